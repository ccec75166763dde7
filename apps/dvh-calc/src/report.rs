//! 结构剂量摘要.

use std::io::{self, Write};

use dvh_berry::prelude::*;

const SEP: &str = "--------------------------------------------------------";

#[inline]
fn f64_to_display(f: Option<f64>) -> String {
    match f {
        Some(f) => format!("{f:.3}"),
        None => "/".to_string(),
    }
}

/// 将单个结构的摘要写进 `w` 中.
fn describe_into<W: Write>(
    name: &str,
    mask: &StructureMask,
    stats: Option<&DoseStats>,
    curve: Option<&DvhCurve>,
    w: &mut W,
) -> io::Result<()> {
    const S4: &str = "    ";

    writeln!(w, "Structure `{name}`:")?;
    writeln!(w, "{S4}Voxels: {}", mask.count())?;
    writeln!(w, "{S4}Volume: {} cc", f64_to_display(mask.volume_cc()))?;
    writeln!(w, "{S4}Min dose: {}", f64_to_display(stats.map(|s| s.min)))?;
    writeln!(w, "{S4}Mean dose: {}", f64_to_display(stats.map(|s| s.mean)))?;
    writeln!(w, "{S4}Max dose: {}", f64_to_display(stats.map(|s| s.max)))?;
    for v in [98.0, 50.0, 2.0] {
        let d = curve.and_then(|c| c.dose_covering(v));
        writeln!(w, "{S4}D{v}: {}", f64_to_display(d))?;
    }
    Ok(())
}

/// 将每个结构的剂量统计与 D98 / D50 / D2 写进 `w` 中, 结构之间以分隔线隔开.
pub fn describe<W: Write>(
    dose: &DoseVolume,
    masks: &[(String, StructureMask)],
    table: &DvhTable,
    mut w: W,
) -> anyhow::Result<()> {
    writeln!(w, "{SEP}")?;
    for (name, mask) in masks {
        let stats = compute_dose_stats(dose, mask)?;
        describe_into(name, mask, stats.as_ref(), table.get(name), &mut w)?;
        writeln!(w, "{SEP}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_describe() {
        let dose = DoseVolume::from_array(
            Array3::from_shape_vec((1, 1, 4), vec![1.0, 2.0, 3.0, 4.0]).unwrap(),
        );
        let masks = vec![
            (
                "PTV".to_string(),
                StructureMask::from_membership(Array3::from_elem((1, 1, 4), true)),
            ),
            (
                "Empty".to_string(),
                StructureMask::from_membership(Array3::from_elem((1, 1, 4), false)),
            ),
        ];
        let table = dvh_from_inputs(&dose, &masks, &DvhConfig::new(5.0, 1.0).unwrap()).unwrap();

        let mut buf = Vec::new();
        describe(&dose, &masks, &table, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("Structure `PTV`:\n    Voxels: 4\n    Volume: 0.004 cc\n"));
        assert!(text.contains("    Mean dose: 2.500\n"));
        assert!(text.contains("    D98: 1.000\n    D50: 3.000\n    D2: 4.000\n"));
        assert!(text.contains("Structure `Empty`:\n    Voxels: 0\n    Volume: 0.000 cc\n"));
        assert!(text.contains("    Min dose: /\n"));
        assert_eq!(text.matches(SEP).count(), 3);
    }
}
