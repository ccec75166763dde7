use super::curve::check_shape;
use super::DvhResult;
use crate::{DoseVolume, StructureMask};

/// 结构内剂量的基本统计信息.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DoseStats {
    /// 结构体素个数 (包括剂量为 NaN 的体素).
    pub voxels: usize,

    /// 结构实际体积 (cc). 体素分辨率未知时为 `None`.
    pub volume_cc: Option<f64>,

    /// 最小剂量.
    pub min: f64,

    /// 平均剂量.
    pub mean: f64,

    /// 最大剂量.
    pub max: f64,
}

/// 计算结构内剂量的最小值、平均值和最大值. NaN 剂量不参与统计.
///
/// 若结构为空 (或结构内剂量全为 NaN), 则返回 `Ok(None)`.
pub fn compute_dose_stats(
    dose: &DoseVolume,
    mask: &StructureMask,
) -> DvhResult<Option<DoseStats>> {
    check_shape(dose, mask, None)?;
    let values = dose.values_in(mask);
    let voxels = values.len();

    let mut count = 0u64;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.into_iter().filter(|v| !v.is_nan()) {
        count += 1;
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }

    if count == 0 {
        return Ok(None);
    }
    Ok(Some(DoseStats {
        voxels,
        volume_cc: mask.volume_cc(),
        min,
        mean: sum / count as f64,
        max,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DvhError;
    use ndarray::Array3;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-8
    }

    #[test]
    fn test_dose_stats() {
        let dose = DoseVolume::from_array(
            Array3::from_shape_vec((1, 2, 3), vec![1.0, 2.0, 100.0, 3.0, f64::NAN, 100.0]).unwrap(),
        );
        let mask = StructureMask::from_membership(
            Array3::from_shape_vec((1, 2, 3), vec![true, true, false, true, true, false]).unwrap(),
        )
        .with_pix_dim([10.0, 10.0, 10.0]);

        let stats = compute_dose_stats(&dose, &mask).unwrap().unwrap();
        assert_eq!(stats.voxels, 4);
        assert!(f64_eq(stats.volume_cc.unwrap(), 4.0));
        assert!(f64_eq(stats.min, 1.0));
        assert!(f64_eq(stats.mean, 2.0));
        assert!(f64_eq(stats.max, 3.0));
    }

    #[test]
    fn test_dose_stats_empty() {
        let shape = (2, 2, 2);
        let dose = DoseVolume::from_array(Array3::from_elem(shape, 1.0));
        let mask = StructureMask::from_membership(Array3::from_elem(shape, false));
        assert_eq!(compute_dose_stats(&dose, &mask).unwrap(), None);

        let other = StructureMask::from_membership(Array3::from_elem((1, 2, 2), true));
        assert!(matches!(
            compute_dose_stats(&dose, &other),
            Err(DvhError::ShapeMismatch { .. })
        ));
    }
}
