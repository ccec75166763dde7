use std::collections::HashSet;

use super::curve::{check_shape, curve_on_axis};
use super::reshape::{LongTable, WideTable};
use super::{DoseAxis, DvhCurve, DvhError, DvhResult};
use crate::{DoseVolume, StructureMask};

/// 多个结构的 DVH 曲线集合. 所有曲线共享同一条剂量轴, 并保持输入顺序.
#[derive(Clone, Debug, PartialEq)]
pub struct DvhTable {
    axis: DoseAxis,
    curves: Vec<(String, DvhCurve)>,
}

impl DvhTable {
    /// 调用方需保证结构名唯一, 且每条曲线都建立在 `axis` 上.
    #[inline]
    pub(crate) fn from_parts(axis: DoseAxis, curves: Vec<(String, DvhCurve)>) -> Self {
        debug_assert!(curves.iter().all(|(_, c)| c.axis() == &axis));
        Self { axis, curves }
    }

    /// 共享剂量轴.
    #[inline]
    pub fn axis(&self) -> &DoseAxis {
        &self.axis
    }

    /// 结构个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.curves.len()
    }

    /// 表中是否没有任何结构?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    /// 按输入顺序迭代结构名.
    #[inline]
    pub fn names(&self) -> impl ExactSizeIterator<Item = &str> {
        self.curves.iter().map(|(name, _)| name.as_str())
    }

    /// 按结构名获取曲线.
    pub fn get(&self, name: &str) -> Option<&DvhCurve> {
        self.curves
            .iter()
            .find_map(|(n, c)| (n == name).then_some(c))
    }

    /// 按输入顺序迭代 `(结构名, 曲线)`.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &DvhCurve)> {
        self.curves.iter().map(|(n, c)| (n.as_str(), c))
    }

    /// 转换为宽表: 每个结构一行, 每个剂量点一列.
    pub fn to_wide(&self) -> WideTable {
        WideTable::from_table(self)
    }

    /// 转换为长表: 每个 (结构, 剂量) 一行.
    pub fn to_long(&self) -> LongTable {
        LongTable::from_table(self)
    }
}

/// 收集结构, 并在计算任何曲线前检查空集合、重名与形状.
fn collect_checked<'a, S, I>(
    dose: &DoseVolume,
    masks: I,
) -> DvhResult<Vec<(String, &'a StructureMask)>>
where
    S: Into<String>,
    I: IntoIterator<Item = (S, &'a StructureMask)>,
{
    let mut seen = HashSet::new();
    let mut checked = Vec::new();
    for (name, mask) in masks {
        let name = name.into();
        if !seen.insert(name.clone()) {
            return Err(DvhError::DuplicateStructure(name));
        }
        check_shape(dose, mask, Some(&name))?;
        checked.push((name, mask));
    }

    if checked.is_empty() {
        return Err(DvhError::NoStructures);
    }
    Ok(checked)
}

/// 计算多个结构的 DVH 表.
///
/// `masks` 按 `(结构名, 掩膜)` 给出, 输出保持该顺序. 剂量轴只构建一次,
/// 由所有曲线共享.
///
/// # 错误
///
/// 1. `masks` 为空时返回 [`DvhError::NoStructures`].
/// 2. 结构名重复时返回 [`DvhError::DuplicateStructure`].
/// 3. 任一掩膜形状与剂量不一致时返回 [`DvhError::ShapeMismatch`].
///
/// 以上检查都在计算任何曲线之前完成.
pub fn compute_dvh_table<'a, S, I>(
    dose: &DoseVolume,
    masks: I,
    max_dose: f64,
    step_size: f64,
) -> DvhResult<DvhTable>
where
    S: Into<String>,
    I: IntoIterator<Item = (S, &'a StructureMask)>,
{
    let masks = collect_checked(dose, masks)?;
    let axis = DoseAxis::new(max_dose, step_size)?;
    log::debug!(
        "computing {} dvh curves over {} dose points",
        masks.len(),
        axis.len()
    );

    let curves = masks
        .into_iter()
        .map(|(name, mask)| {
            let curve = curve_on_axis(dose, mask, &axis);
            (name, curve)
        })
        .collect();
    Ok(DvhTable::from_parts(axis, curves))
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
    }
}

/// 借助 `rayon`, 并行地计算多个结构的 DVH 表. 结果与 [`compute_dvh_table`] 完全一致.
#[cfg(feature = "rayon")]
pub fn par_compute_dvh_table<'a, S, I>(
    dose: &DoseVolume,
    masks: I,
    max_dose: f64,
    step_size: f64,
) -> DvhResult<DvhTable>
where
    S: Into<String>,
    I: IntoIterator<Item = (S, &'a StructureMask)>,
{
    let masks = collect_checked(dose, masks)?;
    let axis = DoseAxis::new(max_dose, step_size)?;
    log::debug!(
        "computing {} dvh curves in parallel over {} dose points",
        masks.len(),
        axis.len()
    );

    let curves = masks
        .into_par_iter()
        .map(|(name, mask)| {
            let curve = curve_on_axis(dose, mask, &axis);
            (name, curve)
        })
        .collect();
    Ok(DvhTable::from_parts(axis, curves))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    const SHAPE: (usize, usize, usize) = (4, 6, 8);

    fn gradient_dose() -> DoseVolume {
        DoseVolume::from_array(Array3::from_shape_fn(SHAPE, |(z, h, w)| {
            (z * 10 + h * 2 + w) as f64 * 0.5
        }))
    }

    fn masks() -> Vec<(String, StructureMask)> {
        vec![
            (
                "PTV".to_string(),
                StructureMask::from_membership(Array3::from_shape_fn(SHAPE, |(z, _, _)| z >= 2)),
            ),
            (
                "Heart".to_string(),
                StructureMask::from_membership(Array3::from_shape_fn(SHAPE, |(_, h, w)| {
                    h < 2 && w < 3
                })),
            ),
            (
                "Empty".to_string(),
                StructureMask::from_membership(Array3::from_elem(SHAPE, false)),
            ),
        ]
    }

    fn borrowed(masks: &[(String, StructureMask)]) -> impl Iterator<Item = (&str, &StructureMask)> {
        masks.iter().map(|(n, m)| (n.as_str(), m))
    }

    #[test]
    fn test_table_shared_axis_and_order() {
        let dose = gradient_dose();
        let masks = masks();
        let table = compute_dvh_table(&dose, borrowed(&masks), 30.0, 0.5).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["PTV", "Heart", "Empty"]);
        for (name, curve) in table.iter() {
            assert!(curve.axis().shares_storage(table.axis()), "{name}");
            assert_eq!(curve.len(), table.axis().len());
        }
        assert!(table.get("Empty").unwrap().is_zero());
        assert!(table.get("Lung").is_none());

        for (name, mask) in masks.iter() {
            let single = crate::dvh::compute_dvh(&dose, mask, 30.0, 0.5).unwrap();
            assert_eq!(table.get(name).unwrap(), &single);
        }
    }

    #[test]
    fn test_table_no_structures() {
        let dose = gradient_dose();
        let none: Vec<(&str, &StructureMask)> = Vec::new();
        assert_eq!(
            compute_dvh_table(&dose, none, 30.0, 0.5).unwrap_err(),
            DvhError::NoStructures
        );
    }

    #[test]
    fn test_table_duplicate_structure() {
        let dose = gradient_dose();
        let masks = masks();
        let dup = borrowed(&masks).chain(std::iter::once(("Heart", &masks[0].1)));
        assert_eq!(
            compute_dvh_table(&dose, dup, 30.0, 0.5).unwrap_err(),
            DvhError::DuplicateStructure("Heart".to_string())
        );
    }

    #[test]
    fn test_table_shape_mismatch() {
        let dose = DoseVolume::from_array(Array3::from_elem((10, 10, 10), 1.0));
        let good = StructureMask::from_membership(Array3::from_elem((10, 10, 10), true));
        let bad = StructureMask::from_membership(Array3::from_elem((5, 5, 5), true));
        let err = compute_dvh_table(&dose, [("Good", &good), ("Bad", &bad)], 10.0, 1.0)
            .unwrap_err();
        assert_eq!(
            err,
            DvhError::ShapeMismatch {
                structure: Some("Bad".to_string()),
                dose: (10, 10, 10),
                mask: (5, 5, 5),
            }
        );
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_par_table_matches_sequential() {
        let dose = gradient_dose();
        let masks = masks();
        let seq = compute_dvh_table(&dose, borrowed(&masks), 30.0, 0.1).unwrap();
        let par = par_compute_dvh_table(&dose, borrowed(&masks), 30.0, 0.1).unwrap();
        assert_eq!(seq, par);
        assert_eq!(seq.names().collect::<Vec<_>>(), par.names().collect::<Vec<_>>());
    }
}
