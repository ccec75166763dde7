use ordered_float::OrderedFloat;

use super::{DoseAxis, DvhError, DvhResult};
use crate::consts::FULL_VOLUME_PERCENT;
use crate::{DoseVolume, StructureMask};

/// 单个结构的累积 DVH 曲线.
///
/// 体积百分比与剂量轴一一对应, 取值在 `[0, 100]` 内且随剂量单调不增.
#[derive(Clone, Debug, PartialEq)]
pub struct DvhCurve {
    axis: DoseAxis,
    volumes: Vec<f64>,
}

impl DvhCurve {
    /// 调用方需保证 `volumes` 与 `axis` 等长.
    #[inline]
    pub(crate) fn from_parts(axis: DoseAxis, volumes: Vec<f64>) -> Self {
        debug_assert_eq!(axis.len(), volumes.len());
        Self { axis, volumes }
    }

    /// 曲线的剂量轴.
    #[inline]
    pub fn axis(&self) -> &DoseAxis {
        &self.axis
    }

    /// 与剂量轴对齐的体积百分比.
    #[inline]
    pub fn volumes(&self) -> &[f64] {
        &self.volumes
    }

    /// 采样点个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    /// 曲线是否没有采样点?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    /// 按剂量升序迭代 `(剂量, 体积百分比)`.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (f64, f64)> + '_ {
        self.axis.iter().zip(self.volumes.iter().copied())
    }

    /// 是否为空结构的全零曲线?
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.volumes.iter().all(|v| *v == 0.0)
    }

    /// 所有剂量轴点上的体积百分比都不小于 `volume` 的最大剂量 (即 D_volume).
    ///
    /// 若剂量 0 处的值也不满足, 则返回 `None`.
    pub fn dose_covering(&self, volume: f64) -> Option<f64> {
        let idx = self.volumes.partition_point(|v| *v >= volume);
        idx.checked_sub(1).map(|i| self.axis.points()[i])
    }
}

/// 检查剂量与掩膜形状是否一致.
pub(crate) fn check_shape(
    dose: &DoseVolume,
    mask: &StructureMask,
    structure: Option<&str>,
) -> DvhResult<()> {
    if dose.shape() == mask.shape() {
        Ok(())
    } else {
        Err(DvhError::ShapeMismatch {
            structure: structure.map(str::to_owned),
            dose: dose.shape(),
            mask: mask.shape(),
        })
    }
}

/// 计算单个结构的累积 DVH 曲线.
///
/// 剂量轴为 `[0, step_size, 2 * step_size, ...)`, 严格小于 `max_dose`.
/// 掩膜不包含任何体素时返回全零曲线.
pub fn compute_dvh(
    dose: &DoseVolume,
    mask: &StructureMask,
    max_dose: f64,
    step_size: f64,
) -> DvhResult<DvhCurve> {
    check_shape(dose, mask, None)?;
    let axis = DoseAxis::new(max_dose, step_size)?;
    Ok(curve_on_axis(dose, mask, &axis))
}

/// 在已构建好的剂量轴上计算单个结构的累积 DVH 曲线.
pub fn compute_dvh_on_axis(
    dose: &DoseVolume,
    mask: &StructureMask,
    axis: &DoseAxis,
) -> DvhResult<DvhCurve> {
    check_shape(dose, mask, None)?;
    Ok(curve_on_axis(dose, mask, axis))
}

/// 调用方需保证形状一致.
pub(crate) fn curve_on_axis(dose: &DoseVolume, mask: &StructureMask, axis: &DoseAxis) -> DvhCurve {
    let volumes = cumulative_percent(dose.values_in(mask), axis.points());
    DvhCurve::from_parts(axis.clone(), volumes)
}

/// 对每个剂量点 `d`, 求 `values` 中不小于 `d` 的比例 (%).
///
/// NaN 计入总数, 但永远不满足 `>= d`. `values` 为空时返回全零.
fn cumulative_percent(mut values: Vec<f64>, points: &[f64]) -> Vec<f64> {
    let total = values.len();
    if total == 0 {
        return vec![0.0; points.len()];
    }

    values.retain(|v| !v.is_nan());
    values.sort_unstable_by_key(|v| OrderedFloat(*v));

    points
        .iter()
        .map(|&d| {
            let below = values.partition_point(|&v| v < d);
            let count = values.len() - below;
            (count as f64 / total as f64) * FULL_VOLUME_PERCENT
        })
        .collect()
}
