use std::sync::Arc;

use super::{DvhError, DvhResult};
use crate::consts::MAX_AXIS_POINTS;

/// 剂量轴 `[0, step, 2 * step, ...]`, 最后一个点严格小于最大剂量.
///
/// 该轴是只读的, 克隆只增加引用计数, 因此同一次计算的所有曲线共享同一份采样点.
#[derive(Clone, Debug)]
pub struct DoseAxis {
    max_dose: f64,
    step_size: f64,
    points: Arc<[f64]>,
}

/// 采样点逐位相同即视为相等.
impl PartialEq for DoseAxis {
    fn eq(&self, other: &Self) -> bool {
        self.shares_storage(other)
            || (self.max_dose.to_bits() == other.max_dose.to_bits()
                && self.step_size.to_bits() == other.step_size.to_bits()
                && self.points.len() == other.points.len()
                && self
                    .points
                    .iter()
                    .zip(other.points.iter())
                    .all(|(a, b)| a.to_bits() == b.to_bits()))
    }
}

/// `0 < step_size < max_dose`, 且均为有限数?
#[inline]
pub(crate) fn is_valid_axis(max_dose: f64, step_size: f64) -> bool {
    max_dose.is_finite() && step_size.is_finite() && 0.0 < step_size && step_size < max_dose
}

impl DoseAxis {
    /// 构建剂量轴.
    ///
    /// 第 `i` 个点为 `i * step_size` (不做累加, 避免误差积累).
    /// 参数不满足 `0 < step_size < max_dose`, 或点数过多时返回 `Err`.
    pub fn new(max_dose: f64, step_size: f64) -> DvhResult<Self> {
        let invalid = DvhError::InvalidAxis {
            max_dose,
            step_size,
        };
        if !is_valid_axis(max_dose, step_size) {
            return Err(invalid);
        }

        let estimate = (max_dose / step_size).ceil();
        if estimate > MAX_AXIS_POINTS as f64 {
            return Err(invalid);
        }

        // 浮点除法可能多估或少估一个点, 两个方向都修正.
        let mut n = estimate as usize;
        while n > 0 && (n - 1) as f64 * step_size >= max_dose {
            n -= 1;
        }
        while (n as f64) * step_size < max_dose {
            n += 1;
        }

        let points = (0..n).map(|i| i as f64 * step_size).collect();
        Ok(Self {
            max_dose,
            step_size,
            points,
        })
    }

    /// 最大剂量 (不包含).
    #[inline]
    pub fn max_dose(&self) -> f64 {
        self.max_dose
    }

    /// 步长.
    #[inline]
    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    /// 所有采样点.
    #[inline]
    pub fn points(&self) -> &[f64] {
        &self.points
    }

    /// 采样点个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// 剂量轴是否为空? 合法参数构建的剂量轴至少包含 `0`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 按升序迭代采样点.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        self.points.iter().copied()
    }

    /// 两条剂量轴是否共享同一份底层存储?
    #[inline]
    pub fn shares_storage(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.points, &other.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_invalid_input() {
        for (max, step) in [
            (0.0, 0.1),
            (-1.0, 0.1),
            (10.0, 0.0),
            (10.0, -1.0),
            (10.0, 10.0),
            (10.0, 11.0),
            (f64::NAN, 0.1),
            (10.0, f64::NAN),
            (f64::INFINITY, 1.0),
            (1e12, 1e-12),
        ] {
            assert!(DoseAxis::new(max, step).is_err(), "({max}, {step})");
        }
    }

    #[test]
    fn test_axis_deterministic() {
        let axis = DoseAxis::new(10.0, 1.0).unwrap();
        let expected: Vec<f64> = (0..10).map(f64::from).collect();
        assert_eq!(axis.points(), expected.as_slice());
        assert_eq!(axis.len(), 10);
    }

    #[test]
    fn test_axis_strictly_below_max() {
        for (max, step) in [(70.0, 0.1), (65.0, 0.1), (1.0, 0.3), (0.3, 0.1), (7.5, 2.5)] {
            let axis = DoseAxis::new(max, step).unwrap();
            let last = *axis.points().last().unwrap();
            assert!(last < max, "({max}, {step}) -> {last}");
            assert!(axis.len() as f64 * step >= max, "({max}, {step}) -> {last}");
            assert_eq!(axis.points()[0], 0.0);
            assert!(axis.points().windows(2).all(|w| w[0] < w[1]));
        }
        assert_eq!(DoseAxis::new(70.0, 0.1).unwrap().len(), 700);
        assert_eq!(DoseAxis::new(7.5, 2.5).unwrap().len(), 3);
        assert_eq!(DoseAxis::new(1.0, 0.3).unwrap().len(), 4);
    }

    #[test]
    fn test_axis_shared_storage() {
        let a = DoseAxis::new(5.0, 0.5).unwrap();
        let b = a.clone();
        let c = DoseAxis::new(5.0, 0.5).unwrap();
        assert!(a.shares_storage(&b));
        assert!(!a.shares_storage(&c));
        assert_eq!(a, c);
        assert_ne!(a, DoseAxis::new(5.0, 0.25).unwrap());
    }
}
