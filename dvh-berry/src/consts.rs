//! 通用常量.

/// 默认最大剂量 (不包含). 单位与剂量数据一致, 通常为 Gy.
pub const DEFAULT_MAX_DOSE: f64 = 70.0;

/// 默认剂量轴步长.
pub const DEFAULT_STEP_SIZE: f64 = 0.1;

/// 体积百分比上限.
pub const FULL_VOLUME_PERCENT: f64 = 100.0;

/// 立方毫米到立方厘米 (cc) 的换算系数.
pub const MM3_PER_CC: f64 = 1000.0;

/// gzip 流的魔数.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// 环境变量名.
pub mod env {
    /// 覆盖默认最大剂量.
    pub const MAX_DOSE: &str = "DVH_MAX_DOSE";

    /// 覆盖默认剂量轴步长.
    pub const STEP_SIZE: &str = "DVH_STEP_SIZE";
}

/// 表格列名.
pub mod column {
    /// 剂量列.
    pub const DOSE: &str = "Dose";

    /// 结构列.
    pub const STRUCTURE: &str = "Structure";

    /// 体积百分比列.
    pub const VOLUME: &str = "Volume";
}

/// 体素是否属于结构? 任何大于 0 的掩膜值都视为属于该结构, NaN 不属于.
#[inline]
pub fn is_member(value: f64) -> bool {
    value > 0.0
}

/// 剂量轴点数上限. 超过该值的 `(max_dose, step_size)` 组合视为非法.
pub const MAX_AXIS_POINTS: usize = 1 << 24;
