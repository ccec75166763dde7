//! 运行时错误.

use thiserror::Error;

use crate::Idx3d;

/// DVH 计算错误.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DvhError {
    /// 剂量轴参数非法. 要求 `0 < step_size < max_dose`, 且均为有限数.
    #[error("invalid dose axis: max_dose = {max_dose}, step_size = {step_size}")]
    InvalidAxis {
        /// 最大剂量 (不包含).
        max_dose: f64,
        /// 步长.
        step_size: f64,
    },

    /// 掩膜与剂量形状不一致. 不会做任何裁剪、填充或广播.
    #[error(
        "mask shape {mask:?} of structure `{}` does not match dose shape {dose:?}",
        .structure.as_deref().unwrap_or("<unnamed>")
    )]
    ShapeMismatch {
        /// 结构名. 单结构计算时为 `None`.
        structure: Option<String>,
        /// 剂量形状 `(z, h, w)`.
        dose: Idx3d,
        /// 掩膜形状 `(z, h, w)`.
        mask: Idx3d,
    },

    /// 没有提供任何结构.
    #[error("no structures supplied")]
    NoStructures,

    /// 结构名重复.
    #[error("duplicate structure name `{0}`")]
    DuplicateStructure(String),
}

/// 宽表 / 长表还原为 DVH 表时的错误.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    /// 表中没有任何结构.
    #[error("table has no structures")]
    Empty,

    /// 结构名重复 (宽表).
    #[error("duplicate structure name `{0}`")]
    DuplicateStructure(String),

    /// 某结构的值个数与剂量轴长度不一致.
    #[error("structure `{structure}` has {found} values, expected {expected}")]
    Length {
        /// 结构名.
        structure: String,
        /// 剂量轴长度.
        expected: usize,
        /// 实际个数.
        found: usize,
    },

    /// 某结构的剂量列与剂量轴不一致 (长表).
    #[error("dose values of structure `{0}` do not match the dose axis")]
    AxisMismatch(String),
}
