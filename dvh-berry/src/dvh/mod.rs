//! 剂量体积直方图 (DVH) 计算.
//!
//! 给定剂量分布与同网格的结构掩膜, 在共享剂量轴上计算累积 DVH 曲线,
//! 并组装为按结构名索引的 [`DvhTable`].

mod axis;
mod curve;
mod error;
mod reshape;
mod stats;
mod table;

pub use axis::DoseAxis;
pub(crate) use axis::is_valid_axis;
pub use curve::{compute_dvh, compute_dvh_on_axis, DvhCurve};
pub use error::{DvhError, TableError};
pub use reshape::{LongRow, LongTable, WideRow, WideTable};
pub use stats::{compute_dose_stats, DoseStats};
pub use table::{compute_dvh_table, DvhTable};

#[cfg(feature = "rayon")]
pub use table::par_compute_dvh_table;

/// DVH 计算运行时错误.
pub type DvhResult<T> = Result<T, DvhError>;
