#![warn(missing_docs)]

//! 核心库. 根据 3D 剂量分布 (dose) 与若干解剖结构掩膜 (structure mask)
//! 计算累积剂量体积直方图 (Dose-Volume Histogram, DVH), 用于放疗计划评估.
//!
//! 该 crate 只提供 `safe` 接口, 且核心计算是纯函数: 不持有、不修改输入数据.
//!
//! # 注意
//!
//! 1. 剂量与所有掩膜必须定义在同一网格上 (形状一致). 本 crate 不做配准、插值或重采样.
//! 2. 非法输入 (形状不一致、空结构集合、重名结构等) 以 `Err` 形式返回, 不会 panic.
//!
//! # 开发计划
//!
//! ### nifti 解码 ✅
//!
//! 支持 gzip 压缩 (`.nii.gz`) 与未压缩 (`.nii`) 两种字节流,
//! 以及可选的、由调用方持有的解码缓存.
//!
//! 实现位于 `dvh-berry/src/data/decoder.rs` 和 `dvh-berry/src/data/cache.rs`.
//!
//! ### 累积 DVH 曲线 ✅
//!
//! 剂量轴 `[0, step, 2 * step, ...)` 严格小于最大剂量. 每个剂量点上的值为
//! "结构内剂量不小于该点的体素占比 (%)". 空结构得到全零曲线.
//!
//! 实现位于 `dvh-berry/src/dvh`.
//!
//! ### 多结构 DVH 表 ✅
//!
//! 所有结构共享同一条剂量轴, 并按输入顺序输出. 开启 `rayon` feature 时可并行计算.
//!
//! ### 宽表 / 长表 ✅
//!
//! 宽表每个结构一行, 长表每个 (结构, 剂量) 一行. 两者均可无损还原为 DVH 表,
//! 并可导出为 csv.
//!
//! 实现位于 `dvh-berry/src/dvh/reshape.rs`.
//!
//! ### 从文件直接计算 ✅
//!
//! 结构名取文件名第一个 `.` 之前的部分.
//!
//! 实现位于 `dvh-berry/src/dataset`.

/// 三维索引, 按 `(z, h, w)` 组织.
pub type Idx3d = (usize, usize, usize);

/// nii 文件基础数据结构与解码.
mod data;

pub use data::cache::{DecodeCache, Fingerprint};
pub use data::decoder::{decode, decode_file, DecodeError, DecodedVolume};
pub use data::{DoseVolume, NiftiHeaderAttr, StructureMask};

pub mod config;
pub mod consts;
pub mod dataset;
pub mod dvh;
pub mod prelude;

pub use config::{ConfigError, DvhConfig};
pub use dvh::{
    compute_dose_stats, compute_dvh, compute_dvh_on_axis, compute_dvh_table, DoseAxis, DoseStats,
    DvhCurve, DvhError, DvhResult, DvhTable,
};
