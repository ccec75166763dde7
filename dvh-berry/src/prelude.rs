//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx3d;

pub use crate::data::{DoseVolume, NiftiHeaderAttr, StructureMask};
pub use crate::{DecodeCache, DecodeError};

pub use crate::consts::{DEFAULT_MAX_DOSE, DEFAULT_STEP_SIZE};
pub use crate::{ConfigError, DvhConfig};

pub use crate::dvh::{
    compute_dose_stats, compute_dvh, compute_dvh_table, DoseAxis, DoseStats, DvhCurve, DvhError,
    DvhTable, LongTable, WideTable,
};

#[cfg(feature = "rayon")]
pub use crate::dvh::par_compute_dvh_table;

pub use crate::dataset::{
    self, dvh_from_files, dvh_from_inputs, dvh_from_uploads, load_inputs, PipelineError, Upload,
};
