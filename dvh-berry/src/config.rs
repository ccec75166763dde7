//! DVH 计算参数.
//!
//! 默认值见 [`crate::consts`]. 可通过环境变量 `$DVH_MAX_DOSE` 和 `$DVH_STEP_SIZE` 覆盖.

use std::env;

use thiserror::Error;

use crate::consts::{env as keys, DEFAULT_MAX_DOSE, DEFAULT_STEP_SIZE};
use crate::dvh::{DoseAxis, DvhResult};

/// 配置错误.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// 环境变量的值无法解析为数字.
    #[error("environment variable `{key}` is not a number: `{value}`")]
    NotANumber {
        /// 环境变量名.
        key: &'static str,
        /// 原始值.
        value: String,
    },

    /// 参数不满足 `0 < step_size < max_dose`.
    #[error("invalid dose axis: max_dose = {max_dose}, step_size = {step_size}")]
    InvalidAxis {
        /// 最大剂量 (不包含).
        max_dose: f64,
        /// 步长.
        step_size: f64,
    },
}

/// DVH 剂量轴配置.
///
/// 通过 [`DvhConfig::new`] 构建的配置总是合法的; 反序列化得到的配置在
/// [`DvhConfig::axis`] 时才会被检查.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DvhConfig {
    max_dose: f64,
    step_size: f64,
}

impl Default for DvhConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_dose: DEFAULT_MAX_DOSE,
            step_size: DEFAULT_STEP_SIZE,
        }
    }
}

impl DvhConfig {
    /// 构建配置. 要求 `0 < step_size < max_dose`, 且均为有限数.
    pub fn new(max_dose: f64, step_size: f64) -> Result<Self, ConfigError> {
        if crate::dvh::is_valid_axis(max_dose, step_size) {
            Ok(Self {
                max_dose,
                step_size,
            })
        } else {
            Err(ConfigError::InvalidAxis {
                max_dose,
                step_size,
            })
        }
    }

    /// 从默认值出发, 用非空的 `$DVH_MAX_DOSE` 和 `$DVH_STEP_SIZE` 覆盖对应参数.
    #[inline]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 同 [`DvhConfig::from_env`], 但从 `lookup` 中读取变量.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &'static str, default: f64| -> Result<f64, ConfigError> {
            match lookup(key) {
                Some(v) if !v.trim().is_empty() => {
                    v.trim().parse().map_err(|_| ConfigError::NotANumber {
                        key,
                        value: v.clone(),
                    })
                }
                _ => Ok(default),
            }
        };
        let max_dose = read(keys::MAX_DOSE, DEFAULT_MAX_DOSE)?;
        let step_size = read(keys::STEP_SIZE, DEFAULT_STEP_SIZE)?;
        let config = Self::new(max_dose, step_size)?;
        log::debug!("dvh config: {config:?}");
        Ok(config)
    }

    /// 替换最大剂量.
    #[inline]
    pub fn with_max_dose(self, max_dose: f64) -> Result<Self, ConfigError> {
        Self::new(max_dose, self.step_size)
    }

    /// 替换步长.
    #[inline]
    pub fn with_step_size(self, step_size: f64) -> Result<Self, ConfigError> {
        Self::new(self.max_dose, step_size)
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

    /// 构建对应的剂量轴.
    #[inline]
    pub fn axis(&self) -> DvhResult<DoseAxis> {
        DoseAxis::new(self.max_dose, self.step_size)
    }
}
