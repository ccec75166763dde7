//! 数据集操作: 结构命名、掩膜加载与从文件 (或上传的字节流) 直接计算 DVH 表.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::dvh::{DvhError, DvhTable};
use crate::{DecodeCache, DecodeError, DoseVolume, DvhConfig, StructureMask};

mod loader;

pub use loader::{mask_loader, MaskLoader};

/// 从文件计算 DVH 表时的错误.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 解码剂量或掩膜失败.
    #[error("failed to decode `{source_name}`: {source}")]
    Decode {
        /// 出错的文件路径或上传文件名.
        source_name: String,
        /// 解码错误.
        source: DecodeError,
    },

    /// 无法从文件名推导结构名.
    #[error("cannot derive a structure name from `{}`", .0.display())]
    Unnamed(PathBuf),

    /// DVH 计算错误.
    #[error(transparent)]
    Dvh(#[from] DvhError),
}

/// 从文件名推导结构名: 取文件基本名中第一个 `.` 之前的部分.
///
/// `"Heart.nii.gz"` -> `"Heart"`, `"dir/PTV.boost.nii"` -> `"PTV"`.
/// 推导结果为空 (如 `".nii"`) 时返回 `None`.
pub fn structure_name<P: AsRef<Path>>(path: P) -> Option<String> {
    let file_name = path.as_ref().file_name()?.to_string_lossy();
    let name = file_name.split('.').next().unwrap_or_default();
    (!name.is_empty()).then(|| name.to_owned())
}

/// 打开剂量文件与所有掩膜文件. 掩膜按给定顺序返回.
pub fn load_inputs<P, Q, I>(
    dose_path: P,
    mask_paths: I,
) -> Result<(DoseVolume, Vec<(String, StructureMask)>), PipelineError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    I: IntoIterator<Item = Q>,
{
    let dose_path = dose_path.as_ref();
    let dose = DoseVolume::open(dose_path).map_err(|source| PipelineError::Decode {
        source_name: dose_path.display().to_string(),
        source,
    })?;
    log::info!(
        "loaded dose `{}` with shape {:?}",
        dose_path.display(),
        dose.shape()
    );

    let masks = mask_loader(mask_paths).collect::<Result<Vec<_>, _>>()?;
    log::info!("loaded {} structure masks", masks.len());
    Ok((dose, masks))
}

/// 按 `config` 计算已加载的 `masks` 的 DVH 表. 开启 `rayon` feature 时并行计算.
pub fn dvh_from_inputs(
    dose: &DoseVolume,
    masks: &[(String, StructureMask)],
    config: &DvhConfig,
) -> Result<DvhTable, DvhError> {
    let masks = masks.iter().map(|(name, mask)| (name.as_str(), mask));

    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            crate::dvh::par_compute_dvh_table(dose, masks, config.max_dose(), config.step_size())
        } else {
            crate::dvh::compute_dvh_table(dose, masks, config.max_dose(), config.step_size())
        }
    }
}

/// 从剂量文件和若干掩膜文件直接计算 DVH 表. 结构名由 [`structure_name`] 推导.
pub fn dvh_from_files<P, Q, I>(
    dose_path: P,
    mask_paths: I,
    config: &DvhConfig,
) -> Result<DvhTable, PipelineError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    I: IntoIterator<Item = Q>,
{
    let (dose, masks) = load_inputs(dose_path, mask_paths)?;
    Ok(dvh_from_inputs(&dose, &masks, config)?)
}

/// 一个上传的文件: 原始文件名和字节内容.
#[derive(Copy, Clone, Debug)]
pub struct Upload<'a> {
    /// 原始文件名, 用于推导结构名.
    pub file_name: &'a str,

    /// 文件内容 (`.nii` 或 `.nii.gz`).
    pub bytes: &'a [u8],
}

impl<'a> Upload<'a> {
    /// 构建上传文件.
    #[inline]
    pub fn new(file_name: &'a str, bytes: &'a [u8]) -> Self {
        Self { file_name, bytes }
    }

    fn decode_with(
        &self,
        cache: &mut DecodeCache,
    ) -> Result<std::sync::Arc<crate::DecodedVolume>, PipelineError> {
        cache
            .get_or_decode(self.bytes)
            .map_err(|source| PipelineError::Decode {
                source_name: self.file_name.to_owned(),
                source,
            })
    }
}

/// 从上传的字节流计算 DVH 表. 解码结果经由调用方持有的 `cache` 复用.
pub fn dvh_from_uploads(
    dose: Upload<'_>,
    masks: &[Upload<'_>],
    config: &DvhConfig,
    cache: &mut DecodeCache,
) -> Result<DvhTable, PipelineError> {
    let dose = DoseVolume::from(dose.decode_with(cache)?.as_ref());

    let mut named = Vec::with_capacity(masks.len());
    for upload in masks {
        let name = structure_name(upload.file_name)
            .ok_or_else(|| PipelineError::Unnamed(PathBuf::from(upload.file_name)))?;
        let mask = StructureMask::from(upload.decode_with(cache)?.as_ref());
        named.push((name, mask));
    }

    Ok(dvh_from_inputs(&dose, &named, config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use nifti::writer::WriterOptions;
    use std::fs;

    #[test]
    fn test_structure_name() {
        assert_eq!(structure_name("Heart.nii.gz").as_deref(), Some("Heart"));
        assert_eq!(structure_name("dir/PTV.boost.nii").as_deref(), Some("PTV"));
        assert_eq!(structure_name("SpinalCord").as_deref(), Some("SpinalCord"));
        assert_eq!(structure_name("a.b/Lung_L.nii").as_deref(), Some("Lung_L"));
        assert_eq!(structure_name(".nii"), None);
        assert_eq!(structure_name(""), None);
    }

    /// 临时目录下的一组测试文件. 数据按 nifti 的 `[W, H, z]` 布局写入.
    struct Fixture {
        dir: PathBuf,
    }

    impl Fixture {
        fn new(tag: &str) -> Self {
            let mut dir = std::env::temp_dir();
            dir.push(format!("dvh-berry-{}-{tag}", std::process::id()));
            fs::create_dir_all(&dir).unwrap();
            Self { dir }
        }

        fn write(&self, name: &str, data: &Array3<f32>) -> PathBuf {
            let path = self.dir.join(name);
            WriterOptions::new(&path).write_nifti(data).unwrap();
            path
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            fs::remove_dir_all(&self.dir).ok();
        }
    }

    fn dose_raw() -> Array3<f32> {
        Array3::from_shape_fn((4, 3, 2), |(w, h, z)| (w + h * 4 + z * 12) as f32)
    }

    fn mask_raw(pred: impl Fn(usize, usize, usize) -> bool) -> Array3<f32> {
        Array3::from_shape_fn((4, 3, 2), |(w, h, z)| if pred(w, h, z) { 1.0 } else { 0.0 })
    }

    #[test]
    fn test_dvh_from_files() {
        let fx = Fixture::new("files");
        let dose = fx.write("dose.nii.gz", &dose_raw());
        let ptv = fx.write("PTV.nii.gz", &mask_raw(|_, _, z| z == 1));
        // 写入时会截断多重扩展名, 写完再改名.
        let cord = fx.dir.join("Cord.mask.nii");
        fs::rename(fx.write("Cord.nii", &mask_raw(|w, _, _| w == 0)), &cord).unwrap();

        let config = DvhConfig::new(30.0, 1.0).unwrap();
        let table = dvh_from_files(&dose, [&ptv, &cord], &config).unwrap();
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["PTV", "Cord"]);
        assert_eq!(table.axis().len(), 30);

        // PTV 内剂量为 12..=23.
        let ptv_curve = table.get("PTV").unwrap();
        assert_eq!(ptv_curve.volumes()[12], 100.0);
        assert_eq!(ptv_curve.volumes()[18], 50.0);
        assert_eq!(ptv_curve.volumes()[24], 0.0);

        // Cord 内剂量为 0, 4, 8, 12, 16, 20.
        let cord_curve = table.get("Cord").unwrap();
        assert_eq!(cord_curve.volumes()[0], 100.0);
        assert_eq!(cord_curve.volumes()[9], 50.0);
        assert_eq!(cord_curve.volumes()[21], 0.0);

        let dup = dvh_from_files(&dose, [&ptv, &ptv], &config).unwrap_err();
        assert!(matches!(
            dup,
            PipelineError::Dvh(DvhError::DuplicateStructure(ref s)) if s == "PTV"
        ));
    }

    #[test]
    fn test_dvh_from_files_errors() {
        let fx = Fixture::new("errors");
        let dose = fx.write("dose.nii.gz", &dose_raw());
        let small = fx.write("Small.nii.gz", &Array3::from_elem((2, 2, 2), 1.0));
        let config = DvhConfig::default();

        let missing = dvh_from_files(&dose, [fx.dir.join("Nope.nii.gz")], &config).unwrap_err();
        assert!(matches!(missing, PipelineError::Decode { .. }));

        let mismatch = dvh_from_files(&dose, [&small], &config).unwrap_err();
        assert!(matches!(
            mismatch,
            PipelineError::Dvh(DvhError::ShapeMismatch { .. })
        ));

        let none: [PathBuf; 0] = [];
        let empty = dvh_from_files(&dose, none, &config).unwrap_err();
        assert!(matches!(empty, PipelineError::Dvh(DvhError::NoStructures)));
    }

    #[test]
    fn test_dvh_from_uploads_uses_cache() {
        let fx = Fixture::new("uploads");
        let dose = fs::read(fx.write("dose.nii.gz", &dose_raw())).unwrap();
        let body = fs::read(fx.write("Body.nii.gz", &mask_raw(|_, _, _| true))).unwrap();

        let config = DvhConfig::new(24.0, 0.5).unwrap();
        let mut cache = DecodeCache::new();
        let uploads = [Upload::new("Body.nii.gz", &body)];
        let first = dvh_from_uploads(Upload::new("dose.nii.gz", &dose), &uploads, &config, &mut cache)
            .unwrap();
        assert_eq!(cache.len(), 2);

        let second =
            dvh_from_uploads(Upload::new("dose.nii.gz", &dose), &uploads, &config, &mut cache)
                .unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(first, second);
        assert_eq!(first.get("Body").unwrap().volumes()[0], 100.0);

        let bad = [Upload::new(".nii.gz", &body)];
        assert!(matches!(
            dvh_from_uploads(Upload::new("dose.nii.gz", &dose), &bad, &config, &mut cache),
            Err(PipelineError::Unnamed(_))
        ));
    }
}
