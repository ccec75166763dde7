//! 结构掩膜加载器.
//!
//! 提供迭代器风格的掩膜获取模式.

use std::path::{Path, PathBuf};

use super::{structure_name, PipelineError};
use crate::StructureMask;

/// 从若干 nifti 文件路径创建结构掩膜加载器. 加载器按给定顺序迭代,
/// 并以文件名推导结构名.
///
/// # 注意
///
/// 加载器不检查重名, 重名由 [`crate::compute_dvh_table`] 拒绝.
pub fn mask_loader<P: AsRef<Path>, I: IntoIterator<Item = P>>(paths: I) -> MaskLoader {
    let mut paths: Vec<PathBuf> = paths.into_iter().map(|p| p.as_ref().to_owned()).collect();
    paths.reverse();
    MaskLoader { paths_rev: paths }
}

/// 结构掩膜加载器. 每次迭代返回 `(结构名, 掩膜)` 或错误.
#[derive(Debug)]
pub struct MaskLoader {
    paths_rev: Vec<PathBuf>,
}

impl Iterator for MaskLoader {
    type Item = Result<(String, StructureMask), PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths_rev.pop()?;
        Some(load_mask(path))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.paths_rev.len(), Some(self.paths_rev.len()))
    }
}

impl ExactSizeIterator for MaskLoader {
    #[inline]
    fn len(&self) -> usize {
        self.paths_rev.len()
    }
}

fn load_mask(path: PathBuf) -> Result<(String, StructureMask), PipelineError> {
    let name = structure_name(&path).ok_or_else(|| PipelineError::Unnamed(path.clone()))?;
    let mask = StructureMask::open(&path).map_err(|source| PipelineError::Decode {
        source_name: path.display().to_string(),
        source,
    })?;
    log::debug!("loaded structure `{name}` with {} voxels", mask.count());
    Ok((name, mask))
}
