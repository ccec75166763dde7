//! nifti 体数据解码.
//!
//! 只负责 "字节 -> 数组" 这一件事: 除了形状, 不解释 header 中的任何几何信息.

use std::io::{self, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use ndarray::{Array3, ArrayD, Axis, Ix3};
use nifti::{InMemNiftiObject, IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use thiserror::Error;

use crate::consts::GZIP_MAGIC;
use crate::Idx3d;

/// 解码错误. 原样向调用方传播, 解码器不做任何恢复尝试.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// 底层 I/O 错误.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// nifti 格式错误 (header 非法、数据截断、不支持的数据类型等).
    #[error("nifti error: {0}")]
    Nifti(#[from] nifti::NiftiError),

    /// 数据不是三维体数据. 参数为 header 中声明的形状.
    #[error("expected a 3-D volume, found shape {0:?}")]
    NotVolumetric(Vec<usize>),
}

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
pub(crate) type BoxedHeader = Box<NiftiHeader>;

/// 解码后的三维体数据, 包括 header 和按 `(z, h, w)` 组织的 `f64` 体素值.
#[derive(Debug, Clone)]
pub struct DecodedVolume {
    /// 原始 header.
    pub header: BoxedHeader,

    /// 体素数据, 标准 (行优先) 布局.
    pub data: Array3<f64>,
}

impl DecodedVolume {
    /// 数据形状 `(z, h, w)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }
}

/// 解码内存中的 nifti 字节流.
///
/// 以 gzip 魔数开头的流会先经 `flate2` 解压; 否则按未压缩的 `.nii` 处理.
pub fn decode(bytes: &[u8]) -> Result<DecodedVolume, DecodeError> {
    if bytes.starts_with(&GZIP_MAGIC) {
        log::debug!("decoding gzip nifti stream ({} bytes)", bytes.len());
        decode_reader(GzDecoder::new(bytes))
    } else {
        log::debug!("decoding raw nifti stream ({} bytes)", bytes.len());
        decode_reader(bytes)
    }
}

/// 打开本地 nifti 文件 (`.nii` 或 `.nii.gz`) 并解码.
pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<DecodedVolume, DecodeError> {
    let obj = ReaderOptions::new().read_file(path.as_ref())?;
    log::debug!("decoded nifti file `{}`", path.as_ref().display());
    from_object(obj)
}

fn decode_reader<R: Read>(source: R) -> Result<DecodedVolume, DecodeError> {
    from_object(InMemNiftiObject::from_reader(source)?)
}

fn from_object(obj: InMemNiftiObject) -> Result<DecodedVolume, DecodeError> {
    let header = Box::new(obj.header().clone());
    let data = into_zhw(obj.into_volume().into_ndarray::<f64>()?)?;
    Ok(DecodedVolume { header, data })
}

/// 将 `[W, H, z]` (或 `[W, H, z, 1]`) 转换成 `(z, H, W)`. 以后均按照该模式访问.
fn into_zhw(data: ArrayD<f64>) -> Result<Array3<f64>, DecodeError> {
    let squeeze = matches!(data.shape(), [_, _, _, 1]);
    let data = if squeeze {
        data.index_axis_move(Axis(3), 0)
    } else {
        data
    };

    let shape = data.shape().to_vec();
    // hint: 原第一维向下增长, 原第二维向右增长.
    let data = data
        .into_dimensionality::<Ix3>()
        .map_err(|_| DecodeError::NotVolumetric(shape))?
        .permuted_axes([2, 1, 0]);

    // The nature of nifti data field layout.
    if data.is_standard_layout() {
        Ok(data)
    } else {
        Ok(data.as_standard_layout().to_owned())
    }
}
