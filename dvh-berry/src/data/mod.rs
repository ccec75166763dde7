use std::ops::Index;
use std::path::Path;

use ndarray::{Array3, ArrayView, Ix3};
use nifti::NiftiHeader;

use crate::consts::{is_member, MM3_PER_CC};
use crate::Idx3d;

pub mod cache;
pub mod decoder;

use decoder::{BoxedHeader, DecodeError, DecodedVolume};

/// 三维 nii 数据 header 的共用属性和部分通用操作.
pub trait NiftiHeaderAttr {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;

    /// 获取单个体素分辨率. 该分辨率以毫米为单位, 分别代表空间 (相邻切片方向),
    /// 高 (自然图像的垂直方向), 宽 (自然图像的水平方向).
    #[inline]
    fn pix_dim(&self) -> [f64; 3] {
        let [_, w, h, z, ..] = self.header().pixdim;
        [z as f64, h as f64, w as f64]
    }

    /// 获取体素的实际体积值, 以立方毫米为单位.
    ///
    /// header 中分辨率缺失或非法 (非正数, 非有限数) 时返回 `None`.
    fn voxel_mm3(&self) -> Option<f64> {
        let dim = self.pix_dim();
        dim.iter()
            .all(|d| d.is_finite() && *d > 0.0)
            .then(|| dim.iter().product())
    }
}

/// 按 `[z, h, w]` 写入 header 的体素分辨率.
fn set_pix_dim(header: &mut NiftiHeader, [z, h, w]: [f32; 3]) {
    let [_, pw, ph, pz, ..] = &mut header.pixdim;
    (*pw, *ph, *pz) = (w, h, z);
}

/// 构造不来源于文件的数据时使用的 header. 分辨率为 1mm 各向同性.
fn synthetic_header() -> BoxedHeader {
    let mut header = Box::<NiftiHeader>::default();
    set_pix_dim(&mut header, [1.0; 3]);
    header
}

/// 三维剂量分布. 剂量值以 `f64` 保存, 单位与计划系统一致 (通常为 Gy).
#[derive(Debug, Clone)]
pub struct DoseVolume {
    header: BoxedHeader,
    data: Array3<f64>,
}

impl NiftiHeaderAttr for DoseVolume {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl Index<Idx3d> for DoseVolume {
    type Output = f64;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl From<DecodedVolume> for DoseVolume {
    #[inline]
    fn from(v: DecodedVolume) -> Self {
        Self {
            header: v.header,
            data: v.data,
        }
    }
}

impl From<&DecodedVolume> for DoseVolume {
    #[inline]
    fn from(v: &DecodedVolume) -> Self {
        Self {
            header: v.header.clone(),
            data: v.data.clone(),
        }
    }
}

impl DoseVolume {
    /// 解码内存中的 nifti 字节流 (`.nii` 或 `.nii.gz`).
    #[inline]
    pub fn from_nifti_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        decoder::decode(bytes).map(Self::from)
    }

    /// 打开 nii 文件格式的剂量分布. `path` 为 nii 文件的本地路径.
    #[inline]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DecodeError> {
        decoder::decode_file(path).map(Self::from)
    }

    /// 直接由 `(z, h, w)` 组织的数组创建剂量分布. 体素分辨率视为 1mm 各向同性.
    #[inline]
    pub fn from_array(data: Array3<f64>) -> Self {
        Self {
            header: synthetic_header(),
            data,
        }
    }

    /// 设置体素分辨率 (毫米, 按 `[z, h, w]` 给出).
    #[inline]
    pub fn with_pix_dim(mut self, pix_dim: [f32; 3]) -> Self {
        set_pix_dim(&mut self.header, pix_dim);
        self
    }

    /// 数据形状 `(z, h, w)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 体素个数.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, f64, Ix3> {
        self.data.view()
    }

    /// 按行优先序收集 `mask` 覆盖的所有体素的剂量值.
    ///
    /// 调用方需保证形状一致, 否则程序 panic.
    pub(crate) fn values_in(&self, mask: &StructureMask) -> Vec<f64> {
        assert_eq!(self.shape(), mask.shape(), "剂量和掩膜形状不一致");
        self.data
            .iter()
            .zip(mask.data.iter())
            .filter_map(|(&dose, &inside)| inside.then_some(dose))
            .collect()
    }
}

/// 三维结构掩膜. 体素值仅表示是否属于该结构.
#[derive(Debug, Clone)]
pub struct StructureMask {
    header: BoxedHeader,
    data: Array3<bool>,
}

impl NiftiHeaderAttr for StructureMask {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl Index<Idx3d> for StructureMask {
    type Output = bool;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl From<DecodedVolume> for StructureMask {
    #[inline]
    fn from(v: DecodedVolume) -> Self {
        Self {
            header: v.header,
            data: v.data.mapv(is_member),
        }
    }
}

impl From<&DecodedVolume> for StructureMask {
    #[inline]
    fn from(v: &DecodedVolume) -> Self {
        Self {
            header: v.header.clone(),
            data: v.data.mapv(is_member),
        }
    }
}

impl StructureMask {
    /// 解码内存中的 nifti 字节流 (`.nii` 或 `.nii.gz`). 大于 0 的体素值视为属于结构.
    #[inline]
    pub fn from_nifti_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        decoder::decode(bytes).map(Self::from)
    }

    /// 打开 nii 文件格式的结构掩膜. `path` 为 nii 文件的本地路径.
    #[inline]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DecodeError> {
        decoder::decode_file(path).map(Self::from)
    }

    /// 由 `(z, h, w)` 组织的数值数组创建掩膜. 大于 0 的值视为属于结构.
    #[inline]
    pub fn from_array(data: &Array3<f64>) -> Self {
        Self::from_membership(data.mapv(is_member))
    }

    /// 直接由 `(z, h, w)` 组织的成员数组创建掩膜. 体素分辨率视为 1mm 各向同性.
    #[inline]
    pub fn from_membership(data: Array3<bool>) -> Self {
        Self {
            header: synthetic_header(),
            data,
        }
    }

    /// 设置体素分辨率 (毫米, 按 `[z, h, w]` 给出).
    #[inline]
    pub fn with_pix_dim(mut self, pix_dim: [f32; 3]) -> Self {
        set_pix_dim(&mut self.header, pix_dim);
        self
    }

    /// 数据形状 `(z, h, w)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, bool, Ix3> {
        self.data.view()
    }

    /// 属于结构的体素个数.
    #[inline]
    pub fn count(&self) -> usize {
        self.data.iter().filter(|p| **p).count()
    }

    /// 结构是否不包含任何体素?
    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|p| *p)
    }

    /// 结构的实际体积, 以立方厘米 (cc) 为单位. 体素分辨率未知时返回 `None`.
    pub fn volume_cc(&self) -> Option<f64> {
        self.voxel_mm3()
            .map(|v| v * self.count() as f64 / MM3_PER_CC)
    }
}
