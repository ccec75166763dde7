//! 解码缓存.
//!
//! 缓存由调用方显式创建、持有和失效, 不存在任何进程级的隐式状态.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::decoder::{decode, DecodeError, DecodedVolume};

/// 字节流内容指纹: (字节数, 64 位内容哈希).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Fingerprint {
    len: usize,
    hash: u64,
}

impl Fingerprint {
    /// 计算 `bytes` 的指纹.
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        Self {
            len: bytes.len(),
            hash: hasher.finish(),
        }
    }

    /// 字节数.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// 指纹对应的字节流是否为空?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// 缓存项. 保存原始字节用于确认命中.
#[derive(Debug)]
struct Cached {
    bytes: Box<[u8]>,
    volume: Arc<DecodedVolume>,
}

impl Cached {
    #[inline]
    fn holds(&self, bytes: &[u8]) -> bool {
        *self.bytes == *bytes
    }
}

/// 以内容指纹为键的解码缓存.
///
/// 指纹只用于定位, 命中前总会逐字节比较原始内容.
/// 冲突时新内容替换旧缓存项. 解码失败的结果不会被缓存.
#[derive(Debug, Default)]
pub struct DecodeCache {
    entries: HashMap<Fingerprint, Cached>,
}

impl DecodeCache {
    /// 创建空缓存.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 若 `bytes` 已被解码过则直接返回缓存结果, 否则解码并缓存.
    pub fn get_or_decode(&mut self, bytes: &[u8]) -> Result<Arc<DecodedVolume>, DecodeError> {
        let key = Fingerprint::of(bytes);
        match self.entries.get(&key) {
            Some(c) if c.holds(bytes) => {
                log::debug!("decode cache hit ({} bytes)", bytes.len());
                return Ok(Arc::clone(&c.volume));
            }
            Some(_) => log::warn!("decode cache fingerprint collision ({} bytes)", bytes.len()),
            None => {}
        }

        let volume = Arc::new(decode(bytes)?);
        let cached = Cached {
            bytes: bytes.into(),
            volume: Arc::clone(&volume),
        };
        self.entries.insert(key, cached);
        Ok(volume)
    }

    /// `bytes` 是否已在缓存中?
    #[inline]
    pub fn contains(&self, bytes: &[u8]) -> bool {
        self.entries
            .get(&Fingerprint::of(bytes))
            .is_some_and(|c| c.holds(bytes))
    }

    /// 移除 `bytes` 对应的缓存项. 返回是否真的移除了.
    pub fn invalidate(&mut self, bytes: &[u8]) -> bool {
        let key = Fingerprint::of(bytes);
        if self.contains(bytes) {
            self.entries.remove(&key).is_some()
        } else {
            false
        }
    }

    /// 清空缓存.
    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// 缓存项个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 缓存是否为空?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
