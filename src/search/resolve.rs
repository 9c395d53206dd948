//! 区间 -> 参考坐标的解析、缓存与去重。

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use lru::LruCache;

use super::error::SearchError;
use super::range::{Edit, Range, ResolvedMatch};
use super::read::{Mate, Strand};
use crate::index::{IndexSide, SearchIndex};

/// 单个索引方向上 SA 行 -> 文本位置的缓存，按 LRU 淘汰。
/// 句柄可 clone 并跨线程共享；只缓存真正走过的行。
#[derive(Clone, Default)]
pub struct RangeCache {
    inner: Option<Arc<Mutex<LruCache<usize, u32>>>>,
}

impl RangeCache {
    /// `limit == 0` 表示不缓存
    pub fn new(limit: usize) -> Self {
        Self { inner: NonZeroUsize::new(limit).map(|n| Arc::new(Mutex::new(LruCache::new(n)))) }
    }

    pub fn get(&self, row: usize) -> Option<u32> {
        let inner = self.inner.as_ref()?;
        let mut cache = inner.lock().unwrap_or_else(PoisonError::into_inner);
        cache.get(&row).copied()
    }

    pub fn put(&self, row: usize, pos: u32) {
        if let Some(inner) = &self.inner {
            inner.lock().unwrap_or_else(PoisonError::into_inner).put(row, pos);
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .as_ref()
            .map_or(0, |c| c.lock().unwrap_or_else(PoisonError::into_inner).len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for RangeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeCache")
            .field("enabled", &self.inner.is_some())
            .field("len", &self.len())
            .finish()
    }
}

/// 正向索引与镜像索引各一个缓存
#[derive(Clone, Debug, Default)]
pub struct RangeCaches {
    pub forward: RangeCache,
    pub mirror: RangeCache,
}

impl RangeCaches {
    pub fn new(limit: usize) -> Self {
        Self { forward: RangeCache::new(limit), mirror: RangeCache::new(limit) }
    }

    fn side(&self, side: IndexSide) -> &RangeCache {
        match side {
            IndexSide::Forward => &self.forward,
            IndexSide::Mirror => &self.mirror,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MatchKey {
    mate: Mate,
    contig: usize,
    offset: u32,
    strand: Strand,
    edits: Vec<Edit>,
}

/// 每个 aligner 一个；`reset` 在读段之间清空去重集合，缓存跨读段保留
#[derive(Debug)]
pub struct MatchResolver {
    caches: RangeCaches,
    seen: HashSet<MatchKey>,
    paired: bool,
    walks: u64,
    cache_hits: u64,
}

impl MatchResolver {
    pub fn new(caches: RangeCaches, paired: bool) -> Self {
        Self { caches, seen: HashSet::new(), paired, walks: 0, cache_hits: 0 }
    }

    pub fn reset(&mut self) {
        self.seen.clear();
    }

    /// 累计 LF 步数
    pub fn walks(&self) -> u64 {
        self.walks
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits
    }

    pub fn caches(&self) -> &RangeCaches {
        &self.caches
    }

    /// 一行在该方向文本中的位置，优先取缓存
    fn text_pos(
        &mut self,
        index: &dyn SearchIndex,
        side: IndexSide,
        row: usize,
    ) -> Result<u32, SearchError> {
        let cache = self.caches.side(side);
        if let Some(pos) = cache.get(row) {
            self.cache_hits += 1;
            return Ok(pos);
        }
        let (pos, steps) = index.locate(side, row).ok_or(SearchError::IndexWalk { side, row })?;
        self.walks += u64::from(steps);
        cache.put(row, pos);
        Ok(pos)
    }

    /// 区间中的一行 -> 参考坐标，不去重
    pub fn locate_row(
        &mut self,
        index: &dyn SearchIndex,
        range: &Range,
        row: usize,
    ) -> Result<ResolvedMatch, SearchError> {
        let raw = u64::from(self.text_pos(index, range.side, row)?);
        let start = match range.side {
            IndexSide::Forward => raw,
            // 镜像文本去掉了末尾 $ 后整体反转
            IndexSide::Mirror => (index.text_len() as u64 - 1)
                .checked_sub(raw + range.len as u64)
                .ok_or(SearchError::OffContig { pos: raw })?,
        };
        let (contig, offset) =
            index.map_text_pos(start as u32).ok_or(SearchError::OffContig { pos: start })?;
        Ok(ResolvedMatch {
            contig,
            offset,
            strand: range.strand,
            len: range.len as u32,
            edits: range.edits.clone(),
            mate: self.paired.then_some(range.mate),
            cost: range.cost,
            penalty: range.penalty,
        })
    }

    /// 解析并去重一行：同一读段内每个 (mate, 坐标, 链, 编辑集合) 只返回一次
    pub fn resolve_row(
        &mut self,
        index: &dyn SearchIndex,
        range: &Range,
        row: usize,
    ) -> Result<Option<ResolvedMatch>, SearchError> {
        let hit = self.locate_row(index, range, row)?;
        Ok(self.claim(&hit, range.mate).then_some(hit))
    }

    /// 一次解析整个区间，按 (contig, 偏移) 排序，不去重
    pub fn locate(
        &mut self,
        index: &dyn SearchIndex,
        range: &Range,
    ) -> Result<Vec<ResolvedMatch>, SearchError> {
        let mut out = (range.top..range.bot)
            .map(|row| self.locate_row(index, range, row))
            .collect::<Result<Vec<_>, _>>()?;
        out.sort_by_key(|m| (m.contig, m.offset));
        Ok(out)
    }

    /// 登记一个并非来自索引区间的命中（窗口扫描结果），已出现过时返回 false
    pub fn claim(&mut self, hit: &ResolvedMatch, mate: Mate) -> bool {
        self.seen.insert(MatchKey {
            mate,
            contig: hit.contig,
            offset: hit.offset,
            strand: hit.strand,
            edits: hit.edits.clone(),
        })
    }
}
