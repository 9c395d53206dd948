use thiserror::Error;

use crate::index::IndexSide;

/// 构造期配置错误：一律在任何搜索开始之前报告
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unsupported seed mismatch count {0} (expected 0..=3)")]
    UnsupportedSeedMismatches(u8),

    #[error("seed length must be positive")]
    ZeroSeedLength,

    #[error("neither forward nor reverse-complement strand is enabled")]
    NoStrands,

    #[error("strand and mate orientation flags leave no mate/strand combination to search")]
    NoMateStrands,

    #[error("paired-end window is empty: inner {inner} > outer {outer}")]
    EmptyPairWindow { inner: u32, outer: u32 },

    #[error("arena capacity must be positive")]
    ZeroPoolCapacity,

    #[error("index is not resident")]
    IndexNotReady,
}

/// 搜索期内部不变量被破坏（区间记账有误），属于致命错误
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("index walk failed on {side:?} index at row {row}")]
    IndexWalk { side: IndexSide, row: usize },

    #[error("located text position {pos} does not fall inside a contig")]
    OffContig { pos: u64 },
}
