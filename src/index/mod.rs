//! 参考索引：后缀数组、BWT、FM 索引，以及搜索层依赖的两个协作接口。

pub mod bwt;
pub mod fm;
pub mod reference;
pub mod sa;

pub use reference::{Contig, IndexMeta, ReferenceIndex};

use serde::{Deserialize, Serialize};

/// 被查询的索引方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IndexSide {
    /// 原文索引，逐步向左扩展
    Forward,
    /// 反转文本索引，逐步向右扩展
    Mirror,
}

/// 搜索层对索引的全部要求：按方向做 backward step、LF 回走定位以及坐标换算。
/// 实现方只读，可跨线程共享。
pub trait SearchIndex: Sync {
    /// 索引是否已完整加载
    fn is_ready(&self) -> bool;

    /// 拼接文本长度（含分隔符）
    fn text_len(&self) -> usize;

    fn full_range(&self, side: IndexSide) -> (usize, usize);

    /// 区间 [top, bot) 以字符 c 扩展一步
    fn backward_step(&self, side: IndexSide, c: u8, top: usize, bot: usize) -> (usize, usize);

    /// 行号 -> (该方向文本中的位置, LF 步数)
    fn locate(&self, side: IndexSide, row: usize) -> Option<(u32, u32)>;

    fn map_text_pos(&self, pos: u32) -> Option<(usize, u32)>;
}

/// 按坐标随机访问参考碱基（配对模式窗口扫描使用）
pub trait ReferenceBases {
    fn num_contigs(&self) -> usize;

    fn contig_len(&self, contig: usize) -> Option<u32>;

    /// 返回碱基编码（0..SIGMA），越界为 None
    fn base(&self, contig: usize, off: u32) -> Option<u8>;
}
