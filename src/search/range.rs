use serde::{Deserialize, Serialize};

use super::arena::EditId;
use super::read::{Mate, Strand};
use crate::index::IndexSide;
use crate::util::dna;

/// 一次替换。`pos` 为参考方向（比对方向）上的读段坐标。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edit {
    pub pos: u32,
    /// 参考上的碱基编码
    pub ref_code: u8,
    /// 读段原本的碱基编码
    pub read_code: u8,
}

impl std::fmt::Display for Edit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}>{}",
            self.pos,
            dna::from_alphabet(self.ref_code) as char,
            dna::from_alphabet(self.read_code) as char
        )
    }
}

/// Edit 池中的链表节点，多个分支共享公共前缀
#[derive(Debug, Clone, Copy)]
pub struct EditNode {
    pub edit: Edit,
    pub prev: Option<EditId>,
}

/// 排序代价：先比错配数，再比质量罚分（关闭质量排序时罚分恒为 0）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Cost {
    pub mms: u8,
    pub qual: u32,
}

impl Cost {
    #[inline]
    pub fn new(mms: u8, penalty: u32, qual_order: bool) -> Self {
        Self { mms, qual: if qual_order { penalty } else { 0 } }
    }
}

/// 索引区间 + 产生它的编辑集合与方向信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Range {
    pub top: usize,
    pub bot: usize,
    pub side: IndexSide,
    pub strand: Strand,
    pub mate: Mate,
    /// 覆盖的读段位置数；种子生成器产出的部分区间只覆盖种子
    pub len: usize,
    pub edits: Vec<Edit>,
    pub cost: Cost,
    /// 实际罚分之和
    pub penalty: u32,
}

impl Range {
    #[inline]
    pub fn size(&self) -> usize {
        self.bot - self.top
    }
}

/// 解析到具体参考坐标的命中
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedMatch {
    pub contig: usize,
    pub offset: u32,
    pub strand: Strand,
    pub len: u32,
    pub edits: Vec<Edit>,
    pub mate: Option<Mate>,
    pub cost: Cost,
    pub penalty: u32,
}

impl ResolvedMatch {
    /// 参考上的右端（开区间）
    #[inline]
    pub fn end(&self) -> u32 {
        self.offset + self.len
    }

    pub fn mismatches(&self) -> usize {
        self.edits.len()
    }
}
