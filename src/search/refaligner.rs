//! 参考窗口扫描：在给定坐标窗口内逐位置比对读段，配对模式为重复 mate 找伙伴时使用。

use super::config::SeedConfig;
use super::range::{Cost, Edit, ResolvedMatch};
use super::read::{Mate, PreparedRead, Strand};
use crate::index::ReferenceBases;
use crate::util::dna;

#[derive(Debug, Clone)]
pub struct RefAligner {
    seed_mms: u8,
    seed_len: usize,
    qual_cutoff: u32,
    qual_order: bool,
}

/// 一次窗口扫描的请求
#[derive(Debug, Clone, Copy)]
pub struct Window {
    pub contig: usize,
    /// 允许的最左起点
    pub begin: u32,
    /// 允许的最右终点（开区间）
    pub end: u32,
}

impl RefAligner {
    pub fn new(cfg: &SeedConfig) -> Self {
        Self {
            seed_mms: cfg.seed_mms,
            seed_len: cfg.seed_len,
            qual_cutoff: cfg.qual_cutoff,
            qual_order: cfg.qual_order,
        }
    }

    /// 窗口内代价最低的比对；同代价取最左
    pub fn find<R>(
        &self,
        refs: &R,
        read: &PreparedRead,
        strand: Strand,
        mate: Option<Mate>,
        win: Window,
    ) -> Option<ResolvedMatch>
    where
        R: ReferenceBases + ?Sized,
    {
        self.scan(refs, read, strand, mate, win).into_iter().next()
    }

    /// 窗口内全部合格的比对，按 (代价, 偏移) 排序。
    ///
    /// 读段上的 N 按错配计；跨过参考 N 的起点整体跳过，与索引搜索一致。
    pub fn scan<R>(
        &self,
        refs: &R,
        read: &PreparedRead,
        strand: Strand,
        mate: Option<Mate>,
        win: Window,
    ) -> Vec<ResolvedMatch>
    where
        R: ReferenceBases + ?Sized,
    {
        let l = read.len() as u32;
        let Some(clen) = refs.contig_len(win.contig) else { return Vec::new() };
        let end = win.end.min(clen);
        if l == 0 || end < win.begin || end - win.begin < l {
            return Vec::new();
        }
        let pattern = read.pattern(strand);
        let pens = read.penalties(strand);
        let seed = read.seed_span(strand, self.seed_len);

        let mut found = Vec::new();
        'start: for off in win.begin..=end - l {
            let mut seed_mms = 0u8;
            let mut penalty = 0u32;
            let mut edits = Vec::new();
            for (i, &rc) in pattern.iter().enumerate() {
                let Some(rf) = refs.base(win.contig, off + i as u32) else { continue 'start };
                if !dna::is_base(rf) {
                    continue 'start;
                }
                if rc == rf {
                    continue;
                }
                if seed.contains(&i) {
                    seed_mms += 1;
                    if seed_mms > self.seed_mms {
                        continue 'start;
                    }
                }
                penalty += pens[i];
                if penalty > self.qual_cutoff {
                    continue 'start;
                }
                edits.push(Edit { pos: i as u32, ref_code: rf, read_code: rc });
            }
            let cost = Cost::new(edits.len().min(u8::MAX as usize) as u8, penalty, self.qual_order);
            found.push(ResolvedMatch {
                contig: win.contig,
                offset: off,
                strand,
                len: l,
                edits,
                mate,
                cost,
                penalty,
            });
        }
        found.sort_by_key(|m| (m.cost, m.offset));
        found
    }
}
