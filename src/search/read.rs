use serde::{Deserialize, Serialize};

use crate::util::dna;

/// 读段相对参考的方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    pub const BOTH: [Strand; 2] = [Strand::Forward, Strand::Reverse];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Strand::Forward => 0,
            Strand::Reverse => 1,
        }
    }

    #[inline]
    pub fn flip(self) -> Strand {
        match self {
            Strand::Forward => Strand::Reverse,
            Strand::Reverse => Strand::Forward,
        }
    }

    pub fn from_fw(fw: bool) -> Strand {
        if fw { Strand::Forward } else { Strand::Reverse }
    }

    pub fn symbol(self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Mate {
    One,
    Two,
}

impl Mate {
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Mate::One => 0,
            Mate::Two => 1,
        }
    }

    #[inline]
    pub fn other(self) -> Mate {
        match self {
            Mate::One => Mate::Two,
            Mate::Two => Mate::One,
        }
    }
}

/// 输入读段：ASCII 碱基 + Phred+33 质量，搜索期间只读
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Read {
    pub name: String,
    pub seq: Vec<u8>,
    pub qual: Vec<u8>,
}

impl Read {
    pub fn new(name: impl Into<String>, seq: &[u8], qual: &[u8]) -> Self {
        Self { name: name.into(), seq: seq.to_vec(), qual: qual.to_vec() }
    }

    /// 以统一质量构造（测试与演示常用）
    pub fn with_uniform_quality(name: impl Into<String>, seq: &[u8], q: u8) -> Self {
        Self { name: name.into(), seq: seq.to_vec(), qual: vec![q; seq.len()] }
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}

/// 每条链上的编码序列与逐位错配罚分。坐标沿参考方向（反向互补链已翻转）。
#[derive(Debug, Clone, Default)]
pub struct PreparedRead {
    codes: [Vec<u8>; 2],
    penalties: [Vec<u32>; 2],
}

impl PreparedRead {
    pub fn new(read: &Read, maq_penalty: bool) -> Self {
        let fw = dna::encode(&read.seq);
        let rc = dna::revcomp_codes(&fw);
        let pen_fw: Vec<u32> = (0..read.seq.len())
            .map(|i| {
                let q = read.qual.get(i).copied().map_or(0, dna::phred);
                dna::mismatch_penalty(maq_penalty, q)
            })
            .collect();
        let pen_rc: Vec<u32> = pen_fw.iter().rev().copied().collect();
        Self { codes: [fw, rc], penalties: [pen_fw, pen_rc] }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.codes[0].len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.codes[0].is_empty()
    }

    #[inline]
    pub fn pattern(&self, strand: Strand) -> &[u8] {
        &self.codes[strand.index()]
    }

    #[inline]
    pub fn penalties(&self, strand: Strand) -> &[u32] {
        &self.penalties[strand.index()]
    }

    /// 种子区在参考方向坐标下的范围：正向为前 s 位，反向互补为后 s 位
    pub fn seed_span(&self, strand: Strand, seed_len: usize) -> std::ops::Range<usize> {
        let l = self.len();
        let s = seed_len.min(l);
        match strand {
            Strand::Forward => 0..s,
            Strand::Reverse => l - s..l,
        }
    }
}

/// 当前正在搜索的一条（或一对）读段
#[derive(Debug, Default)]
pub struct ReadSet {
    mates: [Option<PreparedRead>; 2],
}

impl ReadSet {
    pub fn clear(&mut self) {
        self.mates = [None, None];
    }

    pub fn set(&mut self, mate: Mate, read: PreparedRead) {
        self.mates[mate.index()] = Some(read);
    }

    #[inline]
    pub fn get(&self, mate: Mate) -> Option<&PreparedRead> {
        self.mates[mate.index()].as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_strand_flips_codes_and_penalties() {
        let read = Read::new("r", b"ACGN", b"I5+!");
        let pr = PreparedRead::new(&read, false);
        assert_eq!(pr.pattern(Strand::Forward), &[1, 2, 3, 5]);
        assert_eq!(pr.pattern(Strand::Reverse), &[5, 2, 3, 4]);
        assert_eq!(pr.penalties(Strand::Forward), &[40, 20, 10, 0]);
        assert_eq!(pr.penalties(Strand::Reverse), &[0, 10, 20, 40]);
    }

    #[test]
    fn seed_span_tracks_five_prime_end() {
        let pr = PreparedRead::new(&Read::with_uniform_quality("r", b"ACGTACGT", b'I'), true);
        assert_eq!(pr.seed_span(Strand::Forward, 3), 0..3);
        assert_eq!(pr.seed_span(Strand::Reverse, 3), 5..8);
        assert_eq!(pr.seed_span(Strand::Reverse, 20), 0..8);
    }
}
