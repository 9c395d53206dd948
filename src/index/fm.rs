use serde::{Deserialize, Serialize};

use super::bwt;

/// 单向 FM 索引：
/// - 支持任意有限字母表，字母以 [0..sigma) 进行编码（0 预留为 $，同时充当 contig 分隔符）。
/// - 采用定长分块的 Occ 采样（块内顺扫补偿）。
/// - SA 只保留采样行：文本位置是 `sa_rate` 的倍数、或紧跟在 $ 之后（contig 起点）的行。
///   其余行通过 LF 映射回走到采样行再换算，因此 LF 回走永远不会跨越 $。
#[derive(Debug, Serialize, Deserialize)]
pub struct FMIndex {
    pub sigma: u8,
    pub block: u32,
    /// C[i] = 文本中字母 < i 的累计数量
    pub c: Vec<u32>,
    /// BWT 序列（与文本同长度）
    pub bwt: Vec<u8>,
    /// Occ 采样（按块存储，行优先展平）：occ_samples[block_id * sigma + c]
    pub occ_samples: Vec<u32>,
    pub sa_rate: u32,
    /// 采样行标记位图
    sa_marks: Vec<u64>,
    /// sa_marks 每个字之前的置位数
    sa_mark_rank: Vec<u32>,
    /// 按行号顺序存放的采样 SA 值
    sa_samples: Vec<u32>,
}

impl FMIndex {
    /// `text` 必须以 0 结尾；`sa` 为 `text` 的完整后缀数组，构建后只保留采样部分。
    pub fn build(text: &[u8], sa: &[u32], sigma: u8, block: usize, sa_rate: u32) -> Self {
        let bwt = bwt::build_bwt(text, sa);
        let n = bwt.len();
        let sigma_us = sigma as usize;
        let block = block.max(1);
        let sa_rate = sa_rate.max(1);
        // 计算 C 表
        let mut freq = vec![0u32; sigma_us];
        for &ch in &bwt {
            let ci = ch as usize;
            if ci < sigma_us { freq[ci] += 1; }
        }
        let mut c = vec![0u32; sigma_us];
        let mut acc = 0u32;
        for i in 0..sigma_us {
            c[i] = acc;
            acc += freq[i];
        }

        // 采样 Occ
        let num_blocks = if n == 0 { 0 } else { (n + block - 1) / block };
        let mut occ_samples = vec![0u32; num_blocks * sigma_us];
        let mut running = vec![0u32; sigma_us];
        for bi in 0..num_blocks {
            for a in 0..sigma_us {
                occ_samples[bi * sigma_us + a] = running[a];
            }
            let start = bi * block;
            let end = ((bi + 1) * block).min(n);
            for &ch in &bwt[start..end] {
                let ci = ch as usize;
                if ci < sigma_us { running[ci] += 1; }
            }
        }

        // 采样 SA
        let words = (n + 63) / 64;
        let mut sa_marks = vec![0u64; words];
        let mut sa_samples = Vec::new();
        for (row, &p) in sa.iter().enumerate() {
            let pu = p as usize;
            let contig_start = pu == 0 || text[pu - 1] == 0;
            if p % sa_rate == 0 || contig_start {
                sa_marks[row >> 6] |= 1u64 << (row & 63);
                sa_samples.push(p);
            }
        }
        let mut sa_mark_rank = Vec::with_capacity(words);
        let mut seen = 0u32;
        for &w in &sa_marks {
            sa_mark_rank.push(seen);
            seen += w.count_ones();
        }

        Self {
            sigma,
            block: block as u32,
            c,
            bwt,
            occ_samples,
            sa_rate,
            sa_marks,
            sa_mark_rank,
            sa_samples,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bwt.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bwt.is_empty()
    }

    #[inline]
    pub fn occ(&self, c: u8, pos: usize) -> u32 {
        // 返回 BWT[0..pos) 中 c 的出现次数
        if pos == 0 { return 0; }
        let sigma_us = self.sigma as usize;
        let block = self.block as usize;
        let bi = (pos - 1) / block; // 所在块编号
        let base = self.occ_samples[bi * sigma_us + c as usize];
        let start = bi * block;
        let mut add = 0u32;
        for &ch in &self.bwt[start..pos] {
            if ch == c { add += 1; }
        }
        base + add
    }

    #[inline]
    pub fn rank_range(&self, c: u8, l: usize, r: usize) -> (usize, usize) {
        // 返回在区间 [l, r) 上向左扩展字符 c 后的新区间
        let c0 = self.c[c as usize] as usize;
        let nl = c0 + self.occ(c, l) as usize;
        let nr = c0 + self.occ(c, r) as usize;
        (nl, nr)
    }

    /// 反向搜索精确匹配，pat 已经是编码后的字母表（不应包含 0）
    pub fn backward_search(&self, pat: &[u8]) -> Option<(usize, usize)> {
        if self.bwt.is_empty() { return None; }
        let mut l = 0usize;
        let mut r = self.bwt.len();
        for &a in pat.iter().rev() {
            let (nl, nr) = self.rank_range(a, l, r);
            if nl >= nr { return None; }
            l = nl; r = nr;
        }
        Some((l, r))
    }

    /// 若该行被采样，返回其 SA 值
    #[inline]
    pub fn sampled(&self, row: usize) -> Option<u32> {
        let w = row >> 6;
        let bit = row & 63;
        let word = *self.sa_marks.get(w)?;
        if word & (1u64 << bit) == 0 {
            return None;
        }
        let idx = self.sa_mark_rank[w] + (word & ((1u64 << bit) - 1)).count_ones();
        self.sa_samples.get(idx as usize).copied()
    }

    /// LF 映射：BWT[row] 为 $ 时没有前驱，返回 None
    #[inline]
    pub fn lf(&self, row: usize) -> Option<usize> {
        let ch = *self.bwt.get(row)?;
        if ch == 0 {
            return None;
        }
        Some(self.c[ch as usize] as usize + self.occ(ch, row) as usize)
    }

    /// 回走到采样行，返回 (文本位置, LF 步数)。回走失败说明索引与采样不一致。
    pub fn locate(&self, row: usize) -> Option<(u32, u32)> {
        let mut cur = row;
        let mut steps = 0u32;
        loop {
            if let Some(p) = self.sampled(cur) {
                return Some((p + steps, steps));
            }
            if steps as usize > self.bwt.len() {
                return None;
            }
            cur = self.lf(cur)?;
            steps += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::sa;
    use crate::util::dna;

    fn text_of(seq: &[u8]) -> Vec<u8> {
        let mut t = dna::encode(seq);
        t.push(0);
        t
    }

    #[test]
    fn locate_matches_full_sa() {
        let text = text_of(b"ACGTTGCAACGTAGGCTTACGATCGA");
        let full = sa::build_sa(&text);
        let fm = FMIndex::build(&text, &full, dna::SIGMA as u8, 4, 5);
        for (row, &p) in full.iter().enumerate() {
            let (pos, _) = fm.locate(row).expect("walk");
            assert_eq!(pos, p, "row {}", row);
        }
    }

    #[test]
    fn locate_never_crosses_separators() {
        // 两个 contig：ACGT$ GGA$
        let mut text = dna::encode(b"ACGT");
        text.push(0);
        text.extend(dna::encode(b"GGA"));
        text.push(0);
        let full = sa::build_sa(&text);
        let fm = FMIndex::build(&text, &full, dna::SIGMA as u8, 2, 64);
        for (row, &p) in full.iter().enumerate() {
            assert_eq!(fm.locate(row).map(|x| x.0), Some(p));
        }
    }

    #[test]
    fn backward_search_counts_occurrences() {
        let text = text_of(b"ACGTACGTAA");
        let full = sa::build_sa(&text);
        let fm = FMIndex::build(&text, &full, dna::SIGMA as u8, 4, 4);
        let (l, r) = fm.backward_search(&dna::encode(b"ACGT")).expect("hit");
        assert_eq!(r - l, 2);
        assert!(fm.backward_search(&dna::encode(b"TTT")).is_none());
    }
}
