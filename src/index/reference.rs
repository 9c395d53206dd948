use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::fm::FMIndex;
use super::{sa, IndexSide, ReferenceBases, SearchIndex};
use crate::util::dna;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Contig {
    pub name: String,
    pub len: u32,
    pub offset: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct IndexMeta {
    pub reference_file: Option<String>,
    pub build_args: Option<String>,
    pub build_timestamp: Option<String>,
}

/// 双向参考索引。
///
/// 参考文本为各 contig 依次拼接、每个 contig 后接一个 $（编码 0）。
/// - `fw`：文本本身的 FM 索引，反向搜索即"向左"扩展读段；
/// - `mirror`：去掉末尾 $ 后整体反转、再补 $ 的文本的 FM 索引，反向搜索即"向右"扩展。
///
/// 另外以每字节两个碱基（半字节）打包保存原文，供配对模式窗口扫描按坐标取碱基。
#[derive(Debug, Serialize, Deserialize)]
pub struct ReferenceIndex {
    pub fw: FMIndex,
    pub mirror: FMIndex,
    pub contigs: Vec<Contig>,
    packed: Vec<u8>,
    text_len: u32,
    #[serde(default)]
    pub meta: IndexMeta,
}

impl ReferenceIndex {
    /// 由 (名称, 序列) 构建；序列为 ASCII，非 ACGT 字符按 N 处理。
    pub fn build<S: AsRef<[u8]>>(
        records: &[(String, S)],
        block: usize,
        sa_rate: u32,
    ) -> Result<Self> {
        if records.is_empty() {
            bail!("reference contains no sequences");
        }
        let mut text: Vec<u8> = Vec::new();
        let mut contigs = Vec::with_capacity(records.len());
        for (name, seq) in records {
            let start = text.len() as u32;
            text.extend(dna::normalize_seq(seq.as_ref()).iter().map(|&b| dna::to_alphabet(b)));
            let len = text.len() as u32 - start;
            contigs.push(Contig { name: name.clone(), len, offset: start });
            // sentinel between contigs
            text.push(0);
        }
        if contigs.iter().all(|c| c.len == 0) {
            bail!("reference contains only empty sequences");
        }

        let mut mirror_text: Vec<u8> = text[..text.len() - 1].iter().rev().copied().collect();
        mirror_text.push(0);

        let fw_sa = sa::build_sa(&text);
        let fw = FMIndex::build(&text, &fw_sa, dna::SIGMA as u8, block, sa_rate);
        drop(fw_sa);
        let mirror_sa = sa::build_sa(&mirror_text);
        let mirror = FMIndex::build(&mirror_text, &mirror_sa, dna::SIGMA as u8, block, sa_rate);

        let mut packed = vec![0u8; (text.len() + 1) / 2];
        for (i, &code) in text.iter().enumerate() {
            packed[i >> 1] |= code << ((i & 1) * 4);
        }

        Ok(Self {
            fw,
            mirror,
            contigs,
            packed,
            text_len: text.len() as u32,
            meta: IndexMeta::default(),
        })
    }

    pub fn set_meta(&mut self, meta: IndexMeta) {
        self.meta = meta;
    }

    pub fn side(&self, side: IndexSide) -> &FMIndex {
        match side {
            IndexSide::Forward => &self.fw,
            IndexSide::Mirror => &self.mirror,
        }
    }

    /// 拼接文本中第 `pos` 个编码
    #[inline]
    pub fn text_code(&self, pos: u32) -> u8 {
        let i = pos as usize;
        (self.packed[i >> 1] >> ((i & 1) * 4)) & 0x0f
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let f = std::fs::File::create(path)?;
        bincode::serialize_into(std::io::BufWriter::new(f), self)?;
        Ok(())
    }

    pub fn load_from_file(path: &str) -> Result<Self> {
        let f = std::fs::File::open(path)?;
        let idx: Self = bincode::deserialize_from(std::io::BufReader::new(f))?;
        Ok(idx)
    }
}

impl SearchIndex for ReferenceIndex {
    fn is_ready(&self) -> bool {
        !self.fw.is_empty() && self.fw.len() == self.mirror.len()
    }

    fn text_len(&self) -> usize {
        self.text_len as usize
    }

    fn full_range(&self, side: IndexSide) -> (usize, usize) {
        (0, self.side(side).len())
    }

    #[inline]
    fn backward_step(&self, side: IndexSide, c: u8, top: usize, bot: usize) -> (usize, usize) {
        self.side(side).rank_range(c, top, bot)
    }

    fn locate(&self, side: IndexSide, row: usize) -> Option<(u32, u32)> {
        self.side(side).locate(row)
    }

    /// 将文本位置映射到 (contig_index, contig_offset)。若落在分隔符($)位置，则返回 None。
    fn map_text_pos(&self, pos: u32) -> Option<(usize, u32)> {
        if self.contigs.is_empty() { return None; }
        let mut lo = 0usize;
        let mut hi = self.contigs.len();
        while lo < hi {
            let mid = (lo + hi) / 2;
            let c = &self.contigs[mid];
            if pos < c.offset {
                hi = mid;
            } else if pos >= c.offset + c.len {
                lo = mid + 1;
            } else {
                return Some((mid, pos - c.offset));
            }
        }
        None
    }
}

impl ReferenceBases for ReferenceIndex {
    fn num_contigs(&self) -> usize {
        self.contigs.len()
    }

    fn contig_len(&self, contig: usize) -> Option<u32> {
        self.contigs.get(contig).map(|c| c.len)
    }

    fn base(&self, contig: usize, off: u32) -> Option<u8> {
        let c = self.contigs.get(contig)?;
        if off >= c.len {
            return None;
        }
        Some(self.text_code(c.offset + off))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_contigs() -> ReferenceIndex {
        let recs = vec![
            ("chr1".to_string(), b"ACGTACGTAA".to_vec()),
            ("chr2".to_string(), b"GGNTTA".to_vec()),
        ];
        ReferenceIndex::build(&recs, 4, 3).expect("build")
    }

    #[test]
    fn mirror_searches_rightward() {
        let idx = two_contigs();
        // 在 mirror 上按 P[0], P[1], ... 的顺序做 backward step 等价于在原文中查找 P
        let pat = dna::encode(b"CGTA");
        let (mut top, mut bot) = idx.full_range(IndexSide::Mirror);
        for &c in &pat {
            let (t, b) = idx.backward_step(IndexSide::Mirror, c, top, bot);
            top = t;
            bot = b;
        }
        assert_eq!(bot - top, 2);
        let (l, r) = idx.fw.backward_search(&pat).expect("fw hit");
        assert_eq!(r - l, 2);
    }

    #[test]
    fn packed_bases_round_trip() {
        let idx = two_contigs();
        assert_eq!(idx.base(0, 0), Some(1));
        assert_eq!(idx.base(0, 9), Some(1));
        assert_eq!(idx.base(1, 2), Some(dna::N_CODE));
        assert_eq!(idx.base(1, 6), None);
        assert_eq!(idx.contig_len(1), Some(6));
        assert_eq!(idx.map_text_pos(11), Some((1, 0)));
        assert_eq!(idx.map_text_pos(10), None);
    }

    #[test]
    fn empty_reference_is_rejected() {
        let recs: Vec<(String, Vec<u8>)> = vec![("e".to_string(), Vec::new())];
        assert!(ReferenceIndex::build(&recs, 4, 4).is_err());
    }
}
