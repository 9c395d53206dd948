use std::io::Write;

use crate::index::Contig;
use crate::search::{HitSink, Mate, Read, ResolvedMatch, Strand};
use crate::util::dna;

/// 每个命中一行，制表符分隔：
/// 读段名、mate、链、contig、0-based 偏移、比对方向上的读段序列、错配列表
pub struct TsvSink<'a, W: Write> {
    out: W,
    contigs: &'a [Contig],
    names: [String; 2],
    seqs: [Vec<u8>; 2],
    limit: Option<usize>,
    this_read: usize,
    error: Option<std::io::Error>,
}

impl<'a, W: Write> TsvSink<'a, W> {
    pub fn new(out: W, contigs: &'a [Contig], limit: Option<usize>) -> Self {
        Self {
            out,
            contigs,
            names: Default::default(),
            seqs: Default::default(),
            limit,
            this_read: 0,
            error: None,
        }
    }

    /// 登记接下来要报告的读段（配对时两个都登记）
    pub fn set_read(&mut self, mate: Mate, read: &Read) {
        self.names[mate.index()] = read.name.clone();
        self.seqs[mate.index()] = read.seq.to_ascii_uppercase();
    }

    /// 取回输出，若期间写入失败则返回该错误
    pub fn finish(mut self) -> std::io::Result<W> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.out.flush()?;
        Ok(self.out)
    }

    fn write_hit(&mut self, hit: &ResolvedMatch) -> std::io::Result<()> {
        let mate = hit.mate.unwrap_or(Mate::One);
        let seq = match hit.strand {
            Strand::Forward => self.seqs[mate.index()].clone(),
            Strand::Reverse => dna::revcomp(&self.seqs[mate.index()]),
        };
        let contig = self.contigs.get(hit.contig).map_or("*", |c| c.name.as_str());
        let mate_col = match hit.mate {
            None => "-",
            Some(Mate::One) => "1",
            Some(Mate::Two) => "2",
        };
        let edits = if hit.edits.is_empty() {
            "-".to_string()
        } else {
            hit.edits.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
        };
        writeln!(
            self.out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.names[mate.index()],
            mate_col,
            hit.strand.symbol(),
            contig,
            hit.offset,
            String::from_utf8_lossy(&seq),
            edits
        )
    }

    fn emit(&mut self, hit: &ResolvedMatch) -> bool {
        if self.error.is_some() {
            return false;
        }
        if let Err(e) = self.write_hit(hit) {
            self.error = Some(e);
            return false;
        }
        true
    }

    fn room(&mut self) -> bool {
        self.this_read += 1;
        self.limit.map_or(true, |k| self.this_read < k)
    }
}

impl<W: Write> HitSink for TsvSink<'_, W> {
    fn report(&mut self, hit: &ResolvedMatch) -> bool {
        self.emit(hit) && self.room()
    }

    fn report_pair(&mut self, mate1: &ResolvedMatch, mate2: &ResolvedMatch) -> bool {
        self.emit(mate1) && self.emit(mate2) && self.room()
    }

    fn begin_read(&mut self) {
        self.this_read = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{Cost, Edit};

    #[test]
    fn writes_reverse_strand_hits_in_reference_orientation() {
        let contigs = vec![Contig { name: "chrA".to_string(), len: 100, offset: 0 }];
        let mut sink = TsvSink::new(Vec::new(), &contigs, Some(1));
        sink.set_read(Mate::One, &Read::with_uniform_quality("r1", b"AACG", b'I'));
        sink.begin_read();
        let hit = ResolvedMatch {
            contig: 0,
            offset: 17,
            strand: Strand::Reverse,
            len: 4,
            edits: vec![Edit { pos: 1, ref_code: 1, read_code: 3 }],
            mate: None,
            cost: Cost::default(),
            penalty: 30,
        };
        assert!(!sink.report(&hit));
        let text = String::from_utf8(sink.finish().unwrap()).unwrap();
        assert_eq!(text, "r1\t-\t-\tchrA\t17\tCGTT\t1:A>G\n");
    }
}
