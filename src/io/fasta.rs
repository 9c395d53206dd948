use anyhow::{bail, Context, Result};
use std::io::BufRead;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct FastaRecord {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
}

/// 逐条读取 FASTA；序列转大写，去掉行内空白
pub struct FastaReader<R: BufRead> {
    reader: R,
    buf: String,
    line: usize,
    pending: Option<String>,
    done: bool,
}

fn split_header(header: &str) -> (String, Option<String>) {
    let mut parts = header.splitn(2, char::is_whitespace);
    let id = parts.next().unwrap_or("").to_string();
    let desc = parts.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    (id, desc)
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, buf: String::new(), line: 0, pending: None, done: false }
    }

    fn read_line(&mut self) -> Result<bool> {
        self.buf.clear();
        let n = self
            .reader
            .read_line(&mut self.buf)
            .with_context(|| format!("FASTA read error near line {}", self.line + 1))?;
        self.line += 1;
        Ok(n > 0)
    }

    pub fn next_record(&mut self) -> Result<Option<FastaRecord>> {
        if self.done {
            return Ok(None);
        }

        let header = match self.pending.take() {
            Some(h) => h,
            None => loop {
                if !self.read_line()? {
                    self.done = true;
                    return Ok(None);
                }
                let t = self.buf.trim();
                if t.is_empty() {
                    continue;
                }
                match t.strip_prefix('>') {
                    Some(h) => break h.trim().to_string(),
                    None => {
                        bail!("FASTA line {}: sequence data before the first '>' header", self.line)
                    }
                }
            },
        };
        let (id, desc) = split_header(&header);
        if id.is_empty() {
            bail!("FASTA line {}: empty sequence name", self.line);
        }

        let mut seq = Vec::new();
        loop {
            if !self.read_line()? {
                self.done = true;
                break;
            }
            if let Some(h) = self.buf.trim_start().strip_prefix('>') {
                self.pending = Some(h.trim().to_string());
                break;
            }
            let bases = self.buf.bytes().filter(|b| !b.is_ascii_whitespace());
            seq.extend(bases.map(|b| b.to_ascii_uppercase()));
        }

        Ok(Some(FastaRecord { id, desc, seq }))
    }

    /// 读完全部记录，返回 (名称, 序列)，供索引构建
    pub fn read_all(mut self) -> Result<Vec<(String, Vec<u8>)>> {
        let mut out = Vec::new();
        while let Some(rec) = self.next_record()? {
            out.push((rec.id, rec.seq));
        }
        Ok(out)
    }
}

pub fn read_fasta_file(path: impl AsRef<Path>) -> Result<Vec<(String, Vec<u8>)>> {
    let path = path.as_ref();
    let fh = std::fs::File::open(path)
        .with_context(|| format!("cannot open reference FASTA '{}'", path.display()))?;
    FastaReader::new(std::io::BufReader::new(fh)).read_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_simple_fasta() {
        let data = b">chr1 first\nACgTNN\n>chr2\nAAA\n";
        let mut r = FastaReader::new(Cursor::new(&data[..]));

        let r1 = r.next_record().unwrap().unwrap();
        assert_eq!(r1.id, "chr1");
        assert_eq!(r1.desc.as_deref(), Some("first"));
        assert_eq!(r1.seq, b"ACGTNN");

        let r2 = r.next_record().unwrap().unwrap();
        assert_eq!(r2.id, "chr2");
        assert_eq!(r2.desc, None);
        assert_eq!(r2.seq, b"AAA");

        assert!(r.next_record().unwrap().is_none());
    }

    #[test]
    fn crlf_blank_lines_and_inner_whitespace() {
        let data = b"\n\n>chr1 desc\r\nAC g t n\r\n acgt\r\n>chr2 \r\n N N N \r\n";
        let recs = FastaReader::new(Cursor::new(&data[..])).read_all().unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0], ("chr1".to_string(), b"ACGTNACGT".to_vec()));
        assert_eq!(recs[1], ("chr2".to_string(), b"NNN".to_vec()));
    }

    #[test]
    fn data_before_header_is_an_error() {
        let data = b"ACGT\n>chr1\nACGT\n";
        let err = FastaReader::new(Cursor::new(&data[..])).next_record().unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }
}
