use anyhow::{bail, Context, Result};
use std::io::BufRead;
use std::path::Path;

use crate::search::Read;

#[derive(Debug, Clone)]
pub struct FastqRecord {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
    pub qual: Vec<u8>,
}

impl FastqRecord {
    pub fn into_read(self) -> Read {
        Read { name: self.id, seq: self.seq, qual: self.qual }
    }
}

/// 四行一条的 FASTQ（不支持折行）；质量按 Phred+33 校验
pub struct FastqReader<R: BufRead> {
    reader: R,
    buf: String,
    line: usize,
    done: bool,
}

impl<R: BufRead> FastqReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, buf: String::new(), line: 0, done: false }
    }

    fn read_line(&mut self) -> Result<bool> {
        self.buf.clear();
        let n = self
            .reader
            .read_line(&mut self.buf)
            .with_context(|| format!("FASTQ read error near line {}", self.line + 1))?;
        self.line += 1;
        Ok(n > 0)
    }

    pub fn next_record(&mut self) -> Result<Option<FastqRecord>> {
        if self.done {
            return Ok(None);
        }

        // 跳过记录之间的空行
        loop {
            if !self.read_line()? {
                self.done = true;
                return Ok(None);
            }
            if !self.buf.trim().is_empty() {
                break;
            }
        }
        let Some(header) = self.buf.trim_end().strip_prefix('@') else {
            bail!("FASTQ line {}: header does not start with '@'", self.line);
        };
        let mut parts = header.splitn(2, char::is_whitespace);
        let id = parts.next().unwrap_or("").to_string();
        let desc = parts.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        if !self.read_line()? {
            bail!("FASTQ line {}: unexpected EOF after header of '{}'", self.line, id);
        }
        let seq: Vec<u8> = self.buf.trim_end().bytes().map(|b| b.to_ascii_uppercase()).collect();

        if !self.read_line()? || !self.buf.starts_with('+') {
            bail!("FASTQ line {}: missing '+' separator for '{}'", self.line, id);
        }

        if !self.read_line()? {
            bail!("FASTQ line {}: missing quality line for '{}'", self.line, id);
        }
        let qual = self.buf.trim_end().as_bytes().to_vec();
        if qual.len() != seq.len() {
            bail!(
                "FASTQ line {}: '{}' has {} bases but {} qualities",
                self.line,
                id,
                seq.len(),
                qual.len()
            );
        }
        if let Some(&q) = qual.iter().find(|&&q| !(33..=126).contains(&q)) {
            bail!("FASTQ line {}: quality byte {} of '{}' is outside Phred+33", self.line, q, id);
        }

        Ok(Some(FastqRecord { id, desc, seq, qual }))
    }
}

impl<R: BufRead> Iterator for FastqReader<R> {
    type Item = Result<FastqRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

pub fn open_fastq(
    path: impl AsRef<Path>,
) -> Result<FastqReader<std::io::BufReader<std::fs::File>>> {
    let path = path.as_ref();
    let fh = std::fs::File::open(path)
        .with_context(|| format!("cannot open reads FASTQ '{}'", path.display()))?;
    Ok(FastqReader::new(std::io::BufReader::new(fh)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_two_records() {
        let data = b"@r1 extra\nacGT\n+\nIIII\n\n@r2\nNN\n+r2\n!!\n";
        let recs: Vec<FastqRecord> = FastqReader::new(Cursor::new(&data[..])).collect::<Result<_>>()
            .unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].id, "r1");
        assert_eq!(recs[0].desc.as_deref(), Some("extra"));
        assert_eq!(recs[0].seq, b"ACGT");
        let read = recs[1].clone().into_read();
        assert_eq!(read.name, "r2");
        assert_eq!(read.qual, b"!!");
    }

    #[test]
    fn length_mismatch_reports_line() {
        let data = b"@r1\nACGT\n+\nIII\n";
        let err = FastqReader::new(Cursor::new(&data[..])).next_record().unwrap_err();
        assert!(err.to_string().contains("line 4"));
    }

    #[test]
    fn missing_plus_is_an_error() {
        let data = b"@r1\nACGT\nIIII\n";
        assert!(FastqReader::new(Cursor::new(&data[..])).next_record().is_err());
    }
}
