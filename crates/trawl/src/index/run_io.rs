use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::types::DocId;

/// Writer for BSBI run files: a stream of `{ term bytes, 0x00, u32 doc_id }`
/// records, sorted by `(term, doc_id)` by the caller.
pub struct RunWriter {
    w: BufWriter<File>,
}

impl RunWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let f = File::create(path)
            .with_context(|| format!("create run file {}", path.display()))?;
        Ok(Self {
            w: BufWriter::new(f),
        })
    }

    pub fn write_pair(&mut self, term: &str, doc_id: DocId) -> Result<()> {
        self.w.write_all(term.as_bytes())?;
        self.w.write_all(&[0u8])?;
        self.w.write_all(&doc_id.to_le_bytes())?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.w.flush()?;
        Ok(())
    }
}

/// Streaming reader for run files.
pub struct RunReader {
    r: BufReader<File>,
}

impl RunReader {
    pub fn open(path: &Path) -> Result<Self> {
        let f = File::open(path)
            .with_context(|| format!("open run file {}", path.display()))?;
        Ok(Self {
            r: BufReader::new(f),
        })
    }

    /// Next `(term, doc_id)` pair, or `None` at a clean EOF. EOF in the
    /// middle of a record is an error.
    pub fn next_pair(&mut self) -> Result<Option<(String, DocId)>> {
        let mut term = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.r.read(&mut byte)? {
                0 => {
                    if term.is_empty() {
                        return Ok(None);
                    }
                    bail!("run file truncated inside a term");
                }
                _ => {
                    if byte[0] == 0 {
                        break;
                    }
                    term.push(byte[0]);
                }
            }
        }
        let mut id_bytes = [0u8; 4];
        self.r
            .read_exact(&mut id_bytes)
            .context("run file truncated inside a doc id")?;
        let term = String::from_utf8(term).context("run file term not valid UTF-8")?;
        Ok(Some((term, DocId::from_le_bytes(id_bytes))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.dat");
        let mut w = RunWriter::create(&path).unwrap();
        w.write_pair("fox", 2).unwrap();
        w.write_pair("quick", 0).unwrap();
        w.finish().unwrap();

        let mut r = RunReader::open(&path).unwrap();
        assert_eq!(r.next_pair().unwrap(), Some(("fox".to_string(), 2)));
        assert_eq!(r.next_pair().unwrap(), Some(("quick".to_string(), 0)));
        assert_eq!(r.next_pair().unwrap(), None);
    }

    #[test]
    fn truncated_record_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.dat");
        std::fs::write(&path, b"fox\0\x02\x00").unwrap();
        let mut r = RunReader::open(&path).unwrap();
        assert!(r.next_pair().is_err());
    }
}
