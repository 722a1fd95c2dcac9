use crate::persist::{IndexMeta, PostingsEncoding};
use crate::{IndexError, Posting, Result};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Random-access reader for the postings file. Every lookup seeks to the
/// run recorded in the dictionary and reads exactly its bytes.
pub struct PostingsReader<R> {
    inner: R,
    encoding: PostingsEncoding,
    buf: Vec<u8>,
}

impl PostingsReader<File> {
    pub fn open(path: &Path, encoding: PostingsEncoding) -> Result<Self> {
        Ok(Self::new(File::open(path)?, encoding))
    }
}

impl<R: Read + Seek> PostingsReader<R> {
    pub fn new(inner: R, encoding: PostingsEncoding) -> Self {
        Self { inner, encoding, buf: Vec::new() }
    }

    /// Postings for `term`, or an empty list when the term was never indexed.
    pub fn postings(&mut self, meta: &IndexMeta, term: &str) -> Result<Vec<Posting>> {
        let Some(entry) = meta.entry(term) else {
            return Ok(Vec::new());
        };
        self.inner.seek(SeekFrom::Start(entry.offset))?;
        // bounded by the file, not by the recorded length
        self.buf.clear();
        let read = (&mut self.inner).take(entry.length).read_to_end(&mut self.buf)?;
        if read as u64 != entry.length {
            return Err(IndexError::corrupt(
                term,
                format!("region {}+{} runs past end of postings file", entry.offset, entry.length),
            ));
        }
        self.encoding.decode_run(term, &self.buf)
    }
}
