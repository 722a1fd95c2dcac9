use crate::persist::{load_meta, IndexMeta, IndexPaths};
use crate::reader::PostingsReader;
use crate::scorer::score_query;
use crate::tokenizer::tokenize;
use crate::topk::{format_line, top_k, ScoredDoc, DEFAULT_K};
use crate::Result;
use std::fs::File;
use std::io::{BufRead, Read, Seek, Write};
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct QueryConfig {
    /// Maximum number of documents returned per query.
    pub top_k: usize,
    /// Log elapsed time per query and per batch.
    pub timing: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { top_k: DEFAULT_K, timing: false }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub queries: usize,
    pub failed: usize,
}

/// Read-only query side of an index: in-memory dictionary and lengths plus a
/// postings handle that is only ever seeked and read.
pub struct QueryEngine<R> {
    meta: IndexMeta,
    reader: PostingsReader<R>,
    config: QueryConfig,
}

impl QueryEngine<File> {
    pub fn open(paths: &IndexPaths, config: QueryConfig) -> Result<Self> {
        let meta = load_meta(&paths.dictionary)?;
        let reader = PostingsReader::open(&paths.postings, meta.encoding)?;
        tracing::debug!(terms = meta.dictionary.len(), documents = meta.lengths.len(), "loaded dictionary");
        Ok(Self { meta, reader, config })
    }
}

impl<R: Read + Seek> QueryEngine<R> {
    pub fn new(meta: IndexMeta, postings: R, config: QueryConfig) -> Self {
        let reader = PostingsReader::new(postings, meta.encoding);
        Self { meta, reader, config }
    }

    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Rank documents for one free-text query.
    pub fn search(&mut self, query: &str) -> Result<Vec<ScoredDoc>> {
        self.search_k(query, self.config.top_k)
    }

    pub fn search_k(&mut self, query: &str, k: usize) -> Result<Vec<ScoredDoc>> {
        let start = Instant::now();
        let tokens = tokenize(query);
        let scores = score_query(&tokens, &self.meta, &mut self.reader)?;
        let ranked = top_k(&scores, k);
        if self.config.timing {
            tracing::info!(query, candidates = scores.len(), elapsed_us = start.elapsed().as_micros() as u64, "query evaluated");
        }
        Ok(ranked)
    }

    /// Answer one query per input line, writing one result line per query.
    /// Lines that are not valid UTF-8 are decoded lossily. A query that fails
    /// to evaluate gets an empty line and the batch goes on; failing to read
    /// input or write output aborts.
    pub fn run_batch<I: BufRead, O: Write>(&mut self, mut queries: I, mut out: O) -> Result<BatchSummary> {
        let start = Instant::now();
        let mut summary = BatchSummary::default();
        let mut raw = Vec::new();
        loop {
            raw.clear();
            if queries.read_until(b'\n', &mut raw)? == 0 {
                break;
            }
            summary.queries += 1;
            let line = String::from_utf8_lossy(&raw);
            let ranked = match self.search(line.trim_end_matches(['\n', '\r'])) {
                Ok(ranked) => ranked,
                Err(e) => {
                    tracing::warn!(line = summary.queries, error = %e, "query failed");
                    summary.failed += 1;
                    Vec::new()
                }
            };
            writeln!(out, "{}", format_line(&ranked))?;
        }
        out.flush()?;
        if self.config.timing {
            tracing::info!(queries = summary.queries, elapsed_ms = start.elapsed().as_millis() as u64, "batch complete");
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::{write_index, DictEntry, PostingsEncoding};
    use crate::postings::PostingsBuilder;
    use std::io::Cursor;

    fn engine(k: usize) -> QueryEngine<Cursor<Vec<u8>>> {
        let mut b = PostingsBuilder::new();
        b.add_document(5, tokenize("Information retrieval")).unwrap();
        b.add_document(7, tokenize("retrieval of retrieval models")).unwrap();
        b.add_document(9, tokenize("cooking recipes")).unwrap();
        let (postings, n) = b.finish();
        let (bytes, meta) = write_index(&postings, n, Vec::new(), PostingsEncoding::Text).unwrap();
        QueryEngine::new(meta, Cursor::new(bytes), QueryConfig { top_k: k, timing: false })
    }

    #[test]
    fn batch_writes_one_line_per_query() {
        let mut e = engine(10);
        let input = "retrieval\n\nunknownword\r\nrecipes retrieval\n";
        let mut out = Vec::new();
        let summary = e.run_batch(input.as_bytes(), &mut out).unwrap();
        assert_eq!(summary, BatchSummary { queries: 4, failed: 0 });
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "");
        assert_eq!(lines[3].split(' ').next(), Some("9"));
    }

    #[test]
    fn top_k_limits_results() {
        let mut e = engine(1);
        assert_eq!(e.search("retrieval").unwrap().len(), 1);
        assert_eq!(e.search_k("retrieval", 5).unwrap().len(), 2);
    }

    #[test]
    fn corrupt_query_does_not_stop_batch() {
        let mut e = engine(10);
        e.meta.dictionary.insert("broken".into(), DictEntry { offset: 1 << 20, length: 8, idf: 1.0 });
        let mut out = Vec::new();
        let summary = e.run_batch("broken\nrecipes\n".as_bytes(), &mut out).unwrap();
        assert_eq!(summary, BatchSummary { queries: 2, failed: 1 });
        assert_eq!(String::from_utf8(out).unwrap(), "\n9\n");
    }

    #[test]
    fn invalid_utf8_line_does_not_stop_batch() {
        let mut e = engine(10);
        let mut out = Vec::new();
        let summary = e.run_batch(&b"recipes\n\xff\xfe bad\nrecipes"[..], &mut out).unwrap();
        assert_eq!(summary, BatchSummary { queries: 3, failed: 0 });
        assert_eq!(String::from_utf8(out).unwrap(), "9\n\n9\n");
    }
}
