use crate::postings::PostingsMap;
use crate::{DocId, IndexError, Posting, Result};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Fractional digits used for weights in the text encoding.
pub const WEIGHT_PRECISION: usize = 9;

/// Size of one binary postings record: `u32` doc id followed by `f64` weight.
pub const BINARY_RECORD_LEN: usize = 12;

/// How postings runs are laid out in the postings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostingsEncoding {
    /// Space separated `docID,weight` tokens; runs separated by a newline that
    /// is not part of the recorded run length.
    #[default]
    Text,
    /// Fixed-width little-endian records, no separators.
    Binary,
}

impl PostingsEncoding {
    fn is_text(&self) -> bool {
        *self == PostingsEncoding::Text
    }

    pub fn encode_run(self, run: &[Posting], out: &mut Vec<u8>) -> Result<()> {
        match self {
            PostingsEncoding::Text => {
                for (i, p) in run.iter().enumerate() {
                    if i > 0 {
                        out.push(b' ');
                    }
                    write!(out, "{},{:.prec$}", p.doc_id, p.weight, prec = WEIGHT_PRECISION)?;
                }
            }
            PostingsEncoding::Binary => {
                for p in run {
                    bincode::serialize_into(&mut *out, &(p.doc_id, p.weight))?;
                }
            }
        }
        Ok(())
    }

    /// Inverse of [`encode_run`](Self::encode_run). `term` is only used for error reporting.
    pub fn decode_run(self, term: &str, bytes: &[u8]) -> Result<Vec<Posting>> {
        let postings = match self {
            PostingsEncoding::Text => {
                let text = std::str::from_utf8(bytes).map_err(|e| IndexError::corrupt(term, e.to_string()))?;
                text.split_ascii_whitespace()
                    .map(|tok| parse_text_posting(term, tok))
                    .collect::<Result<Vec<_>>>()?
            }
            PostingsEncoding::Binary => {
                if bytes.len() % BINARY_RECORD_LEN != 0 {
                    return Err(IndexError::corrupt(
                        term,
                        format!("{} bytes is not a multiple of the {BINARY_RECORD_LEN}-byte record", bytes.len()),
                    ));
                }
                bytes
                    .chunks_exact(BINARY_RECORD_LEN)
                    .map(|rec| {
                        bincode::deserialize::<(DocId, f64)>(rec)
                            .map(|(doc_id, weight)| Posting { doc_id, weight })
                            .map_err(|e| IndexError::corrupt(term, e.to_string()))
                    })
                    .collect::<Result<Vec<_>>>()?
            }
        };
        if postings.is_empty() {
            return Err(IndexError::corrupt(term, "empty postings run"));
        }
        if let Some(p) = postings.iter().find(|p| !valid_weight(p.weight)) {
            return Err(IndexError::corrupt(term, format!("invalid weight {} for document {}", p.weight, p.doc_id)));
        }
        Ok(postings)
    }

    fn run_separator(self) -> &'static [u8] {
        match self {
            PostingsEncoding::Text => b"\n",
            PostingsEncoding::Binary => b"",
        }
    }
}

fn parse_text_posting(term: &str, tok: &str) -> Result<Posting> {
    let bad = || IndexError::corrupt(term, format!("malformed posting {tok:?}"));
    let (doc, weight) = tok.split_once(',').ok_or_else(bad)?;
    let doc_id = doc.parse::<DocId>().map_err(|_| bad())?;
    let weight = weight.parse::<f64>().map_err(|_| bad())?;
    Ok(Posting { doc_id, weight })
}

#[inline]
fn valid_weight(w: f64) -> bool {
    w.is_finite() && w >= 0.0
}

impl fmt::Display for PostingsEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PostingsEncoding::Text => "text",
            PostingsEncoding::Binary => "binary",
        })
    }
}

impl FromStr for PostingsEncoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(PostingsEncoding::Text),
            "binary" => Ok(PostingsEncoding::Binary),
            other => Err(format!("unknown postings encoding {other:?} (expected text or binary)")),
        }
    }
}

/// Where a term's postings run lives, plus its precomputed idf.
/// Stored on disk as the ordered triple `[offset, length, idf]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(u64, u64, f64)", into = "(u64, u64, f64)")]
pub struct DictEntry {
    pub offset: u64,
    pub length: u64,
    pub idf: f64,
}

impl From<(u64, u64, f64)> for DictEntry {
    fn from((offset, length, idf): (u64, u64, f64)) -> Self {
        Self { offset, length, idf }
    }
}

impl From<DictEntry> for (u64, u64, f64) {
    fn from(e: DictEntry) -> Self {
        (e.offset, e.length, e.idf)
    }
}

/// Contents of the dictionary/metadata file.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    /// Euclidean length of each document's weight vector.
    #[serde(serialize_with = "ordered")]
    pub lengths: HashMap<DocId, f64>,
    #[serde(serialize_with = "ordered")]
    pub dictionary: HashMap<String, DictEntry>,
    #[serde(default, skip_serializing_if = "PostingsEncoding::is_text")]
    pub encoding: PostingsEncoding,
}

impl IndexMeta {
    pub fn entry(&self, term: &str) -> Option<&DictEntry> {
        self.dictionary.get(term)
    }

    pub fn length(&self, doc_id: DocId) -> Option<f64> {
        self.lengths.get(&doc_id).copied()
    }
}

// Sorted keys keep rebuilds of an unchanged corpus byte-identical.
fn ordered<S, K, V>(map: &HashMap<K, V>, s: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
    K: Ord + Serialize,
    V: Serialize,
{
    map.iter().collect::<BTreeMap<_, _>>().serialize(s)
}

/// `log10(N / df)`.
#[inline]
pub fn idf(num_docs: u32, df: usize) -> f64 {
    (num_docs as f64 / df as f64).log10()
}

/// Per-document vector length `sqrt(sum of squared weights)`.
pub fn document_lengths(postings: &PostingsMap) -> HashMap<DocId, f64> {
    let mut terms: Vec<&String> = postings.keys().collect();
    terms.sort();
    let mut sums: HashMap<DocId, f64> = HashMap::new();
    for term in terms {
        for p in &postings[term] {
            *sums.entry(p.doc_id).or_insert(0.0) += p.weight * p.weight;
        }
    }
    sums.into_iter().map(|(doc, sq)| (doc, sq.sqrt())).collect()
}

/// Streams postings runs to `out`, recording where each one lands.
pub struct IndexWriter<W: Write> {
    out: W,
    encoding: PostingsEncoding,
    num_docs: u32,
    offset: u64,
    buf: Vec<u8>,
    dictionary: HashMap<String, DictEntry>,
}

impl<W: Write> IndexWriter<W> {
    pub fn new(out: W, encoding: PostingsEncoding, num_docs: u32) -> Self {
        Self { out, encoding, num_docs, offset: 0, buf: Vec::new(), dictionary: HashMap::new() }
    }

    pub fn write_run(&mut self, term: &str, run: &[Posting]) -> Result<()> {
        debug_assert!(!run.is_empty());
        self.buf.clear();
        self.encoding.encode_run(run, &mut self.buf)?;
        let length = self.buf.len() as u64;
        self.buf.extend_from_slice(self.encoding.run_separator());
        self.out.write_all(&self.buf)?;

        let entry = DictEntry { offset: self.offset, length, idf: idf(self.num_docs, run.len()) };
        self.dictionary.insert(term.to_string(), entry);
        self.offset += self.buf.len() as u64;
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.offset
    }

    /// Flush the postings sink and assemble the metadata.
    pub fn finish(mut self, lengths: HashMap<DocId, f64>) -> Result<(W, IndexMeta)> {
        self.out.flush()?;
        let meta = IndexMeta { lengths, dictionary: self.dictionary, encoding: self.encoding };
        Ok((self.out, meta))
    }
}

/// Serialize all runs (in sorted term order) and compute the matching metadata.
pub fn write_index<W: Write>(
    postings: &PostingsMap,
    num_docs: u32,
    out: W,
    encoding: PostingsEncoding,
) -> Result<(W, IndexMeta)> {
    let mut terms: Vec<&String> = postings.keys().collect();
    terms.sort();
    let mut writer = IndexWriter::new(out, encoding, num_docs);
    for term in terms {
        writer.write_run(term, &postings[term])?;
    }
    tracing::debug!(bytes = writer.bytes_written(), "postings serialized");
    writer.finish(document_lengths(postings))
}

pub fn save_meta<W: Write>(out: W, meta: &IndexMeta) -> Result<()> {
    let mut out = BufWriter::new(out);
    serde_json::to_writer(&mut out, meta)?;
    out.flush()?;
    Ok(())
}

pub fn load_meta(path: &Path) -> Result<IndexMeta> {
    let f = File::open(path)?;
    let meta = serde_json::from_reader(BufReader::new(f))?;
    Ok(meta)
}

/// The two artifacts making up an index.
#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub dictionary: PathBuf,
    pub postings: PathBuf,
}

impl IndexPaths {
    pub fn new<D: AsRef<Path>, P: AsRef<Path>>(dictionary: D, postings: P) -> Self {
        Self { dictionary: dictionary.as_ref().to_path_buf(), postings: postings.as_ref().to_path_buf() }
    }

    /// Sibling path an artifact is written to before being renamed into place.
    pub fn staging(path: &Path) -> PathBuf {
        Self::sibling(path, ".partial")
    }

    /// Sibling path holding the previous artifact while a new one is swapped in.
    pub fn backup(path: &Path) -> PathBuf {
        Self::sibling(path, ".previous")
    }

    fn sibling(path: &Path, suffix: &str) -> PathBuf {
        let mut name = path.file_name().map(OsString::from).unwrap_or_default();
        name.push(suffix);
        path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> Vec<Posting> {
        vec![
            Posting { doc_id: 1, weight: 1.0 },
            Posting { doc_id: 12, weight: 1.0 + 3f64.log10() },
            Posting { doc_id: 400, weight: 1.0 + 17f64.log10() },
        ]
    }

    #[test]
    fn text_run_layout() {
        let mut buf = Vec::new();
        PostingsEncoding::Text.encode_run(&run()[..2], &mut buf).unwrap();
        assert_eq!(std::str::from_utf8(&buf).unwrap(), "1,1.000000000 12,1.477121255");
    }

    #[test]
    fn weights_survive_both_encodings_within_precision() {
        for enc in [PostingsEncoding::Text, PostingsEncoding::Binary] {
            let mut buf = Vec::new();
            enc.encode_run(&run(), &mut buf).unwrap();
            let back = enc.decode_run("t", &buf).unwrap();
            assert_eq!(back.len(), 3);
            for (a, b) in run().iter().zip(&back) {
                assert_eq!(a.doc_id, b.doc_id);
                assert!((a.weight - b.weight).abs() <= 1e-9, "{enc}: {} vs {}", a.weight, b.weight);
            }
        }
    }

    #[test]
    fn binary_records_are_fixed_width() {
        let mut buf = Vec::new();
        PostingsEncoding::Binary.encode_run(&run(), &mut buf).unwrap();
        assert_eq!(buf.len(), 3 * BINARY_RECORD_LEN);
        assert_eq!(&buf[..4], &1u32.to_le_bytes());
    }

    #[test]
    fn corrupt_regions_are_reported() {
        let text = PostingsEncoding::Text;
        assert!(matches!(text.decode_run("t", b"1,1.0 x"), Err(IndexError::CorruptPostings { .. })));
        assert!(matches!(text.decode_run("t", b"1;1.0"), Err(IndexError::CorruptPostings { .. })));
        assert!(matches!(text.decode_run("t", b""), Err(IndexError::CorruptPostings { .. })));
        assert!(matches!(
            PostingsEncoding::Binary.decode_run("t", &[0u8; 13]),
            Err(IndexError::CorruptPostings { .. })
        ));
    }

    #[test]
    fn non_finite_or_negative_weights_are_corrupt() {
        for weight in [f64::NAN, f64::INFINITY, -1.0] {
            let mut buf = Vec::new();
            PostingsEncoding::Binary.encode_run(&[Posting { doc_id: 3, weight }], &mut buf).unwrap();
            assert!(matches!(
                PostingsEncoding::Binary.decode_run("t", &buf),
                Err(IndexError::CorruptPostings { .. })
            ));
        }
        for text in [&b"3,NaN"[..], b"3,inf", b"3,-1.0"] {
            assert!(matches!(PostingsEncoding::Text.decode_run("t", text), Err(IndexError::CorruptPostings { .. })));
        }
    }

    #[test]
    fn dictionary_entry_serializes_as_triple() {
        let e = DictEntry { offset: 10, length: 25, idf: 0.5 };
        assert_eq!(serde_json::to_string(&e).unwrap(), "[10,25,0.5]");
        let back: DictEntry = serde_json::from_str("[10,25,0.5]").unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn meta_has_two_fields_for_text_and_sorted_keys() {
        let mut meta = IndexMeta::default();
        meta.lengths.insert(10, 2.0);
        meta.lengths.insert(2, 1.0);
        meta.dictionary.insert("b".into(), DictEntry { offset: 0, length: 1, idf: 0.0 });
        meta.dictionary.insert("a".into(), DictEntry { offset: 2, length: 1, idf: 0.0 });
        let json = serde_json::to_string(&meta).unwrap();
        assert_eq!(json, r#"{"lengths":{"2":1.0,"10":2.0},"dictionary":{"a":[2,1,0.0],"b":[0,1,0.0]}}"#);

        meta.encoding = PostingsEncoding::Binary;
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.ends_with(r#""encoding":"binary"}"#));
        let back: IndexMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(back.encoding, PostingsEncoding::Binary);
        assert_eq!(back.length(10), Some(2.0));
    }

    #[test]
    fn writer_records_offsets_lengths_and_idf() {
        let mut postings = PostingsMap::new();
        postings.insert("cat".into(), vec![Posting { doc_id: 1, weight: 1.0 }, Posting { doc_id: 2, weight: 1.0 }]);
        postings.insert("dog".into(), vec![Posting { doc_id: 3, weight: 1.0 }]);
        let (bytes, meta) = write_index(&postings, 4, Vec::new(), PostingsEncoding::Text).unwrap();

        let cat = meta.entry("cat").unwrap();
        let dog = meta.entry("dog").unwrap();
        assert_eq!((cat.offset, cat.length), (0, 27));
        assert_eq!((dog.offset, dog.length), (28, 13));
        assert!((cat.idf - 2f64.log10()).abs() < 1e-12);
        assert!((dog.idf - 4f64.log10()).abs() < 1e-12);
        let region = &bytes[dog.offset as usize..(dog.offset + dog.length) as usize];
        assert_eq!(region, b"3,1.000000000");
        assert_eq!(meta.lengths.len(), 3);
    }

    #[test]
    fn lengths_match_independent_computation() {
        let mut postings = PostingsMap::new();
        postings.insert("a".into(), vec![Posting::from_tf(1, 2), Posting::from_tf(2, 1)]);
        postings.insert("b".into(), vec![Posting::from_tf(1, 5)]);
        let lengths = document_lengths(&postings);
        let expected = (log_tf_sq(2) + log_tf_sq(5)).sqrt();
        assert!((lengths[&1] - expected).abs() < 1e-12);
        assert!((lengths[&2] - 1.0).abs() < 1e-12);
    }

    fn log_tf_sq(tf: u32) -> f64 {
        let w = crate::log_tf(tf);
        w * w
    }

    #[test]
    fn staging_path_is_a_sibling() {
        let p = IndexPaths::staging(Path::new("/tmp/out/dictionary.txt"));
        assert_eq!(p, PathBuf::from("/tmp/out/dictionary.txt.partial"));
    }
}
