use crate::persist::IndexMeta;
use crate::reader::PostingsReader;
use crate::{log_tf, DocId, IndexError, Result};
use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Seek};

pub type ScoreMap = HashMap<DocId, f64>;

/// Query term frequencies, keyed in sorted term order so that score
/// accumulation happens in the same order on every run.
pub fn query_term_counts(tokens: &[String]) -> BTreeMap<&str, u32> {
    let mut counts = BTreeMap::new();
    for t in tokens {
        *counts.entry(t.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Weight of a query term: `(1 + log10(qtf)) * idf`, or exactly 1 when the
/// query has a single distinct term.
#[inline]
pub fn query_weight(distinct_terms: usize, qtf: u32, idf: f64) -> f64 {
    if distinct_terms == 1 {
        1.0
    } else {
        log_tf(qtf) * idf
    }
}

/// Score every document sharing at least one term with the query and divide by
/// the document's vector length. Documents matching nothing are absent.
pub fn score_query<R: Read + Seek>(
    tokens: &[String],
    meta: &IndexMeta,
    reader: &mut PostingsReader<R>,
) -> Result<ScoreMap> {
    let counts = query_term_counts(tokens);
    let distinct = counts.len();
    let mut scores = ScoreMap::new();

    for (term, qtf) in counts {
        let Some(entry) = meta.entry(term) else {
            continue;
        };
        let qw = query_weight(distinct, qtf, entry.idf);
        for p in reader.postings(meta, term)? {
            *scores.entry(p.doc_id).or_insert(0.0) += p.weight * qw;
        }
    }

    for (doc_id, score) in scores.iter_mut() {
        let length = meta.length(*doc_id).ok_or(IndexError::MissingLength { doc_id: *doc_id })?;
        *score /= length;
    }
    Ok(scores)
}
