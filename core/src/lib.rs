pub mod build;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod persist;
pub mod postings;
pub mod reader;
pub mod scorer;
pub mod tokenizer;
pub mod topk;

use serde::{Deserialize, Serialize};

pub use error::{IndexError, Result};

pub type DocId = u32;

/// One entry of a postings run: a document and its log-weighted term frequency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub weight: f64, // 1 + log10(tf)
}

impl Posting {
    pub fn from_tf(doc_id: DocId, tf: u32) -> Self {
        Self { doc_id, weight: log_tf(tf) }
    }
}

/// Logarithmically dampened term frequency. Callers never pass `tf == 0`.
#[inline]
pub fn log_tf(tf: u32) -> f64 {
    debug_assert!(tf > 0);
    1.0 + (tf as f64).log10()
}
