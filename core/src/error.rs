use crate::DocId;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("dictionary (de)serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("binary postings codec failed: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("corpus entry {path:?} is not named by a positive integer document id")]
    InvalidDocName { path: PathBuf },

    #[error("documents must arrive in strictly increasing id order (got {next} after {prev})")]
    OutOfOrder { prev: DocId, next: DocId },

    #[error("corrupt postings for term {term:?}: {reason}")]
    CorruptPostings { term: String, reason: String },

    #[error("document {doc_id} has postings but no length entry; dictionary and postings do not match")]
    MissingLength { doc_id: DocId },
}

impl IndexError {
    pub(crate) fn corrupt(term: &str, reason: impl Into<String>) -> Self {
        IndexError::CorruptPostings { term: term.to_string(), reason: reason.into() }
    }
}
