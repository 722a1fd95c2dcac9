use crate::{DocId, IndexError, Posting, Result};
use std::collections::HashMap;

/// Per-term postings runs, each sorted by strictly increasing doc id.
pub type PostingsMap = HashMap<String, Vec<Posting>>;

/// Accumulates postings from documents fed in increasing doc id order.
///
/// Because every document contributes at most one posting per term and ids
/// only grow, each run is already sorted when the builder is finished.
#[derive(Debug, Default)]
pub struct PostingsBuilder {
    postings: PostingsMap,
    last_doc: Option<DocId>,
    num_docs: u32,
}

impl PostingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one document. Empty token sequences still count towards the
    /// collection size but produce no postings.
    pub fn add_document<I, S>(&mut self, doc_id: DocId, tokens: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(prev) = self.last_doc {
            if doc_id <= prev {
                return Err(IndexError::OutOfOrder { prev, next: doc_id });
            }
        }
        self.last_doc = Some(doc_id);
        self.num_docs += 1;

        let mut tf_counts: HashMap<String, u32> = HashMap::new();
        for token in tokens {
            *tf_counts.entry(token.into()).or_insert(0) += 1;
        }
        for (term, tf) in tf_counts {
            self.postings.entry(term).or_default().push(Posting::from_tf(doc_id, tf));
        }
        Ok(())
    }

    pub fn num_docs(&self) -> u32 {
        self.num_docs
    }

    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }

    pub fn finish(self) -> (PostingsMap, u32) {
        (self.postings, self.num_docs)
    }
}
