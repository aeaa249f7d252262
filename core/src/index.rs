use crate::docstore::Document;
use crate::tokenizer::normalize;
use parking_lot::RwLock;
use std::collections::HashMap;

pub type DocId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPosting {
    pub doc_id: DocId,
    pub count: u32,
}

/// Postings for one token, ascending by `doc_id` with one entry per document.
pub type PostingList = Vec<TokenPosting>;

/// How the token occurrences of one `add` call were applied.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AddOutcome {
    pub appended: usize,
    pub incremented: usize,
    /// Occurrences dropped because a later document already owns the list tail.
    pub discarded: usize,
}

#[derive(Default)]
pub struct InvertedIndex {
    postings: RwLock<HashMap<String, PostingList>>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Index the text of `doc` under its id.
    ///
    /// Lists are only ever appended to. An occurrence for a document whose id
    /// is below the id at the tail of the token's list is dropped rather than
    /// inserted in order, so every list stays strictly ascending without
    /// sorting. The whole document is applied under one write lock.
    pub fn add(&self, doc: &Document) -> AddOutcome {
        let tokens = normalize(&doc.text);
        let mut outcome = AddOutcome::default();
        let mut postings = self.postings.write();
        for token in tokens {
            let list = postings.entry(token).or_default();
            match list.last_mut() {
                Some(last) if last.doc_id > doc.id => {
                    outcome.discarded += 1;
                    continue;
                }
                Some(last) if last.doc_id == doc.id => {
                    last.count = last.count.saturating_add(1);
                    outcome.incremented += 1;
                    continue;
                }
                _ => {}
            }
            list.push(TokenPosting { doc_id: doc.id, count: 1 });
            outcome.appended += 1;
        }
        outcome
    }

    /// Snapshot of the posting list for an already-normalized token.
    pub fn postings(&self, token: &str) -> Option<PostingList> {
        self.postings.read().get(token).cloned()
    }

    /// Add every posting count of `tokens` into `scores`, keyed by document.
    ///
    /// Scores are `u64`: a token repeated in both the query and a document
    /// contributes the product of the two counts, which can exceed `u32`.
    pub fn accumulate<S: AsRef<str>>(&self, tokens: &[S], scores: &mut HashMap<DocId, u64>) {
        let postings = self.postings.read();
        for token in tokens {
            if let Some(list) = postings.get(token.as_ref()) {
                for p in list {
                    *scores.entry(p.doc_id).or_insert(0) += u64::from(p.count);
                }
            }
        }
    }

    /// Number of distinct tokens.
    pub fn token_count(&self) -> usize { self.postings.read().len() }
}
