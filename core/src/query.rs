use crate::docstore::{Document, DocumentStore};
use crate::index::{DocId, InvertedIndex};
use crate::tokenizer::normalize;
use std::collections::HashMap;

/// Ranked keyword search over an index and the store that names its ids.
pub struct QueryEngine<'a> {
    index: &'a InvertedIndex,
    docs: &'a DocumentStore,
}

impl<'a> QueryEngine<'a> {
    pub fn new(index: &'a InvertedIndex, docs: &'a DocumentStore) -> Self {
        Self { index, docs }
    }

    /// Sum of per-document token counts for the normalized query, highest
    /// score first and ties by ascending id.
    pub fn rank(&self, query: &str) -> Vec<(DocId, u64)> {
        let tokens = normalize(query);
        let mut scores: HashMap<DocId, u64> = HashMap::new();
        self.index.accumulate(&tokens, &mut scores);
        let mut scored: Vec<(DocId, u64)> = scores.into_iter().collect();
        scored.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        scored
    }

    /// The complete ranked result set. Ids the store cannot resolve are skipped.
    pub fn search(&self, query: &str) -> Vec<Document> {
        self.rank(query)
            .into_iter()
            .filter_map(|(id, _)| self.docs.get_by_id(id))
            .collect()
    }
}
