//! In-memory full-text search over crawled pages.
//!
//! Pages arrive as partial updates (a title, then body fragments) through
//! [`SearchEngine::observe_title`] and [`SearchEngine::observe_text`], and are
//! indexed on [`SearchEngine::finish_page`]. Queries are answered by
//! [`SearchEngine::search`] with results ordered by summed term frequency.

pub mod docstore;
pub mod index;
pub mod query;
pub mod tokenizer;

pub use docstore::{Document, DocumentStore, Fragment};
pub use index::{AddOutcome, DocId, InvertedIndex, PostingList, TokenPosting};
pub use query::QueryEngine;

/// Pages with this many bytes of body text or fewer are not indexed.
pub const DEFAULT_MIN_TEXT_LEN: usize = 2;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub min_text_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self { Self { min_text_len: DEFAULT_MIN_TEXT_LEN } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Indexed { id: DocId, outcome: AddOutcome },
    /// Unknown url, or not enough text accumulated.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineStats {
    pub documents: usize,
    pub tokens: usize,
}

/// Document store and inverted index behind one handle, shared as `Arc<SearchEngine>`
/// between crawler tasks and query handlers.
#[derive(Default)]
pub struct SearchEngine {
    config: EngineConfig,
    docs: DocumentStore,
    index: InvertedIndex,
}

impl SearchEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config, docs: DocumentStore::new(), index: InvertedIndex::new() }
    }

    pub fn observe_title(&self, url: &str, title: &str) -> Document {
        self.docs.upsert(url, Fragment::title(title))
    }

    pub fn observe_text(&self, url: &str, text: &str) -> Document {
        self.docs.upsert(url, Fragment::text(text))
    }

    /// Completion signal for a page: index whatever text has accumulated.
    pub fn finish_page(&self, url: &str) -> PageOutcome {
        let Some(doc) = self.docs.take_for_indexing(url, self.config.min_text_len) else {
            tracing::debug!(url, "page skipped, not enough text");
            return PageOutcome::Skipped;
        };
        let outcome = self.index.add(&doc);
        tracing::debug!(
            url,
            id = doc.id,
            appended = outcome.appended,
            incremented = outcome.incremented,
            discarded = outcome.discarded,
            "page indexed"
        );
        PageOutcome::Indexed { id: doc.id, outcome }
    }

    pub fn search(&self, query: &str) -> Vec<Document> {
        self.query().search(query)
    }

    pub fn rank(&self, query: &str) -> Vec<(DocId, u64)> {
        self.query().rank(query)
    }

    pub fn query(&self) -> QueryEngine<'_> {
        QueryEngine::new(&self.index, &self.docs)
    }

    pub fn documents(&self) -> &DocumentStore { &self.docs }

    pub fn index(&self) -> &InvertedIndex { &self.index }

    pub fn stats(&self) -> EngineStats {
        EngineStats { documents: self.docs.len(), tokens: self.index.token_count() }
    }
}
