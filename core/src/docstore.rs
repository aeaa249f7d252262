use crate::index::DocId;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;

/// A crawled page. Only `url` and `title` are part of the serialized form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    #[serde(skip)]
    pub id: DocId,
    pub url: String,
    pub title: String,
    /// Body text accumulated during ingestion; emptied once indexed.
    #[serde(skip)]
    pub text: String,
}

/// Partial page content delivered by one crawler callback.
#[derive(Debug, Clone, Default)]
pub struct Fragment {
    pub title: Option<String>,
    pub text: Option<String>,
}

impl Fragment {
    pub fn title(title: impl Into<String>) -> Self {
        Self { title: Some(title.into()), text: None }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self { title: None, text: Some(text.into()) }
    }
}

#[derive(Default)]
struct Inner {
    by_url: HashMap<String, Document>,
    /// `urls[id]` is the url owning `id`.
    urls: Vec<String>,
}

/// Url-keyed document metadata and the authority for document ids.
#[derive(Default)]
pub struct DocumentStore {
    inner: Mutex<Inner>,
}

impl DocumentStore {
    pub fn new() -> Self { Self::default() }

    /// Merge `fragment` into the document at `url`, creating it with the next
    /// free id on first sight. Non-empty titles overwrite; non-empty text is
    /// appended after a single space.
    ///
    /// # Panics
    ///
    /// If more than `DocId::MAX + 1` distinct urls have been stored.
    pub fn upsert(&self, url: &str, fragment: Fragment) -> Document {
        let mut inner = self.inner.lock();
        let Inner { by_url, urls } = &mut *inner;
        let doc = by_url.entry(url.to_string()).or_insert_with(|| {
            let id = next_id(urls.len());
            urls.push(url.to_string());
            Document { id, url: url.to_string(), ..Document::default() }
        });
        if let Some(title) = fragment.title.filter(|t| !t.is_empty()) {
            doc.title = title;
        }
        if let Some(text) = fragment.text.filter(|t| !t.is_empty()) {
            if doc.text.is_empty() {
                doc.text = text;
            } else {
                doc.text.push(' ');
                doc.text.push_str(&text);
            }
        }
        doc.clone()
    }

    /// Hand the merged document at `url` over for indexing.
    ///
    /// Returns `None` (and leaves the document as is) unless more than
    /// `min_text_len` bytes of text have accumulated. On success the stored
    /// text is cleared and moved into the returned document.
    pub fn take_for_indexing(&self, url: &str, min_text_len: usize) -> Option<Document> {
        let mut inner = self.inner.lock();
        let doc = inner.by_url.get_mut(url)?;
        if doc.text.len() <= min_text_len {
            return None;
        }
        let text = std::mem::take(&mut doc.text);
        Some(Document { text, ..doc.clone() })
    }

    pub fn get(&self, url: &str) -> Option<Document> {
        self.inner.lock().by_url.get(url).map(without_text)
    }

    /// Look a document up by id. The returned copy never carries text.
    pub fn get_by_id(&self, id: DocId) -> Option<Document> {
        let inner = self.inner.lock();
        let url = inner.urls.get(id as usize)?;
        inner.by_url.get(url).map(without_text)
    }

    pub fn len(&self) -> usize { self.inner.lock().urls.len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

fn next_id(assigned: usize) -> DocId {
    DocId::try_from(assigned).expect("document id space exhausted")
}

fn without_text(doc: &Document) -> Document {
    Document { id: doc.id, url: doc.url.clone(), title: doc.title.clone(), text: String::new() }
}
