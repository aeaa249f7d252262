use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;

lazy_static! {
    static ref RE: Regex = Regex::new(r"[\p{L}\p{N}]+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","an","and","are","as","at","be","but","by","for","if","in",
            "into","is","it","no","not","of","on","or","such","that","the",
            "their","then","there","these","they","this","to","was","will","with",
        ];
        words.iter().copied().collect()
    };
}

pub fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Split on every character that is neither a letter nor a number.
pub fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    RE.find_iter(text).map(|m| m.as_str())
}

/// Normalize text into index terms: tokenize, lowercase, drop stopwords, stem.
///
/// Used for both document bodies and queries, so a query term matches exactly
/// the postings its document-side spelling produced.
pub fn normalize(text: &str) -> Vec<String> {
    tokenize(text)
        .map(str::to_lowercase)
        .filter(|token| !is_stopword(token))
        .map(|token| STEMMER.stem(&token).into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_normalize() {
        let t = normalize("Running, runs, run!");
        assert_eq!(t, vec!["run", "run", "run"]);
    }

    #[test]
    fn splits_on_non_alphanumerics() {
        let t: Vec<&str> = tokenize("foo-bar_baz/42 x9").collect();
        assert_eq!(t, vec!["foo", "bar", "baz", "42", "x9"]);
    }

    // Words on Snowball's own stopword list are stemmed like any other token.
    #[test]
    fn stems_snowball_stopwords_too() {
        assert_eq!(normalize("having"), vec!["have"]);
        assert_eq!(normalize("having has"), normalize("have has"));
    }

    #[test]
    fn empty_and_symbol_only_input() {
        assert!(normalize("").is_empty());
        assert!(normalize("  -- !! ?? ").is_empty());
    }
}
