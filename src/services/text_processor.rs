// Text Processing Service
// Tokenization for the review vectorizer and review text normalization

use regex::Regex;
use std::sync::OnceLock;

static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
static WS_RE: OnceLock<Regex> = OnceLock::new();

fn token_re() -> &'static Regex {
    // Runs of two or more word characters, unicode-aware
    TOKEN_RE.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"))
}

fn ws_re() -> &'static Regex {
    WS_RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

/// Split text into word tokens
pub fn tokenize(text: &str, lowercase: bool) -> Vec<String> {
    if text.is_empty() {
        return vec![];
    }

    let source = if lowercase {
        text.to_lowercase()
    } else {
        text.to_string()
    };

    token_re()
        .find_iter(&source)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Build word n-grams for every n in [min_n, max_n], unigrams first
pub fn word_ngrams(tokens: &[String], min_n: usize, max_n: usize) -> Vec<String> {
    let min_n = min_n.max(1);
    if tokens.is_empty() || max_n < min_n {
        return vec![];
    }

    let mut out = Vec::new();
    for n in min_n..=max_n {
        if tokens.len() < n {
            break;
        }
        for window in tokens.windows(n) {
            out.push(window.join(" "));
        }
    }
    out
}

/// Lowercase, collapse whitespace and trim
pub fn normalize_review_text(text: &str) -> String {
    ws_re().replace_all(&text.to_lowercase(), " ").trim().to_string()
}

/// Unicode scalar count, used for length heuristics
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
