use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use url::Url;

use crate::PipelineError;

const KEPT_SYMBOLS: &[char] = &[
    '.', ',', '!', '?', '$', '€', '£', '¥', '%', '@', '#', '&', '*', '(', ')', '-', '_',
];

/// Normalise scraped or generated text: single spaces, no exotic symbols,
/// no space before punctuation and no doubled `.`/`,`.
pub fn clean_text(text: &str) -> String {
    let filtered: String = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || KEPT_SYMBOLS.contains(c))
        .collect();

    let mut out = String::with_capacity(filtered.len());
    for c in filtered.chars() {
        if matches!(c, '.' | ',' | '!' | '?') {
            while out.ends_with(' ') {
                out.pop();
            }
            if (c == '.' || c == ',') && out.ends_with(c) {
                continue;
            }
        }
        if c == ' ' && out.ends_with(' ') {
            continue;
        }
        out.push(c);
    }
    out.trim().to_string()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Last path segment of `url`, or `content` for a root URL.
pub fn page_context(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path()
                .trim_matches('/')
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "content".to_string())
}

/// Lowercase and join words with `_`, capped at `max_len` characters.
pub fn slug(text: &str, max_len: usize) -> String {
    let joined = text
        .to_lowercase()
        .split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
                .collect::<String>()
        })
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    joined.chars().take(max_len).collect()
}

pub fn save_json<T: Serialize>(data: &T, filename: &Path) -> Result<(), PipelineError> {
    let mut file = File::create(filename)?;
    file.write_all(serde_json::to_string_pretty(data)?.as_bytes())?;
    tracing::info!(file = %filename.display(), "wrote output");
    Ok(())
}
