//! Lenient parsing of rerank replies

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref INDEX_RE: Regex = Regex::new(r"-?\d+").unwrap();
}

/// Candidate indices named by a rerank reply, in the order given.
///
/// Every run of digits counts as an index. Negative numbers (including the
/// second half of a range such as `1-5`), out-of-range and repeated indices
/// are dropped; at most `top_n` are kept. An empty result means the
/// caller should fall back to the original order.
pub fn parse_rerank_indices(response: &str, candidates: usize, top_n: usize) -> Vec<usize> {
    let mut indices = Vec::with_capacity(top_n);
    for token in INDEX_RE.find_iter(response) {
        if indices.len() == top_n {
            break;
        }
        let text = token.as_str();
        if text.starts_with('-') {
            continue;
        }
        let Ok(idx) = text.parse::<usize>() else {
            continue;
        };
        if idx < candidates && !indices.contains(&idx) {
            indices.push(idx);
        }
    }
    indices
}
