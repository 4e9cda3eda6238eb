//! Multi-insurer feature comparison
//!
//! One filtered search per insurer (run concurrently), then a single
//! structured-extraction call over all contexts. The extracted table is
//! normalized so that every requested insurer appears exactly once.

use super::prompts::{comparison_context, comparison_messages, NOT_SPECIFIED};
use crate::cancel::cancellable;
use crate::error::{AseguroError, Result};
use crate::llm::Generator;
use crate::store::{RetrievedPassage, SearchFilter, VectorStore};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Maximum words kept in a row's `value`
pub const MAX_VALUE_WORDS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub insurer: String,
    pub value: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub source: String,
}

impl ComparisonRow {
    fn not_specified(insurer: &str) -> Self {
        Self {
            insurer: insurer.to_string(),
            value: NOT_SPECIFIED.to_string(),
            details: String::new(),
            source: String::new(),
        }
    }

    pub fn is_specified(&self) -> bool {
        self.value != NOT_SPECIFIED
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub feature: String,
    pub comparison: Vec<ComparisonRow>,
}

/// A comparison table, or an explicit extraction failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComparisonOutcome {
    Table(ComparisonResult),
    Failed { error: String },
}

pub struct ComparisonPipeline {
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn Generator>,
    k: usize,
}

impl ComparisonPipeline {
    pub fn new(store: Arc<dyn VectorStore>, generator: Arc<dyn Generator>, k: usize) -> Self {
        Self {
            store,
            generator,
            k,
        }
    }

    /// Compare `feature` across `insurers`.
    ///
    /// Vector-store failures and cancellation are errors. Generation or
    /// parse failures are reported as [`ComparisonOutcome::Failed`].
    pub async fn compare(
        &self,
        feature: &str,
        insurers: &[String],
        cancel: &CancellationToken,
    ) -> Result<ComparisonOutcome> {
        let feature = feature.trim();
        if feature.is_empty() {
            return Err(AseguroError::InvalidInput(
                "comparison feature is empty".to_string(),
            ));
        }
        let insurers = normalize_insurers(insurers);
        if insurers.is_empty() {
            return Err(AseguroError::InvalidInput(
                "at least one insurer is required".to_string(),
            ));
        }

        let searches = insurers.iter().map(|insurer| {
            let filter = SearchFilter::insurer(insurer.clone());
            async move {
                let passages = self.store.search(feature, self.k, Some(&filter), cancel).await?;
                tracing::debug!(insurer = %insurer, found = passages.len(), "comparison retrieval");
                Ok::<_, AseguroError>((insurer.clone(), passages))
            }
        });
        let blocks: Vec<(String, Vec<RetrievedPassage>)> = try_join_all(searches).await?;

        if blocks.iter().all(|(_, passages)| passages.is_empty()) {
            tracing::info!(feature, "no evidence for any insurer");
            return Ok(ComparisonOutcome::Table(ComparisonResult {
                feature: feature.to_string(),
                comparison: insurers
                    .iter()
                    .map(|i| ComparisonRow::not_specified(i))
                    .collect(),
            }));
        }

        let context = comparison_context(&blocks);
        let messages = comparison_messages(feature, &insurers, &context);

        let response = match cancellable(cancel, "comparison extraction", self.generator.complete(messages)).await
        {
            Ok(response) => response,
            Err(e @ AseguroError::Cancelled(_)) => return Err(e),
            Err(e) => {
                tracing::warn!("Comparison extraction failed: {}", e);
                return Ok(ComparisonOutcome::Failed {
                    error: e.to_string(),
                });
            }
        };

        let rows = match parse_comparison_rows(&response) {
            Ok(rows) => rows,
            Err(reason) => {
                tracing::warn!("Unparsable comparison output: {}", reason);
                tracing::debug!("Raw comparison response: {}", response);
                return Ok(ComparisonOutcome::Failed { error: reason });
            }
        };

        let evidence: Vec<(String, bool)> = blocks
            .iter()
            .map(|(insurer, passages)| (insurer.clone(), !passages.is_empty()))
            .collect();

        Ok(ComparisonOutcome::Table(ComparisonResult {
            feature: feature.to_string(),
            comparison: normalize_rows(&evidence, rows),
        }))
    }
}

/// Uppercase, trim and dedupe insurer names, keeping request order
pub fn normalize_insurers(insurers: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(insurers.len());
    for insurer in insurers {
        let key = insurer.trim().to_uppercase();
        if !key.is_empty() && !normalized.contains(&key) {
            normalized.push(key);
        }
    }
    normalized
}

#[derive(Deserialize)]
struct RawComparison {
    comparison: Vec<RawRow>,
}

#[derive(Deserialize)]
struct RawRow {
    #[serde(default)]
    insurer: serde_json::Value,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    details: serde_json::Value,
    #[serde(default)]
    source: serde_json::Value,
}

fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

/// Rows of the first JSON object in an extraction reply
pub fn parse_comparison_rows(response: &str) -> std::result::Result<Vec<ComparisonRow>, String> {
    let json_str = match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => &response[start..=end],
        _ => return Err("no JSON object in extraction output".to_string()),
    };

    let raw: RawComparison =
        serde_json::from_str(json_str).map_err(|e| format!("invalid comparison JSON: {}", e))?;

    Ok(raw
        .comparison
        .into_iter()
        .map(|row| ComparisonRow {
            insurer: value_text(&row.insurer),
            value: value_text(&row.value),
            details: value_text(&row.details),
            source: value_text(&row.source),
        })
        .collect())
}

fn truncate_words(text: &str, max_words: usize) -> String {
    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Upper-case words of an insurer name with accents folded and
/// punctuation dropped: "Rímac Seguros S.A." -> ["RIMAC", "SEGUROS", "S", "A"]
fn name_words(name: &str) -> Vec<String> {
    let folded: String = name
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_uppercase();
    folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn names_match(requested: &[String], extracted: &[String], allow_prefix: bool) -> bool {
    if requested.is_empty() || extracted.is_empty() {
        return false;
    }
    if requested == extracted {
        return true;
    }
    allow_prefix && (extracted.starts_with(requested) || requested.starts_with(extracted))
}

/// One row per requested insurer, in request order.
///
/// Extracted rows are matched by folded name, exact matches first and
/// word-prefix matches ("RIMAC SEGUROS" for RIMAC) second. Insurers without
/// retrieved evidence, or absent from the extracted rows, get the "not
/// specified" row. Extra rows are dropped.
fn normalize_rows(evidence: &[(String, bool)], rows: Vec<ComparisonRow>) -> Vec<ComparisonRow> {
    let mut rows: Vec<Option<(Vec<String>, ComparisonRow)>> = rows
        .into_iter()
        .map(|row| Some((name_words(&row.insurer), row)))
        .collect();
    let requested: Vec<Vec<String>> = evidence.iter().map(|(name, _)| name_words(name)).collect();
    let mut assigned: Vec<Option<ComparisonRow>> = vec![None; evidence.len()];

    for allow_prefix in [false, true] {
        for (slot, words) in assigned.iter_mut().zip(&requested) {
            if slot.is_some() {
                continue;
            }
            *slot = rows
                .iter_mut()
                .find(|candidate| {
                    matches!(candidate, Some((name, _)) if names_match(words, name, allow_prefix))
                })
                .and_then(Option::take)
                .map(|(_, row)| row);
        }
    }

    evidence
        .iter()
        .zip(assigned)
        .map(|((insurer, has_evidence), extracted)| match extracted {
            Some(row) if *has_evidence && !row.value.is_empty() => ComparisonRow {
                insurer: insurer.clone(),
                value: truncate_words(&row.value, MAX_VALUE_WORDS),
                details: row.details,
                source: row.source,
            },
            _ => ComparisonRow::not_specified(insurer),
        })
        .collect()
}
