//! Keyword detector.
//!
//! Triggers when the prompt uses language that asks for earlier context:
//! recall ("remember", "last time"), decisions ("why did we", "chose"),
//! architecture ("design", "pattern") or problems ("bug", "blocker").
//! Categories are scanned in order and the first matching pattern wins.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::{Match, Regex, RegexBuilder};
use serde::Deserialize;
use tracing::warn;

use super::heuristics::{is_code_like, round_confidence, trimmed_len, window};
use super::traits::Detector;
use crate::types::{DetectionContext, QueryType, TriggerResult};

/// Registry name of [`KeywordDetector`].
pub const KEYWORD_DETECTOR: &str = "keyword_detector";

const MIN_PROMPT_CHARS: usize = 5;
const CONTEXT_RADIUS: usize = 50;
const MAX_QUERY_TERMS: usize = 5;
const MAX_CAPITALIZED_TERMS: usize = 3;
const ESTIMATED_TOKENS: u32 = 150;

/// Built-in keyword categories, in scan order.
const DEFAULT_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "memory",
        &[
            r"\b(remember|recall|previously|earlier|last\s+time)\b",
            r"\b(we\s+discussed|we\s+talked\s+about)\b",
            r"\b(from\s+before|mentioned\s+earlier)\b",
        ],
    ),
    (
        "decision",
        &[
            r"\b(why\s+did\s+we|how\s+did\s+we|when\s+did\s+we)\b",
            r"\b(decided|chose|selected|picked)\b",
            r"\b(decision|rationale|reasoning)\b",
        ],
    ),
    (
        "architecture",
        &[
            r"\b(architecture|architectural|design)\b",
            r"\b(pattern|approach|structure)\b",
            r"\b(implementation|strategy)\b",
        ],
    ),
    (
        "problem",
        &[
            r"\b(issue|problem|bug|error)\b",
            r"\b(blocker|challenge|difficulty)\b",
            r"\b(fix|resolve|solution)\b",
        ],
    ),
];

static DOUBLE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)""#).expect("valid regex literal"));
static SINGLE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'([^']+)'").expect("valid regex literal"));
static CAMEL_CASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-z]+[A-Z][a-zA-Z]*\b").expect("valid regex literal"));
static SNAKE_CASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-z]+_[a-z_]+\b").expect("valid regex literal"));
static CAPITALIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][a-z]+\b").expect("valid regex literal"));

/// Configuration for [`KeywordDetector`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    /// Default: 2.
    pub priority: i32,
    pub enabled: bool,
    /// Category name → case-insensitive regex patterns. Replaces the
    /// built-in categories when set; scan order follows the map order.
    pub keywords: Option<IndexMap<String, Vec<String>>>,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            priority: 2,
            enabled: true,
            keywords: None,
        }
    }
}

/// Detects memory-related keywords in prompts.
pub struct KeywordDetector {
    priority: i32,
    enabled: bool,
    categories: Vec<(String, Vec<Regex>)>,
}

impl KeywordDetector {
    /// Build a detector from `config`.
    ///
    /// Patterns that fail to compile are skipped with a warning.
    pub fn new(config: &KeywordConfig) -> Self {
        let categories = match &config.keywords {
            Some(custom) => custom
                .iter()
                .map(|(category, patterns)| {
                    (category.clone(), compile_patterns(category, patterns.as_slice()))
                })
                .collect(),
            None => DEFAULT_KEYWORDS
                .iter()
                .map(|(category, patterns)| {
                    (category.to_string(), compile_patterns(category, *patterns))
                })
                .collect(),
        };

        Self {
            priority: config.priority,
            enabled: config.enabled,
            categories,
        }
    }

    /// Category names in scan order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|(name, _)| name.as_str())
    }
}

impl Default for KeywordDetector {
    fn default() -> Self {
        Self::new(&KeywordConfig::default())
    }
}

fn compile_patterns<S: AsRef<str>>(category: &str, patterns: &[S]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| {
            let pattern = pattern.as_ref();
            match RegexBuilder::new(pattern).case_insensitive(true).build() {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(category, pattern, error = %e, "skipping invalid keyword pattern");
                    None
                }
            }
        })
        .collect()
}

impl Detector for KeywordDetector {
    fn name(&self) -> &str {
        KEYWORD_DETECTOR
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn evaluate(&self, prompt: &str, _context: &DetectionContext) -> Option<TriggerResult> {
        if trimmed_len(prompt) < MIN_PROMPT_CHARS || is_code_like(prompt) {
            return None;
        }

        let (category, matched) = self.categories.iter().find_map(|(category, patterns)| {
            patterns
                .iter()
                .find_map(|re| re.find(prompt))
                .map(|m| (category.as_str(), m))
        })?;

        let terms = extract_query_terms(prompt, matched);
        let confidence = keyword_confidence(category, prompt);

        Some(
            TriggerResult::new(
                QueryType::KeywordSearch,
                confidence,
                ESTIMATED_TOKENS,
                format!(
                    "Keyword match: '{}' (category: {category})",
                    matched.as_str()
                ),
            )
            .with_param("query", terms.join(" "))
            .with_param("category", category)
            .with_param("matched_pattern", matched.as_str()),
        )
    }
}

/// Pull up to five search terms from the text around `matched`.
///
/// Preference: quoted strings, camelCase / snake_case identifiers, then
/// capitalized words. With none of those, the words surrounding the match.
fn extract_query_terms(prompt: &str, matched: Match<'_>) -> Vec<String> {
    let context = window(prompt, matched.start(), matched.end(), CONTEXT_RADIUS);

    let mut terms: Vec<&str> = Vec::new();
    for re in [&*DOUBLE_QUOTED, &*SINGLE_QUOTED] {
        terms.extend(
            re.captures_iter(context)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str()),
        );
    }
    for re in [&*CAMEL_CASE, &*SNAKE_CASE] {
        terms.extend(re.find_iter(context).map(|m| m.as_str()));
    }
    terms.extend(
        CAPITALIZED
            .find_iter(context)
            .take(MAX_CAPITALIZED_TERMS)
            .map(|m| m.as_str()),
    );

    if terms.is_empty() {
        let words: Vec<&str> = context.split_whitespace().collect();
        let match_words: Vec<&str> = matched.as_str().split_whitespace().collect();
        if let Some(i) = words
            .iter()
            .position(|word| match_words.iter().any(|mw| word.contains(mw)))
        {
            let lo = i.saturating_sub(2);
            let hi = (i + 3).min(words.len());
            terms.extend_from_slice(&words[lo..hi]);
        }
    }

    let mut seen = std::collections::HashSet::new();
    terms
        .into_iter()
        .filter(|term| seen.insert(term.to_lowercase()))
        .take(MAX_QUERY_TERMS)
        .map(str::to_string)
        .collect()
}

fn keyword_confidence(category: &str, prompt: &str) -> f64 {
    let mut confidence: f64 = match category {
        "memory" => 0.9,
        "decision" => 0.85,
        "architecture" | "problem" => 0.75,
        _ => 0.7,
    };
    if prompt.contains('?') {
        confidence = (confidence + 0.1).min(1.0);
    }
    if prompt.chars().count() > 50 {
        confidence = (confidence + 0.05).min(1.0);
    }
    round_confidence(confidence)
}
