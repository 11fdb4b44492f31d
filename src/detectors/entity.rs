//! Entity mention detector.
//!
//! Matches prompts against the entity names known to the memory graph.
//! Names come from the shared [`MemoryCache`] and are refreshed from an
//! [`EntitySource`] when the cached list goes stale.
//!
//! # Matching
//!
//! - **exact** (score 1.0): the whole name appears as a word sequence,
//!   case-insensitively (`"usermanager"` in `"what is UserManager?"`).
//! - **partial** (score ≥ threshold): best of substring similarity between
//!   any entity word and prompt word (`shorter / longer`), and the share of
//!   entity words present in the prompt.
//!
//! Matches are ordered by score alone; ties keep the order of the name list.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use tracing::{debug, warn};

use super::heuristics::{is_code_like, round_confidence, trimmed_len};
use super::traits::Detector;
use crate::Result;
use crate::cache::MemoryCache;
use crate::types::{DetectionContext, QueryType, TriggerResult};

/// Registry name of [`EntityMentionDetector`].
pub const ENTITY_MENTION_DETECTOR: &str = "entity_mention_detector";

const MIN_PROMPT_CHARS: usize = 3;
const MAX_MATCHES: usize = 10;
const REASON_NAMES: usize = 3;
const ESTIMATED_TOKENS: u32 = 100;

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w+\b").expect("valid regex literal"));

/// Source of entity names, typically a memory-graph client.
pub trait EntitySource: Send + Sync {
    /// Source name for logging/debugging.
    fn name(&self) -> &str;

    /// Fetch the current list of entity names.
    ///
    /// Called while the [`MemoryCache`] lock is held. Implementations must
    /// not call back into the same cache, or the call deadlocks.
    fn entity_names(&self) -> Result<Vec<String>>;
}

/// Configuration for [`EntityMentionDetector`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EntityMentionConfig {
    /// Default: 3.
    pub priority: i32,
    pub enabled: bool,
    /// Names (and prompt words) shorter than this are ignored. Default: 2.
    pub min_entity_length: usize,
    /// Minimum fuzzy score for a partial match. Default: 0.7.
    pub partial_match_threshold: f64,
}

impl Default for EntityMentionConfig {
    fn default() -> Self {
        Self {
            priority: 3,
            enabled: true,
            min_entity_length: 2,
            partial_match_threshold: 0.7,
        }
    }
}

/// How an entity name matched the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Partial,
}

/// One matched entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityMatch {
    pub name: String,
    pub kind: MatchKind,
    pub score: f64,
}

/// Detects mentions of known entities.
pub struct EntityMentionDetector {
    config: EntityMentionConfig,
    cache: Arc<MemoryCache>,
    source: RwLock<Option<Arc<dyn EntitySource>>>,
}

impl EntityMentionDetector {
    /// Build a detector reading names from `cache`.
    ///
    /// Without a source the cached names are used as-is and never refreshed.
    pub fn new(config: EntityMentionConfig, cache: Arc<MemoryCache>) -> Self {
        Self {
            config,
            cache,
            source: RwLock::new(None),
        }
    }

    /// Attach the source used to refresh stale names.
    pub fn with_source(self, source: Arc<dyn EntitySource>) -> Self {
        self.set_source(source);
        self
    }

    /// Attach or replace the source used to refresh stale names.
    pub fn set_source(&self, source: Arc<dyn EntitySource>) {
        *self.source.write() = Some(source);
    }

    pub fn config(&self) -> &EntityMentionConfig {
        &self.config
    }

    /// The shared cache this detector reads from.
    pub fn cache(&self) -> &Arc<MemoryCache> {
        &self.cache
    }

    fn entity_names(&self) -> Option<Vec<String>> {
        let source = self.source.read().clone();
        let names = match &source {
            Some(source) => {
                let refresh = || source.entity_names();
                self.cache.get_entity_names(Some(&refresh), false)
            }
            None => self.cache.get_entity_names(None, false),
        };
        match names {
            Ok(names) => Some(names),
            Err(e) => {
                warn!(
                    source = source.as_ref().map(|s| s.name()),
                    error = %e,
                    "entity names unavailable"
                );
                None
            }
        }
    }

    /// Find entity mentions in `prompt`, best first, at most ten.
    pub fn find_mentions(&self, prompt: &str, entity_names: &[String]) -> Vec<EntityMatch> {
        let prompt_lower = prompt.to_lowercase();
        let prompt_words = self.words(&prompt_lower);

        let mut matches: Vec<EntityMatch> = entity_names
            .iter()
            .filter(|name| name.chars().count() >= self.config.min_entity_length)
            .filter_map(|name| {
                let entity_lower = name.to_lowercase();
                if contains_phrase(&prompt_lower, &entity_lower) {
                    return Some(EntityMatch {
                        name: name.clone(),
                        kind: MatchKind::Exact,
                        score: 1.0,
                    });
                }
                let score = fuzzy_score(&self.words(&entity_lower), &prompt_words);
                (score >= self.config.partial_match_threshold).then(|| EntityMatch {
                    name: name.clone(),
                    kind: MatchKind::Partial,
                    score,
                })
            })
            .collect();

        // Stable: equal scores keep the order of `entity_names`.
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(MAX_MATCHES);
        matches
    }

    /// Word tokens of `text` at least `min_entity_length` characters long.
    fn words<'a>(&self, text: &'a str) -> Vec<&'a str> {
        WORD.find_iter(text)
            .map(|m| m.as_str())
            .filter(|w| w.chars().count() >= self.config.min_entity_length)
            .collect()
    }
}

impl Detector for EntityMentionDetector {
    fn name(&self) -> &str {
        ENTITY_MENTION_DETECTOR
    }

    fn priority(&self) -> i32 {
        self.config.priority
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    fn evaluate(&self, prompt: &str, _context: &DetectionContext) -> Option<TriggerResult> {
        if trimmed_len(prompt) < MIN_PROMPT_CHARS || is_code_like(prompt) {
            return None;
        }

        let entity_names = self.entity_names()?;
        if entity_names.is_empty() {
            return None;
        }

        let matches = self.find_mentions(prompt, &entity_names);
        if matches.is_empty() {
            return None;
        }
        debug!(count = matches.len(), "entity mentions found");

        let names: Vec<String> = matches.iter().map(|m| m.name.clone()).collect();
        Some(
            TriggerResult::new(
                QueryType::EntityDetails,
                mention_confidence(&matches, prompt),
                ESTIMATED_TOKENS,
                mention_reason(&matches),
            )
            .with_param("names", names),
        )
    }
}

/// Whole-word, case-insensitive containment of `phrase` in `text`.
fn contains_phrase(text: &str, phrase: &str) -> bool {
    let pattern = format!(r"\b{}\b", regex::escape(phrase));
    match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(re) => re.is_match(text),
        Err(_) => false,
    }
}

/// Best of substring similarity and word-overlap ratio, in `[0, 1]`.
fn fuzzy_score(entity_words: &[&str], prompt_words: &[&str]) -> f64 {
    if entity_words.is_empty() || prompt_words.is_empty() {
        return 0.0;
    }

    let mut substring_score: f64 = 0.0;
    for entity_word in entity_words {
        for prompt_word in prompt_words {
            if entity_word.contains(prompt_word) || prompt_word.contains(entity_word) {
                let a = entity_word.chars().count();
                let b = prompt_word.chars().count();
                substring_score = substring_score.max(a.min(b) as f64 / a.max(b) as f64);
            }
        }
    }

    let entity_set: HashSet<&str> = entity_words.iter().copied().collect();
    let prompt_set: HashSet<&str> = prompt_words.iter().copied().collect();
    let overlap = entity_set.intersection(&prompt_set).count() as f64 / entity_set.len() as f64;

    substring_score.max(overlap)
}

fn mention_confidence(matches: &[EntityMatch], prompt: &str) -> f64 {
    if matches.is_empty() {
        return 0.0;
    }

    let exact = matches.iter().filter(|m| m.kind == MatchKind::Exact).count();
    let base = match exact {
        0 => 0.6,
        1 => 0.8,
        _ => 0.9,
    };
    let average = matches.iter().map(|m| m.score).sum::<f64>() / matches.len() as f64;

    let mut confidence = (base * average).min(1.0);
    if prompt.contains('?') {
        confidence = (confidence + 0.05).min(1.0);
    }
    if prompt.chars().count() > 50 {
        confidence = (confidence + 0.05).min(1.0);
    }
    round_confidence(confidence)
}

fn mention_reason(matches: &[EntityMatch]) -> String {
    let mut listed = matches
        .iter()
        .take(REASON_NAMES)
        .map(|m| format!("'{}'", m.name))
        .collect::<Vec<_>>()
        .join(", ");
    if matches.len() > REASON_NAMES {
        listed.push_str(&format!(" (+{} more)", matches.len() - REASON_NAMES));
    }
    format!("Mentioned {} known entity(ies): {listed}", matches.len())
}
