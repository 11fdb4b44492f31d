//! Tests for [`KeywordDetector`].

use indexmap::IndexMap;

use muninn::detectors::{Detector, KEYWORD_DETECTOR, KeywordConfig, KeywordDetector};
use muninn::{DetectionContext, QueryType};

fn evaluate(prompt: &str) -> Option<muninn::TriggerResult> {
    KeywordDetector::default().evaluate(prompt, &DetectionContext::new())
}

#[test]
fn defaults() {
    let detector = KeywordDetector::default();
    assert_eq!(detector.name(), KEYWORD_DETECTOR);
    assert_eq!(detector.priority(), 2);
    assert!(detector.enabled());
    assert_eq!(
        detector.categories().collect::<Vec<_>>(),
        vec!["memory", "decision", "architecture", "problem"]
    );
}

#[test]
fn memory_keyword_triggers() {
    let result = evaluate("Do you remember how we set up caching?").unwrap();
    assert!(result.triggered);
    assert_eq!(result.query_type, QueryType::KeywordSearch);
    assert_eq!(result.estimated_tokens, 150);
    assert_eq!(result.param("category").unwrap(), "memory");
    assert_eq!(result.param("matched_pattern").unwrap(), "remember");
    // memory 0.9 + question 0.1
    assert_eq!(result.confidence, 1.0);
    assert_eq!(
        result.reason,
        "Keyword match: 'remember' (category: memory)"
    );
}

#[test]
fn decision_keyword_triggers() {
    let result = evaluate("Why did we choose PostgreSQL").unwrap();
    assert_eq!(result.param("category").unwrap(), "decision");
    assert_eq!(result.param("matched_pattern").unwrap(), "Why did we");
    assert_eq!(result.confidence, 0.85);
    assert_eq!(result.param("query").unwrap(), "Why");
}

#[test]
fn first_category_in_order_wins() {
    // "bug" is a problem keyword, "earlier" is a memory keyword
    let result = evaluate("the bug we saw earlier").unwrap();
    assert_eq!(result.param("category").unwrap(), "memory");
}

#[test]
fn matching_is_case_insensitive() {
    let result = evaluate("THE ARCHITECTURE OF THIS THING").unwrap();
    assert_eq!(result.param("category").unwrap(), "architecture");
    assert_eq!(result.param("matched_pattern").unwrap(), "ARCHITECTURE");
}

#[test]
fn keywords_need_word_boundaries() {
    assert!(evaluate("prefixed designer tools only").is_none());
}

#[test]
fn short_prompt_is_ignored() {
    assert!(evaluate("bug").is_none());
    assert!(evaluate("   fix   ").is_none());
}

#[test]
fn code_block_is_ignored() {
    assert!(evaluate("```\n// remember to fix this bug\nlet x = 1;\n```").is_none());
    assert!(evaluate("{design: [remember(a), fix(b)]};{[()]}").is_none());
}

#[test]
fn indented_prose_still_triggers() {
    let result = evaluate("    do you remember why we picked redis?").unwrap();
    assert_eq!(result.param("category").unwrap(), "memory");
}

#[test]
fn plain_prose_without_keywords_is_ignored() {
    assert!(evaluate("Please add a unit test for the parser").is_none());
}

#[test]
fn long_question_gets_both_bonuses() {
    let prompt = "Could you explain what caused this problem in the nightly build yesterday?";
    let result = evaluate(prompt).unwrap();
    assert_eq!(result.param("category").unwrap(), "problem");
    // 0.75 + 0.1 + 0.05
    assert_eq!(result.confidence, 0.9);
}

#[test]
fn custom_keywords_replace_defaults() {
    let mut keywords = IndexMap::new();
    keywords.insert("deploy".to_string(), vec![r"\b(rollout|release)\b".to_string()]);
    let detector = KeywordDetector::new(&KeywordConfig {
        keywords: Some(keywords),
        ..Default::default()
    });

    assert_eq!(detector.categories().collect::<Vec<_>>(), vec!["deploy"]);
    assert!(
        detector
            .evaluate("do you remember this", &DetectionContext::new())
            .is_none()
    );

    let result = detector
        .evaluate("plan the release for friday", &DetectionContext::new())
        .unwrap();
    assert_eq!(result.param("category").unwrap(), "deploy");
    assert_eq!(result.confidence, 0.7);
}

#[test]
fn disabled_flag_is_reported() {
    let detector = KeywordDetector::new(&KeywordConfig {
        enabled: false,
        priority: 7,
        ..Default::default()
    });
    assert!(!detector.enabled());
    assert_eq!(detector.priority(), 7);
}
