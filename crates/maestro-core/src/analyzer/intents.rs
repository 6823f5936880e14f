//! Intent detection.
//!
//! A prioritized pattern pass over the prompt. High-priority intents
//! (humor, recipe, weather) are checked first; each detected intent records
//! the keywords that triggered it for traceability.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Humor,
    Recipe,
    Weather,
    Storytelling,
    Information,
    CurrentEvents,
    Cultural,
    Personal,
}

/// An intent together with the keywords that triggered it.
#[derive(Debug, Clone, Serialize)]
pub struct DetectedIntent {
    pub intent: Intent,
    pub triggers: Vec<String>,
}

/// Pattern table, high-priority group first.
const PATTERNS: &[(Intent, &[&str])] = &[
    (
        Intent::Humor,
        &["funny", "joke", "comedy", "parody", "amusing", "humor", "satire"],
    ),
    (
        Intent::Recipe,
        &["recipe", "cook", "prepare", "ingredient", "how to make", "ciorba"],
    ),
    (
        Intent::Weather,
        &["weather", "forecast", "temperature"],
    ),
    (
        Intent::Storytelling,
        &["story", "tale", "tell me", "narrative", "tell us"],
    ),
    (
        Intent::Information,
        &["what", "how", "where", "when", "explain"],
    ),
    (
        Intent::CurrentEvents,
        &["today", "now", "current", "latest", "news"],
    ),
    (
        Intent::Cultural,
        &["traditional", "cultural", "heritage", "history"],
    ),
    (
        Intent::Personal,
        &["grandma", "granny", "family", "my ", "our "],
    ),
];

/// Detect every intent whose pattern matches the prompt.
pub fn detect_intents(prompt: &str) -> Vec<DetectedIntent> {
    let lower = prompt.to_lowercase();
    PATTERNS
        .iter()
        .filter_map(|(intent, patterns)| {
            let triggers: Vec<String> = patterns
                .iter()
                .filter(|p| lower.contains(*p))
                .map(|p| p.trim().to_string())
                .collect();
            if triggers.is_empty() {
                None
            } else {
                Some(DetectedIntent {
                    intent: *intent,
                    triggers,
                })
            }
        })
        .collect()
}

pub fn has_intent(intents: &[DetectedIntent], intent: Intent) -> bool {
    intents.iter().any(|d| d.intent == intent)
}
