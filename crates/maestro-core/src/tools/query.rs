//! Focused query generation for tools.
//!
//! Composes a short search query from extracted entities and the prompt's
//! dominant intent. When entity extraction yields nothing usable, falls
//! back to the raw prompt minus stop words.

use crate::analyzer::entities::Entities;

/// Intent keyword table, most specific first; the first matching intent
/// leads the query.
const INTENT_KEYWORDS: &[(&str, &[&str])] = &[
    ("weather", &["weather", "forecast", "temperature", "climate"]),
    ("news", &["news", "latest", "update", "happening"]),
    ("price", &["price", "cost", "buy", "purchase", "expensive", "cheap"]),
    ("restaurant", &["restaurant", "food", "dining", "eat "]),
    ("travel", &["travel", "visit", "trip", "vacation"]),
    ("learn", &["learn", "how", "tutorial", "guide"]),
];

const GENERIC_CONCEPTS: &[&str] = &["story", "tell", "about", "like", "would", "make", "create"];

const STOP_WORDS: &[&str] = &[
    "i", "would", "like", "to", "can", "you", "please", "tell", "me", "about", "the", "a", "an",
    "and", "or", "but", "in", "on", "at", "of", "for", "with", "is", "it", "my", "what", "whats",
];

const MAX_QUERY_WORDS: usize = 5;

/// Compose a focused web-search query from the prompt and its entities.
pub fn compose_search_query(prompt: &str, entities: &Entities) -> String {
    let prompt_lower = prompt.to_lowercase();
    let mut parts: Vec<String> = Vec::new();

    for (intent, keywords) in INTENT_KEYWORDS {
        if keywords.iter().any(|k| prompt_lower.contains(k)) {
            parts.push((*intent).to_string());
            break;
        }
    }

    // Locations carry the most search signal; take the first.
    if let Some(location) = entities.locations.first() {
        parts.push(location.clone());
    }

    // Temporal context: prefer "today" over other date mentions.
    if let Some(date) = entities
        .dates
        .iter()
        .find(|d| d.contains("today"))
        .or_else(|| entities.dates.first())
    {
        push_unique(&mut parts, date);
    }

    if parts.len() < 4 {
        if let Some(product) = entities.products.first() {
            push_unique(&mut parts, product);
        }
    }

    if parts.len() < 3 {
        for concept in entities
            .key_concepts
            .iter()
            .filter(|c| !GENERIC_CONCEPTS.contains(&c.as_str()))
            .take(2)
        {
            push_unique(&mut parts, concept);
        }
    }

    // Entity composition came up short: fill from the raw prompt minus
    // stop words.
    if parts.len() < 2 {
        for word in prompt.split_whitespace() {
            if parts.len() >= 4 {
                break;
            }
            let cleaned: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase();
            if cleaned.len() > 2
                && !STOP_WORDS.contains(&cleaned.as_str())
                && !cleaned.chars().all(char::is_numeric)
            {
                push_unique(&mut parts, &cleaned);
            }
        }
    }

    let query = parts
        .into_iter()
        .take(MAX_QUERY_WORDS)
        .collect::<Vec<_>>()
        .join(" ");

    if query.trim().is_empty() {
        prompt
            .split_whitespace()
            .take(3)
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        query
    }
}

/// Phrase the knowledgebase lookup as a direct question about the content.
pub fn compose_knowledge_query(prompt: &str) -> String {
    let lower = prompt.to_lowercase();
    if let Some(pos) = lower.find("how") {
        let rest = prompt[pos + 3..].trim().trim_end_matches('?');
        if !rest.is_empty() {
            return format!("How {rest}?");
        }
    }
    if let Some(pos) = lower.find("what") {
        let rest = prompt[pos + 4..].trim().trim_end_matches('?');
        if !rest.is_empty() {
            return format!("What {rest}?");
        }
    }
    format!("Information about {prompt}")
}

fn push_unique(parts: &mut Vec<String>, value: &str) {
    if !parts.iter().any(|p| p.eq_ignore_ascii_case(value)) {
        parts.push(value.to_string());
    }
}
