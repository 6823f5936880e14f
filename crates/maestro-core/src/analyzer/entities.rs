//! Entity extraction.
//!
//! A curated dictionary plus regex pass over the prompt. Entities are
//! grouped into fixed categories; `key_concepts` collects the remaining
//! substantive words (capped at five).

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Extracted entities grouped by category.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Entities {
    pub locations: Vec<String>,
    pub dates: Vec<String>,
    pub people: Vec<String>,
    pub organizations: Vec<String>,
    pub products: Vec<String>,
    pub events: Vec<String>,
    pub key_concepts: Vec<String>,
}

impl Entities {
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
            && self.dates.is_empty()
            && self.people.is_empty()
            && self.organizations.is_empty()
            && self.products.is_empty()
            && self.events.is_empty()
            && self.key_concepts.is_empty()
    }
}

/// Place names that plain capitalization heuristics misclassify.
const KNOWN_LOCATIONS: &[&str] = &[
    "bucharest", "romania", "halkidiki", "greece", "paris", "france", "london", "berlin",
    "germany", "rome", "italy", "madrid", "spain", "athens", "tokyo", "vienna", "cluj",
    "brasov", "timisoara",
];

const DATE_WORDS: &[&str] = &[
    "today", "tomorrow", "yesterday", "tonight", "monday", "tuesday", "wednesday", "thursday",
    "friday", "saturday", "sunday", "january", "february", "march", "april", "may", "june",
    "july", "august", "september", "october", "november", "december",
];

/// Words after which a capitalized token is most likely a place.
const LOCATION_INDICATORS: &[&str] = &["in", "at", "from", "to", "near"];

const GENERIC_WORDS: &[&str] = &[
    "would", "like", "tell", "about", "what", "how", "where", "when", "please", "could",
    "should", "make", "give", "this", "that", "with", "have", "some", "know",
];

static NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4}|\d{1,2}[./-]\d{1,2}(?:[./-]\d{2,4})?)\b").expect("valid date pattern")
});

static LAST_NEXT_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(last|next|this)\s+(week|month|year|weekend)\b").expect("valid span pattern")
});

fn clean(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric()).to_string()
}

/// Extract grouped entities from a prompt.
pub fn extract_entities(prompt: &str) -> Entities {
    let mut entities = Entities::default();
    let words: Vec<&str> = prompt.split_whitespace().collect();

    for m in NUMERIC_DATE.find_iter(prompt) {
        entities.dates.push(m.as_str().to_string());
    }
    for m in LAST_NEXT_SPAN.find_iter(prompt) {
        entities.dates.push(m.as_str().to_lowercase());
    }

    for (i, word) in words.iter().enumerate() {
        let cleaned = clean(word);
        if cleaned.is_empty() {
            continue;
        }
        let lower = cleaned.to_lowercase();

        if KNOWN_LOCATIONS.contains(&lower.as_str()) {
            push_unique(&mut entities.locations, &cleaned);
            continue;
        }

        if DATE_WORDS.contains(&lower.as_str()) {
            push_unique(&mut entities.dates, &lower);
            continue;
        }

        // Capitalized token after a location indicator: treat as a place.
        let after_indicator = i > 0
            && LOCATION_INDICATORS.contains(&clean(words[i - 1]).to_lowercase().as_str());
        if after_indicator && cleaned.chars().next().is_some_and(char::is_uppercase) && cleaned.len() > 2
        {
            push_unique(&mut entities.locations, &cleaned);
            continue;
        }

        if lower.len() > 3 && !GENERIC_WORDS.contains(&lower.as_str()) && !lower.chars().all(char::is_numeric)
        {
            push_unique(&mut entities.key_concepts, &lower);
        }
    }

    entities.key_concepts.truncate(5);
    entities
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v.eq_ignore_ascii_case(value)) {
        list.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_known_location_and_date() {
        let e = extract_entities("What's the weather in Bucharest today?");
        assert_eq!(e.locations, vec!["Bucharest"]);
        assert_eq!(e.dates, vec!["today"]);
    }

    #[test]
    fn capitalized_token_after_indicator_is_location() {
        let e = extract_entities("best restaurants in Springfield tonight");
        assert!(e.locations.contains(&"Springfield".to_string()));
    }

    #[test]
    fn relative_spans_are_dates() {
        let e = extract_entities("Analyze weather in Bucharest last week");
        assert!(e.dates.contains(&"last week".to_string()));
    }

    #[test]
    fn key_concepts_skip_generic_words() {
        let e = extract_entities("Would you like to tell me about dragons?");
        assert_eq!(e.key_concepts, vec!["dragons"]);
    }

    #[test]
    fn empty_prompt_yields_nothing() {
        assert!(extract_entities("").is_empty());
    }
}
