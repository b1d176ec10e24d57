use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use showroom_core::catalog::CarRecord;
use showroom_core::preferences::PreferenceMap;

use crate::generation::TextGenerator;
use crate::prompts;

static FENCED_JSON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("fenced json pattern is valid")
});

/// Phrases that signal the user wants to narrow the previous results.
const REFINEMENT_PHRASES: [&str; 11] = [
    "from this list",
    "from these",
    "of these",
    "of those",
    "show only",
    "only the",
    "just the",
    "filter by",
    "narrow",
    "refine",
    "specify",
];

/// Attribute names whose mention after a search also reads as a
/// refinement.
const ATTRIBUTE_TOKENS: [&str; 9] = [
    "color", "price", "year", "fuel", "transmission", "doors", "mileage", "brand", "model",
];

/// Turns free text into a sparse preference map through the pluggable
/// generation capability. Parse trouble and backend trouble both yield
/// an empty map - an empty map is a valid outcome, not an error.
pub struct PreferenceExtractor {
    generator: Arc<dyn TextGenerator>,
}

impl PreferenceExtractor {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn extract(
        &self,
        user_input: &str,
        previous_results: &[CarRecord],
    ) -> PreferenceMap {
        let request = prompts::extract_request(user_input, previous_results);

        match self.generator.generate(&request).await {
            Ok(response) => {
                let preferences = parse_preferences(&response);
                debug!(
                    event_name = "agent.extract.completed",
                    generator = self.generator.name(),
                    empty = preferences.is_empty(),
                    "extracted preferences from user input"
                );
                preferences
            }
            Err(error) => {
                warn!(
                    event_name = "agent.extract.backend_failed",
                    generator = self.generator.name(),
                    error = %error,
                    "preference extraction degraded to an empty map"
                );
                PreferenceMap::default()
            }
        }
    }
}

/// Finds a JSON object in a model response: a fenced ```json block
/// first, otherwise the substring between the first `{` and the last
/// `}`.
pub fn extract_json_object(response: &str) -> Option<&str> {
    if let Some(captures) = FENCED_JSON.captures(response) {
        return captures.get(1).map(|group| group.as_str());
    }

    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (end >= start).then(|| &response[start..=end])
}

pub fn parse_preferences(response: &str) -> PreferenceMap {
    let Some(json_text) = extract_json_object(response) else {
        return PreferenceMap::default();
    };

    match serde_json::from_str::<serde_json::Value>(json_text) {
        Ok(value) => PreferenceMap::from_json(&value),
        Err(_) => PreferenceMap::default(),
    }
}

/// A follow-up narrows the previous result set (instead of starting a
/// new search) when prior results exist and the text either carries a
/// refinement phrase or names a filterable attribute.
pub fn is_refinement_request(user_input: &str, has_previous_results: bool) -> bool {
    if !has_previous_results {
        return false;
    }

    let lowered = user_input.to_lowercase();
    REFINEMENT_PHRASES.iter().any(|phrase| lowered.contains(phrase))
        || ATTRIBUTE_TOKENS.iter().any(|token| lowered.contains(token))
}

#[cfg(test)]
mod tests {
    use super::{extract_json_object, is_refinement_request, parse_preferences};

    #[test]
    fn fenced_json_blocks_are_preferred() {
        let response = "Here you go:\n```json\n{\"brand\": \"Audi\"}\n```\nAnything else?";
        assert_eq!(extract_json_object(response), Some("{\"brand\": \"Audi\"}"));
    }

    #[test]
    fn bare_braces_are_the_fallback() {
        let response = "sure thing {\"brand\": \"Fiat\", \"doors\": 4} hope that helps";
        assert_eq!(extract_json_object(response), Some("{\"brand\": \"Fiat\", \"doors\": 4}"));
    }

    #[test]
    fn responses_without_json_yield_an_empty_map() {
        assert!(parse_preferences("I could not understand the request.").is_empty());
        assert!(parse_preferences("{ not json at all").is_empty());
    }

    #[test]
    fn parse_drops_unknown_keys_silently() {
        let preferences =
            parse_preferences("```json\n{\"brand\": \"BMW\", \"spoiler\": true}\n```");
        assert_eq!(preferences.brand.as_deref(), Some("BMW"));
    }

    #[test]
    fn refinement_requires_previous_results() {
        assert!(!is_refinement_request("only the red ones", false));
        assert!(is_refinement_request("only the red ones", true));
    }

    #[test]
    fn attribute_mentions_after_a_search_read_as_refinement() {
        assert!(is_refinement_request("what about the price?", true));
        assert!(is_refinement_request("show me white color", true));
        assert!(!is_refinement_request("thanks, that is all", true));
    }
}
