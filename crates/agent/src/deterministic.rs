//! Rule-based text generation.
//!
//! This variant needs no model and no network: extraction walks fixed
//! lexicons and patterns, questions come from templates. It is always
//! available, which makes it the fallback for every model-backed
//! deployment and the default for tests.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use showroom_core::preferences::{MissingInfo, PreferenceMap, PriceBand, YearPreference};

use crate::generation::{GenerationError, GenerationRequest, TaskKind, TextGenerator};
use crate::prompts;

const BRAND_LEXICON: [&str; 14] = [
    "toyota",
    "honda",
    "ford",
    "chevrolet",
    "volkswagen",
    "fiat",
    "renault",
    "nissan",
    "hyundai",
    "kia",
    "bmw",
    "mercedes-benz",
    "audi",
    "volvo",
];

const MODEL_LEXICON: [&str; 12] = [
    "corolla", "hilux", "civic", "fit", "ranger", "onix", "cruze", "golf", "polo", "argo",
    "sandero", "kicks",
];

const COLOR_LEXICON: [&str; 9] =
    ["black", "white", "silver", "red", "blue", "gray", "grey", "green", "pearl"];

const FUEL_LEXICON: [&str; 6] = ["gasoline", "ethanol", "flex", "diesel", "electric", "hybrid"];

const USAGE_LEXICON: [&str; 5] = ["city", "highway", "work", "leisure", "family"];

static YEAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").expect("year pattern is valid"));

static DOORS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d)[\s-]*doors?\b").expect("doors pattern is valid"));

static MILEAGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:under|below|less than|max(?:imum)?(?:\s+of)?)\s+([\d][\d,.]*)\s*km")
        .expect("mileage pattern is valid")
});

/// Extracts preferences from plain text by lexicon and pattern matching.
/// Shared by the generator below and by anything that wants rule-based
/// extraction without a prompt round trip.
pub fn extract_preferences_by_rule(text: &str) -> PreferenceMap {
    let lowered = text.to_lowercase();
    let mut preferences = PreferenceMap::default();

    preferences.brand = BRAND_LEXICON
        .iter()
        .find(|brand| lowered.contains(*brand))
        .map(|brand| capitalize_brand(brand));
    preferences.model = MODEL_LEXICON
        .iter()
        .find(|model| lowered.contains(*model))
        .map(|model| capitalize_brand(model));

    preferences.price_band = detect_price_band(&lowered);
    preferences.year = detect_year(&lowered);

    preferences.fuel_type =
        FUEL_LEXICON.iter().find(|fuel| lowered.contains(*fuel)).map(|fuel| fuel.to_string());
    preferences.transmission = detect_transmission(&lowered);
    preferences.color = COLOR_LEXICON
        .iter()
        .find(|color| lowered.contains(*color))
        .map(|color| if *color == "grey" { "gray".to_string() } else { color.to_string() });

    preferences.doors = DOORS_PATTERN
        .captures(&lowered)
        .and_then(|captures| captures.get(1))
        .and_then(|group| group.as_str().parse().ok());

    preferences.mileage_limit = MILEAGE_PATTERN
        .captures(&lowered)
        .and_then(|captures| captures.get(1))
        .and_then(|group| group.as_str().replace([',', '.'], "").parse().ok());

    preferences.usage =
        USAGE_LEXICON.iter().find(|usage| lowered.contains(*usage)).map(|usage| usage.to_string());

    preferences
}

fn detect_price_band(lowered: &str) -> Option<PriceBand> {
    const BUDGET: [&str; 4] = ["cheap", "budget", "affordable", "economical"];
    const LUXURY: [&str; 4] = ["luxury", "premium", "expensive", "high-end"];
    const MID: [&str; 3] = ["mid-range", "mid range", "medium"];

    if BUDGET.iter().any(|hint| lowered.contains(hint)) {
        return Some(PriceBand::Budget);
    }
    if LUXURY.iter().any(|hint| lowered.contains(hint)) {
        return Some(PriceBand::Luxury);
    }
    if MID.iter().any(|hint| lowered.contains(hint)) {
        return Some(PriceBand::Mid);
    }
    None
}

fn detect_year(lowered: &str) -> Option<YearPreference> {
    if let Some(captures) = YEAR_PATTERN.captures(lowered) {
        if let Ok(year) = captures[1].parse() {
            return Some(YearPreference::Exact(year));
        }
    }
    if lowered.contains("recent") || lowered.contains("brand new") || lowered.contains("newer") {
        return Some(YearPreference::Recent);
    }
    if lowered.contains("older") || lowered.contains("old car") {
        return Some(YearPreference::Old);
    }
    None
}

fn detect_transmission(lowered: &str) -> Option<String> {
    for candidate in ["automatic", "manual", "cvt", "semi_automatic", "dual_clutch"] {
        if lowered.contains(candidate) {
            return Some(candidate.to_string());
        }
    }
    None
}

fn capitalize_brand(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// The deterministic implementing variant of the generation capability.
///
/// Extraction responses are emitted as fenced JSON so that both variants
/// share a single parse path in the extractor.
#[derive(Clone, Copy, Debug, Default)]
pub struct RuleBasedGenerator;

impl RuleBasedGenerator {
    pub fn new() -> Self {
        Self
    }

    fn answer_extract(&self, prompt: &str) -> String {
        let user_text = prompt
            .lines()
            .find_map(|line| {
                line.strip_prefix("User input: ").or_else(|| line.strip_prefix("New user input: "))
            })
            .unwrap_or(prompt);

        let preferences = extract_preferences_by_rule(user_text);
        let body = serde_json::to_string_pretty(&preferences).unwrap_or_else(|_| "{}".to_string());
        format!("```json\n{body}\n```")
    }

    fn answer_question(&self, prompt: &str) -> String {
        let missing_line = prompt
            .lines()
            .find_map(|line| line.strip_prefix("Missing information: "))
            .unwrap_or("");

        let first_missing = missing_line.split(',').map(str::trim).find_map(|token| match token {
            "brand" => Some(MissingInfo::BrandOrModel),
            "price_band" => Some(MissingInfo::PriceBand),
            "year" => Some(MissingInfo::Year),
            _ => None,
        });

        match first_missing {
            Some(info) => prompts::question_template(info).to_string(),
            None => prompts::READY_ACKNOWLEDGEMENT.to_string(),
        }
    }
}

#[async_trait]
impl TextGenerator for RuleBasedGenerator {
    fn name(&self) -> &'static str {
        "deterministic"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        Ok(match request.task {
            TaskKind::ExtractPreferences => self.answer_extract(&request.prompt),
            TaskKind::GenerateQuestion => self.answer_question(&request.prompt),
            TaskKind::FormatResults => "Here are the cars I found for you.".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use showroom_core::preferences::{PriceBand, YearPreference};

    use super::{extract_preferences_by_rule, RuleBasedGenerator};
    use crate::extract::parse_preferences;
    use crate::generation::TextGenerator;
    use crate::prompts;

    #[test]
    fn brand_and_year_are_extracted_from_plain_text() {
        let preferences = extract_preferences_by_rule("I want a Toyota from 2020");
        assert_eq!(preferences.brand.as_deref(), Some("Toyota"));
        assert_eq!(preferences.year, Some(YearPreference::Exact(2020)));
    }

    #[test]
    fn bands_colors_and_counts_are_recognized() {
        let preferences = extract_preferences_by_rule(
            "a cheap white automatic with 4 doors, under 80,000 km, for city driving",
        );
        assert_eq!(preferences.price_band, Some(PriceBand::Budget));
        assert_eq!(preferences.color.as_deref(), Some("white"));
        assert_eq!(preferences.transmission.as_deref(), Some("automatic"));
        assert_eq!(preferences.doors, Some(4));
        assert_eq!(preferences.mileage_limit, Some(80_000));
        assert_eq!(preferences.usage.as_deref(), Some("city"));
    }

    #[test]
    fn hyphenated_brands_keep_their_casing() {
        let preferences = extract_preferences_by_rule("maybe a mercedes-benz");
        assert_eq!(preferences.brand.as_deref(), Some("Mercedes-Benz"));
    }

    #[test]
    fn unrelated_text_extracts_nothing() {
        assert!(extract_preferences_by_rule("hello, how are you today?").is_empty());
    }

    #[tokio::test]
    async fn generator_answers_extraction_through_the_shared_parse_path() {
        let generator = RuleBasedGenerator::new();
        let request = prompts::extract_request("a Honda Civic, gasoline", &[]);

        let response = generator.generate(&request).await.expect("deterministic never fails");
        let preferences = parse_preferences(&response);

        assert_eq!(preferences.brand.as_deref(), Some("Honda"));
        assert_eq!(preferences.model.as_deref(), Some("Civic"));
        assert_eq!(preferences.fuel_type.as_deref(), Some("gasoline"));
    }

    #[tokio::test]
    async fn generator_answers_questions_from_templates_in_priority_order() {
        let generator = RuleBasedGenerator::new();
        let request = prompts::question_request(
            &Default::default(),
            &[
                showroom_core::preferences::MissingInfo::BrandOrModel,
                showroom_core::preferences::MissingInfo::Year,
            ],
        );

        let response = generator.generate(&request).await.expect("deterministic never fails");
        assert_eq!(response, prompts::question_template(
            showroom_core::preferences::MissingInfo::BrandOrModel
        ));
    }
}
