//! Prompt construction for every generation task.
//!
//! Prompts are data, not behavior: the deterministic generator and the
//! tests both rely on the exact structure produced here (notably the
//! `User input:` and `Missing information:` lines).

use showroom_core::catalog::CarRecord;
use showroom_core::preferences::{MissingInfo, PreferenceMap};

use crate::generation::{GenerationRequest, TaskKind};

pub const EXTRACT_PREFERENCES_SYSTEM: &str = "\
You extract car-shopping preferences from natural conversation.

Extract these fields from the user input:
- brand: car brand (e.g. Audi, BMW, Toyota)
- model: specific car name (e.g. A4, Corolla)
- price_band: one of budget, mid, luxury
- year: a specific year as an INTEGER (e.g. 2016), or \"recent\" or \"old\"
- fuel_type: one of gasoline, ethanol, flex, diesel, electric, hybrid
- transmission: one of manual, automatic, cvt, semi_automatic, dual_clutch
- color: preferred color
- doors: number of doors (2, 4, 5)
- mileage_limit: maximum accepted mileage in kilometers
- usage: intended usage (city, highway, work, leisure)

When the user is refining an earlier search (prior results are quoted),
keep unchanged preferences and add or replace only what they mention.

Reply with ONLY a valid JSON object. Use null for anything not
mentioned.";

pub const GENERATE_QUESTION_SYSTEM: &str = "\
You are an experienced car-sales assistant. Ask one natural, friendly
question to clarify the customer's preferences. Focus on a single piece
of information; do not interrogate.";

/// Prior results are summarized into the extraction prompt so a
/// refinement turn narrows instead of restarting. At most this many
/// cars are quoted.
const REFINEMENT_CONTEXT_LIMIT: usize = 5;

pub fn extract_request(user_input: &str, previous_results: &[CarRecord]) -> GenerationRequest {
    let prompt = if previous_results.is_empty() {
        format!("User input: {user_input}\n\nExtract the preferences:")
    } else {
        format!(
            "Context from the previous search:\n{}\n\nNew user input: {user_input}\n\n\
             Extract the preferences, treating this as a refinement of the previous search:",
            refinement_context(previous_results)
        )
    };

    GenerationRequest {
        task: TaskKind::ExtractPreferences,
        system_prompt: EXTRACT_PREFERENCES_SYSTEM.to_string(),
        prompt,
    }
}

pub fn question_request(
    preferences: &PreferenceMap,
    missing: &[MissingInfo],
) -> GenerationRequest {
    let known = serde_json::to_string(preferences).unwrap_or_else(|_| "{}".to_string());
    let missing_names =
        missing.iter().map(|info| missing_token(*info)).collect::<Vec<_>>().join(", ");

    GenerationRequest {
        task: TaskKind::GenerateQuestion,
        system_prompt: GENERATE_QUESTION_SYSTEM.to_string(),
        prompt: format!(
            "Current preferences: {known}\nMissing information: {missing_names}\n\n\
             Ask one question:"
        ),
    }
}

pub fn refinement_context(previous_results: &[CarRecord]) -> String {
    let mut lines = vec!["Results of the previous search:".to_string()];
    for (index, car) in previous_results.iter().take(REFINEMENT_CONTEXT_LIMIT).enumerate() {
        lines.push(format!(
            "{}. {} {} ({}) - {:.2} - color {} - {} - {} - {} km",
            index + 1,
            car.car_name.brand.name,
            car.car_name.name,
            car.year_manufacture,
            car.price,
            car.color.name,
            car.fuel_type.as_str(),
            car.transmission.as_str(),
            car.mileage,
        ));
    }
    lines.join("\n")
}

pub fn missing_token(info: MissingInfo) -> &'static str {
    match info {
        MissingInfo::BrandOrModel => "brand",
        MissingInfo::PriceBand => "price_band",
        MissingInfo::Year => "year",
    }
}

/// Fixed fallback questions, used when the generation backend cannot
/// produce one.
pub fn question_template(info: MissingInfo) -> &'static str {
    match info {
        MissingInfo::BrandOrModel => {
            "Which car brand do you prefer? (e.g. Audi, BMW, Toyota, Honda...)"
        }
        MissingInfo::PriceBand => "What price range suits you? (budget, mid, luxury)",
        MissingInfo::Year => "Do you prefer newer or older cars?",
    }
}

pub const READY_ACKNOWLEDGEMENT: &str =
    "Great, I have enough to search for cars that fit you.";

#[cfg(test)]
mod tests {
    use showroom_core::preferences::{MissingInfo, PreferenceMap};

    use super::{extract_request, question_request};
    use crate::generation::TaskKind;

    #[test]
    fn extract_request_without_context_carries_the_user_input() {
        let request = extract_request("a cheap Fiat", &[]);
        assert_eq!(request.task, TaskKind::ExtractPreferences);
        assert!(request.prompt.contains("User input: a cheap Fiat"));
        assert!(!request.prompt.contains("previous search"));
    }

    #[test]
    fn question_request_names_the_missing_fields() {
        let request = question_request(
            &PreferenceMap::default(),
            &[MissingInfo::BrandOrModel, MissingInfo::Year],
        );
        assert!(request.prompt.contains("Missing information: brand, year"));
    }
}
