//! crates/life_engine_core/src/flows.rs
//!
//! Contracts for the two generative flows. Prompt rendering and response
//! parsing live here so adapters only move text to and from the model.

use serde::{Deserialize, Serialize};

use crate::ports::{PortError, PortResult};

/// Upper bound on insights and on recommendations returned to callers.
pub const MAX_INSIGHT_ITEMS: usize = 3;

//=========================================================================================
// Adaptive Progression
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionRequest {
    /// Human label of the domain, e.g. "Fitness".
    pub domain: String,
    pub performance_data: String,
    pub current_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionSuggestion {
    pub suggested_level: String,
    pub reasoning: String,
}

pub const PROGRESSION_SYSTEM_PROMPT: &str = "You are a personal coach who adapts training \
difficulty to how the user has actually been performing. Answer with a single JSON object \
and nothing else.";

pub fn render_progression_prompt(request: &ProgressionRequest) -> String {
    format!(
        "Review the user's recent performance and propose the next challenge level.\n\n\
         Domain: {}\n\
         Performance Data: {}\n\
         Current Level: {}\n\n\
         Keep the suggestion challenging but reachable. Respond as JSON in exactly this shape:\n\
         {{\"suggestedLevel\": \"<next level>\", \"reasoning\": \"<why this level fits>\"}}",
        request.domain, request.performance_data, request.current_level
    )
}

pub fn parse_progression(raw: &str) -> PortResult<ProgressionSuggestion> {
    let suggestion: ProgressionSuggestion = serde_json::from_str(extract_json_object(raw)?)
        .map_err(|e| PortError::MalformedResponse(e.to_string()))?;
    if suggestion.suggested_level.trim().is_empty() || suggestion.reasoning.trim().is_empty() {
        return Err(PortError::MalformedResponse(
            "Progression response is missing a suggested level or reasoning".to_string(),
        ));
    }
    Ok(ProgressionSuggestion {
        suggested_level: suggestion.suggested_level.trim().to_string(),
        reasoning: suggestion.reasoning.trim().to_string(),
    })
}

//=========================================================================================
// Cross-Domain Insights
//=========================================================================================

/// Averaged 0–10 scores, one per tracked domain.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightScores {
    pub sleep_quality: f64,
    pub deep_work_performance: f64,
    pub nutrition_score: f64,
    pub exercise_consistency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossDomainInsights {
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
}

pub const INSIGHTS_SYSTEM_PROMPT: &str = "You are a life coach who looks for links between \
sleep, focused work, nutrition and exercise. Answer with a single JSON object and nothing else.";

pub fn render_insights_prompt(scores: &InsightScores) -> String {
    format!(
        "Here are the user's average scores out of 10:\n\n\
         Sleep Quality: {}/10\n\
         Deep Work Performance: {}/10\n\
         Nutrition Score: {}/10\n\
         Exercise Consistency: {}/10\n\n\
         Point out how these areas influence each other and suggest concrete changes. \
         Give at most {max} insights and at most {max} recommendations. \
         Respond as JSON in exactly this shape:\n\
         {{\"insights\": [\"...\"], \"recommendations\": [\"...\"]}}",
        scores.sleep_quality,
        scores.deep_work_performance,
        scores.nutrition_score,
        scores.exercise_consistency,
        max = MAX_INSIGHT_ITEMS
    )
}

pub fn parse_insights(raw: &str) -> PortResult<CrossDomainInsights> {
    let parsed: CrossDomainInsights = serde_json::from_str(extract_json_object(raw)?)
        .map_err(|e| PortError::MalformedResponse(e.to_string()))?;
    let insights = clean_items(parsed.insights);
    let recommendations = clean_items(parsed.recommendations);
    if insights.is_empty() || recommendations.is_empty() {
        return Err(PortError::MalformedResponse(
            "Insights response has no insights or no recommendations".to_string(),
        ));
    }
    Ok(CrossDomainInsights {
        insights,
        recommendations,
    })
}

fn clean_items(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .take(MAX_INSIGHT_ITEMS)
        .collect()
}

/// Models sometimes wrap the object in prose or a code fence.
pub fn extract_json_object(raw: &str) -> PortResult<&str> {
    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&raw[start..=end]),
        _ => Err(PortError::MalformedResponse(
            "Response does not contain a JSON object".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progression_prompt_carries_all_inputs() {
        let prompt = render_progression_prompt(&ProgressionRequest {
            domain: "Fitness".into(),
            performance_data: "Squat: 3x5 @ 100kg (RPE 8)".into(),
            current_level: "Strength Block on 2024-07-22".into(),
        });
        assert!(prompt.contains("Domain: Fitness"));
        assert!(prompt.contains("Performance Data: Squat: 3x5 @ 100kg (RPE 8)"));
        assert!(prompt.contains("Current Level: Strength Block on 2024-07-22"));
        assert!(prompt.contains("\"suggestedLevel\""));
    }

    #[test]
    fn parses_fenced_progression_response() {
        let raw = "```json\n{\"suggestedLevel\": \"4x5 @ 105kg\", \"reasoning\": \"RPE left room.\"}\n```";
        let suggestion = parse_progression(raw).unwrap();
        assert_eq!(suggestion.suggested_level, "4x5 @ 105kg");
        assert_eq!(suggestion.reasoning, "RPE left room.");
    }

    #[test]
    fn malformed_progression_is_an_error() {
        assert!(matches!(
            parse_progression("I think you should lift more."),
            Err(PortError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_progression("{\"suggestedLevel\": \"\", \"reasoning\": \"x\"}"),
            Err(PortError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_progression("{\"level\": \"x\"}"),
            Err(PortError::MalformedResponse(_))
        ));
    }

    #[test]
    fn insights_prompt_lists_scores_out_of_ten() {
        let prompt = render_insights_prompt(&InsightScores {
            sleep_quality: 7.0,
            deep_work_performance: 8.0,
            nutrition_score: 6.0,
            exercise_consistency: 9.0,
        });
        assert!(prompt.contains("Sleep Quality: 7/10"));
        assert!(prompt.contains("Exercise Consistency: 9/10"));
        assert!(prompt.contains("at most 3 insights"));
    }

    #[test]
    fn insights_are_capped_at_three() {
        let raw = r#"{"insights": ["a", "b", " ", "c", "d"], "recommendations": ["r1"]}"#;
        let parsed = parse_insights(raw).unwrap();
        assert_eq!(parsed.insights, vec!["a", "b", "c"]);
        assert_eq!(parsed.recommendations, vec!["r1"]);
    }

    #[test]
    fn empty_insights_are_malformed() {
        let raw = r#"{"insights": [], "recommendations": ["r1"]}"#;
        assert!(matches!(parse_insights(raw), Err(PortError::MalformedResponse(_))));
    }

    #[test]
    fn scores_use_camel_case_on_the_wire() {
        let scores: InsightScores = serde_json::from_str(
            r#"{"sleepQuality": 7, "deepWorkPerformance": 8, "nutritionScore": 6, "exerciseConsistency": 9}"#,
        )
        .unwrap();
        assert_eq!(scores.deep_work_performance, 8.0);
    }
}
