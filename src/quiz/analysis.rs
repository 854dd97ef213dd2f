use std::sync::Arc;

use serde_json::{json, Value};

use crate::quiz::generator::{AnalysisError, GenerationRequest, TextGenerator};
use crate::quiz::{AnalysisResult, Answer};

/// Highest score a single question can award.
pub const MAX_SCORE_PER_QUESTION: u64 = 20;

pub const DEFAULT_ANALYSIS: &str = "Something went wrong while analyzing your answers. \
Still, being interested in these qualities is already a wonderful first step toward becoming a better person.";

pub struct HeroAnalyst {
    generator: Arc<dyn TextGenerator>,
}

impl HeroAnalyst {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Produces the analysis for a finished quiz. Never fails: any problem with
    /// the service resolves to [`DEFAULT_ANALYSIS`] and the locally computed
    /// percentage.
    pub async fn analyze(&self, name: &str, answers: &[Answer]) -> AnalysisResult {
        let fallback = fallback_percentage(answers);
        let request = GenerationRequest {
            prompt: build_prompt(name, answers),
            response_schema: response_schema(),
        };

        let reply = match self.generator.generate(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                log::error!("Error calling the analysis service: {}", e);
                return default_result(fallback);
            }
        };

        match parse_reply(&reply, fallback) {
            Ok(result) => result,
            Err(e) => {
                log::warn!("Unusable analysis reply ({}): {:?}", e, reply);
                default_result(fallback)
            }
        }
    }
}

fn default_result(fallback: u32) -> AnalysisResult {
    AnalysisResult {
        analysis: DEFAULT_ANALYSIS.to_string(),
        percentage: fallback,
    }
}

/// `round(100 * total / (20 * count))`, rounding halves up. An empty slice gives 0.
pub fn fallback_percentage(answers: &[Answer]) -> u32 {
    if answers.is_empty() {
        return 0;
    }
    let total: u64 = answers.iter().map(|a| u64::from(a.score)).sum();
    let max = MAX_SCORE_PER_QUESTION * answers.len() as u64;
    let rounded = (200 * total + max) / (2 * max);
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

pub fn build_prompt(name: &str, answers: &[Answer]) -> String {
    let score_details = answers
        .iter()
        .map(|a| format!("- {}: {} points", a.r#trait, a.score))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are an expert in character analysis. Analyze the personality of a person named '{}' \
based on the scores they received for each of these {} virtues:
{}

The maximum score for each virtue is {} points.

Write a short analysis (no more than 3-4 sentences) that is positive, encouraging and constructive, \
about their potential for leadership and for being a hero or heroine, based on these scores. \
Then summarize it as a single hero percentage.

Reply only with JSON following this schema, without markdown backticks:",
        name,
        answers.len(),
        score_details,
        MAX_SCORE_PER_QUESTION
    )
}

pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "analysis": {
                "type": "STRING",
                "description": "A short character analysis in English",
            },
            "percentage": {
                "type": "INTEGER",
                "description": "Hero percentage, derived from the total score",
            },
        },
        "required": ["analysis", "percentage"],
    })
}

/// Parses the service reply, which must be a JSON object with named fields.
/// A missing, non-integer or out-of-range percentage is replaced by `fallback`;
/// a missing analysis text is an error.
pub fn parse_reply(reply: &str, fallback: u32) -> Result<AnalysisResult, AnalysisError> {
    let json: Value = serde_json::from_str(reply.trim())?;
    let fields = json.as_object().ok_or(AnalysisError::NotAnObject)?;

    let analysis = fields
        .get("analysis")
        .and_then(|a| a.as_str())
        .ok_or(AnalysisError::MissingAnalysis)?
        .to_string();

    let percentage = match fields.get("percentage") {
        None | Some(Value::Null) => fallback,
        Some(value) => match whole_number(value) {
            Some(p) if (0..=100).contains(&p) => p as u32,
            _ => {
                log::warn!("Ignoring percentage {} from the analysis service", value);
                fallback
            }
        },
    };

    Ok(AnalysisResult {
        analysis,
        percentage,
    })
}

// Accepts 87 and 87.0, rejects 87.5 and "87".
fn whole_number(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    value
        .as_f64()
        .filter(|f| f.fract() == 0.0 && f.abs() <= i64::MAX as f64)
        .map(|f| f as i64)
}
