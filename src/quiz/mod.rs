pub mod analysis;
pub mod generator;
pub mod questions;
pub mod session;

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Question {
    pub r#trait: String,
    pub text: String,
    pub options: Vec<AnswerOption>,
}
impl Question {
    pub fn new(r#trait: &str, text: &str, options: Vec<AnswerOption>) -> Self {
        Self {
            r#trait: r#trait.to_string(),
            text: text.to_string(),
            options,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AnswerOption {
    pub text: String,
    pub score: u32,
}
impl AnswerOption {
    pub fn new(text: &str, score: u32) -> Self {
        Self {
            text: text.to_string(),
            score,
        }
    }
}

/// One scored answer, recorded when the user picks an option.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Answer {
    pub r#trait: String,
    pub score: u32,
}
impl Answer {
    pub fn new(r#trait: &str, score: u32) -> Self {
        Self {
            r#trait: r#trait.to_string(),
            score,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AnalysisResult {
    pub analysis: String,
    pub percentage: u32,
}
