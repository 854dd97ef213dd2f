//! Quiz session state machine.
//!
//! A session moves `Welcome -> Playing -> Loading -> Results` and back to
//! `Welcome` on restart. Each variant carries exactly the data that phase owns,
//! so a result can only exist in `Results` and answers only while playing or
//! waiting for the analysis.

use std::fmt;

use thiserror::Error;

use crate::quiz::analysis::HeroAnalyst;
use crate::quiz::{AnalysisResult, Answer, Question};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Session {
    Welcome {
        name: String,
    },
    Playing {
        name: String,
        index: usize,
        answers: Vec<Answer>,
    },
    Loading {
        name: String,
        answers: Vec<Answer>,
    },
    Results {
        name: String,
        result: AnalysisResult,
    },
}

impl Default for Session {
    fn default() -> Self {
        Session::Welcome {
            name: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Welcome,
    Playing,
    Loading,
    Results,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Welcome => "welcome",
            Phase::Playing => "playing",
            Phase::Loading => "loading",
            Phase::Results => "results",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("cannot {action} during the {phase} phase")]
    InvalidAction { phase: Phase, action: &'static str },

    #[error("question {question} has no option {option}")]
    UnknownOption { question: usize, option: usize },
}

/// Everything the analyst needs once the last question is answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAnalysis {
    pub name: String,
    pub answers: Vec<Answer>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Moved on to the next question.
    Next,
    /// That was the last question; the session is now `Loading`.
    Analyze(PendingAnalysis),
}

/// What the current phase shows to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Screen<'a> {
    Welcome {
        name: &'a str,
        can_start: bool,
    },
    Playing {
        question: Option<&'a Question>,
        number: usize,
        total: usize,
        progress: f64,
    },
    Loading,
    Results {
        name: &'a str,
        percentage: u32,
        analysis: &'a str,
    },
}

impl Session {
    pub fn phase(&self) -> Phase {
        match self {
            Session::Welcome { .. } => Phase::Welcome,
            Session::Playing { .. } => Phase::Playing,
            Session::Loading { .. } => Phase::Loading,
            Session::Results { .. } => Phase::Results,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Session::Welcome { name }
            | Session::Playing { name, .. }
            | Session::Loading { name, .. }
            | Session::Results { name, .. } => name,
        }
    }

    pub fn answers(&self) -> &[Answer] {
        match self {
            Session::Playing { answers, .. } | Session::Loading { answers, .. } => answers,
            _ => &[],
        }
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            Session::Results { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn set_name(&mut self, new_name: &str) -> Result<(), SessionError> {
        let phase = self.phase();
        match self {
            Session::Welcome { name } => {
                *name = new_name.to_string();
                Ok(())
            }
            _ => Err(SessionError::InvalidAction {
                phase,
                action: "change the name",
            }),
        }
    }

    /// Begins the quiz. Returns `false` and changes nothing unless the session
    /// is in `Welcome` with a name that is non-empty after trimming. The name is
    /// stored as typed.
    pub fn start(&mut self) -> bool {
        let Session::Welcome { name } = self else {
            return false;
        };
        if name.trim().is_empty() {
            return false;
        }

        let name = std::mem::take(name);
        log::debug!("Starting quiz for {:?}", name);
        *self = Session::Playing {
            name,
            index: 0,
            answers: Vec::new(),
        };
        true
    }

    /// Records the chosen option of the current question.
    ///
    /// On the last question the session switches to `Loading` before this
    /// returns, and the caller receives what it needs to run the analysis.
    pub fn select_option(
        &mut self,
        bank: &[Question],
        option_index: usize,
    ) -> Result<Advance, SessionError> {
        let phase = self.phase();
        let Session::Playing {
            name,
            index,
            answers,
        } = self
        else {
            return Err(SessionError::InvalidAction {
                phase,
                action: "select an option",
            });
        };

        let unknown = SessionError::UnknownOption {
            question: *index,
            option: option_index,
        };
        let question = bank.get(*index).ok_or(unknown.clone())?;
        let option = question.options.get(option_index).ok_or(unknown)?;

        answers.push(Answer::new(&question.r#trait, option.score));

        if *index + 1 < bank.len() {
            *index += 1;
            return Ok(Advance::Next);
        }

        let pending = PendingAnalysis {
            name: std::mem::take(name),
            answers: std::mem::take(answers),
        };
        *self = Session::Loading {
            name: pending.name.clone(),
            answers: pending.answers.clone(),
        };
        Ok(Advance::Analyze(pending))
    }

    /// Stores the analysis and moves from `Loading` to `Results`.
    pub fn complete(&mut self, result: AnalysisResult) -> Result<(), SessionError> {
        let phase = self.phase();
        let Session::Loading { name, .. } = self else {
            return Err(SessionError::InvalidAction {
                phase,
                action: "store an analysis",
            });
        };

        let name = std::mem::take(name);
        *self = Session::Results { name, result };
        Ok(())
    }

    /// Selects an option and, if it was the last one, awaits the analysis and
    /// finishes the session.
    ///
    /// The analysis call cannot be cancelled: dropping the returned future
    /// mid-analysis leaves the session in `Loading` until `restart`.
    pub async fn answer(
        &mut self,
        bank: &[Question],
        analyst: &HeroAnalyst,
        option_index: usize,
    ) -> Result<(), SessionError> {
        if let Advance::Analyze(pending) = self.select_option(bank, option_index)? {
            let result = analyst.analyze(&pending.name, &pending.answers).await;
            self.complete(result)?;
        }
        Ok(())
    }

    /// Back to an empty `Welcome`, from any phase.
    pub fn restart(&mut self) {
        *self = Session::default();
    }

    /// Fraction of questions answered so far; 0 outside `Playing`.
    pub fn progress(&self, total: usize) -> f64 {
        match self {
            Session::Playing { index, .. } if total > 0 => *index as f64 / total as f64,
            _ => 0.0,
        }
    }

    pub fn screen<'a>(&'a self, bank: &'a [Question]) -> Screen<'a> {
        match self {
            Session::Welcome { name } => Screen::Welcome {
                name,
                can_start: !name.trim().is_empty(),
            },
            Session::Playing { index, .. } => Screen::Playing {
                question: bank.get(*index),
                number: index + 1,
                total: bank.len(),
                progress: self.progress(bank.len()),
            },
            Session::Loading { .. } => Screen::Loading,
            Session::Results { name, result } => Screen::Results {
                name,
                percentage: result.percentage,
                analysis: &result.analysis,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::analysis::tests::FakeGenerator;
    use crate::quiz::analysis::DEFAULT_ANALYSIS;
    use crate::quiz::AnswerOption;
    use std::sync::Arc;

    fn bank() -> Vec<Question> {
        ["Courage", "Honesty", "Compassion", "Responsibility", "Perseverance"]
            .iter()
            .map(|t| {
                Question::new(
                    t,
                    &format!("How much {}?", t),
                    vec![
                        AnswerOption::new("All of it", 20),
                        AnswerOption::new("Half", 10),
                        AnswerOption::new("None", 0),
                    ],
                )
            })
            .collect()
    }

    fn playing(name: &str) -> Session {
        let mut session = Session::default();
        session.set_name(name).unwrap();
        assert!(session.start());
        session
    }

    #[test]
    fn blank_names_do_not_start() {
        for name in ["", "   ", "\t\n"] {
            let mut session = Session::default();
            session.set_name(name).unwrap();
            assert!(!session.start());
            assert_eq!(session.phase(), Phase::Welcome);
            assert_eq!(session.name(), name);
        }
    }

    #[test]
    fn start_keeps_the_untrimmed_name() {
        let session = playing("  Ann  ");
        assert_eq!(
            session,
            Session::Playing {
                name: "  Ann  ".to_string(),
                index: 0,
                answers: vec![],
            }
        );
    }

    #[test]
    fn start_outside_welcome_is_a_no_op() {
        let mut session = playing("Ann");
        let before = session.clone();
        assert!(!session.start());
        assert_eq!(session, before);
    }

    #[test]
    fn each_selection_appends_one_answer() {
        let bank = bank();
        let mut session = playing("Ann");

        for i in 0..bank.len() - 1 {
            assert_eq!(session.answers().len(), i);
            assert_eq!(session.select_option(&bank, 1), Ok(Advance::Next));
            assert_eq!(session.phase(), Phase::Playing);
            assert_eq!(session.answers().len(), i + 1);
            assert_eq!(session.answers()[i], Answer::new(&bank[i].r#trait, 10));
            if let Session::Playing { index, .. } = &session {
                assert_eq!(*index, i + 1);
            }
        }
    }

    #[test]
    fn last_selection_enters_loading_before_analysis() {
        let bank = bank();
        let mut session = playing("Ann");
        for _ in 0..bank.len() - 1 {
            session.select_option(&bank, 0).unwrap();
        }

        let advance = session.select_option(&bank, 2).unwrap();
        let expected_answers = vec![
            Answer::new("Courage", 20),
            Answer::new("Honesty", 20),
            Answer::new("Compassion", 20),
            Answer::new("Responsibility", 20),
            Answer::new("Perseverance", 0),
        ];
        assert_eq!(
            advance,
            Advance::Analyze(PendingAnalysis {
                name: "Ann".to_string(),
                answers: expected_answers.clone(),
            })
        );
        assert_eq!(session.phase(), Phase::Loading);
        assert_eq!(session.answers(), expected_answers.as_slice());
        assert_eq!(session.result(), None);
        assert_eq!(session.screen(&bank), Screen::Loading);

        let result = AnalysisResult {
            analysis: "Brave.".to_string(),
            percentage: 80,
        };
        session.complete(result.clone()).unwrap();
        assert_eq!(session.phase(), Phase::Results);
        assert_eq!(session.result(), Some(&result));
    }

    #[test]
    fn unknown_option_changes_nothing() {
        let bank = bank();
        let mut session = playing("Ann");
        let before = session.clone();
        assert_eq!(
            session.select_option(&bank, 7),
            Err(SessionError::UnknownOption {
                question: 0,
                option: 7
            })
        );
        assert_eq!(session, before);
    }

    #[test]
    fn actions_outside_their_phase_are_rejected() {
        let bank = bank();
        let mut session = Session::default();
        assert_eq!(
            session.select_option(&bank, 0),
            Err(SessionError::InvalidAction {
                phase: Phase::Welcome,
                action: "select an option"
            })
        );
        assert!(session.complete(AnalysisResult::default()).is_err());

        let mut session = playing("Ann");
        assert!(session.set_name("Bob").is_err());
        assert!(session.complete(AnalysisResult::default()).is_err());
        assert_eq!(session.name(), "Ann");
    }

    #[test]
    fn restart_resets_every_phase() {
        let bank = bank();

        let welcome = {
            let mut s = Session::default();
            s.set_name("Ann").unwrap();
            s
        };
        let mid_quiz = {
            let mut s = playing("Ann");
            s.select_option(&bank, 0).unwrap();
            s
        };
        let loading = Session::Loading {
            name: "Ann".to_string(),
            answers: vec![Answer::new("Courage", 20)],
        };
        let results = Session::Results {
            name: "Ann".to_string(),
            result: AnalysisResult {
                analysis: "Brave.".to_string(),
                percentage: 90,
            },
        };

        for mut session in [welcome, mid_quiz, loading, results] {
            session.restart();
            assert_eq!(session, Session::default());
            assert_eq!(session.name(), "");
            assert!(session.answers().is_empty());
            assert_eq!(session.result(), None);
            assert_eq!(session.phase(), Phase::Welcome);
        }
    }

    #[test]
    fn screens_expose_phase_data() {
        let bank = bank();
        let mut session = Session::default();
        assert_eq!(
            session.screen(&bank),
            Screen::Welcome {
                name: "",
                can_start: false
            }
        );

        session.set_name(" Ann ").unwrap();
        assert_eq!(
            session.screen(&bank),
            Screen::Welcome {
                name: " Ann ",
                can_start: true
            }
        );

        session.start();
        session.select_option(&bank, 0).unwrap();
        session.select_option(&bank, 0).unwrap();
        assert_eq!(
            session.screen(&bank),
            Screen::Playing {
                question: Some(&bank[2]),
                number: 3,
                total: 5,
                progress: 0.4,
            }
        );
    }

    #[tokio::test]
    async fn full_quiz_reaches_results() {
        let bank = bank();
        let generator = Arc::new(FakeGenerator::replying(
            "{\"analysis\": \"Ann is a born leader.\", \"percentage\": 95}",
        ));
        let analyst = HeroAnalyst::new(generator.clone());

        let mut session = playing("  Ann  ");
        for _ in 0..bank.len() {
            session.answer(&bank, &analyst, 0).await.unwrap();
        }

        assert_eq!(
            session.screen(&bank),
            Screen::Results {
                name: "  Ann  ",
                percentage: 95,
                analysis: "Ann is a born leader.",
            }
        );
        assert_eq!(generator.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_analysis_still_reaches_results() {
        let bank = bank();
        let analyst = HeroAnalyst::new(Arc::new(FakeGenerator::failing("timeout")));

        let mut session = playing("Ann");
        for _ in 0..bank.len() {
            session.answer(&bank, &analyst, 1).await.unwrap();
        }

        assert_eq!(
            session,
            Session::Results {
                name: "Ann".to_string(),
                result: AnalysisResult {
                    analysis: DEFAULT_ANALYSIS.to_string(),
                    percentage: 50,
                },
            }
        );
    }
}
