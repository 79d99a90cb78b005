pub mod flow;
pub mod scorer;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub use flow::{QuestionnaireFlow, Step};
pub use scorer::{classify, compute_score, RiskBand, RiskScoreResult, SKIP_SCORE};

pub type QuestionId = u32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub prompt: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionKind {
    Choice { options: Vec<ChoiceOption> },
    Numeric { placeholder: String, role: AmountRole },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub points: u32,
    pub label: String,
}

/// Which cadence input a numeric question feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountRole {
    InitialInvestment,
    MonthlyInvestment,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    Choice(u32),
    Amount(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuestionnaireError {
    UnknownQuestion(QuestionId),
    UnknownOption { question: QuestionId, points: u32 },
    KindMismatch { question: QuestionId },
    InvalidAmount { question: QuestionId, amount: f64 },
    Unanswered(QuestionId),
    Finished,
}

impl fmt::Display for QuestionnaireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownQuestion(id) => write!(f, "unknown question id {id}"),
            Self::UnknownOption { question, points } => {
                write!(f, "question {question} has no option worth {points} points")
            }
            Self::KindMismatch { question } => {
                write!(f, "answer type does not match question {question}")
            }
            Self::InvalidAmount { question, amount } => write!(
                f,
                "question {question} needs a non-negative amount (got {amount})"
            ),
            Self::Unanswered(id) => write!(f, "question {id} has not been answered"),
            Self::Finished => f.write_str("questionnaire already finished"),
        }
    }
}

impl std::error::Error for QuestionnaireError {}

/// Fixed, ordered list of questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub questions: Vec<Question>,
}

impl Catalog {
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Reads a bare number as the answer type the question expects.
    pub fn interpret(&self, id: QuestionId, raw: f64) -> Result<AnswerValue, QuestionnaireError> {
        let q = self
            .question(id)
            .ok_or(QuestionnaireError::UnknownQuestion(id))?;
        match q.kind {
            QuestionKind::Numeric { .. } => Ok(AnswerValue::Amount(raw)),
            QuestionKind::Choice { .. } => {
                if raw.fract() != 0.0 || !(0.0..=u32::MAX as f64).contains(&raw) {
                    return Err(QuestionnaireError::KindMismatch { question: id });
                }
                Ok(AnswerValue::Choice(raw as u32))
            }
        }
    }

    fn amount_question(&self, role: AmountRole) -> Option<QuestionId> {
        self.questions.iter().find_map(|q| match &q.kind {
            QuestionKind::Numeric { role: r, .. } if *r == role => Some(q.id),
            _ => None,
        })
    }

    /// The product questionnaire: goal, horizon, initial amount, monthly amount,
    /// reaction to a drawdown.
    pub fn standard() -> Self {
        fn choice(id: QuestionId, prompt: &str, options: &[(u32, &str)]) -> Question {
            Question {
                id,
                prompt: prompt.to_string(),
                kind: QuestionKind::Choice {
                    options: options
                        .iter()
                        .map(|(points, label)| ChoiceOption {
                            points: *points,
                            label: label.to_string(),
                        })
                        .collect(),
                },
            }
        }

        fn numeric(id: QuestionId, prompt: &str, role: AmountRole) -> Question {
            Question {
                id,
                prompt: prompt.to_string(),
                kind: QuestionKind::Numeric {
                    placeholder: "Enter amount in dollars".to_string(),
                    role,
                },
            }
        }

        Self {
            questions: vec![
                choice(
                    1,
                    "What is your main investment goal?",
                    &[
                        (2, "Buy a home"),
                        (4, "Save for a child's education"),
                        (6, "Build emergency fund"),
                        (8, "Generate passive income"),
                        (10, "Save for retirement"),
                        (12, "Build long-term wealth"),
                    ],
                ),
                choice(
                    2,
                    "When do you plan to use this money?",
                    &[
                        (2, "Less than 1 year"),
                        (5, "1-3 years"),
                        (10, "3-5 years"),
                        (15, "5-10 years"),
                        (20, "More than 10 years"),
                    ],
                ),
                numeric(
                    3,
                    "What is your initial investment amount?",
                    AmountRole::InitialInvestment,
                ),
                numeric(
                    4,
                    "How much will you invest monthly?",
                    AmountRole::MonthlyInvestment,
                ),
                choice(
                    5,
                    "If your investments dropped 10% in value, what would you do?",
                    &[
                        (0, "Panic and sell everything"),
                        (3, "Feel nervous but hold on"),
                        (6, "Stay calm and wait"),
                        (9, "See it as a normal market fluctuation"),
                        (18, "Buy more at the lower price"),
                    ],
                ),
            ],
        }
    }
}

/// Recorded answers keyed by question id. Re-answering overwrites.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerSet {
    answers: BTreeMap<QuestionId, AnswerValue>,
}

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(
        &mut self,
        catalog: &Catalog,
        question: QuestionId,
        value: AnswerValue,
    ) -> Result<(), QuestionnaireError> {
        let q = catalog
            .question(question)
            .ok_or(QuestionnaireError::UnknownQuestion(question))?;

        match (&q.kind, value) {
            (QuestionKind::Choice { options }, AnswerValue::Choice(points)) => {
                if !options.iter().any(|o| o.points == points) {
                    return Err(QuestionnaireError::UnknownOption { question, points });
                }
            }
            (QuestionKind::Numeric { .. }, AnswerValue::Amount(amount)) => {
                if !amount.is_finite() || amount < 0.0 {
                    return Err(QuestionnaireError::InvalidAmount { question, amount });
                }
            }
            _ => return Err(QuestionnaireError::KindMismatch { question }),
        }

        self.answers.insert(question, value);
        Ok(())
    }

    pub fn get(&self, question: QuestionId) -> Option<AnswerValue> {
        self.answers.get(&question).copied()
    }

    /// A recorded choice worth 0 points still counts as answered.
    pub fn can_advance(&self, question: QuestionId) -> bool {
        self.answers.contains_key(&question)
    }

    pub fn choice_points(&self) -> impl Iterator<Item = u32> + '_ {
        self.answers.values().filter_map(|v| match v {
            AnswerValue::Choice(points) => Some(*points),
            AnswerValue::Amount(_) => None,
        })
    }

    pub fn amount_for(&self, catalog: &Catalog, role: AmountRole) -> Option<f64> {
        let id = catalog.amount_question(role)?;
        match self.get(id)? {
            AnswerValue::Amount(amount) => Some(amount),
            AnswerValue::Choice(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_has_five_ordered_questions() {
        let catalog = Catalog::standard();
        let ids: Vec<_> = catalog.questions.iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn reanswer_overwrites() {
        let catalog = Catalog::standard();
        let mut answers = AnswerSet::new();
        answers.answer(&catalog, 1, AnswerValue::Choice(6)).unwrap();
        answers.answer(&catalog, 1, AnswerValue::Choice(12)).unwrap();
        assert_eq!(answers.get(1), Some(AnswerValue::Choice(12)));
        assert_eq!(answers.len(), 1);
    }

    #[test]
    fn zero_point_choice_counts_as_answered() {
        let catalog = Catalog::standard();
        let mut answers = AnswerSet::new();
        assert!(!answers.can_advance(5));
        answers.answer(&catalog, 5, AnswerValue::Choice(0)).unwrap();
        assert!(answers.can_advance(5));
    }

    #[test]
    fn rejects_invalid_answers() {
        let catalog = Catalog::standard();
        let mut answers = AnswerSet::new();

        assert_eq!(
            answers.answer(&catalog, 9, AnswerValue::Choice(2)),
            Err(QuestionnaireError::UnknownQuestion(9))
        );
        assert_eq!(
            answers.answer(&catalog, 1, AnswerValue::Choice(7)),
            Err(QuestionnaireError::UnknownOption {
                question: 1,
                points: 7
            })
        );
        assert_eq!(
            answers.answer(&catalog, 3, AnswerValue::Choice(2)),
            Err(QuestionnaireError::KindMismatch { question: 3 })
        );
        assert!(answers
            .answer(&catalog, 3, AnswerValue::Amount(-1.0))
            .is_err());
        assert!(answers
            .answer(&catalog, 4, AnswerValue::Amount(f64::NAN))
            .is_err());
        assert!(answers.is_empty());
    }

    #[test]
    fn amounts_are_resolved_by_role() {
        let catalog = Catalog::standard();
        let mut answers = AnswerSet::new();
        answers
            .answer(&catalog, 3, AnswerValue::Amount(10_000.0))
            .unwrap();
        assert_eq!(
            answers.amount_for(&catalog, AmountRole::InitialInvestment),
            Some(10_000.0)
        );
        assert_eq!(
            answers.amount_for(&catalog, AmountRole::MonthlyInvestment),
            None
        );
        assert_eq!(answers.choice_points().count(), 0);
    }

    #[test]
    fn interprets_bare_numbers_by_question_kind() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.interpret(1, 6.0), Ok(AnswerValue::Choice(6)));
        assert_eq!(catalog.interpret(3, 2500.5), Ok(AnswerValue::Amount(2500.5)));
        assert_eq!(
            catalog.interpret(2, 2.5),
            Err(QuestionnaireError::KindMismatch { question: 2 })
        );
        assert_eq!(
            catalog.interpret(42, 1.0),
            Err(QuestionnaireError::UnknownQuestion(42))
        );
    }
}
