use crate::questionnaire::scorer::{compute_score, RiskScoreResult};
use crate::questionnaire::{
    AmountRole, AnswerSet, AnswerValue, Catalog, Question, QuestionId, QuestionnaireError,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Question(QuestionId),
    Completed(RiskScoreResult),
}

/// Sequential walk over a fixed catalog. Going back keeps every recorded answer.
#[derive(Debug, Clone)]
pub struct QuestionnaireFlow {
    catalog: Catalog,
    cursor: usize,
    answers: AnswerSet,
    result: Option<RiskScoreResult>,
}

impl QuestionnaireFlow {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            cursor: 0,
            answers: AnswerSet::new(),
            result: None,
        }
    }

    pub fn standard() -> Self {
        Self::new(Catalog::standard())
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&Question> {
        self.catalog.questions.get(self.cursor)
    }

    pub fn result(&self) -> Option<RiskScoreResult> {
        self.result
    }

    /// Records an answer for any question in the catalog.
    pub fn answer(&mut self, id: QuestionId, value: AnswerValue) -> Result<(), QuestionnaireError> {
        self.answers.answer(&self.catalog, id, value)
    }

    pub fn answer_current(&mut self, value: AnswerValue) -> Result<(), QuestionnaireError> {
        let id = self.current().ok_or(QuestionnaireError::Finished)?.id;
        self.answer(id, value)
    }

    pub fn can_advance(&self) -> bool {
        self.current()
            .map(|q| self.answers.can_advance(q.id))
            .unwrap_or(false)
    }

    /// Moves forward once the current question is answered. On the last question the
    /// score is computed instead.
    pub fn next(&mut self) -> Result<Step, QuestionnaireError> {
        let id = self.current().ok_or(QuestionnaireError::Finished)?.id;
        if !self.answers.can_advance(id) {
            return Err(QuestionnaireError::Unanswered(id));
        }

        if self.cursor + 1 < self.catalog.len() {
            self.cursor += 1;
            let next_id = self.catalog.questions[self.cursor].id;
            return Ok(Step::Question(next_id));
        }

        let result = self.score();
        self.result = Some(result);
        tracing::debug!(
            total_score = result.total_score,
            band = %result.band,
            "questionnaire completed"
        );
        Ok(Step::Completed(result))
    }

    /// No-op on the first question.
    pub fn back(&mut self) -> Option<QuestionId> {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
        self.current().map(|q| q.id)
    }

    pub fn score(&self) -> RiskScoreResult {
        let initial = self
            .answers
            .amount_for(&self.catalog, AmountRole::InitialInvestment);
        let monthly = self
            .answers
            .amount_for(&self.catalog, AmountRole::MonthlyInvestment);
        RiskScoreResult::from_score(compute_score(&self.answers, initial, monthly))
    }

    /// Walks the whole catalog with pre-collected numeric answers, as submitted by a
    /// form or command line. Every question must be answered.
    pub fn complete_with(
        mut self,
        raw: &BTreeMap<QuestionId, f64>,
    ) -> Result<RiskScoreResult, QuestionnaireError> {
        if let Some(&unknown) = raw.keys().find(|id| self.catalog.question(**id).is_none()) {
            return Err(QuestionnaireError::UnknownQuestion(unknown));
        }

        loop {
            let id = self.current().ok_or(QuestionnaireError::Finished)?.id;
            let value = raw
                .get(&id)
                .copied()
                .ok_or(QuestionnaireError::Unanswered(id))?;
            let value = self.catalog.interpret(id, value)?;
            self.answer(id, value)?;
            if let Step::Completed(result) = self.next()? {
                return Ok(result);
            }
        }
    }

    /// Bypasses the questionnaire. Whatever was answered so far is dropped.
    pub fn skip(self) -> RiskScoreResult {
        tracing::debug!(answered = self.answers.len(), "questionnaire skipped");
        RiskScoreResult::skipped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questionnaire::RiskBand;

    #[test]
    fn walks_forward_and_completes() {
        let mut flow = QuestionnaireFlow::standard();
        let script = [
            AnswerValue::Choice(6),
            AnswerValue::Choice(10),
            AnswerValue::Amount(10_000.0),
            AnswerValue::Amount(500.0),
            AnswerValue::Choice(6),
        ];

        let mut last = None;
        for value in script {
            flow.answer_current(value).unwrap();
            last = Some(flow.next().unwrap());
        }

        let Some(Step::Completed(result)) = last else {
            panic!("expected completion, got {last:?}");
        };
        assert_eq!(result.total_score, 29);
        assert_eq!(result.band, RiskBand::Balanced);
        assert_eq!(flow.result(), Some(result));
    }

    #[test]
    fn next_requires_an_answer() {
        let mut flow = QuestionnaireFlow::standard();
        assert!(!flow.can_advance());
        assert_eq!(flow.next(), Err(QuestionnaireError::Unanswered(1)));
        assert_eq!(flow.position(), 0);
    }

    #[test]
    fn back_keeps_answers() {
        let mut flow = QuestionnaireFlow::standard();
        flow.answer_current(AnswerValue::Choice(4)).unwrap();
        assert_eq!(flow.next(), Ok(Step::Question(2)));
        flow.answer_current(AnswerValue::Choice(15)).unwrap();

        assert_eq!(flow.back(), Some(1));
        assert_eq!(flow.answers().get(1), Some(AnswerValue::Choice(4)));
        assert_eq!(flow.answers().get(2), Some(AnswerValue::Choice(15)));
        assert!(flow.can_advance());

        // Already at the first question.
        assert_eq!(flow.back(), Some(1));
        assert_eq!(flow.position(), 0);
    }

    #[test]
    fn skip_ignores_partial_answers() {
        let mut flow = QuestionnaireFlow::standard();
        flow.answer_current(AnswerValue::Choice(12)).unwrap();
        flow.next().unwrap();
        flow.answer_current(AnswerValue::Choice(20)).unwrap();

        let result = flow.skip();
        assert_eq!(result.total_score, 30);
        assert_eq!(result.band, RiskBand::Balanced);
    }

    #[test]
    fn completes_from_raw_answers() {
        let raw = BTreeMap::from([(1, 6.0), (2, 10.0), (3, 10_000.0), (4, 500.0), (5, 6.0)]);
        let result = QuestionnaireFlow::standard().complete_with(&raw).unwrap();
        assert_eq!(result.total_score, 29);
        assert_eq!(result.band, RiskBand::Balanced);
    }

    #[test]
    fn raw_answers_must_cover_the_catalog() {
        let raw = BTreeMap::from([(1, 6.0), (2, 10.0), (3, 10_000.0)]);
        assert_eq!(
            QuestionnaireFlow::standard().complete_with(&raw),
            Err(QuestionnaireError::Unanswered(4))
        );

        let raw = BTreeMap::from([(1, 6.0), (9, 1.0)]);
        assert_eq!(
            QuestionnaireFlow::standard().complete_with(&raw),
            Err(QuestionnaireError::UnknownQuestion(9))
        );

        let raw = BTreeMap::from([(1, 7.0), (2, 10.0), (3, 1.0), (4, 1.0), (5, 6.0)]);
        assert_eq!(
            QuestionnaireFlow::standard().complete_with(&raw),
            Err(QuestionnaireError::UnknownOption {
                question: 1,
                points: 7
            })
        );
    }

    #[test]
    fn zero_principal_contributes_no_cadence() {
        let mut flow = QuestionnaireFlow::standard();
        flow.answer(1, AnswerValue::Choice(2)).unwrap();
        flow.answer(2, AnswerValue::Choice(2)).unwrap();
        flow.answer(3, AnswerValue::Amount(0.0)).unwrap();
        flow.answer(4, AnswerValue::Amount(1_000.0)).unwrap();
        flow.answer(5, AnswerValue::Choice(0)).unwrap();
        assert_eq!(flow.score().total_score, 4);
    }
}
