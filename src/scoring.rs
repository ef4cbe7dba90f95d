use crate::content::{Question, QuestionKind, MATCHED_SENTINEL};
use crate::level::Level;
use std::collections::HashMap;

/// Result of scoring one submitted quiz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreSummary {
    pub correct: usize,
    pub total: usize,
    pub percent: u32,
}

impl ScoreSummary {
    pub fn is_perfect(&self) -> bool {
        self.total > 0 && self.percent == 100
    }

    /// Progression on a perfect score only; anything below 100% stays put.
    pub fn advancement(&self, level: Level) -> Option<Level> {
        if self.is_perfect() {
            Some(level.advanced())
        } else {
            None
        }
    }
}

/// Pure function of the answers snapshot; recomputing from the same
/// snapshot always yields the same summary.
pub fn score(questions: &[Question], answers: &HashMap<usize, String>) -> ScoreSummary {
    let total = questions.len();
    let correct = questions
        .iter()
        .filter(|q| {
            answers
                .get(&q.id)
                .is_some_and(|a| answer_is_correct(q, a))
        })
        .count();

    let percent = if total == 0 {
        0
    } else {
        (100.0 * correct as f64 / total as f64).round() as u32
    };

    ScoreSummary {
        correct,
        total,
        percent,
    }
}

fn answer_is_correct(question: &Question, answer: &str) -> bool {
    match &question.kind {
        QuestionKind::Matching { .. } => answer == MATCHED_SENTINEL,
        QuestionKind::TrueFalse { .. } => {
            // Recorded as 0/1; compare numerically so "1" and "1.0" agree
            match (answer.parse::<f64>(), question.correct_answer.parse::<f64>()) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            }
        }
        QuestionKind::Typing { .. } | QuestionKind::WordSpelling { .. } => {
            answer.eq_ignore_ascii_case(&question.correct_answer)
        }
    }
}
