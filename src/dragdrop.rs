use crate::content::{Question, QuestionKind, MATCHED_SENTINEL};
use crate::letters::{Alphabet, Letter};
use crate::level::Level;
use itertools::Itertools;
use std::collections::HashMap;

/// What a drop did to the owning question's recorded answer.
#[derive(Debug, Clone, PartialEq)]
pub enum DropEffect {
    /// Record this as the question's current answer.
    Answer(String),
    /// The question is no longer complete; forget any recorded answer.
    ClearAnswer,
    /// Nothing to record (e.g. drop on a non-drag question).
    None,
}

/// Tracks icon-to-slot assignments for matching and word-spelling
/// questions and derives their answers. Slot keys are the target letter
/// for matching and the zero-based position for word-spelling.
#[derive(Debug, Default, Clone)]
pub struct DragBoard {
    assignments: HashMap<(usize, String), String>,
}

impl DragBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assignment(&self, question_id: usize, slot_key: &str) -> Option<&str> {
        self.assignments
            .get(&(question_id, slot_key.to_string()))
            .map(String::as_str)
    }

    /// Record a dropped sign and re-derive the question's answer.
    pub fn drop(
        &mut self,
        question: &Question,
        slot_key: &str,
        sign: &str,
        alphabet: &Alphabet,
    ) -> DropEffect {
        self.assignments
            .insert((question.id, slot_key.to_string()), sign.to_string());

        match &question.kind {
            QuestionKind::Matching { pairs } => {
                // Every pair has to be simultaneously correct; a later bad
                // drop un-marks a previously complete question.
                let all_correct = pairs.iter().all(|p| {
                    self.assignment(question.id, &p.letter.to_string()) == Some(p.sign.as_str())
                });

                if all_correct {
                    DropEffect::Answer(MATCHED_SENTINEL.into())
                } else {
                    DropEffect::ClearAnswer
                }
            }
            QuestionKind::WordSpelling { .. } => {
                DropEffect::Answer(self.attempted_word(question, alphabet))
            }
            _ => DropEffect::None,
        }
    }

    /// The word spelled so far: assigned signs mapped back to letters via
    /// the reference alphabet, concatenated in slot order. Unfilled slots
    /// and unknown signs contribute nothing.
    pub fn attempted_word(&self, question: &Question, alphabet: &Alphabet) -> String {
        let word = match &question.kind {
            QuestionKind::WordSpelling { word } => word,
            _ => return String::new(),
        };

        (0..word.chars().count())
            .filter_map(|pos| self.assignment(question.id, &pos.to_string()))
            .filter_map(|sign| alphabet.letter_for_sign(sign))
            .join("")
    }

    /// Per-slot "looks correct" hint: does the dropped sign equal the
    /// canonical sign of the letter this slot expects? Not used for
    /// scoring; word-spelling is only judged as a whole at submit time.
    pub fn slot_hint(
        &self,
        question: &Question,
        slot_key: &str,
        alphabet: &Alphabet,
    ) -> Option<bool> {
        let dropped = self.assignment(question.id, slot_key)?;

        let expected_letter = match &question.kind {
            QuestionKind::Matching { .. } => slot_key.chars().next()?,
            QuestionKind::WordSpelling { word } => {
                let pos: usize = slot_key.parse().ok()?;
                word.chars().nth(pos)?
            }
            _ => return None,
        };

        alphabet.get(expected_letter).map(|l| l.emoji == dropped)
    }

    pub fn clear(&mut self) {
        self.assignments.clear();
    }
}

/// Icons offered for dragging: always the cumulative letter set of the
/// current level, distractors included.
pub fn icon_bank(alphabet: &Alphabet, level: Level) -> Vec<Letter> {
    alphabet.letters[..level.cumulative_count(alphabet.len())].to_vec()
}
