use crate::content::{LevelContent, Question, QuestionKind};
use crate::dragdrop::{DragBoard, DropEffect};
use crate::letters::{Alphabet, Letter};
use crate::scoring::{score, ScoreSummary};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Learning,
    Quiz,
    Results,
}

/// One level attempt: flashcard walk-through, then the quiz, then results.
/// Owned by the UI for the duration of the attempt and rebuilt on restart.
#[derive(Debug)]
pub struct QuizSession {
    pub content: LevelContent,
    pub mode: Mode,
    pub current_index: usize,
    answers: HashMap<usize, String>,
    pub board: DragBoard,
    alphabet: Alphabet,
    summary: Option<ScoreSummary>,
    /// Best percentage seen for this (tier, level); loaded on entry,
    /// never decreases within the session.
    highest_percent: u32,
}

impl QuizSession {
    pub fn new(content: LevelContent, alphabet: Alphabet, start_in_quiz: bool) -> Self {
        let mode = if start_in_quiz {
            Mode::Quiz
        } else {
            Mode::Learning
        };

        Self {
            content,
            mode,
            current_index: 0,
            answers: HashMap::new(),
            board: DragBoard::new(),
            alphabet,
            summary: None,
            highest_percent: 0,
        }
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn answers(&self) -> &HashMap<usize, String> {
        &self.answers
    }

    pub fn summary(&self) -> Option<ScoreSummary> {
        self.summary
    }

    pub fn highest_percent(&self) -> u32 {
        self.highest_percent
    }

    /// Raise the best-score display; lower values are ignored.
    pub fn observe_percent(&mut self, percent: u32) {
        self.highest_percent = self.highest_percent.max(percent);
    }

    // --- learning mode ---

    pub fn current_lesson_letter(&self) -> Option<&Letter> {
        self.content.lesson_letters.get(self.current_index)
    }

    /// "Continue" in learning mode; past the last letter the session
    /// switches to quiz mode at question 0.
    pub fn advance_lesson(&mut self) {
        if self.mode != Mode::Learning {
            return;
        }
        if self.current_index + 1 < self.content.lesson_letters.len() {
            self.current_index += 1;
        } else {
            self.mode = Mode::Quiz;
            self.current_index = 0;
        }
    }

    // --- quiz mode ---

    pub fn current_question(&self) -> Option<&Question> {
        self.content.questions.get(self.current_index)
    }

    pub fn is_last_question(&self) -> bool {
        self.current_index + 1 >= self.content.questions.len()
    }

    /// Record a typed/selected answer for the current question.
    pub fn record_answer(&mut self, answer: String) {
        if let Some(q) = self.current_question() {
            self.answers.insert(q.id, answer);
        }
    }

    /// Route a drop through the drag board and apply its effect to the
    /// current question's recorded answer.
    pub fn drop_sign(&mut self, slot_key: &str, sign: &str) {
        let Some(question) = self.current_question().cloned() else {
            return;
        };

        match self.board.drop(&question, slot_key, sign, &self.alphabet) {
            DropEffect::Answer(answer) => {
                self.answers.insert(question.id, answer);
            }
            DropEffect::ClearAnswer => {
                self.answers.remove(&question.id);
            }
            DropEffect::None => {}
        }
    }

    /// Whether "next"/"submit" is unlocked for the current question.
    pub fn is_current_complete(&self) -> bool {
        let Some(q) = self.current_question() else {
            // Degenerate zero-question quiz: nothing blocks submission
            return true;
        };

        match &q.kind {
            QuestionKind::Typing { .. } | QuestionKind::TrueFalse { .. } => {
                self.answers.contains_key(&q.id)
            }
            QuestionKind::Matching { .. } => self
                .answers
                .get(&q.id)
                .is_some_and(|a| a == crate::content::MATCHED_SENTINEL),
            QuestionKind::WordSpelling { word } => {
                // Length gate only; correctness is judged at scoring time
                self.board.attempted_word(q, &self.alphabet).chars().count()
                    == word.chars().count()
            }
        }
    }

    pub fn next_question(&mut self) {
        if self.mode == Mode::Quiz && !self.is_last_question() && self.is_current_complete() {
            self.current_index += 1;
        }
    }

    /// "Previous" keeps all recorded answers.
    pub fn previous_question(&mut self) {
        if self.mode == Mode::Quiz && self.current_index > 0 {
            self.current_index -= 1;
        }
    }

    pub fn can_submit(&self) -> bool {
        self.mode == Mode::Quiz
            && (self.content.questions.is_empty()
                || (self.is_last_question() && self.is_current_complete()))
    }

    /// Score the session and move to results. Returns the summary so the
    /// caller can report it.
    pub fn submit(&mut self) -> Option<ScoreSummary> {
        if !self.can_submit() {
            return None;
        }

        let summary = score(&self.content.questions, &self.answers);
        self.mode = Mode::Results;
        self.summary = Some(summary);
        self.observe_percent(summary.percent);
        Some(summary)
    }

    /// Back to the flashcards with fresh content; the highest-score
    /// display survives.
    pub fn restart(&mut self, content: LevelContent) {
        self.content = content;
        self.mode = Mode::Learning;
        self.current_index = 0;
        self.answers.clear();
        self.board.clear();
        self.summary = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentGenerator;
    use crate::letters::WordList;
    use crate::level::{Level, Tier};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn session(level: Level, seed: u64, start_in_quiz: bool) -> QuizSession {
        let alphabet = Alphabet::load();
        let generator = ContentGenerator::new(alphabet.clone(), WordList::load());
        let content = generator.generate(level, &mut StdRng::seed_from_u64(seed));
        QuizSession::new(content, alphabet, start_in_quiz)
    }

    fn answer_current_correctly(session: &mut QuizSession) {
        let q = session.current_question().unwrap().clone();
        match &q.kind {
            QuestionKind::Typing { .. } | QuestionKind::TrueFalse { .. } => {
                session.record_answer(q.correct_answer.clone());
            }
            QuestionKind::Matching { pairs } => {
                for p in pairs.clone() {
                    session.drop_sign(&p.letter.to_string(), &p.sign);
                }
            }
            QuestionKind::WordSpelling { word } => {
                for (i, c) in word.chars().enumerate() {
                    let sign = session.alphabet().get(c).unwrap().emoji.clone();
                    session.drop_sign(&i.to_string(), &sign);
                }
            }
        }
    }

    #[test]
    fn starts_in_learning_by_default() {
        let session = session(Level::new(Tier::Beginner, 1), 1, false);
        assert_eq!(session.mode, Mode::Learning);
        assert_eq!(session.current_lesson_letter().unwrap().letter, 'A');
    }

    #[test]
    fn quiz_entry_flag_skips_learning() {
        let session = session(Level::new(Tier::Beginner, 1), 1, true);
        assert_eq!(session.mode, Mode::Quiz);
    }

    #[test]
    fn learning_walks_letters_then_enters_quiz() {
        let mut session = session(Level::new(Tier::Beginner, 1), 1, false);

        for _ in 0..4 {
            assert_eq!(session.mode, Mode::Learning);
            session.advance_lesson();
        }

        assert_eq!(session.mode, Mode::Quiz);
        assert_eq!(session.current_index, 0);
    }

    #[test]
    fn incomplete_question_blocks_next() {
        let mut session = session(Level::new(Tier::Beginner, 1), 1, true);

        assert!(!session.is_current_complete());
        session.next_question();
        assert_eq!(session.current_index, 0);

        answer_current_correctly(&mut session);
        assert!(session.is_current_complete());
        session.next_question();
        assert_eq!(session.current_index, 1);
    }

    #[test]
    fn previous_navigation_keeps_answers() {
        let mut session = session(Level::new(Tier::Beginner, 1), 1, true);

        answer_current_correctly(&mut session);
        let first_id = session.current_question().unwrap().id;
        session.next_question();
        session.previous_question();

        assert_eq!(session.current_index, 0);
        assert!(session.answers().contains_key(&first_id));
    }

    #[test]
    fn perfect_run_scores_one_hundred() {
        let mut session = session(Level::new(Tier::Beginner, 1), 1, true);

        loop {
            answer_current_correctly(&mut session);
            if session.is_last_question() {
                break;
            }
            session.next_question();
        }

        let summary = session.submit().unwrap();
        assert_eq!(session.mode, Mode::Results);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.percent, 100);
        assert!(summary.is_perfect());
    }

    #[test]
    fn submit_is_refused_before_last_question_is_complete() {
        let mut session = session(Level::new(Tier::Beginner, 1), 1, true);
        assert!(!session.can_submit());
        assert_eq!(session.submit(), None);
    }

    #[test]
    fn word_spelling_completeness_is_length_only() {
        let mut session = session(Level::new(Tier::Beginner, 2), 5, true);

        // Walk to the word-spelling question
        while !session
            .current_question()
            .map(|q| q.is_word_spelling())
            .unwrap_or(false)
        {
            answer_current_correctly(&mut session);
            if session.is_last_question() {
                break;
            }
            session.next_question();
        }

        let q = session.current_question().unwrap().clone();
        let QuestionKind::WordSpelling { word } = &q.kind else {
            panic!("expected a word-spelling question at level 2");
        };

        // Fill every slot with a deliberately wrong sign; still "complete"
        let wrong = session.alphabet().get('A').unwrap().emoji.clone();
        let filler = session.alphabet().get('B').unwrap().emoji.clone();
        for (i, c) in word.chars().enumerate() {
            let sign = if c == 'A' { filler.clone() } else { wrong.clone() };
            session.drop_sign(&i.to_string(), &sign);
        }

        assert!(session.is_current_complete());
        assert_ne!(session.answers()[&q.id], *word);
    }

    #[test]
    fn restart_resets_everything_but_highest_score() {
        let mut session = session(Level::new(Tier::Beginner, 1), 1, true);
        session.observe_percent(80);

        loop {
            answer_current_correctly(&mut session);
            if session.is_last_question() {
                break;
            }
            session.next_question();
        }
        session.submit().unwrap();
        assert_eq!(session.highest_percent(), 100);

        let alphabet = Alphabet::load();
        let generator = ContentGenerator::new(alphabet.clone(), WordList::load());
        let fresh = generator.generate(
            Level::new(Tier::Beginner, 1),
            &mut StdRng::seed_from_u64(2),
        );
        session.restart(fresh);

        assert_eq!(session.mode, Mode::Learning);
        assert_eq!(session.current_index, 0);
        assert!(session.answers().is_empty());
        assert_eq!(session.summary(), None);
        assert_eq!(session.highest_percent(), 100);
    }

    #[test]
    fn highest_percent_never_decreases() {
        let mut session = session(Level::new(Tier::Beginner, 1), 1, true);
        session.observe_percent(60);
        session.observe_percent(40);
        assert_eq!(session.highest_percent(), 60);
    }
}
