use crate::letters::{Alphabet, Letter, WordList, CAMERA_ALPHABET, LETTERS_PER_LEVEL};
use crate::level::Level;
use rand::seq::SliceRandom;
use rand::Rng;

/// Answer value recorded for a matching question once every pair is in
/// place. Also its correct answer, so scoring stays a string comparison.
pub const MATCHED_SENTINEL: &str = "matched";

/// One letter/sign pairing inside a matching question.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchPair {
    pub letter: char,
    pub sign: String,
}

/// Variant-specific question payload.
#[derive(Debug, Clone, PartialEq)]
pub enum QuestionKind {
    /// Shows a sign, the user types the letter it stands for.
    Typing { sign: String },
    /// Drag each sign onto its letter; 3–4 pairs.
    Matching { pairs: Vec<MatchPair> },
    /// Legacy variant kept for scoring compatibility; the generator does
    /// not emit these.
    TrueFalse { statement: String },
    /// Drag signs into per-position slots to spell the target word.
    WordSpelling { word: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    /// Position in the generated list.
    pub id: usize,
    pub text: String,
    pub correct_answer: String,
    pub kind: QuestionKind,
}

impl Question {
    pub fn is_matching(&self) -> bool {
        matches!(self.kind, QuestionKind::Matching { .. })
    }

    pub fn is_word_spelling(&self) -> bool {
        matches!(self.kind, QuestionKind::WordSpelling { .. })
    }
}

/// Everything one level attempt needs: the flashcard letters and the quiz.
#[derive(Debug, Clone)]
pub struct LevelContent {
    pub level: Level,
    pub lesson_letters: Vec<Letter>,
    pub questions: Vec<Question>,
}

/// Builds per-level lesson and quiz content. Deterministic for a given
/// level and RNG seed; callers pass `thread_rng` in production and a
/// seeded `StdRng` in tests.
pub struct ContentGenerator {
    alphabet: Alphabet,
    words: WordList,
}

impl ContentGenerator {
    pub fn new(alphabet: Alphabet, words: WordList) -> Self {
        Self { alphabet, words }
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn generate<R: Rng>(&self, level: Level, rng: &mut R) -> LevelContent {
        let lesson_letters = self.alphabet.letters[level.lesson_range(self.alphabet.len())].to_vec();
        let cumulative = &self.alphabet.letters[..level.cumulative_count(self.alphabet.len())];

        let mut questions = Vec::new();

        let mut typing: Vec<Question> = cumulative
            .iter()
            .map(|l| Question {
                id: 0,
                text: "Which letter is this sign?".into(),
                correct_answer: l.letter.to_string(),
                kind: QuestionKind::Typing {
                    sign: l.emoji.clone(),
                },
            })
            .collect();
        typing.shuffle(rng);
        questions.append(&mut typing);

        if cumulative.len() >= 3 {
            let pairs: Vec<MatchPair> = cumulative
                .choose_multiple(rng, cumulative.len().min(4))
                .map(|l| MatchPair {
                    letter: l.letter,
                    sign: l.emoji.clone(),
                })
                .collect();

            questions.push(Question {
                id: 0,
                text: "Match each sign to its letter".into(),
                correct_answer: MATCHED_SENTINEL.into(),
                kind: QuestionKind::Matching { pairs },
            });
        }

        if level.number >= 2 && cumulative.len() >= 3 {
            let wanted = if level.number < 3 { 1 } else { 2 };
            let candidates: Vec<&String> = self
                .words
                .words
                .iter()
                .filter(|w| w.chars().all(|c| cumulative.iter().any(|l| l.letter == c)))
                .collect();

            // Exhausted candidates silently yield fewer questions.
            for word in candidates.choose_multiple(rng, wanted) {
                questions.push(Question {
                    id: 0,
                    text: format!("Spell the word {word} with signs"),
                    correct_answer: (*word).clone(),
                    kind: QuestionKind::WordSpelling {
                        word: (*word).clone(),
                    },
                });
            }
        }

        questions.shuffle(rng);
        for (id, q) in questions.iter_mut().enumerate() {
            q.id = id;
        }

        LevelContent {
            level,
            lesson_letters,
            questions,
        }
    }
}

/// Target letters for a camera quiz: the cumulative rule applied to the
/// classifier-supported alphabet instead of the full A–W set.
pub fn camera_targets(level: Level) -> Vec<char> {
    let count = (LETTERS_PER_LEVEL * level.number as usize).min(CAMERA_ALPHABET.len());
    CAMERA_ALPHABET[..count].to_vec()
}
