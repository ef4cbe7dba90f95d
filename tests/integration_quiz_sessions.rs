use rand::rngs::StdRng;
use rand::SeedableRng;

use signik::content::{ContentGenerator, QuestionKind};
use signik::letters::{Alphabet, WordList};
use signik::level::{Level, Tier};
use signik::quiz::{Mode, QuizSession};
use signik::scoring::score;

fn generator() -> ContentGenerator {
    ContentGenerator::new(Alphabet::load(), WordList::load())
}

fn session(level: Level, seed: u64, start_in_quiz: bool) -> QuizSession {
    let alphabet = Alphabet::load();
    let content = generator().generate(level, &mut StdRng::seed_from_u64(seed));
    QuizSession::new(content, alphabet, start_in_quiz)
}

fn answer_correctly(session: &mut QuizSession) {
    let q = session.current_question().unwrap().clone();
    match &q.kind {
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
        _ => session.record_answer(q.correct_answer.clone()),
    }
}

#[test]
fn generated_content_respects_the_level_contract() {
    let generator = generator();

    for tier in [Tier::Beginner, Tier::Intermediate] {
        for number in 1..=5u8 {
            let level = Level::new(tier, number);
            let content = generator.generate(level, &mut StdRng::seed_from_u64(99));

            // Typing questions track the cumulative letter set
            let typing = content
                .questions
                .iter()
                .filter(|q| matches!(q.kind, QuestionKind::Typing { .. }))
                .count();
            assert_eq!(
                typing,
                level.cumulative_count(generator.alphabet().len()),
                "{level}"
            );

            // Exactly one matching question once three letters exist
            let matching = content.questions.iter().filter(|q| q.is_matching()).count();
            assert_eq!(matching, 1, "{level}");

            // Ids always equal positions so answers key cleanly
            for (i, q) in content.questions.iter().enumerate() {
                assert_eq!(q.id, i);
            }
        }
    }
}

#[test]
fn full_attempt_with_mistakes_scores_partially() {
    let mut session = session(Level::new(Tier::Beginner, 1), 11, true);

    // Miss the first typing question on purpose, get the rest right
    let mut missed = false;
    loop {
        let q = session.current_question().unwrap().clone();
        if !missed {
            if let QuestionKind::Typing { .. } = &q.kind {
                let wrong = if q.correct_answer == "A" { "B" } else { "A" };
                session.record_answer(wrong.into());
                missed = true;
                if session.is_last_question() {
                    break;
                }
                session.next_question();
                continue;
            }
        }
        answer_correctly(&mut session);
        if session.is_last_question() {
            break;
        }
        session.next_question();
    }

    let summary = session.submit().unwrap();
    assert_eq!(summary.total, 5);
    assert_eq!(summary.correct, 4);
    assert_eq!(summary.percent, 80);
    assert!(!summary.is_perfect());
    assert_eq!(summary.advancement(Level::new(Tier::Beginner, 1)), None);
}

#[test]
fn revising_an_answer_before_submit_changes_the_score() {
    let mut session = session(Level::new(Tier::Beginner, 1), 11, true);

    // Answer everything correctly except the first question
    let mut spoiled_id = None;
    loop {
        let q = session.current_question().unwrap().clone();
        if spoiled_id.is_none() {
            if let QuestionKind::Typing { .. } = &q.kind {
                let wrong = if q.correct_answer == "A" { "B" } else { "A" };
                session.record_answer(wrong.into());
                spoiled_id = Some(q.id);
                if session.is_last_question() {
                    break;
                }
                session.next_question();
                continue;
            }
        }
        answer_correctly(&mut session);
        if session.is_last_question() {
            break;
        }
        session.next_question();
    }

    // Walk back and fix the spoiled answer; earlier answers survive
    let spoiled_id = spoiled_id.expect("a typing question was spoiled");
    while session.current_question().map(|q| q.id) != Some(spoiled_id) {
        session.previous_question();
    }
    answer_correctly(&mut session);
    while !session.is_last_question() {
        session.next_question();
    }

    let summary = session.submit().unwrap();
    assert_eq!(summary.percent, 100);
}

#[test]
fn scoring_is_idempotent_over_the_answer_snapshot() {
    let mut session = session(Level::new(Tier::Beginner, 2), 4, true);

    loop {
        answer_correctly(&mut session);
        if session.is_last_question() {
            break;
        }
        session.next_question();
    }

    let first = score(&session.content.questions, session.answers());
    let second = score(&session.content.questions, session.answers());
    assert_eq!(first, second);

    let submitted = session.submit().unwrap();
    assert_eq!(submitted, first);
}

#[test]
fn restart_generates_a_fresh_attempt_on_the_same_level() {
    let mut session = session(Level::new(Tier::Beginner, 1), 5, true);

    loop {
        answer_correctly(&mut session);
        if session.is_last_question() {
            break;
        }
        session.next_question();
    }
    session.submit().unwrap();
    assert_eq!(session.highest_percent(), 100);

    let fresh = generator().generate(
        Level::new(Tier::Beginner, 1),
        &mut StdRng::seed_from_u64(6),
    );
    session.restart(fresh);

    assert_eq!(session.mode, Mode::Learning);
    assert!(session.answers().is_empty());
    assert_eq!(session.summary(), None);
    // The best-score display is sticky across attempts
    assert_eq!(session.highest_percent(), 100);
}

#[test]
fn progression_crosses_tiers_and_stops_at_pro_five() {
    use signik::scoring::ScoreSummary;

    let perfect = ScoreSummary {
        correct: 5,
        total: 5,
        percent: 100,
    };

    assert_eq!(
        perfect.advancement(Level::new(Tier::Beginner, 5)),
        Some(Level::new(Tier::Intermediate, 1))
    );
    assert_eq!(
        perfect.advancement(Level::new(Tier::Expert, 5)),
        Some(Level::new(Tier::Pro, 1))
    );
    assert_eq!(
        perfect.advancement(Level::new(Tier::Pro, 5)),
        Some(Level::new(Tier::Pro, 5))
    );
}
