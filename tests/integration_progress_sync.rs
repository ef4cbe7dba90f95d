use assert_matches::assert_matches;
use std::sync::{Arc, Mutex};

use signik::level::{Level, Tier};
use signik::progress::{AdvanceResult, ProgressApi, ProgressError, ProgressReporter};
use signik::scoring::ScoreSummary;
use signik::session_store::{FileSessionStore, SessionStore, StoredSession};

#[derive(Default)]
struct RecordingApi {
    saved: Mutex<Vec<(i64, Level, u32)>>,
    updated: Mutex<Vec<(i64, Level)>>,
    highest: u32,
    fail_save: bool,
    fail_update: bool,
}

impl ProgressApi for RecordingApi {
    fn highest_score(&self, _user_id: i64, _level: Level) -> Result<u32, ProgressError> {
        Ok(self.highest)
    }

    fn save_score(&self, user_id: i64, level: Level, score: u32) -> Result<u32, ProgressError> {
        if self.fail_save {
            return Err(ProgressError::Rejected("save refused".into()));
        }
        self.saved.lock().unwrap().push((user_id, level, score));
        Ok(score.max(self.highest))
    }

    fn user_progress(&self, _user_id: i64) -> Result<Level, ProgressError> {
        Ok(Level::new(Tier::Beginner, 1))
    }

    fn update_progress(&self, user_id: i64, level: Level) -> Result<(), ProgressError> {
        if self.fail_update {
            return Err(ProgressError::Rejected("update refused".into()));
        }
        self.updated.lock().unwrap().push((user_id, level));
        Ok(())
    }

    fn leaderboard(&self, _tier: Tier) -> Result<Option<String>, ProgressError> {
        Ok(None)
    }
}

fn perfect() -> ScoreSummary {
    ScoreSummary {
        correct: 5,
        total: 5,
        percent: 100,
    }
}

// The full signed-in round trip: score saved, advancement confirmed by
// the backend, then (and only then) mirrored into the local session file.
#[test]
fn confirmed_advancement_is_persisted_locally() {
    let api = Arc::new(RecordingApi::default());
    let reporter = ProgressReporter::new(api.clone());
    let level = Level::new(Tier::Beginner, 1);

    let dir = tempfile::tempdir().unwrap();
    let store = FileSessionStore::with_path(dir.path().join("session.json"));
    let mut stored = StoredSession {
        user_id: Some(3),
        ..Default::default()
    };
    store.save(&stored).unwrap();

    let outcome = reporter.submit(Some(3), level, perfect()).recv().unwrap();

    let next = Level::new(Tier::Beginner, 2);
    assert_eq!(outcome.advance, AdvanceResult::Confirmed(next));
    assert_eq!(outcome.backend_highest, Some(100));
    assert_eq!(api.saved.lock().unwrap().as_slice(), &[(3, level, 100)]);

    // What the binary does with a confirmed advance
    stored.set_level(next);
    store.save(&stored).unwrap();
    assert_eq!(store.load().level(), next);
}

#[test]
fn rejected_advancement_leaves_local_progress_untouched() {
    let api = Arc::new(RecordingApi {
        fail_update: true,
        ..Default::default()
    });
    let reporter = ProgressReporter::new(api.clone());
    let level = Level::new(Tier::Beginner, 1);

    let dir = tempfile::tempdir().unwrap();
    let store = FileSessionStore::with_path(dir.path().join("session.json"));
    let stored = StoredSession {
        user_id: Some(3),
        ..Default::default()
    };
    store.save(&stored).unwrap();

    let outcome = reporter.submit(Some(3), level, perfect()).recv().unwrap();

    assert_matches!(outcome.advance, AdvanceResult::Failed(_));
    // The score itself was still saved before the update failed
    assert_eq!(api.saved.lock().unwrap().len(), 1);
    // Local progress stays where it was
    assert_eq!(store.load().level(), Level::new(Tier::Beginner, 1));
}

#[test]
fn failed_save_still_reports_advancement_separately() {
    let api = Arc::new(RecordingApi {
        fail_save: true,
        ..Default::default()
    });
    let reporter = ProgressReporter::new(api.clone());

    let outcome = reporter
        .submit(Some(3), Level::new(Tier::Beginner, 1), perfect())
        .recv()
        .unwrap();

    assert_eq!(outcome.backend_highest, None);
    assert_eq!(
        outcome.advance,
        AdvanceResult::Confirmed(Level::new(Tier::Beginner, 2))
    );
    assert_eq!(api.updated.lock().unwrap().len(), 1);
}

#[test]
fn imperfect_score_never_touches_progression() {
    let api = Arc::new(RecordingApi::default());
    let reporter = ProgressReporter::new(api.clone());

    let summary = ScoreSummary {
        correct: 4,
        total: 5,
        percent: 80,
    };
    let outcome = reporter
        .submit(Some(3), Level::new(Tier::Expert, 4), summary)
        .recv()
        .unwrap();

    assert_eq!(outcome.advance, AdvanceResult::None);
    assert_eq!(outcome.backend_highest, Some(80));
    assert!(api.updated.lock().unwrap().is_empty());
}

#[test]
fn anonymous_submissions_stay_offline() {
    let api = Arc::new(RecordingApi::default());
    let reporter = ProgressReporter::new(api.clone());

    let outcome = reporter
        .submit(None, Level::new(Tier::Intermediate, 5), perfect())
        .recv()
        .unwrap();

    assert_eq!(
        outcome.advance,
        AdvanceResult::Confirmed(Level::new(Tier::Expert, 1))
    );
    assert!(api.saved.lock().unwrap().is_empty());
    assert!(api.updated.lock().unwrap().is_empty());
}

#[test]
fn backend_highest_feeds_the_best_score_display() {
    let api = Arc::new(RecordingApi {
        highest: 80,
        ..Default::default()
    });
    let reporter = ProgressReporter::new(api);
    let level = Level::new(Tier::Beginner, 3);

    let highest = reporter.fetch_highest(3, level).recv().unwrap();
    assert_eq!(highest, 80);

    // Saving a lower score keeps the higher stored best
    let api2 = Arc::new(RecordingApi {
        highest: 80,
        ..Default::default()
    });
    let reporter2 = ProgressReporter::new(api2);
    let summary = ScoreSummary {
        correct: 3,
        total: 5,
        percent: 60,
    };
    let outcome = reporter2.submit(Some(3), level, summary).recv().unwrap();
    assert_eq!(outcome.backend_highest, Some(80));
}
