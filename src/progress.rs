use crate::level::{Level, Tier};
use crate::scoring::ScoreSummary;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend refused: {0}")]
    Rejected(String),
}

/// Request/response contract of the external scoring & progress service.
pub trait ProgressApi: Send + Sync {
    fn highest_score(&self, user_id: i64, level: Level) -> Result<u32, ProgressError>;
    /// Persist a score; the backend answers with the (possibly updated)
    /// highest score for the level.
    fn save_score(&self, user_id: i64, level: Level, score: u32) -> Result<u32, ProgressError>;
    /// Unknown users come back as beginner level 1.
    fn user_progress(&self, user_id: i64) -> Result<Level, ProgressError>;
    fn update_progress(&self, user_id: i64, level: Level) -> Result<(), ProgressError>;
    fn leaderboard(&self, tier: Tier) -> Result<Option<String>, ProgressError>;
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    highest_score: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProgressResponse {
    level_type: Option<String>,
    level_number: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct AckResponse {
    success: bool,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LeaderboardResponse {
    success: bool,
    name: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct SaveScoreRequest<'a> {
    user_id: i64,
    level_type: &'a str,
    level_number: u8,
    score: u32,
}

#[derive(Debug, Serialize)]
struct UpdateProgressRequest<'a> {
    user_id: i64,
    level_type: &'a str,
    level_number: u8,
}

/// Blocking HTTP client for the backend service.
pub struct HttpProgressClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpProgressClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.into(),
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl ProgressApi for HttpProgressClient {
    fn highest_score(&self, user_id: i64, level: Level) -> Result<u32, ProgressError> {
        let resp: ScoreResponse = self
            .client
            .get(self.url("/get-score"))
            .query(&[
                ("user_id", user_id.to_string()),
                ("level_type", level.tier.to_string()),
                ("level_number", level.number.to_string()),
            ])
            .send()?
            .json()?;

        Ok(resp.highest_score.unwrap_or(0))
    }

    fn save_score(&self, user_id: i64, level: Level, score: u32) -> Result<u32, ProgressError> {
        let resp: ScoreResponse = self
            .client
            .post(self.url("/save-score"))
            .json(&SaveScoreRequest {
                user_id,
                level_type: &level.tier.to_string(),
                level_number: level.number,
                score,
            })
            .send()?
            .json()?;

        Ok(resp.highest_score.unwrap_or(score))
    }

    fn user_progress(&self, user_id: i64) -> Result<Level, ProgressError> {
        let resp: ProgressResponse = self
            .client
            .get(self.url("/user-progress"))
            .query(&[("user_id", user_id.to_string())])
            .send()?
            .json()?;

        let tier = resp
            .level_type
            .as_deref()
            .and_then(|t| Tier::from_str(t).ok())
            .unwrap_or(Tier::Beginner);
        Ok(Level::new(tier, resp.level_number.unwrap_or(1)))
    }

    fn update_progress(&self, user_id: i64, level: Level) -> Result<(), ProgressError> {
        let resp: AckResponse = self
            .client
            .post(self.url("/update-progress"))
            .json(&UpdateProgressRequest {
                user_id,
                level_type: &level.tier.to_string(),
                level_number: level.number,
            })
            .send()?
            .json()?;

        if resp.success {
            Ok(())
        } else {
            Err(ProgressError::Rejected(
                resp.message.unwrap_or_else(|| "update rejected".into()),
            ))
        }
    }

    fn leaderboard(&self, tier: Tier) -> Result<Option<String>, ProgressError> {
        let resp: LeaderboardResponse = self
            .client
            .get(self.url("/leaderboard"))
            .query(&[("level_type", tier.to_string())])
            .send()?
            .json()?;

        if resp.success {
            Ok(resp.name)
        } else {
            Err(ProgressError::Rejected(
                resp.message.unwrap_or_else(|| "leaderboard unavailable".into()),
            ))
        }
    }
}

/// How far a perfect score got through the advancement handshake.
/// Local progress is only written once the backend has confirmed.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceResult {
    /// Score below 100%, nothing to advance.
    None,
    Confirmed(Level),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    /// Highest score the backend reports after saving, if it answered.
    pub backend_highest: Option<u32>,
    pub advance: AdvanceResult,
}

/// Reports scores and advancement on a background thread so the UI never
/// blocks on the network. The receiver yields exactly one outcome.
pub struct ProgressReporter {
    api: Arc<dyn ProgressApi>,
}

impl ProgressReporter {
    pub fn new(api: Arc<dyn ProgressApi>) -> Self {
        Self { api }
    }

    pub fn submit(
        &self,
        user_id: Option<i64>,
        level: Level,
        summary: ScoreSummary,
    ) -> Receiver<SubmitOutcome> {
        let (tx, rx) = mpsc::channel();
        let api = Arc::clone(&self.api);

        std::thread::spawn(move || {
            let outcome = run_submit(api.as_ref(), user_id, level, summary);
            // A dismissed screen's late outcome is simply discarded
            let _ = tx.send(outcome);
        });

        rx
    }

    /// Load the stored best for a level without blocking the UI.
    pub fn fetch_highest(&self, user_id: i64, level: Level) -> Receiver<u32> {
        let (tx, rx) = mpsc::channel();
        let api = Arc::clone(&self.api);

        std::thread::spawn(move || match api.highest_score(user_id, level) {
            Ok(highest) => {
                let _ = tx.send(highest);
            }
            Err(e) => log::warn!("could not fetch highest score: {e}"),
        });

        rx
    }

    /// Look up the tier's current leader for the results screen.
    pub fn fetch_leaderboard(&self, tier: Tier) -> Receiver<Option<String>> {
        let (tx, rx) = mpsc::channel();
        let api = Arc::clone(&self.api);

        std::thread::spawn(move || match api.leaderboard(tier) {
            Ok(name) => {
                let _ = tx.send(name);
            }
            Err(e) => log::warn!("could not fetch the {tier} leaderboard: {e}"),
        });

        rx
    }
}

fn run_submit(
    api: &dyn ProgressApi,
    user_id: Option<i64>,
    level: Level,
    summary: ScoreSummary,
) -> SubmitOutcome {
    let advanced_to = summary.advancement(level);

    let Some(user_id) = user_id else {
        // Practicing without an account: nothing to persist remotely,
        // progression applies locally right away.
        let advance = match advanced_to {
            Some(next) => AdvanceResult::Confirmed(next),
            None => AdvanceResult::None,
        };
        return SubmitOutcome {
            backend_highest: None,
            advance,
        };
    };

    let backend_highest = match api.save_score(user_id, level, summary.percent) {
        Ok(highest) => Some(highest),
        Err(e) => {
            log::warn!("score not persisted for {level}: {e}");
            None
        }
    };

    let advance = match advanced_to {
        None => AdvanceResult::None,
        Some(next) => match api.update_progress(user_id, next) {
            Ok(()) => AdvanceResult::Confirmed(next),
            Err(e) => {
                log::warn!("advancement to {next} not confirmed: {e}");
                AdvanceResult::Failed(e.to_string())
            }
        },
    };

    SubmitOutcome {
        backend_highest,
        advance,
    }
}
