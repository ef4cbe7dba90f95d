mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use signik::{
    camera::{CameraEvaluator, HttpLandmarkSource, HttpSignClassifier},
    config::{Config, ConfigStore, FileConfigStore},
    content::{camera_targets, ContentGenerator, QuestionKind},
    dragdrop::icon_bank,
    letters::{Alphabet, WordList},
    level::{Level, Tier},
    progress::{AdvanceResult, HttpProgressClient, ProgressReporter, SubmitOutcome},
    quiz::{Mode, QuizSession},
    runtime::{AppEvent, AppEventSource, CrosstermEventSource, FixedTicker, Runner, Ticker},
    scoring::ScoreSummary,
    session_store::{FileSessionStore, SessionStore, StoredSession},
    stats::{append_attempt_log, ScoreDb},
    util::mean,
};
use std::{
    error::Error,
    io::{self, stdin},
    sync::mpsc::{Receiver, TryRecvError},
    sync::Arc,
    time::Duration,
};

const TICK_RATE_MS: u64 = 100;
const RECENT_ATTEMPTS_SHOWN: u32 = 10;

/// terminal fingerspelling trainer with levelled quizzes and camera checks
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal fingerspelling trainer: study signs level by level, take drag-and-drop quizzes, sync scores and progression with a backend, and (at the higher tiers) get your actual hand signs checked through a camera classifier."
)]
pub struct Cli {
    /// tier to practice (defaults to your stored progress)
    #[clap(short = 't', long, value_enum)]
    tier: Option<Tier>,

    /// level number within the tier, 1-5 (defaults to your stored progress)
    #[clap(short = 'l', long)]
    level: Option<u8>,

    /// skip the flashcards and jump straight into the quiz
    #[clap(short = 'q', long)]
    quiz: bool,

    /// camera-based sign evaluation instead of the manual quiz (expert and pro tiers only)
    #[clap(long)]
    camera: bool,

    /// backend service base url (overrides the config file)
    #[clap(long)]
    backend_url: Option<String>,

    /// fixed seed for quiz generation, for reproducible sessions
    #[clap(long)]
    seed: Option<u64>,

    /// backend user id to record scores and progression under
    #[clap(short = 'u', long)]
    user_id: Option<i64>,

    /// forget the stored user and local progress, then exit
    #[clap(long)]
    sign_out: bool,
}

/// What the user is looking at.
pub enum Screen {
    Session(QuizSession),
    Camera(CameraEvaluator),
}

/// Cursor state for the drag-and-drop quiz variants.
#[derive(Debug, Default)]
pub struct DragCursor {
    /// Index into the icon bank; None until the user picks one up.
    pub selected_icon: Option<usize>,
    pub slot: usize,
}

impl DragCursor {
    fn reset(&mut self) {
        self.selected_icon = None;
        self.slot = 0;
    }
}

pub struct App {
    pub cli: Cli,
    pub config: Config,
    pub level: Level,
    pub screen: Screen,
    pub cursor: DragCursor,
    pub stored: StoredSession,
    /// One-line status shown at the bottom of the screen.
    pub status: Option<String>,
    pub advance: Option<AdvanceResult>,
    pub submit_pending: bool,
    pub local_best: Option<u32>,
    pub recent_average: Option<f64>,
    /// Current tier leader per the backend, shown on the results screens.
    pub tier_leader: Option<String>,
    store: FileSessionStore,
    reporter: ProgressReporter,
    score_db: Option<ScoreDb>,
    generator: ContentGenerator,
    rng: StdRng,
    pending_submit: Option<Receiver<SubmitOutcome>>,
    pending_highest: Option<Receiver<u32>>,
    pending_leaderboard: Option<Receiver<Option<String>>>,
    camera_submitted: bool,
}

#[derive(Debug, PartialEq)]
pub enum KeyOutcome {
    Continue,
    Quit,
}

impl App {
    pub fn new(cli: Cli) -> Self {
        let mut config = FileConfigStore::new().load();
        if let Some(url) = &cli.backend_url {
            config.backend_url = url.clone();
        }

        let store = FileSessionStore::new();
        let mut stored = store.load();
        if cli.user_id.is_some() {
            stored.user_id = cli.user_id;
            if let Err(e) = store.save(&stored) {
                log::warn!("could not persist session: {e}");
            }
        }

        let tier = cli.tier.unwrap_or(stored.level_type);
        let number = cli.level.unwrap_or(if cli.tier.is_some() {
            1
        } else {
            stored.level_number
        });
        let level = Level::new(tier, number);

        let mut rng = match cli.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let alphabet = Alphabet::load();
        let generator = ContentGenerator::new(alphabet, WordList::load());
        let reporter = ProgressReporter::new(Arc::new(HttpProgressClient::new(
            config.backend_url.clone(),
        )));

        let score_db = match ScoreDb::new() {
            Ok(db) => Some(db),
            Err(e) => {
                log::warn!("local score db unavailable: {e}");
                None
            }
        };

        let screen = if cli.camera {
            Screen::Camera(build_evaluator(&config, level))
        } else {
            Screen::Session(QuizSession::new(
                generator.generate(level, &mut rng),
                generator.alphabet().clone(),
                cli.quiz,
            ))
        };

        let mut app = Self {
            cli,
            config,
            level,
            screen,
            cursor: DragCursor::default(),
            stored,
            status: None,
            advance: None,
            submit_pending: false,
            local_best: None,
            recent_average: None,
            tier_leader: None,
            store,
            reporter,
            score_db,
            generator,
            rng,
            pending_submit: None,
            pending_highest: None,
            pending_leaderboard: None,
            camera_submitted: false,
        };
        app.load_level_stats();
        app
    }

    fn make_session(&mut self) -> QuizSession {
        let content = self.generator.generate(self.level, &mut self.rng);
        let mut session = QuizSession::new(
            content,
            self.generator.alphabet().clone(),
            self.cli.quiz,
        );
        if let Some(best) = self.local_best {
            session.observe_percent(best);
        }
        session
    }

    fn make_evaluator(&self) -> CameraEvaluator {
        build_evaluator(&self.config, self.level)
    }

    /// Local best/average for the current level, plus a background fetch
    /// of the backend's stored best when a user is signed in.
    fn load_level_stats(&mut self) {
        if let Some(db) = &self.score_db {
            self.local_best = db.highest_percent(self.level).unwrap_or(None);
            self.recent_average = db
                .recent_percents(self.level, RECENT_ATTEMPTS_SHOWN)
                .ok()
                .and_then(|ps| mean(&ps));
        }

        if let Screen::Session(session) = &mut self.screen {
            if let Some(best) = self.local_best {
                session.observe_percent(best);
            }
        }

        if let Some(user_id) = self.stored.user_id {
            self.pending_highest = Some(self.reporter.fetch_highest(user_id, self.level));
        }
    }

    pub fn on_tick(&mut self) {
        let mut check_error = None;
        let mut camera_summary = None;
        if let Screen::Camera(evaluator) = &mut self.screen {
            evaluator.on_tick();
            check_error = evaluator.take_check_error();
            if evaluator.is_complete() && !self.camera_submitted {
                camera_summary = Some(evaluator.summary());
            }
        }
        if let Some(msg) = check_error {
            self.status = Some(msg);
        }
        if let Some(summary) = camera_summary {
            self.camera_submitted = true;
            self.submit_summary(summary);
        }

        // A receiver whose worker died is cleared, not polled forever
        if let Some(rx) = &self.pending_highest {
            match rx.try_recv() {
                Ok(highest) => {
                    if let Screen::Session(session) = &mut self.screen {
                        session.observe_percent(highest);
                    }
                    self.local_best = Some(self.local_best.unwrap_or(0).max(highest));
                    self.pending_highest = None;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => self.pending_highest = None,
            }
        }

        if let Some(rx) = &self.pending_leaderboard {
            match rx.try_recv() {
                Ok(name) => {
                    self.tier_leader = name;
                    self.pending_leaderboard = None;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => self.pending_leaderboard = None,
            }
        }

        if let Some(rx) = &self.pending_submit {
            match rx.try_recv() {
                Ok(outcome) => {
                    self.apply_submit_outcome(outcome);
                    self.pending_submit = None;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    self.pending_submit = None;
                    self.submit_pending = false;
                }
            }
        }
    }

    /// Record the attempt locally and hand it to the background reporter.
    fn submit_summary(&mut self, summary: ScoreSummary) {
        if let Some(db) = &self.score_db {
            if let Err(e) = db.record_attempt(self.level, &summary) {
                log::warn!("attempt not recorded locally: {e}");
            }
            self.local_best = db.highest_percent(self.level).unwrap_or(self.local_best);
            self.recent_average = db
                .recent_percents(self.level, RECENT_ATTEMPTS_SHOWN)
                .ok()
                .and_then(|ps| mean(&ps));
        }
        if let Err(e) = append_attempt_log(self.level, &summary) {
            log::warn!("attempt log not written: {e}");
        }

        self.submit_pending = true;
        self.advance = None;
        self.pending_submit =
            Some(self.reporter.submit(self.stored.user_id, self.level, summary));
        self.tier_leader = None;
        self.pending_leaderboard = Some(self.reporter.fetch_leaderboard(self.level.tier));
    }

    fn apply_submit_outcome(&mut self, outcome: SubmitOutcome) {
        self.submit_pending = false;

        if let Some(highest) = outcome.backend_highest {
            if let Screen::Session(session) = &mut self.screen {
                session.observe_percent(highest);
            }
            self.local_best = Some(self.local_best.unwrap_or(0).max(highest));
        }

        if let AdvanceResult::Confirmed(next) = &outcome.advance {
            self.stored.set_level(*next);
            if let Err(e) = self.store.save(&self.stored) {
                log::warn!("could not persist progression: {e}");
            }
        }
        self.advance = Some(outcome.advance);
    }

    /// Move to the confirmed next level and start a fresh attempt there.
    fn continue_to_next_level(&mut self) {
        let Some(AdvanceResult::Confirmed(next)) = self.advance.clone() else {
            return;
        };
        self.level = next;
        self.advance = None;
        self.cursor.reset();
        self.local_best = None;
        self.recent_average = None;
        self.tier_leader = None;
        self.camera_submitted = false;

        if matches!(self.screen, Screen::Camera(_)) && self.level.tier.supports_camera() {
            self.screen = Screen::Camera(self.make_evaluator());
        } else {
            self.screen = Screen::Session(self.make_session());
        }
        self.load_level_stats();
    }

    fn restart_attempt(&mut self) {
        self.cursor.reset();
        self.advance = None;
        self.camera_submitted = false;

        if matches!(self.screen, Screen::Camera(_)) {
            self.screen = Screen::Camera(self.make_evaluator());
        } else {
            let content = self.generator.generate(self.level, &mut self.rng);
            if let Screen::Session(session) = &mut self.screen {
                session.restart(content);
            }
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) -> KeyOutcome {
        if key.code == KeyCode::Esc
            || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
        {
            return KeyOutcome::Quit;
        }

        self.status = None;
        match &mut self.screen {
            Screen::Session(_) => self.on_session_key(key),
            Screen::Camera(_) => self.on_camera_key(key),
        }
        KeyOutcome::Continue
    }

    fn on_session_key(&mut self, key: KeyEvent) {
        let Screen::Session(session) = &mut self.screen else {
            return;
        };

        match session.mode {
            Mode::Learning => {
                if matches!(
                    key.code,
                    KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Right
                ) {
                    session.advance_lesson();
                }
            }
            Mode::Quiz => {
                let kind = session.current_question().map(|q| q.kind.clone());
                match key.code {
                    KeyCode::Left => {
                        session.previous_question();
                        self.cursor.reset();
                    }
                    KeyCode::Right => {
                        let before = session.current_index;
                        session.next_question();
                        if session.current_index != before {
                            self.cursor.reset();
                        }
                    }
                    KeyCode::Tab => {
                        let bank = icon_bank(session.alphabet(), self.level);
                        if !bank.is_empty() {
                            self.cursor.selected_icon = Some(
                                self.cursor
                                    .selected_icon
                                    .map_or(0, |i| (i + 1) % bank.len()),
                            );
                        }
                    }
                    KeyCode::Up => {
                        self.cursor.slot = self.cursor.slot.saturating_sub(1);
                    }
                    KeyCode::Down => {
                        let slots = match &kind {
                            Some(QuestionKind::Matching { pairs }) => pairs.len(),
                            Some(QuestionKind::WordSpelling { word }) => word.chars().count(),
                            _ => 0,
                        };
                        if self.cursor.slot + 1 < slots {
                            self.cursor.slot += 1;
                        }
                    }
                    KeyCode::Enter => {
                        if !self.drop_selected(&kind) {
                            self.try_submit();
                        }
                    }
                    KeyCode::Char(c) => match &kind {
                        Some(QuestionKind::Typing { .. }) if c.is_ascii_alphabetic() => {
                            session.record_answer(c.to_ascii_uppercase().to_string());
                        }
                        Some(QuestionKind::TrueFalse { .. }) if c == 't' || c == 'f' => {
                            session.record_answer(if c == 't' { "1" } else { "0" }.into());
                        }
                        _ => {}
                    },
                    _ => {}
                }
            }
            Mode::Results => match key.code {
                KeyCode::Char('r') => self.restart_attempt(),
                KeyCode::Char('c') => self.continue_to_next_level(),
                _ => {}
            },
        }
    }

    fn try_submit(&mut self) {
        let Screen::Session(session) = &mut self.screen else {
            return;
        };
        if !session.can_submit() {
            return;
        }
        let Some(summary) = session.submit() else {
            return;
        };
        self.submit_summary(summary);
    }

    /// Drop the picked-up icon into the focused slot of a drag question.
    /// Returns true if the key was consumed as a drop.
    fn drop_selected(&mut self, kind: &Option<QuestionKind>) -> bool {
        let Some(icon) = self.cursor.selected_icon else {
            return false;
        };
        let Screen::Session(session) = &mut self.screen else {
            return false;
        };

        let slot_key = match kind {
            Some(QuestionKind::Matching { pairs }) => {
                pairs.get(self.cursor.slot).map(|p| p.letter.to_string())
            }
            Some(QuestionKind::WordSpelling { .. }) => Some(self.cursor.slot.to_string()),
            _ => None,
        };
        let Some(slot_key) = slot_key else {
            return false;
        };

        let bank = icon_bank(session.alphabet(), self.level);
        if let Some(letter) = bank.get(icon) {
            let sign = letter.emoji.clone();
            session.drop_sign(&slot_key, &sign);
            self.cursor.selected_icon = None;
        }
        true
    }

    fn on_camera_key(&mut self, key: KeyEvent) {
        use signik::camera::EvaluatorPhase;

        let Screen::Camera(evaluator) = &mut self.screen else {
            return;
        };

        match evaluator.phase() {
            EvaluatorPhase::Ready => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Char('s')) {
                    if let Err(e) = evaluator.start_camera() {
                        self.status = Some(e.guidance().to_string());
                    }
                }
            }
            EvaluatorPhase::CameraActive => match key.code {
                KeyCode::Enter | KeyCode::Char(' ') => {
                    // The verdict arrives through on_tick while the
                    // Checking phase renders
                    if let Err(e) = evaluator.check_sign() {
                        self.status = Some(e.to_string());
                    }
                }
                KeyCode::Char('k') => evaluator.skip_sign(),
                _ => {}
            },
            EvaluatorPhase::Complete => match key.code {
                KeyCode::Char('r') => self.restart_attempt(),
                KeyCode::Char('c') => self.continue_to_next_level(),
                _ => {}
            },
            _ => {}
        }
    }
}

fn build_evaluator(config: &Config, level: Level) -> CameraEvaluator {
    let source = HttpLandmarkSource::new(
        config.detector_url.clone(),
        config.camera_metadata_timeout_secs,
    );
    let classifier = HttpSignClassifier::new(config.backend_url.clone());
    let mut evaluator = CameraEvaluator::new(
        camera_targets(level),
        config.confidence_threshold(level.tier),
        Box::new(source),
        Arc::new(classifier),
    );
    evaluator.mount();
    evaluator
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if cli.sign_out {
        FileSessionStore::new().clear()?;
        println!("Signed out; stored user and progress forgotten.");
        return Ok(());
    }

    if cli.camera {
        let tier = cli.tier.unwrap_or(FileSessionStore::new().load().level_type);
        if !tier.supports_camera() {
            let mut cmd = Cli::command();
            cmd.error(
                ErrorKind::ArgumentConflict,
                "camera evaluation is only available at the expert and pro tiers",
            )
            .exit();
        }
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(cli);
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, E: AppEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| ui::ui(app, f))?;

        match runner.step() {
            AppEvent::Tick => app.on_tick(),
            AppEvent::Resize => {}
            AppEvent::Key(key) => {
                if app.on_key(key) == KeyOutcome::Quit {
                    break;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("signik").chain(args.iter().copied()))
    }

    #[test]
    fn cli_defaults() {
        let cli = cli(&[]);
        assert_eq!(cli.tier, None);
        assert_eq!(cli.level, None);
        assert!(!cli.quiz);
        assert!(!cli.camera);
        assert_eq!(cli.seed, None);
        assert_eq!(cli.user_id, None);
        assert!(!cli.sign_out);
    }

    #[test]
    fn cli_tier_and_level() {
        let cli = cli(&["-t", "expert", "-l", "3"]);
        assert_eq!(cli.tier, Some(Tier::Expert));
        assert_eq!(cli.level, Some(3));
    }

    #[test]
    fn cli_flags() {
        let cli = cli(&["--quiz", "--camera", "--seed", "42", "-u", "7"]);
        assert!(cli.quiz);
        assert!(cli.camera);
        assert_eq!(cli.seed, Some(42));
        assert_eq!(cli.user_id, Some(7));
    }

    #[test]
    fn explicit_tier_without_level_starts_at_one() {
        let app = App::new(cli(&["-t", "intermediate", "--seed", "1"]));
        assert_eq!(app.level, Level::new(Tier::Intermediate, 1));
    }

    #[test]
    fn quiz_flag_skips_learning_mode() {
        let app = App::new(cli(&["-t", "beginner", "-l", "1", "--quiz", "--seed", "1"]));
        let Screen::Session(session) = &app.screen else {
            panic!("expected a quiz session");
        };
        assert_eq!(session.mode, Mode::Quiz);
    }

    #[test]
    fn typing_answer_is_recorded_uppercase() {
        let mut app = App::new(cli(&["-t", "beginner", "-l", "1", "--quiz", "--seed", "1"]));

        // Walk to a typing question
        loop {
            let Screen::Session(session) = &mut app.screen else {
                unreachable!();
            };
            let q = session.current_question().unwrap().clone();
            if matches!(q.kind, QuestionKind::Typing { .. }) {
                break;
            }
            // Answer drag questions directly through the session
            match &q.kind {
                QuestionKind::Matching { pairs } => {
                    for p in pairs.clone() {
                        session.drop_sign(&p.letter.to_string(), &p.sign);
                    }
                }
                _ => session.record_answer(q.correct_answer.clone()),
            }
            session.next_question();
        }

        app.on_key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE));
        let Screen::Session(session) = &app.screen else {
            unreachable!();
        };
        let q = session.current_question().unwrap();
        assert_eq!(session.answers().get(&q.id).map(String::as_str), Some("A"));
    }

    #[test]
    fn drag_cursor_resets_on_navigation() {
        let mut app = App::new(cli(&["-t", "beginner", "-l", "1", "--quiz", "--seed", "1"]));
        app.cursor.selected_icon = Some(2);
        app.cursor.slot = 1;

        {
            let Screen::Session(session) = &mut app.screen else {
                unreachable!();
            };
            let q = session.current_question().unwrap().clone();
            session.record_answer(q.correct_answer.clone());
            if q.is_matching() {
                if let QuestionKind::Matching { pairs } = &q.kind {
                    for p in pairs.clone() {
                        session.drop_sign(&p.letter.to_string(), &p.sign);
                    }
                }
            }
        }

        app.on_key(KeyEvent::new(KeyCode::Right, KeyModifiers::NONE));
        assert_eq!(app.cursor.selected_icon, None);
        assert_eq!(app.cursor.slot, 0);
    }

    #[test]
    fn seeded_app_reproduces_the_generated_quiz() {
        let app = App::new(cli(&["-t", "beginner", "-l", "2", "--quiz", "--seed", "9"]));
        let generator = ContentGenerator::new(Alphabet::load(), WordList::load());
        let expected =
            generator.generate(Level::new(Tier::Beginner, 2), &mut StdRng::seed_from_u64(9));

        let Screen::Session(session) = &app.screen else {
            panic!("expected a session");
        };
        assert_eq!(session.content.questions, expected.questions);
    }

    #[test]
    fn dead_fetch_receivers_are_cleared_on_tick() {
        let mut app = App::new(cli(&["-t", "beginner", "-l", "1", "--seed", "1"]));
        let (tx, rx) = std::sync::mpsc::channel::<u32>();
        drop(tx);
        app.pending_highest = Some(rx);

        app.on_tick();
        assert!(app.pending_highest.is_none());
    }

    #[test]
    fn escape_quits_from_any_screen() {
        let mut app = App::new(cli(&["-t", "beginner", "-l", "1", "--seed", "1"]));
        let outcome = app.on_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        assert_eq!(outcome, KeyOutcome::Quit);
    }
}
