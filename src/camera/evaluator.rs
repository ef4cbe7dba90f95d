use crate::camera::classifier::{Classification, ClassifierError, SignClassifier};
use crate::camera::landmarks::{CameraError, LandmarkFrame, LandmarkSource};
use crate::scoring::ScoreSummary;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use thiserror::Error;

/// Ticks a passed sign stays on screen before the next target appears.
pub const PASS_DISPLAY_TICKS: u8 = 12;

#[derive(Debug, Clone, PartialEq)]
pub enum EvaluatorPhase {
    LoadingDetector,
    Ready,
    CameraActive,
    Checking,
    Complete,
    /// Detector never loaded; terminal for this session.
    Failed(String),
}

/// One answered or skipped camera question.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationOutcome {
    pub letter: char,
    pub correct: bool,
}

/// What a single check told the user.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub passed: bool,
    pub confidence: f64,
    pub threshold: f64,
    pub prediction: Option<String>,
}

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("camera is not active")]
    NotActive,
    #[error("no hand detected yet — hold your hand in view and try again")]
    NoHand,
}

/// Drives the camera quiz: samples landmark frames from the source,
/// submits snapshots to the classifier, and gates passes on the tier's
/// confidence threshold. The classifier runs on a worker thread; the
/// verdict lands on a later tick while the Checking phase renders.
pub struct CameraEvaluator {
    targets: Vec<char>,
    current: usize,
    results: Vec<EvaluationOutcome>,
    phase: EvaluatorPhase,
    threshold: f64,
    source: Box<dyn LandmarkSource>,
    classifier: Arc<dyn SignClassifier>,
    latest: Option<LandmarkFrame>,
    last_timestamp_ms: u64,
    pass_display_ticks: u8,
    pending_check: Option<(char, Receiver<Result<Classification, ClassifierError>>)>,
    last_check: Option<CheckOutcome>,
    check_error: Option<String>,
}

impl CameraEvaluator {
    pub fn new(
        targets: Vec<char>,
        threshold: f64,
        source: Box<dyn LandmarkSource>,
        classifier: Arc<dyn SignClassifier>,
    ) -> Self {
        Self {
            targets,
            current: 0,
            results: Vec::new(),
            phase: EvaluatorPhase::LoadingDetector,
            threshold,
            source,
            classifier,
            latest: None,
            last_timestamp_ms: 0,
            pass_display_ticks: 0,
            pending_check: None,
            last_check: None,
            check_error: None,
        }
    }

    pub fn phase(&self) -> &EvaluatorPhase {
        &self.phase
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn results(&self) -> &[EvaluationOutcome] {
        &self.results
    }

    pub fn current_target(&self) -> Option<char> {
        self.targets.get(self.current).copied()
    }

    pub fn has_frame(&self) -> bool {
        self.latest.is_some()
    }

    /// Verdict of the most recent resolved check, kept on screen until
    /// the next check starts or the target is skipped.
    pub fn last_check(&self) -> Option<&CheckOutcome> {
        self.last_check.as_ref()
    }

    /// A classifier failure from the pending check, if one arrived.
    /// Consumed by the caller for status display.
    pub fn take_check_error(&mut self) -> Option<String> {
        self.check_error.take()
    }

    /// Load the external detector. No automatic retry: a failure here is
    /// terminal for this screen.
    pub fn mount(&mut self) {
        if self.phase != EvaluatorPhase::LoadingDetector {
            return;
        }
        match self.source.load_detector() {
            Ok(()) => self.phase = EvaluatorPhase::Ready,
            Err(e) => self.phase = EvaluatorPhase::Failed(e.guidance().to_string()),
        }
    }

    /// Acquire the capture device. Failures other than detector load are
    /// retryable; the evaluator stays Ready.
    pub fn start_camera(&mut self) -> Result<(), CameraError> {
        if self.phase != EvaluatorPhase::Ready {
            return Ok(());
        }
        match self.source.start_camera() {
            Ok(()) => {
                self.phase = EvaluatorPhase::CameraActive;
                Ok(())
            }
            Err(e) => {
                if e.is_terminal() {
                    self.phase = EvaluatorPhase::Failed(e.guidance().to_string());
                }
                Err(e)
            }
        }
    }

    pub fn stop_camera(&mut self) {
        self.source.stop();
        if self.phase == EvaluatorPhase::CameraActive {
            self.phase = EvaluatorPhase::Ready;
        }
        self.latest = None;
    }

    /// Per-tick work: resolve a pending check, count down the pass
    /// display, and sample a frame. Only a frame whose timestamp
    /// advanced replaces the cached snapshot; stale frames are dropped,
    /// never queued.
    pub fn on_tick(&mut self) {
        if self.pass_display_ticks > 0 {
            self.pass_display_ticks -= 1;
            if self.pass_display_ticks == 0 {
                self.advance_target();
            }
        }

        self.poll_check();

        if self.phase != EvaluatorPhase::CameraActive || !self.source.is_running() {
            return;
        }

        if let Some(frame) = self.source.poll_frame() {
            if frame.timestamp_ms > self.last_timestamp_ms {
                self.last_timestamp_ms = frame.timestamp_ms;
                self.latest = Some(frame);
            }
        }
    }

    /// Submit the cached landmark snapshot for the current target. The
    /// classifier answers on a worker thread; until it does the phase
    /// stays Checking and further checks are refused. The eventual
    /// verdict passes iff the classifier matched at or above the
    /// threshold.
    pub fn check_sign(&mut self) -> Result<(), CheckError> {
        if self.phase != EvaluatorPhase::CameraActive || self.pass_display_ticks > 0 {
            return Err(CheckError::NotActive);
        }
        let Some(target) = self.current_target() else {
            return Err(CheckError::NotActive);
        };
        let frame = match &self.latest {
            Some(frame) if frame.has_full_hand() => frame.clone(),
            _ => return Err(CheckError::NoHand),
        };

        self.phase = EvaluatorPhase::Checking;
        self.last_check = None;

        let (tx, rx) = mpsc::channel();
        let classifier = Arc::clone(&self.classifier);
        std::thread::spawn(move || {
            // An abandoned check's late verdict is simply discarded
            let _ = tx.send(classifier.check(target, &frame));
        });
        self.pending_check = Some((target, rx));
        Ok(())
    }

    fn poll_check(&mut self) {
        let Some((target, rx)) = &self.pending_check else {
            return;
        };
        let target = *target;

        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                Err(ClassifierError::Rejected("classifier worker exited".into()))
            }
        };

        self.pending_check = None;
        self.phase = EvaluatorPhase::CameraActive;

        match result {
            Ok(classification) => {
                let passed =
                    classification.matched && classification.confidence >= self.threshold;
                if passed {
                    self.results.push(EvaluationOutcome {
                        letter: target,
                        correct: true,
                    });
                    // Leave the pass on screen briefly before moving on
                    self.pass_display_ticks = PASS_DISPLAY_TICKS;
                }
                self.last_check = Some(CheckOutcome {
                    passed,
                    confidence: classification.confidence,
                    threshold: self.threshold,
                    prediction: classification.prediction,
                });
            }
            Err(e) => self.check_error = Some(e.to_string()),
        }
    }

    /// Give up on the current target; recorded as incorrect, advances
    /// immediately.
    pub fn skip_sign(&mut self) {
        let Some(target) = self.current_target() else {
            return;
        };
        if self.pass_display_ticks > 0 || self.pending_check.is_some() {
            return;
        }
        self.last_check = None;
        self.results.push(EvaluationOutcome {
            letter: target,
            correct: false,
        });
        self.advance_target();
    }

    fn advance_target(&mut self) {
        self.current += 1;
        if self.current >= self.targets.len() {
            self.phase = EvaluatorPhase::Complete;
            self.source.stop();
            self.latest = None;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.phase == EvaluatorPhase::Complete
    }

    /// Final score over all camera questions, same rounding and
    /// advancement contract as the manual quiz.
    pub fn summary(&self) -> ScoreSummary {
        let total = self.targets.len();
        let correct = self.results.iter().filter(|r| r.correct).count();
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
}

impl Drop for CameraEvaluator {
    fn drop(&mut self) {
        // Never leak an open capture device or a live frame loop
        self.source.stop();
    }
}
