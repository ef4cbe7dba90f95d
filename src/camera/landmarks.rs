use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Points per detected hand. Checks are refused below this.
pub const LANDMARK_COUNT: usize = 21;

/// One 3D point on a detected hand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandLandmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// The landmark set sampled from one video frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LandmarkFrame {
    pub points: Vec<HandLandmark>,
    /// Frame presentation time; only frames with an advanced timestamp
    /// replace the cached sample.
    pub timestamp_ms: u64,
}

impl LandmarkFrame {
    pub fn has_full_hand(&self) -> bool {
        self.points.len() >= LANDMARK_COUNT
    }
}

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("no camera device found")]
    DeviceNotFound,
    #[error("camera device is busy")]
    DeviceBusy,
    #[error("camera requires a secure context (loopback or https)")]
    InsecureContext,
    #[error("timed out after {0}s waiting for video metadata")]
    MetadataTimeout(u64),
    #[error("hand detector failed to load: {0}")]
    DetectorLoad(String),
    #[error("camera error: {0}")]
    Other(String),
}

impl CameraError {
    /// User-facing guidance keyed by error category.
    pub fn guidance(&self) -> &'static str {
        match self {
            CameraError::PermissionDenied => {
                "Camera access was denied. Allow camera permission and try again."
            }
            CameraError::DeviceNotFound => {
                "No camera was found. Connect a camera and try again."
            }
            CameraError::DeviceBusy => {
                "The camera is in use by another application. Close it and try again."
            }
            CameraError::InsecureContext => {
                "The detector must be reached over localhost or https."
            }
            CameraError::MetadataTimeout(_) => {
                "The camera took too long to start. Try again."
            }
            CameraError::DetectorLoad(_) => {
                "The hand detector could not be loaded. Reopen this screen to retry."
            }
            CameraError::Other(_) => "Something went wrong with the camera.",
        }
    }

    /// Detector-load failures are terminal for the session; everything
    /// else is recoverable by retrying.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CameraError::DetectorLoad(_))
    }
}

/// External hand-landmark detection capability: a camera-owning detector
/// sidecar reached over a request/response interface.
pub trait LandmarkSource {
    /// Load the detection model. Called once on mount; failure is
    /// terminal for this session.
    fn load_detector(&mut self) -> Result<(), CameraError>;
    /// Acquire the capture device. Retryable on failure.
    fn start_camera(&mut self) -> Result<(), CameraError>;
    /// Latest single-hand landmark set, if the detector has one.
    fn poll_frame(&mut self) -> Option<LandmarkFrame>;
    /// Release the capture device. Must be safe to call repeatedly.
    fn stop(&mut self);
    fn is_running(&self) -> bool;
}

#[derive(Debug, Deserialize)]
struct DetectorStatus {
    ready: bool,
    #[serde(default)]
    message: Option<String>,
}

/// How often the background worker asks the detector for a frame.
const FRAME_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Production source talking to a local detector service over HTTP.
/// Frames are fetched by a background worker; `poll_frame` only drains
/// its channel, so a slow detector never stalls the caller.
pub struct HttpLandmarkSource {
    base_url: String,
    metadata_timeout: Duration,
    client: reqwest::blocking::Client,
    worker: Option<FrameWorker>,
    pending: Option<LandmarkFrame>,
}

struct FrameWorker {
    frames: Receiver<LandmarkFrame>,
    shutdown: Arc<AtomicBool>,
}

impl HttpLandmarkSource {
    pub fn new(base_url: impl Into<String>, metadata_timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.into(),
            metadata_timeout: Duration::from_secs(metadata_timeout_secs),
            client,
            worker: None,
            pending: None,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn classify_transport_error(e: &reqwest::Error) -> CameraError {
        match e.status() {
            Some(s) if s == reqwest::StatusCode::FORBIDDEN => CameraError::PermissionDenied,
            Some(s) if s == reqwest::StatusCode::NOT_FOUND => CameraError::DeviceNotFound,
            Some(s) if s == reqwest::StatusCode::CONFLICT => CameraError::DeviceBusy,
            _ if e.is_connect() => CameraError::DeviceNotFound,
            _ => CameraError::Other(e.to_string()),
        }
    }
}

/// Only loopback http or https count as a secure context.
fn is_secure_context(url: &str) -> bool {
    if url.starts_with("https://") {
        return true;
    }
    let Some(rest) = url.strip_prefix("http://") else {
        return false;
    };
    let authority = rest.split('/').next().unwrap_or("");
    // IPv6 hosts are bracketed, with the port outside the brackets
    if let Some(bracketed) = authority.strip_prefix('[') {
        return bracketed.split(']').next() == Some("::1");
    }
    let host = authority.split(':').next().unwrap_or("");
    host == "localhost" || host == "127.0.0.1"
}

impl LandmarkSource for HttpLandmarkSource {
    fn load_detector(&mut self) -> Result<(), CameraError> {
        let status: DetectorStatus = self
            .client
            .get(self.url("/detector/status"))
            .send()
            .and_then(|r| r.json())
            .map_err(|e| CameraError::DetectorLoad(e.to_string()))?;

        if status.ready {
            Ok(())
        } else {
            Err(CameraError::DetectorLoad(
                status.message.unwrap_or_else(|| "detector not ready".into()),
            ))
        }
    }

    fn start_camera(&mut self) -> Result<(), CameraError> {
        if !is_secure_context(&self.base_url) {
            return Err(CameraError::InsecureContext);
        }
        if self.worker.is_some() {
            // One capture device at a time; reuse the open stream
            return Ok(());
        }

        self.client
            .post(self.url("/camera/start"))
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| Self::classify_transport_error(&e))?;

        let (tx, rx) = mpsc::channel();
        let shutdown = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&shutdown);
        let poll_url = self.url("/landmarks");
        let client = self.client.clone();

        std::thread::spawn(move || {
            while !stop_flag.load(Ordering::SeqCst) {
                let fetched = client
                    .get(&poll_url)
                    .send()
                    .and_then(|r| r.json::<LandmarkFrame>());
                if let Ok(frame) = fetched {
                    if tx.send(frame).is_err() {
                        break;
                    }
                }
                std::thread::sleep(FRAME_POLL_INTERVAL);
            }
        });

        // The stream is up once the detector reports frame metadata;
        // bounded wait, then a retryable timeout.
        match rx.recv_timeout(self.metadata_timeout) {
            Ok(first) => self.pending = Some(first),
            Err(_) => {
                shutdown.store(true, Ordering::SeqCst);
                self.stop_stream();
                return Err(CameraError::MetadataTimeout(
                    self.metadata_timeout.as_secs(),
                ));
            }
        }

        self.worker = Some(FrameWorker {
            frames: rx,
            shutdown,
        });
        Ok(())
    }

    fn poll_frame(&mut self) -> Option<LandmarkFrame> {
        let worker = self.worker.as_ref()?;
        let mut latest = self.pending.take();
        while let Ok(frame) = worker.frames.try_recv() {
            latest = Some(frame);
        }
        latest
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.shutdown.store(true, Ordering::SeqCst);
            self.stop_stream();
        }
        self.pending = None;
    }

    fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

impl HttpLandmarkSource {
    fn stop_stream(&self) {
        if let Err(e) = self.client.post(self.url("/camera/stop")).send() {
            log::warn!("camera stop not acknowledged: {e}");
        }
    }
}

impl Drop for HttpLandmarkSource {
    fn drop(&mut self) {
        self.stop();
    }
}
