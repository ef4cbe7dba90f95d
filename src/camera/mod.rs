pub mod classifier;
pub mod evaluator;
pub mod landmarks;

pub use classifier::{Classification, ClassifierError, HttpSignClassifier, SignClassifier};
pub use evaluator::{CameraEvaluator, CheckError, CheckOutcome, EvaluationOutcome, EvaluatorPhase};
pub use landmarks::{
    CameraError, HandLandmark, HttpLandmarkSource, LandmarkFrame, LandmarkSource, LANDMARK_COUNT,
};
