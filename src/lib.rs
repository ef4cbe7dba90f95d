// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod camera;
pub mod config;
pub mod content;
pub mod dragdrop;
pub mod letters;
pub mod level;
pub mod progress;
pub mod quiz;
pub mod runtime;
pub mod scoring;
pub mod session_store;
pub mod stats;
pub mod util;
