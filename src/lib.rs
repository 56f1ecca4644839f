// Library surface for headless/integration tests and reuse.
// The recorder and scorer have no dependencies on the rest of the crate.
pub mod app_dirs;
pub mod backend;
pub mod capture;
pub mod config;
pub mod error;
pub mod input;
pub mod payload;
pub mod runtime;
pub mod scoring;
pub mod session;
pub mod summary;
pub mod ui;
pub mod workflow;

pub use backend::{Backend, HttpBackend};
pub use capture::{KeyEvent, Recorder};
pub use error::BackendError;
pub use scoring::{accuracy, normalize};
pub use workflow::{AppState, Controller};

pub const TICK_RATE_MS: u64 = 100;
