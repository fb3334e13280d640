//! Replay TUI: a single-threaded cooperative render/input loop over an
//! already-loaded [`crate::loader::Trace`].

pub mod app;
pub mod source_cache;
pub mod ui;

pub use app::{App, Breakpoint, EmptyTraceError, Mode};
pub use ui::{draw, MIN_HEIGHT, MIN_WIDTH};
