//! retrace — a trace-based time-travel debugger.
//!
//! Five components, each its own module: the trace record & codec
//! ([`event`]), the runtime writer embedded in traced programs ([`writer`]),
//! the AST instrumenter ([`instrument`]), the trace loader & indexer
//! ([`loader`]), and the replay TUI ([`replay`]).

pub mod event;
pub mod instrument;
pub mod loader;
pub mod replay;
pub mod writer;

pub use event::{decode, encode, CodecError, Event, MODULE_SCOPE};
pub use instrument::{instrument, instrument_block, KnownVars};
pub use loader::{ChangedSet, Stats, Trace};
pub use writer::{
    close_debug_log, debug_log, enter_scope, exit_scope, init_debug_log,
    init_debug_log_with_config, WriterConfig, WriterError,
};
