//! Runtime trace writer.
//!
//! Process-wide, lazily-initialised singleton: a step counter, a depth/scope
//! tracker, and a line-oriented append file. Thread-safety is provided by a
//! single [`Mutex`] guarding the whole slot — one writer per process is the
//! documented contract, not something enforced beyond that lock (a caller
//! emitting from multiple threads still gets correct interleaving, just not
//! the per-thread scope/depth this design assumes).

use std::collections::{BTreeMap, VecDeque};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::event::{encode, Event, MODULE_SCOPE};

/// Environment variable that overrides the default trace path.
pub const TRACE_PATH_ENV_VAR: &str = "RETRACE_TRACE_PATH";

/// Default trace path when neither an explicit path nor the environment
/// variable is given.
pub const DEFAULT_TRACE_PATH: &str = ".debug.trace";

/// Size of the tail window kept for the human-readable summary.
const RING_CAPACITY: usize = 15;

/// Value substituted when stringification panics.
pub const ERROR_REPR: &str = "<error>";

/// Value substituted when a program has no stringification capability for
/// a captured local at all (as opposed to one that merely failed).
pub const NO_REPRESENTATION: &str = "<no representation>";

/// Truncation width applied to each variable's value inside the summary
/// file. Deliberately distinct from [`crate::event::Event`]'s 80-column
/// description truncation — the two are separate constants on purpose.
pub const SUMMARY_VALUE_TRUNCATION: usize = 30;

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("failed to open trace file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Safely stringifies a value: catches any panic raised while formatting and
/// substitutes [`ERROR_REPR`], so `emit` itself can never fail from value
/// capture.
pub fn safe_repr<F>(f: F) -> String
where
    F: FnOnce() -> String,
{
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(f))
        .unwrap_or_else(|_| ERROR_REPR.to_string())
}

struct WriterState {
    path: PathBuf,
    file: File,
    next_step: u64,
    depth: u32,
    scope: String,
    ring: VecDeque<Event>,
    max_depth: u32,
    scopes_seen: Vec<String>,
}

enum Slot {
    Uninit,
    Active(WriterState),
    Disabled,
}

static STATE: Mutex<Slot> = Mutex::new(Slot::Uninit);
static HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Writer configuration: a plain struct of optional fields with a `Default`
/// impl a constructor fills in, rather than a bag of positional arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriterConfig {
    /// An explicit trace path. Wins over [`TRACE_PATH_ENV_VAR`] when set.
    pub path: Option<PathBuf>,
}

impl WriterConfig {
    pub fn resolve(&self) -> PathBuf {
        resolve_path(self.path.as_deref().and_then(|p| p.to_str()))
    }
}

fn resolve_path(explicit: Option<&str>) -> PathBuf {
    // An explicit path always wins over the environment variable.
    if let Some(p) = explicit {
        return PathBuf::from(p);
    }
    if let Ok(p) = std::env::var(TRACE_PATH_ENV_VAR) {
        if !p.is_empty() {
            return PathBuf::from(p);
        }
    }
    PathBuf::from(DEFAULT_TRACE_PATH)
}

extern "C" fn atexit_hook() {
    close_debug_log();
}

fn install_exit_hook_once() {
    if HOOK_INSTALLED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
    {
        // SAFETY: `atexit_hook` is a plain `extern "C" fn()` with no
        // captures; libc guarantees it runs once at normal process exit.
        unsafe {
            libc::atexit(atexit_hook);
        }
    }
}

/// Opens (truncating) the trace file and resets all counters. Safe to call
/// more than once; each call starts a fresh trace.
///
/// A failure to open the trace file is fatal *for the writer only*: the
/// slot becomes [`Slot::Disabled`] and every subsequent `emit` silently does
/// nothing rather than propagating into instrumented code.
pub fn init_debug_log(path: Option<&str>) {
    init_debug_log_with_config(WriterConfig { path: path.map(PathBuf::from) })
}

/// As [`init_debug_log`], taking a [`WriterConfig`] instead of a bare path.
pub fn init_debug_log_with_config(config: WriterConfig) {
    let resolved = config.resolve();
    let mut guard = STATE.lock().unwrap();
    match File::create(&resolved) {
        Ok(file) => {
            *guard = Slot::Active(WriterState {
                path: resolved,
                file,
                next_step: 0,
                depth: 0,
                scope: MODULE_SCOPE.to_string(),
                ring: VecDeque::with_capacity(RING_CAPACITY),
                max_depth: 0,
                scopes_seen: Vec::new(),
            });
            drop(guard);
            install_exit_hook_once();
        }
        Err(source) => {
            let err = WriterError::Open { path: resolved, source };
            eprintln!("retrace: {err}");
            *guard = Slot::Disabled;
        }
    }
}

fn now_ts() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Emits one event. Lazily initialises the writer (with the default path)
/// if nothing has called [`init_debug_log`] yet. Returns the assigned step
/// number, or `None` if the writer is disabled (open failure) or was never
/// able to initialise.
pub fn debug_log(
    file: &str,
    line: u32,
    col: u32,
    desc: &str,
    vars: BTreeMap<String, String>,
) -> Option<u64> {
    let mut guard = STATE.lock().unwrap();
    if matches!(*guard, Slot::Uninit) {
        drop(guard);
        init_debug_log(None);
        guard = STATE.lock().unwrap();
    }
    let state = match &mut *guard {
        Slot::Active(s) => s,
        _ => return None,
    };

    let event = Event {
        step: state.next_step,
        ts: now_ts(),
        file: file.to_string(),
        line,
        col,
        desc: Event::truncate_with_ellipsis(desc, 80),
        depth: state.depth,
        scope: state.scope.clone(),
        vars,
    };
    state.next_step += 1;

    let mut line_text = encode(&event);
    line_text.push('\n');
    let _ = state.file.write_all(line_text.as_bytes());
    let _ = state.file.flush();

    if state.ring.len() == RING_CAPACITY {
        state.ring.pop_front();
    }
    state.ring.push_back(event.clone());
    state.max_depth = state.max_depth.max(state.depth);

    Some(event.step)
}

/// Sets the current scope and increases depth. Called by instrumented
/// procedure bodies on entry.
pub fn enter_scope(name: &str) {
    let mut guard = STATE.lock().unwrap();
    if let Slot::Active(state) = &mut *guard {
        state.scope = name.to_string();
        state.depth += 1;
        if !state.scopes_seen.iter().any(|s| s == name) {
            state.scopes_seen.push(name.to_string());
        }
        state.max_depth = state.max_depth.max(state.depth);
    }
}

/// Decreases depth; clamps to zero and resets scope to the module sentinel
/// once depth reaches zero.
pub fn exit_scope() {
    let mut guard = STATE.lock().unwrap();
    if let Slot::Active(state) = &mut *guard {
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            state.scope = MODULE_SCOPE.to_string();
        }
    }
}

fn summary_path(trace_path: &Path) -> PathBuf {
    let file_name = trace_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let new_name = match file_name.rfind('.') {
        Some(idx) if idx > 0 => format!("{}.summary", &file_name[..idx]),
        _ => format!("{file_name}.summary"),
    };
    trace_path.with_file_name(new_name)
}

fn render_summary(state: &WriterState) -> String {
    let mut out = String::new();
    out.push_str("# Debug Summary\n");
    out.push_str(&format!("# Total steps: {}\n", state.next_step));
    out.push_str(&format!("# Max depth: {}\n", state.max_depth));
    out.push_str(&format!("# Scopes: {}\n", state.scopes_seen.join(" -> ")));
    out.push('\n');
    out.push_str("# Last K steps:\n");
    for event in &state.ring {
        out.push_str(&format!(
            "[{}] {}:{} ({}) | {}\n",
            event.step, event.file, event.line, event.scope, event.desc
        ));
        if !event.vars.is_empty() {
            let parts: Vec<String> = event
                .vars
                .iter()
                .map(|(k, v)| {
                    format!(
                        "{}={}",
                        k,
                        Event::truncate_with_ellipsis(v, SUMMARY_VALUE_TRUNCATION)
                    )
                })
                .collect();
            out.push_str(&format!("    vars: {}\n", parts.join(", ")));
        }
    }
    out
}

/// Writes the summary file and closes the trace file handle. Idempotent:
/// calling it when nothing is active does nothing. After closing, the slot
/// returns to `Uninit` so a later `emit` can lazily reopen a fresh trace.
pub fn close_debug_log() {
    let mut guard = STATE.lock().unwrap();
    let state = match std::mem::replace(&mut *guard, Slot::Uninit) {
        Slot::Active(s) => s,
        other => {
            *guard = other;
            return;
        }
    };
    drop(guard);

    let summary = render_summary(&state);
    let path = summary_path(&state.path);
    let _ = std::fs::write(path, summary);
    drop(state.file);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    // The writer is process-global state; serialise tests that touch it so
    // they don't stomp on each other's trace files.
    static TEST_LOCK: StdMutex<()> = StdMutex::new(());

    fn with_temp_path() -> PathBuf {
        let dir = std::env::temp_dir();
        let unique = format!(
            "retrace-writer-test-{:?}-{}",
            std::thread::current().id(),
            now_ts()
        );
        dir.join(unique)
    }

    #[test]
    fn emit_assigns_dense_steps_and_flushes() {
        let _guard = TEST_LOCK.lock().unwrap();
        let path = with_temp_path();
        init_debug_log(Some(path.to_str().unwrap()));

        let step0 = debug_log("t.src", 1, 0, "var x = 10", BTreeMap::new());
        let mut vars = BTreeMap::new();
        vars.insert("x".to_string(), "10".to_string());
        let step1 = debug_log("t.src", 2, 0, "x = x + 1", vars);
        close_debug_log();

        assert_eq!(step0, Some(0));
        assert_eq!(step1, Some(1));

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Event = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.step, 0);
        assert_eq!(first.depth, 0);
        assert_eq!(first.scope, MODULE_SCOPE);

        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_file(summary_path(&path));
    }

    #[test]
    fn scope_enter_exit_tracks_depth_and_resets_sentinel() {
        let _guard = TEST_LOCK.lock().unwrap();
        let path = with_temp_path();
        init_debug_log(Some(path.to_str().unwrap()));

        enter_scope("f");
        let step = debug_log("t.src", 5, 0, "echo y", BTreeMap::new());
        exit_scope();
        let after = debug_log("t.src", 6, 0, "echo done", BTreeMap::new());
        close_debug_log();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        let inside: Event = serde_json::from_str(lines[0]).unwrap();
        let outside: Event = serde_json::from_str(lines[1]).unwrap();

        assert_eq!(step, Some(0));
        assert_eq!(after, Some(1));
        assert_eq!(inside.depth, 1);
        assert_eq!(inside.scope, "f");
        assert_eq!(outside.depth, 0);
        assert_eq!(outside.scope, MODULE_SCOPE);

        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_file(summary_path(&path));
    }

    #[test]
    fn open_failure_disables_writer_without_panicking() {
        let _guard = TEST_LOCK.lock().unwrap();
        // A path under a nonexistent directory cannot be created.
        let bogus = PathBuf::from("/nonexistent-dir-for-retrace-tests/trace");
        init_debug_log(Some(bogus.to_str().unwrap()));
        let step = debug_log("t.src", 1, 0, "x", BTreeMap::new());
        assert_eq!(step, None);
    }

    #[test]
    fn writer_config_prefers_explicit_path_over_env_var() {
        let _guard = TEST_LOCK.lock().unwrap();
        std::env::set_var(TRACE_PATH_ENV_VAR, "/tmp/from-env.trace");
        let config = WriterConfig { path: Some(PathBuf::from("/tmp/from-config.trace")) };
        assert_eq!(config.resolve(), PathBuf::from("/tmp/from-config.trace"));
        std::env::remove_var(TRACE_PATH_ENV_VAR);
    }

    #[test]
    fn writer_config_default_falls_back_to_default_path() {
        let _guard = TEST_LOCK.lock().unwrap();
        std::env::remove_var(TRACE_PATH_ENV_VAR);
        assert_eq!(WriterConfig::default().resolve(), PathBuf::from(DEFAULT_TRACE_PATH));
    }

    #[test]
    fn summary_path_replaces_extension() {
        assert_eq!(
            summary_path(Path::new(".debug.trace")),
            PathBuf::from(".debug.summary")
        );
        assert_eq!(
            summary_path(Path::new("/tmp/run.trace")),
            PathBuf::from("/tmp/run.summary")
        );
    }

    #[test]
    fn safe_repr_substitutes_error_on_panic() {
        let result = safe_repr(|| panic!("boom"));
        assert_eq!(result, ERROR_REPR);
    }

    #[test]
    fn safe_repr_passes_through_normal_value() {
        let result = safe_repr(|| 42.to_string());
        assert_eq!(result, "42");
    }
}
