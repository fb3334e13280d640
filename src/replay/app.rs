//! Replay TUI input state machine: navigation, search, breakpoints,
//! watches, and the modal overlays, decoupled from rendering (see
//! [`crate::replay::ui`]) so the whole state machine is unit-testable
//! without a real terminal.

use crossterm::event::{KeyCode, KeyEvent};
use indexmap::IndexSet;

use crate::loader::Trace;
use crate::replay::source_cache::SourceCache;

const PAGE_SIZE: usize = 10;

/// A `(file-suffix, line)` pair. File comparison is suffix-based so a bare
/// filename matches a full path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    pub file_suffix: String,
    pub line: u32,
}

impl Breakpoint {
    pub fn matches(&self, file: &str, line: u32) -> bool {
        line == self.line && file.ends_with(self.file_suffix.as_str())
    }
}

fn parse_breakpoint(spec: &str) -> Option<Breakpoint> {
    let (file, line) = spec.rsplit_once(':')?;
    if file.is_empty() {
        return None;
    }
    let line: u32 = line.parse().ok()?;
    Some(Breakpoint { file_suffix: file.to_string(), line })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Normal,
    SearchPrompt,
    JumpPrompt,
    BreakPrompt,
    WatchPrompt,
    Help,
    Timeline,
    Inspect(String),
}

fn is_prompt_char(c: char) -> bool {
    c.is_ascii_graphic() || c == ' '
}

/// The TUI's whole mutable state, driven by a single-threaded cooperative
/// loop: render, block for one key, dispatch, loop.
pub struct App {
    pub trace: Trace,
    pub pos: usize,
    pub mode: Mode,
    pub input: String,
    pub status: Option<String>,
    pub breakpoints: Vec<Breakpoint>,
    pub watches: IndexSet<String>,
    pub selected_var_index: usize,
    pub search_results: Vec<usize>,
    pub search_index: usize,
    pub source_cache: SourceCache,
    pub should_quit: bool,
}

/// Empty/missing traces are refused at construction: the replay binary
/// exits non-zero before entering full-screen mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyTraceError;

impl App {
    pub fn new(trace: Trace) -> Result<Self, EmptyTraceError> {
        if trace.is_empty() {
            return Err(EmptyTraceError);
        }
        Ok(App {
            trace,
            pos: 0,
            mode: Mode::Normal,
            input: String::new(),
            status: None,
            breakpoints: Vec::new(),
            watches: IndexSet::new(),
            selected_var_index: 0,
            search_results: Vec::new(),
            search_index: 0,
            source_cache: SourceCache::new(),
            should_quit: false,
        })
    }

    fn last_step(&self) -> usize {
        self.trace.len().saturating_sub(1)
    }

    fn set_pos(&mut self, new_pos: usize) {
        self.pos = new_pos.min(self.last_step());
        self.selected_var_index = 0;
    }

    // -- Navigation ---------------------------------------------------------

    pub fn step_forward(&mut self) {
        self.set_pos((self.pos + 1).min(self.last_step()));
    }

    pub fn step_backward(&mut self) {
        self.set_pos(self.pos.saturating_sub(1));
    }

    pub fn page_down(&mut self) {
        self.set_pos((self.pos + PAGE_SIZE).min(self.last_step()));
    }

    pub fn page_up(&mut self) {
        self.set_pos(self.pos.saturating_sub(PAGE_SIZE));
    }

    pub fn home(&mut self) {
        self.set_pos(0);
    }

    pub fn end(&mut self) {
        self.set_pos(self.last_step());
    }

    pub fn jump(&mut self, step: usize) {
        if step <= self.last_step() {
            self.set_pos(step);
            self.status = None;
        } else {
            self.status = Some(format!("Step {step} out of range (0..{})", self.last_step()));
        }
    }

    fn jump_from_input(&mut self) {
        match self.input.parse::<usize>() {
            Ok(step) => self.jump(step),
            Err(_) => self.status = Some(format!("Invalid step: {}", self.input)),
        }
    }

    pub fn continue_to_breakpoint(&mut self) {
        for i in (self.pos + 1)..self.trace.len() {
            if let Some(event) = self.trace.get(i) {
                if self.breakpoints.iter().any(|bp| bp.matches(&event.file, event.line)) {
                    self.set_pos(i);
                    self.status = None;
                    return;
                }
            }
        }
        self.status = Some("No breakpoint hit".to_string());
    }

    pub fn reverse_to_breakpoint(&mut self) {
        for i in (0..self.pos).rev() {
            if let Some(event) = self.trace.get(i) {
                if self.breakpoints.iter().any(|bp| bp.matches(&event.file, event.line)) {
                    self.set_pos(i);
                    self.status = None;
                    return;
                }
            }
        }
        self.status = Some("No breakpoint hit".to_string());
    }

    pub fn set_breakpoint(&mut self, spec: &str) {
        match parse_breakpoint(spec) {
            Some(bp) => {
                self.breakpoints.push(bp);
                self.status = None;
            }
            None => self.status = Some(format!("Invalid breakpoint: {spec}")),
        }
    }

    // -- Search ---------------------------------------------------------

    pub fn run_search(&mut self, pattern: &str) {
        let needle = pattern.to_lowercase();
        let results: Vec<usize> = self
            .trace
            .events()
            .iter()
            .enumerate()
            .filter(|(_, event)| {
                event.desc.to_lowercase().contains(&needle)
                    || event.file.to_lowercase().contains(&needle)
                    || event.scope.to_lowercase().contains(&needle)
                    || event
                        .vars
                        .iter()
                        .any(|(k, v)| k.to_lowercase().contains(&needle) || v.to_lowercase().contains(&needle))
            })
            .map(|(i, _)| i)
            .collect();

        self.search_index = 0;
        if let Some(&first) = results.first() {
            self.set_pos(first);
            self.status = Some(format!("{} match(es) for \"{pattern}\"", results.len()));
        } else {
            self.status = Some(format!("No matches for \"{pattern}\""));
        }
        self.search_results = results;
    }

    pub fn search_next(&mut self) {
        if self.search_results.is_empty() {
            return;
        }
        self.search_index = (self.search_index + 1) % self.search_results.len();
        self.set_pos(self.search_results[self.search_index]);
    }

    pub fn search_prev(&mut self) {
        if self.search_results.is_empty() {
            return;
        }
        self.search_index = (self.search_index + self.search_results.len() - 1) % self.search_results.len();
        self.set_pos(self.search_results[self.search_index]);
    }

    // -- Watches & diff -----------------------------------------------------

    pub fn toggle_watch(&mut self, name: &str) {
        if self.watches.shift_remove(name) {
            self.status = Some(format!("Unwatched {name}"));
        } else {
            self.watches.insert(name.to_string());
            self.status = Some(format!("Watching {name}"));
        }
    }

    pub fn list_watches(&mut self) {
        self.status = Some(if self.watches.is_empty() {
            "No watches".to_string()
        } else {
            self.watches.iter().cloned().collect::<Vec<_>>().join(", ")
        });
    }

    /// Changed names relative to the previous step, joined by spaces with
    /// `+`/`~`/`-` prefixes.
    pub fn diff_string(&self) -> String {
        let diff = self.trace.changed_names(self.pos);
        let mut parts = Vec::new();
        parts.extend(diff.added.iter().map(|n| format!("+{n}")));
        parts.extend(diff.changed.iter().map(|n| format!("~{n}")));
        parts.extend(diff.removed.iter().map(|n| format!("-{n}")));
        if parts.is_empty() {
            "(no changes)".to_string()
        } else {
            parts.join(" ")
        }
    }

    pub fn run_diff(&mut self) {
        self.status = Some(self.diff_string());
    }

    /// Names known at the current step, sorted.
    pub fn current_var_names(&self) -> Vec<String> {
        let Some(event) = self.trace.get(self.pos) else {
            return Vec::new();
        };
        let mut names: Vec<String> = event.vars.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn move_selection(&mut self, delta: isize) {
        let names = self.current_var_names();
        if names.is_empty() {
            self.selected_var_index = 0;
            return;
        }
        let len = names.len() as isize;
        let cur = self.selected_var_index as isize;
        let next = (cur + delta).rem_euclid(len);
        self.selected_var_index = next as usize;
    }

    pub fn selected_var_name(&self) -> Option<String> {
        self.current_var_names().get(self.selected_var_index).cloned()
    }

    // -- Input state machine ------------------------------------------------

    pub fn handle_key(&mut self, key: KeyEvent) {
        match self.mode.clone() {
            Mode::Normal => self.handle_normal_key(key),
            Mode::SearchPrompt => self.handle_prompt_key(key, |app| {
                let pattern = app.input.clone();
                app.run_search(&pattern);
            }),
            Mode::JumpPrompt => self.handle_digit_prompt_key(key),
            Mode::BreakPrompt => self.handle_prompt_key(key, |app| {
                let spec = app.input.clone();
                app.set_breakpoint(&spec);
            }),
            Mode::WatchPrompt => self.handle_prompt_key(key, |app| {
                if app.input.is_empty() {
                    app.list_watches();
                } else {
                    let name = app.input.clone();
                    app.toggle_watch(&name);
                }
            }),
            Mode::Help | Mode::Timeline | Mode::Inspect(_) => {
                // Any key dismisses the overlay.
                self.mode = Mode::Normal;
            }
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Right => self.step_forward(),
            KeyCode::Left => self.step_backward(),
            KeyCode::PageDown => self.page_down(),
            KeyCode::PageUp => self.page_up(),
            KeyCode::Home => self.home(),
            KeyCode::End => self.end(),
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::Char('c') => self.continue_to_breakpoint(),
            KeyCode::Char('r') => self.reverse_to_breakpoint(),
            KeyCode::Char('d') => self.run_diff(),
            KeyCode::Char('n') => self.search_next(),
            KeyCode::Char('p') => self.search_prev(),
            KeyCode::Char('/') | KeyCode::Char('f') => self.enter_prompt(Mode::SearchPrompt),
            KeyCode::Char('g') => self.enter_prompt(Mode::JumpPrompt),
            KeyCode::Char('b') => self.enter_prompt(Mode::BreakPrompt),
            KeyCode::Char('w') => self.enter_prompt(Mode::WatchPrompt),
            KeyCode::Char('h') => self.mode = Mode::Help,
            KeyCode::Char('t') => self.mode = Mode::Timeline,
            KeyCode::Char('v') => {
                if let Some(name) = self.selected_var_name() {
                    self.mode = Mode::Inspect(name);
                } else {
                    self.status = Some("No variable selected".to_string());
                }
            }
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
    }

    fn enter_prompt(&mut self, mode: Mode) {
        self.mode = mode;
        self.input.clear();
        self.status = None;
    }

    fn handle_prompt_key(&mut self, key: KeyEvent, on_enter: impl FnOnce(&mut App)) {
        match key.code {
            KeyCode::Enter => {
                on_enter(self);
                self.mode = Mode::Normal;
            }
            KeyCode::Esc => {
                self.input.clear();
                self.mode = Mode::Normal;
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) if is_prompt_char(c) => self.input.push(c),
            _ => {}
        }
    }

    fn handle_digit_prompt_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                self.jump_from_input();
                self.mode = Mode::Normal;
            }
            KeyCode::Esc => {
                self.input.clear();
                self.mode = Mode::Normal;
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() => self.input.push(c),
            _ => {}
        }
    }
}
