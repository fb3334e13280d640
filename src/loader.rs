//! Trace loader & indexer: reads a trace file into an ordered event vector
//! and builds the small set of derived indices the replay TUI needs (stats,
//! per-name watch history, per-step changed set, the file and scope lists
//! used by the timeline overlay).

use std::collections::HashSet;
use std::path::Path;

use crate::event::{decode, Event, MODULE_SCOPE};

/// Aggregate counters over a whole trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub total_steps: usize,
    pub unique_files: usize,
    pub max_depth: u32,
    pub duration_seconds: f64,
}

/// Per-step diff relative to the previous step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedSet {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
}

impl ChangedSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// The loaded, indexed trace.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    events: Vec<Event>,
    files: Vec<String>,
    scopes: Vec<String>,
}

impl Trace {
    /// Loads a trace file. Malformed lines are skipped; a missing file
    /// yields an empty trace rather than an error.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let contents = match std::fs::read_to_string(path.as_ref()) {
            Ok(c) => c,
            Err(_) => return Self::default(),
        };
        Self::from_lines(contents.lines())
    }

    /// Loads a trace from an in-memory string rather than a file. Used by
    /// tests across the crate that need a `Trace` without touching disk.
    pub fn load_from_str(contents: &str) -> Self {
        Self::from_lines(contents.lines())
    }

    fn from_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Self {
        let mut events = Vec::new();
        let mut files = Vec::new();
        let mut seen_files = HashSet::new();
        let mut scopes = Vec::new();
        let mut seen_scopes = HashSet::new();

        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let Ok(event) = decode(line) else { continue };

            if !event.file.is_empty() && seen_files.insert(event.file.clone()) {
                files.push(event.file.clone());
            }
            if event.scope != MODULE_SCOPE && seen_scopes.insert(event.scope.clone()) {
                scopes.push(event.scope.clone());
            }
            events.push(event);
        }

        Trace { events, files, scopes }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn get(&self, step: usize) -> Option<&Event> {
        self.events.get(step)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Distinct source files referenced, in order of first appearance.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Distinct non-module scopes entered, in order of first appearance.
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn stats(&self) -> Stats {
        let total_steps = self.events.len();
        let max_depth = self.events.iter().map(|e| e.depth).max().unwrap_or(0);
        let duration_seconds = match (self.events.first(), self.events.last()) {
            (Some(first), Some(last)) if self.events.len() >= 2 => last.ts - first.ts,
            _ => 0.0,
        };
        Stats {
            total_steps,
            unique_files: self.files.len(),
            max_depth,
            duration_seconds,
        }
    }

    /// Changed names between step `i` and `i - 1`. Step 0 has no changed
    /// set.
    pub fn changed_names(&self, i: usize) -> ChangedSet {
        if i == 0 || i >= self.events.len() {
            return ChangedSet::default();
        }
        let prev = &self.events[i - 1].vars;
        let cur = &self.events[i].vars;

        let mut added = Vec::new();
        let mut changed = Vec::new();
        for (name, value) in cur {
            match prev.get(name) {
                None => added.push(name.clone()),
                Some(prev_value) if prev_value != value => changed.push(name.clone()),
                Some(_) => {}
            }
        }
        let mut removed: Vec<String> = prev
            .keys()
            .filter(|name| !cur.contains_key(*name))
            .cloned()
            .collect();

        added.sort();
        changed.sort();
        removed.sort();
        ChangedSet { added, removed, changed }
    }

    /// Sequence of `(step, value)` pairs at which `name`'s value differs
    /// from the value last emitted for it. A step where `name` is absent
    /// never emits an entry.
    pub fn watch_history(&self, name: &str) -> Vec<(u64, String)> {
        let mut history = Vec::new();
        let mut last: Option<&str> = None;
        for event in &self.events {
            if let Some(value) = event.vars.get(name) {
                if last != Some(value.as_str()) {
                    history.push((event.step, value.clone()));
                    last = Some(value.as_str());
                }
            }
        }
        history
    }
}
