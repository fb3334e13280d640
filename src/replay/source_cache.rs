//! Append-only source file cache keyed by path. Memory growth is bounded by
//! the number of distinct files referenced in the trace.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct SourceCache {
    cache: HashMap<String, Vec<String>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached lines for `path`, loading and caching them on
    /// first access. A file that can't be read yields an empty slice
    /// rather than an error — the source pane then just renders nothing.
    pub fn lines(&mut self, path: &str) -> &[String] {
        self.cache
            .entry(path.to_string())
            .or_insert_with(|| {
                std::fs::read_to_string(path)
                    .map(|contents| contents.lines().map(|l| l.to_string()).collect())
                    .unwrap_or_default()
            })
            .as_slice()
    }

    pub fn cached_file_count(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_empty_lines_without_error() {
        let mut cache = SourceCache::new();
        let lines = cache.lines("/no/such/file/for/retrace/tests.src");
        assert!(lines.is_empty());
        assert_eq!(cache.cached_file_count(), 1);
    }

    #[test]
    fn reads_and_caches_real_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "line one").unwrap();
        writeln!(file, "line two").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let mut cache = SourceCache::new();
        let lines = cache.lines(&path).to_vec();
        assert_eq!(lines, vec!["line one".to_string(), "line two".to_string()]);
        // Second access must hit the cache, not re-read the file.
        assert_eq!(cache.cached_file_count(), 1);
    }
}
