//! Per-operation counters.
//!
//! A [`CacheReport`] is created by the caller for one top-level operation and
//! threaded through cache calls by `&mut`. Nothing here is global, so two
//! concurrent operations never share counts.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheReport {
    /// Lookups answered from disk with a fresh record
    pub hits: u64,
    /// Lookups that found nothing usable
    pub misses: u64,
    /// Lookups that found a record past its freshness basis
    pub stale: u64,
    /// Records that failed to decode and were discarded
    pub corrupt: u64,
    pub fetches: u64,
    pub fetch_failures: u64,
    pub puts: u64,
    /// Items handled by get/put calls
    pub processed: u64,
    /// Writes that changed stored bytes
    pub changed: u64,
    pub invalidated: u64,
}

impl CacheReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_stale(&mut self) {
        self.stale += 1;
    }

    pub fn record_corrupt(&mut self) {
        self.corrupt += 1;
    }

    pub fn record_fetch(&mut self) {
        self.fetches += 1;
    }

    pub fn record_fetch_failure(&mut self) {
        self.fetch_failures += 1;
    }

    pub fn record_put(&mut self) {
        self.puts += 1;
    }

    pub fn record_processed(&mut self) {
        self.processed += 1;
    }

    pub fn record_changed(&mut self) {
        self.changed += 1;
    }

    pub fn record_invalidated(&mut self, count: usize) {
        self.invalidated += count as u64;
    }

    /// Fold another report's counts into this one.
    pub fn merge(&mut self, other: &CacheReport) {
        self.hits += other.hits;
        self.misses += other.misses;
        self.stale += other.stale;
        self.corrupt += other.corrupt;
        self.fetches += other.fetches;
        self.fetch_failures += other.fetch_failures;
        self.puts += other.puts;
        self.processed += other.processed;
        self.changed += other.changed;
        self.invalidated += other.invalidated;
    }

    /// Copy of the current counts, e.g. for JSON output mid-operation.
    pub fn snapshot(&self) -> CacheReport {
        *self
    }

    pub fn lookups(&self) -> u64 {
        self.hits + self.misses + self.stale
    }

    /// Fraction of lookups served without fetching.
    pub fn hit_rate(&self) -> f64 {
        let total = self.lookups();
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }

    /// Format a human-readable report.
    pub fn format_report(&self) -> String {
        let mut lines = Vec::new();
        lines.push("Cache Report".to_string());
        lines.push("=".repeat(50));
        lines.push("Lookups:".to_string());
        lines.push(format!("  Hits:            {}", self.hits));
        lines.push(format!("  Misses:          {}", self.misses));
        lines.push(format!("  Stale:           {}", self.stale));
        lines.push(format!("  Corrupt:         {}", self.corrupt));
        lines.push(format!("  Hit Rate:        {:.1}%", self.hit_rate() * 100.0));
        lines.push(String::new());
        lines.push("Fetches:".to_string());
        lines.push(format!("  Attempted:       {}", self.fetches));
        lines.push(format!("  Failed:          {}", self.fetch_failures));
        lines.push(String::new());
        lines.push("Writes:".to_string());
        lines.push(format!("  Puts:            {}", self.puts));
        lines.push(format!("  Processed:       {}", self.processed));
        lines.push(format!("  Changed:         {}", self.changed));
        lines.push(format!("  Invalidated:     {}", self.invalidated));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let mut report = CacheReport::new();
        assert_eq!(report.hit_rate(), 0.0);
        report.record_hit();
        report.record_hit();
        report.record_hit();
        report.record_miss();
        assert!((report.hit_rate() - 0.75).abs() < f64::EPSILON);
        report.record_stale();
        assert!((report.hit_rate() - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn test_merge() {
        let mut left = CacheReport::new();
        left.record_fetch();
        left.record_invalidated(3);
        let mut right = CacheReport::new();
        right.record_fetch();
        right.record_fetch_failure();

        left.merge(&right);
        assert_eq!(left.fetches, 2);
        assert_eq!(left.fetch_failures, 1);
        assert_eq!(left.invalidated, 3);
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut report = CacheReport::new();
        report.record_put();
        report.record_changed();
        let json = serde_json::to_value(report.snapshot()).unwrap();
        assert_eq!(json["puts"], 1);
        assert_eq!(json["changed"], 1);
        assert_eq!(json["hits"], 0);
    }

    #[test]
    fn test_format_report() {
        let mut report = CacheReport::new();
        report.record_hit();
        report.record_miss();
        let text = report.format_report();
        assert!(text.starts_with("Cache Report"));
        assert!(text.contains("Hit Rate:        50.0%"));
    }
}
