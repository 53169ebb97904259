//! Sync statistics and summary reporting

use crate::logging::Logger;
use std::time::{Duration, Instant};

/// Counters for one batch of image tasks
#[derive(Debug, Clone)]
pub struct SyncStats {
    pub total_images: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Inspected but left untouched (no-modify mode)
    pub inspected_only: usize,
    pub renamed: usize,
    pub copies: usize,
    pub start_time: Instant,
}

impl SyncStats {
    pub fn new(total_images: usize) -> Self {
        Self {
            total_images,
            succeeded: 0,
            failed: 0,
            inspected_only: 0,
            renamed: 0,
            copies: 0,
            start_time: Instant::now(),
        }
    }

    pub fn mark_succeeded(&mut self) {
        self.succeeded += 1;
    }

    pub fn mark_inspected_only(&mut self) {
        self.inspected_only += 1;
        self.succeeded += 1;
    }

    pub fn mark_failed(&mut self) {
        self.failed += 1;
    }

    pub fn record_copies(&mut self, copies: usize, renamed: bool) {
        self.copies += copies;
        if renamed {
            self.renamed += 1;
        }
    }

    pub fn completed(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn report(&self, logger: &Logger) {
        let mut items = vec![
            ("Images", self.total_images.to_string()),
            ("Succeeded", self.succeeded.to_string()),
            ("Failed", self.failed.to_string()),
        ];
        if self.inspected_only > 0 {
            items.push(("Inspected only", self.inspected_only.to_string()));
        }
        if self.copies > 0 {
            items.push(("Copies", self.copies.to_string()));
        }
        if self.renamed > 0 {
            items.push(("Renamed tags", self.renamed.to_string()));
        }
        items.push(("Elapsed", logger.format_duration(self.elapsed())));
        logger.summary_kv("Sync Summary", &items);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let mut stats = SyncStats::new(4);
        stats.mark_succeeded();
        stats.record_copies(2, true);
        stats.mark_inspected_only();
        stats.mark_failed();

        assert_eq!(stats.completed(), 3);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.copies, 2);
        assert_eq!(stats.renamed, 1);
        assert!(stats.has_failures());
    }
}
