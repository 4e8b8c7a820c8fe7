//! Run counters and summary reporting

use std::collections::BTreeMap;
use std::time::Duration;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use crate::error::{RecordError, Skip};
use crate::progress::fmt_num;

/// Counters for one pipeline run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    /// Raw records pulled from the decoder
    pub seen: usize,
    pub converted: usize,
    pub skipped: usize,
    /// Records rejected with a [`RecordError`]
    pub errored: usize,
    /// Units the decoder dropped before conversion
    pub malformed: usize,
    pub batches: usize,
    /// Skip count per reason
    pub skip_reasons: BTreeMap<String, usize>,
    /// Error count per message
    pub error_messages: BTreeMap<String, usize>,
    pub elapsed: Duration,
}

impl RunStats {
    pub fn record_converted(&mut self) {
        self.seen += 1;
        self.converted += 1;
    }

    pub fn record_skip(&mut self, skip: &Skip) {
        self.seen += 1;
        self.skipped += 1;
        *self.skip_reasons.entry(skip.reason().to_string()).or_default() += 1;
    }

    pub fn record_error(&mut self, error: &RecordError) {
        self.seen += 1;
        self.errored += 1;
        *self.error_messages.entry(error.message().to_string()).or_default() += 1;
    }

    /// Records per second over the whole run
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.seen as f64 / secs
        } else {
            0.0
        }
    }

    /// Summary table with one row per counter, skip reason and error message
    pub fn summary_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new("Outcome").fg(Color::Cyan),
                Cell::new("Records").fg(Color::Cyan),
            ]);

        table.add_row(vec![Cell::new("seen"), Cell::new(fmt_num(self.seen))]);
        table.add_row(vec![
            Cell::new("converted").fg(Color::Green),
            Cell::new(fmt_num(self.converted)),
        ]);
        table.add_row(vec![
            Cell::new("skipped").fg(Color::Yellow),
            Cell::new(fmt_num(self.skipped)),
        ]);
        for (reason, count) in &self.skip_reasons {
            table.add_row(vec![
                Cell::new(format!("  {reason}")).fg(Color::DarkGrey),
                Cell::new(fmt_num(*count)),
            ]);
        }
        let errored = if self.errored > 0 {
            Cell::new("errors").fg(Color::Red)
        } else {
            Cell::new("errors")
        };
        table.add_row(vec![errored, Cell::new(fmt_num(self.errored))]);
        for (message, count) in &self.error_messages {
            table.add_row(vec![
                Cell::new(format!("  {message}")).fg(Color::DarkGrey),
                Cell::new(fmt_num(*count)),
            ]);
        }
        table.add_row(vec![
            Cell::new("malformed (decoder)"),
            Cell::new(fmt_num(self.malformed)),
        ]);
        table.add_row(vec![Cell::new("batches"), Cell::new(fmt_num(self.batches))]);
        table
    }

    /// One-line summary at info level
    pub fn log_summary(&self, label: &str) {
        log::info!(
            "{label}: {} seen, {} converted, {} skipped, {} errors, {} malformed in {:.1}s ({:.0} rec/s)",
            fmt_num(self.seen),
            fmt_num(self.converted),
            fmt_num(self.skipped),
            fmt_num(self.errored),
            fmt_num(self.malformed),
            self.elapsed.as_secs_f64(),
            self.throughput(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_add_up() {
        let mut stats = RunStats::default();
        stats.record_converted();
        stats.record_skip(&Skip::new("empty date"));
        stats.record_skip(&Skip::new("empty date").with_detail("ai-162-x"));
        stats.record_skip(&Skip::new("id too long"));
        stats.record_error(&RecordError::new("URL is missing"));

        assert_eq!(stats.seen, 5);
        assert_eq!(stats.converted + stats.skipped + stats.errored, stats.seen);
        assert_eq!(stats.skip_reasons["empty date"], 2);
        assert_eq!(stats.skip_reasons["id too long"], 1);
        assert_eq!(stats.error_messages["URL is missing"], 1);
    }

    #[test]
    fn errors_are_counted_per_message() {
        let mut stats = RunStats::default();
        stats.record_error(&RecordError::new("URL is missing"));
        stats.record_error(&RecordError::new("URL is missing"));
        stats.record_error(&RecordError::new("document without ID"));

        assert_eq!(stats.errored, 3);
        assert_eq!(stats.error_messages.len(), 2);
        assert_eq!(stats.error_messages["URL is missing"], 2);
        assert_eq!(stats.error_messages.values().sum::<usize>(), stats.errored);

        let rendered = stats.summary_table().to_string();
        assert!(rendered.contains("document without ID"));
    }

    #[test]
    fn throughput_zero_elapsed() {
        let stats = RunStats {
            seen: 10,
            ..Default::default()
        };
        assert_eq!(stats.throughput(), 0.0);
    }

    #[test]
    fn throughput_per_second() {
        let stats = RunStats {
            seen: 500,
            elapsed: Duration::from_secs(2),
            ..Default::default()
        };
        assert_eq!(stats.throughput(), 250.0);
    }

    #[test]
    fn summary_lists_skip_reasons() {
        let mut stats = RunStats::default();
        stats.record_skip(&Skip::new("short date"));
        let rendered = stats.summary_table().to_string();
        assert!(rendered.contains("short date"));
        assert!(rendered.contains("converted"));
    }
}
