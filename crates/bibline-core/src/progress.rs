//! Progress reporting for TTY and non-TTY environments.
//!
//! TTY mode: one indicatif bar per input source, cleared on completion.
//! Non-TTY mode: hidden bars; the run summary is logged instead.

use std::io::IsTerminal;
use std::sync::Arc;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Input bar: consumed bytes of the source file
fn bytes_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:<24.dim} {bar:30.green/dim} {binary_bytes:>7}/{binary_total_bytes:7} {eta:>4} {wide_msg:.dim}")
        .expect("invalid template")
        .progress_chars("--")
}

/// Input of unknown length (stdin, pipes): spinner with byte count
fn stream_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} {prefix:<22.dim} {binary_bytes:>9} {wide_msg:.dim}")
        .expect("invalid template")
}

/// Central progress context managing multi-progress bars.
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    /// Create new context, detecting TTY automatically.
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty: std::io::stderr().is_terminal(),
        }
    }

    /// Bar for one input source.
    ///
    /// With a known `total` it shows a byte bar, otherwise a spinner.
    /// Hidden (no-op) outside a TTY.
    pub fn source_bar(&self, name: &str, total: Option<u64>) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = match total {
            Some(total) => {
                let pb = self.multi.add(ProgressBar::new(total));
                pb.set_style(bytes_style());
                pb
            }
            None => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(stream_style());
                pb.enable_steady_tick(std::time::Duration::from_millis(120));
                pb
            }
        };
        pb.set_prefix(truncate_name(name, 24).to_string());
        pb
    }

    /// Print a line above managed progress bars.
    pub fn println(&self, msg: impl AsRef<str>) {
        if self.is_tty {
            let _ = self.multi.println(msg);
        } else {
            eprintln!("{}", msg.as_ref());
        }
    }

    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// Get reference to `MultiProgress` for log bridge.
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe wrapper for `ProgressContext`.
pub type SharedProgress = Arc<ProgressContext>;

/// Keep the tail of long names (file names carry the interesting part)
fn truncate_name(name: &str, max: usize) -> &str {
    let count = name.chars().count();
    if count <= max {
        return name;
    }
    let skip = count - max;
    let (idx, _) = name.char_indices().nth(skip).unwrap_or((0, ' '));
    &name[idx..]
}

/// Format number with thousand separators.
pub fn fmt_num(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
