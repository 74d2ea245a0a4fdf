use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use organizer_core::actions::ActionResult;
use organizer_core::ProgressReporter;
use std::sync::Mutex;
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// indicatif bars for the organize pipeline.
///
/// - Scan: spinner (total unknown upfront)
/// - Hash: bar over the size-bucket candidates
/// - Execute: bar over the plan
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some(pb);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }

    fn counting_bar(total: usize, label: &str, unit: &str) -> ProgressBar {
        let pb = ProgressBar::new(total as u64);
        let template =
            format!("  {{spinner:.cyan}} {label} [{{bar:30.cyan/dim}}] {{pos}}/{{len}} {unit}");
        let style = ProgressStyle::with_template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━╸─")
            .tick_chars(TICK_CHARS);
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }
}

fn done(message: String) {
    eprintln!("  {} {}", "✓".green(), message);
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self, root: &str) {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars(TICK_CHARS);
        pb.set_style(style);
        pb.set_message(format!("Scanning {}...", root));
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_scan_complete(&self, total_files: usize, duration_secs: f64) {
        self.finish_bar();
        done(format!(
            "Scan complete: {} files in {:.2}s",
            total_files, duration_secs
        ));
    }

    fn on_hash_start(&self, candidates: usize) {
        self.set_bar(Self::counting_bar(candidates, "Hashing", "files"));
    }

    fn on_hash_progress(&self, files_hashed: usize, total_files: usize) {
        self.with_bar(|pb| {
            if pb.length() != Some(total_files as u64) {
                pb.set_length(total_files as u64);
            }
            pb.set_position(files_hashed as u64);
        });
    }

    fn on_hash_complete(&self, duplicate_groups: usize, duration_secs: f64) {
        self.finish_bar();
        done(format!(
            "Hash complete: {} duplicate groups in {:.2}s",
            duplicate_groups, duration_secs
        ));
    }

    fn on_execute_start(&self, total_actions: usize) {
        if total_actions > 0 {
            self.set_bar(Self::counting_bar(total_actions, "Organizing", "actions"));
        }
    }

    fn on_action_complete(&self, index: usize, result: &ActionResult) {
        self.with_bar(|pb| {
            if let Some(error) = &result.error {
                pb.println(format!("  {} {}: {}", "✗".red(), result.action, error));
            }
            pb.set_position(index as u64 + 1);
        });
    }

    fn on_execute_complete(&self, succeeded: usize, failed: usize, duration_secs: f64) {
        self.finish_bar();
        if succeeded + failed > 0 {
            done(format!(
                "Organize complete: {} succeeded, {} failed in {:.2}s",
                succeeded, failed, duration_secs
            ));
        }
    }
}
