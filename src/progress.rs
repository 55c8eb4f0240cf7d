//! Terminal progress for reconciliation passes.

use authsync::{Error, ProviderState, ReconcileObserver, Scheme, SchemePhase, SchemeReport};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::ui;

/// Shows a spinner while a scheme is in flight and one line per outcome
pub struct TerminalObserver {
    quiet: bool,
    spinner: Option<ProgressBar>,
    applied: usize,
    in_sync: usize,
}

impl TerminalObserver {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            spinner: None,
            applied: 0,
            in_sync: 0,
        }
    }

    /// Schemes written so far
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Schemes found already matching
    pub fn in_sync(&self) -> usize {
        self.in_sync
    }

    fn finish_spinner(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }
}

impl ReconcileObserver for TerminalObserver {
    fn on_scheme_start(&mut self, scheme: Scheme) {
        let pb = if self.quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        if let Ok(style) = ProgressStyle::with_template("  {spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("{scheme} authentication"));
        pb.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(pb);
    }

    fn on_scheme_complete(&mut self, report: &SchemeReport, _state: Option<&ProviderState>) {
        self.finish_spinner();
        match report.phase {
            SchemePhase::Applied => self.applied += 1,
            SchemePhase::Merged => self.in_sync += 1,
            _ => {}
        }
        if self.quiet {
            return;
        }
        let detail = if report.changed_keys.is_empty() {
            String::new()
        } else {
            format!(" ({})", report.changed_keys.join(", "))
        };
        println!(
            "  {} {} {}{}",
            "✓".green(),
            report.scheme,
            ui::phase_label(report.phase),
            detail.dimmed()
        );
    }

    fn on_scheme_failed(&mut self, scheme: Scheme, error: &Error) {
        self.finish_spinner();
        println!("  {} {} {}", "✗".red(), scheme, error);
    }
}

impl Drop for TerminalObserver {
    fn drop(&mut self) {
        self.finish_spinner();
    }
}
