//! Console output: progress lines, job progress and command results.
//!
//! Progress lines go to stdout in text mode and to stderr otherwise, so
//! `--output json` keeps stdout machine-readable.

use std::io::{self, IsTerminal, Write};
use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use sitectl_core::{JobState, Reporter};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

// ── Reporter ─────────────────────────────────────────────────────────

/// Prints orchestrator progress to the terminal.
pub struct ConsoleReporter {
    quiet: bool,
    color: bool,
    to_stderr: bool,
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleReporter {
    pub fn new(quiet: bool, color: bool, format: OutputFormat) -> Self {
        Self {
            quiet,
            color,
            to_stderr: format != OutputFormat::Text,
            bar: Mutex::new(None),
        }
    }

    fn write_line(&self, line: &str) {
        if self.to_stderr {
            let _ = writeln!(io::stderr().lock(), "{line}");
        } else {
            let _ = writeln!(io::stdout().lock(), "{line}");
        }
    }

    fn show_bar(&self) -> bool {
        !self.quiet && io::stderr().is_terminal()
    }

    fn finish_bar(&self) {
        if let Some(bar) = self.bar.lock().ok().and_then(|mut slot| slot.take()) {
            bar.finish_and_clear();
        }
    }
}

impl Reporter for ConsoleReporter {
    fn info(&self, line: &str) {
        if !self.quiet {
            self.write_line(line);
        }
    }

    fn error(&self, message: &str) {
        let mut stderr = io::stderr().lock();
        if self.color {
            let _ = writeln!(stderr, "{} {message}", "ERROR:".red().bold());
        } else {
            let _ = writeln!(stderr, "ERROR: {message}");
        }
    }

    fn job(&self, state: &JobState) {
        if !self.show_bar() {
            if let JobState::Polling {
                percentage: Some(p),
                ..
            } = state
            {
                self.step(&format!("job in progress: {p}%"));
            }
            return;
        }
        if state.is_terminal() {
            self.finish_bar();
            return;
        }
        let JobState::Polling { percentage, .. } = state else {
            return;
        };
        let Ok(mut slot) = self.bar.lock() else {
            return;
        };
        let bar = slot.get_or_insert_with(|| {
            let bar = ProgressBar::new(100);
            bar.set_style(
                ProgressStyle::with_template(" - job {bar:30} {pos:>3}%")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        });
        if let Some(p) = percentage {
            bar.set_position(u64::from(*p));
        }
    }
}

// ── Result rendering ─────────────────────────────────────────────────

/// Render a result: `text_fn` lines in text mode, serde otherwise.
pub fn render<T: Serialize + ?Sized>(
    format: OutputFormat,
    data: &T,
    text_fn: impl Fn(&T) -> Vec<String>,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Text => Ok(text_fn(data).join("\n")),
        OutputFormat::Json => {
            serde_json::to_string_pretty(data).map_err(|e| CliError::Render(e.to_string()))
        }
        OutputFormat::Yaml => serde_yaml::to_string(data).map_err(|e| CliError::Render(e.to_string())),
    }
}

/// Render a list as a table in text mode, serde otherwise.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
) -> Result<String, CliError>
where
    T: Serialize,
    R: Tabled,
{
    render(format, data, |items| {
        if items.is_empty() {
            return Vec::new();
        }
        let rows: Vec<R> = items.iter().map(&to_row).collect();
        vec![Table::new(rows).with(Style::rounded()).to_string()]
    })
}

/// Print rendered output to stdout. Results are printed even in quiet
/// mode; only progress lines are silenced.
pub fn print_output(output: &str) {
    if output.is_empty() {
        return;
    }
    let _ = writeln!(io::stdout().lock(), "{output}");
}
