use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// A running spinner and the line to print when it finishes successfully.
pub struct Spinner {
    bar: ProgressBar,
    message: String,
    done_message: String,
}

impl Spinner {
    pub fn message(&self) -> &str {
        &self.message
    }
}

pub trait StatusReporter {
    fn start_spinner(&self, message: &str, done_message: &str) -> Spinner;
    fn stop_ok(&self, spinner: Spinner);
    fn stop_warn_ok(&self, spinner: Spinner);
    fn stop_fail(&self, spinner: Spinner);
    fn info(&self, message: &str);
}

/// Terminal reporter. With `hidden` set the spinner is never drawn, but the
/// final status lines are still printed.
pub struct SpinnerReporter {
    hidden: bool,
}

impl SpinnerReporter {
    pub fn new(hidden: bool) -> Self {
        Self { hidden }
    }
}

impl StatusReporter for SpinnerReporter {
    fn start_spinner(&self, message: &str, done_message: &str) -> Spinner {
        let bar = if self.hidden {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner:.blue.bold} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        bar.set_message(message.to_string());

        Spinner {
            bar,
            message: message.to_string(),
            done_message: done_message.to_string(),
        }
    }

    fn stop_ok(&self, spinner: Spinner) {
        spinner.bar.finish_and_clear();
        println!("{}", spinner.done_message);
    }

    fn stop_warn_ok(&self, spinner: Spinner) {
        spinner.bar.finish_and_clear();
        println!("{}... [{}]", spinner.message(), "OK".yellow());
    }

    fn stop_fail(&self, spinner: Spinner) {
        spinner.bar.finish_and_clear();
        println!("{}... [{}]", spinner.message(), "FAIL".red());
    }

    fn info(&self, message: &str) {
        println!("{}", message.cyan());
    }
}
