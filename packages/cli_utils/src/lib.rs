#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the link corridor tools.
//!
//! [`IndicatifProgress`] renders [`ProgressCallback`] updates from the tower
//! import and the corridor search. [`init_logger`] routes `log` output
//! through `indicatif-log-bridge` so log lines do not tear the bars.

use std::sync::Arc;
use std::time::Duration;

use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use link_corridor_search_models::progress::ProgressCallback;

pub use indicatif::MultiProgress;

/// An `indicatif` [`ProgressBar`] behind [`ProgressCallback`].
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Applied once `set_total()` reports a length.
    bar_style: ProgressStyle,
}

impl IndicatifProgress {
    fn spinner(multi: &MultiProgress, template: &str, message: &str, bar_template: &str) -> Self {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template(template)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let bar_style = ProgressStyle::with_template(bar_template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");

        Self { bar, bar_style }
    }

    /// Row counter for an FCC import. The record files carry no row
    /// count, so this stays a spinner showing rows written unless a total
    /// is set.
    #[must_use]
    pub fn import_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        Arc::new(Self::spinner(
            multi,
            "{spinner:.cyan} {msg} {human_pos} rows [{elapsed}]",
            message,
            "  {msg} {wide_bar:.cyan/dim} {human_pos}/{human_len} {percent}% [{eta}]",
        ))
    }

    /// Indicator for a corridor search. Shows elapsed time while pages
    /// are fetched, and becomes a bar if the caller learns a total.
    #[must_use]
    pub fn search_spinner(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        Arc::new(Self::spinner(
            multi,
            "{spinner:.yellow} {msg} [{elapsed}]",
            message,
            "  {msg} {wide_bar:.yellow/dim} {pos}/{len} [{elapsed}]",
        ))
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.bar_style.clone());
    }

    fn set_position(&self, pos: u64) {
        self.bar.set_position(pos);
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }

    fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

/// Initializes `pretty_env_logger` (filtered by `RUST_LOG`) behind
/// `indicatif-log-bridge`.
///
/// Returns the [`MultiProgress`] every progress bar must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    // A logger may already be installed, e.g. in tests.
    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok();

    log::set_max_level(level);

    multi
}

/// Asks a yes/no question, hiding progress bars while the prompt is up.
///
/// # Errors
///
/// Returns [`dialoguer::Error`] if the terminal cannot be read.
pub fn confirm(multi: &MultiProgress, prompt: &str, default: bool) -> Result<bool, dialoguer::Error> {
    multi.suspend(|| {
        Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
    })
}
