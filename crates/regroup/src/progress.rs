// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal progress bar bound to the engine's progress sink.

use std::sync::Mutex;

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use regroup_core::types::OutcomeCounts;
use regroup_core::{ProgressSink, RegroupError};

/// Renders run progress as an indicatif bar on stderr.
///
/// The bar is created lazily on the first progress event so a run with no
/// pending candidates never draws one.
pub struct ProgressBarSink {
    bar: Mutex<Option<ProgressBar>>,
}

impl ProgressBarSink {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    pub fn finish(&self) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(bar) = guard.as_ref() {
                bar.finish_and_clear();
            }
        }
    }
}

#[async_trait]
impl ProgressSink for ProgressBarSink {
    async fn on_progress(
        &self,
        processed: u64,
        total: u64,
        counts: &OutcomeCounts,
    ) -> Result<(), RegroupError> {
        let mut guard = self
            .bar
            .lock()
            .map_err(|_| RegroupError::Internal("progress bar mutex poisoned".to_string()))?;

        let bar = guard.get_or_insert_with(|| {
            let bar = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::with_template(
                "{bar:40.cyan/blue} {pos}/{len} {msg}",
            ) {
                bar.set_style(style);
            }
            bar
        });
        bar.set_position(processed);
        bar.set_message(format!(
            "added {} / already in {} / failed {}",
            counts.added, counts.already_in, counts.failed
        ));
        Ok(())
    }
}
