/*
  Copyright© 2023 Raúl Wolters(1)

  This file is part of irocs-morph.

  irocs-morph is free software: you can redistribute it and/or modify it under
  the terms of the European Union Public License version 1.2 or later, as
  published by the European Commission.

  irocs-morph is distributed in the hope that it will be useful, but WITHOUT ANY
  WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR
  A PARTICULAR PURPOSE. See the European Union Public License for more details.

  You should have received a copy of the EUPL in an/all official language(s) of
  the European Union along with irocs-morph.  If not, see
  <https://ec.europa.eu/info/european-union-public-licence_en/>.

  (1) Resident of the Kingdom of the Netherlands; agreement between licensor and
  licensee subject to Dutch law as per article 15 of the EUPL.
*/

//! Progress reporting and cancellation for long-running floods.

/// Capability for reporting progress of a long-running operation. Both methods
/// return whether the operation should continue: returning `false` asks the
/// caller to abort.
///
/// Reporters are polled at coarse granularity only (see
/// [`crate::watershed::WatershedBuilder::set_poll_interval`]).
pub trait ProgressReporter {
  /// Report the completed fraction of the work, in `[0, 1]`
  fn update_progress(&mut self, fraction: f64) -> bool;

  /// Report a status message
  fn update_progress_message(&mut self, msg: &str) -> bool;
}

/// Reporter that ignores all updates and never cancels
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
  fn update_progress(&mut self, _fraction: f64) -> bool {
    true
  }

  fn update_progress_message(&mut self, _msg: &str) -> bool {
    true
  }
}

/// Adapts a closure `FnMut(fraction) -> bool` into a [`ProgressReporter`].
/// Messages are accepted and ignored.
pub struct FnProgress<F>(pub F);

impl<F> ProgressReporter for FnProgress<F>
where
  F: FnMut(f64) -> bool,
{
  fn update_progress(&mut self, fraction: f64) -> bool {
    (self.0)(fraction)
  }

  fn update_progress_message(&mut self, _msg: &str) -> bool {
    true
  }
}

#[cfg(feature = "progress")]
const BAR_LEN: u64 = 1000;

/// Creates a progress bar in the style used throughout this crate. Fractions
/// reported through [`ProgressReporter`] are mapped onto the bar's length.
#[cfg(feature = "progress")]
pub fn progress_bar(msg: &str) -> indicatif::ProgressBar {
  const TEMPLATE: &str = "{spinner}[{elapsed}/{duration}] {msg} {percent}% {bar:60}";
  let bar = indicatif::ProgressBar::new(BAR_LEN);
  if let Ok(style) = indicatif::ProgressStyle::with_template(TEMPLATE) {
    bar.set_style(style);
  }
  bar.set_message(msg.to_string());
  bar
}

#[cfg(feature = "progress")]
impl ProgressReporter for indicatif::ProgressBar {
  fn update_progress(&mut self, fraction: f64) -> bool {
    let len = self.length().unwrap_or(BAR_LEN);
    self.set_position((fraction.clamp(0.0, 1.0) * len as f64) as u64);
    true
  }

  fn update_progress_message(&mut self, msg: &str) -> bool {
    self.set_message(msg.to_string());
    true
  }
}
