use chrono::NaiveDate;
use thiserror::Error;

/// Contract violations surfaced by the layout pipeline.
///
/// These indicate a caller bug rather than a runtime condition; nothing in
/// the pipeline retries them.
#[derive(
  Debug, Clone, PartialEq, Error,
)]
pub enum LayoutError {
  #[error(
    "a week needs exactly 7 dates, got \
     {actual}"
  )]
  WeekLength { actual: usize },

  #[error(
    "week dates are not consecutive: \
     {previous} is followed by {next}"
  )]
  NonConsecutiveWeek {
    previous: NaiveDate,
    next:     NaiveDate
  },

  #[error(
    "invalid viewport {width}x{height}: \
     dimensions must be finite and \
     non-negative"
  )]
  InvalidViewport {
    width:  f64,
    height: f64
  }
}
