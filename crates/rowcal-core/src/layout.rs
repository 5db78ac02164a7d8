use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{
  debug,
  info
};

use crate::budget::compute_max_visible_rows;
use crate::config::LayoutConfig;
use crate::datetime::{
  DAYS_PER_WEEK,
  WeekDates
};
use crate::error::LayoutError;
use crate::event::CalendarEvent;
use crate::overflow::{
  OverflowInfo,
  calculate_overflow
};
use crate::rows::{
  RowAssignment,
  assign_rows,
  row_count
};
use crate::segment::{
  build_segments,
  sort_segments
};

/// Pixel size of one week row as measured by the host layout.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Serialize,
)]
pub struct Viewport {
  pub width:  f64,
  pub height: f64
}

impl Viewport {
  pub fn new(
    width: f64,
    height: f64
  ) -> Self {
    Self { width, height }
  }

  fn validate(
    &self
  ) -> Result<(), LayoutError> {
    let ok =
      |v: f64| v.is_finite() && v >= 0.0;
    if ok(self.width) && ok(self.height) {
      Ok(())
    } else {
      Err(LayoutError::InvalidViewport {
        width:  self.width,
        height: self.height
      })
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Serialize,
)]
pub struct TilePlacement<'a> {
  pub assignment: RowAssignment<'a>,
  pub left:       f64,
  pub top:        f64,
  pub width:      f64,
  pub height:     f64
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Serialize,
)]
pub struct IndicatorPlacement {
  pub day:          usize,
  pub hidden_count: usize,
  pub left:         f64,
  pub top:          f64,
  pub width:        f64
}

#[derive(
  Debug, Clone, PartialEq, Serialize,
)]
pub struct WeekLayout<'a> {
  pub week_start:       NaiveDate,
  pub week_row_index:   usize,
  pub assignments:      Vec<RowAssignment<'a>>,
  pub row_count:        usize,
  pub max_visible_rows: usize,
  pub overflow:
    BTreeMap<usize, OverflowInfo<'a>>,
  pub tiles:            Vec<TilePlacement<'a>>,
  pub indicators:       Vec<IndicatorPlacement>
}

impl<'a> WeekLayout<'a> {
  pub fn visible_assignments(
    &self
  ) -> impl Iterator<Item = &RowAssignment<'a>>
  {
    self.assignments.iter().filter(
      |assignment| {
        assignment.row
          < self.max_visible_rows
      }
    )
  }

  pub fn hidden_count(
    &self,
    day: usize
  ) -> usize {
    self
      .overflow
      .get(&day)
      .map(|info| info.hidden_count)
      .unwrap_or(0)
  }
}

/// Runs one full layout pass for a single week row.
pub fn layout_week<'a>(
  events: &'a [CalendarEvent],
  week: &WeekDates,
  viewport: Viewport,
  config: &LayoutConfig
) -> Result<WeekLayout<'a>, LayoutError> {
  layout_week_row(
    events, week, 0, viewport, config
  )
}

/// Lays out every week of a multi-week grid, each with the same viewport.
#[tracing::instrument(
  skip(events, weeks, config),
  fields(week_count = weeks.len())
)]
pub fn layout_month<'a>(
  events: &'a [CalendarEvent],
  weeks: &[WeekDates],
  viewport: Viewport,
  config: &LayoutConfig
) -> Result<Vec<WeekLayout<'a>>, LayoutError>
{
  weeks
    .iter()
    .enumerate()
    .map(|(week_row_index, week)| {
      layout_week_row(
        events,
        week,
        week_row_index,
        viewport,
        config
      )
    })
    .collect()
}

#[tracing::instrument(
  skip(events, config),
  fields(
    week_start = %week.start(),
    event_count = events.len()
  )
)]
fn layout_week_row<'a>(
  events: &'a [CalendarEvent],
  week: &WeekDates,
  week_row_index: usize,
  viewport: Viewport,
  config: &LayoutConfig
) -> Result<WeekLayout<'a>, LayoutError> {
  viewport.validate()?;

  let mut segments = build_segments(
    events,
    week,
    &config.timezone,
    week_row_index
  );
  sort_segments(&mut segments);
  let assignments = assign_rows(&segments);
  let rows = row_count(&assignments);

  let slot = config.tile_slot_height();
  let max_visible_rows =
    compute_max_visible_rows(
      viewport.height,
      slot,
      config.max_visible_events_per_day,
      config.overflow_indicator_height,
      config.date_label_height,
      rows
    );
  let overflow = calculate_overflow(
    &assignments,
    max_visible_rows
  );

  let column_width =
    viewport.width / DAYS_PER_WEEK as f64;
  let header = config.date_label_height;

  let tiles: Vec<TilePlacement<'a>> =
    assignments
      .iter()
      .filter(|assignment| {
        assignment.row < max_visible_rows
      })
      .map(|assignment| {
        let segment = &assignment.segment;
        let span = segment.span_days() as f64;
        TilePlacement {
          assignment: *assignment,
          left:       segment.start_day
            as f64
            * column_width,
          top:        header
            + assignment.row as f64 * slot,
          width:      (span * column_width
            - config.tile_horizontal_spacing)
            .max(0.0),
          height:     config.tile_height
        }
      })
      .collect();

  let indicator_top =
    header + max_visible_rows as f64 * slot;
  let indicators: Vec<IndicatorPlacement> =
    overflow
      .iter()
      .map(|(day, info)| {
        IndicatorPlacement {
          day:          *day,
          hidden_count: info.hidden_count,
          left:         *day as f64
            * column_width,
          top:          indicator_top,
          width:        column_width
        }
      })
      .collect();

  debug!(
    rows,
    max_visible_rows,
    tiles = tiles.len(),
    overflow_days = overflow.len(),
    "week layout complete"
  );
  if !overflow.is_empty() {
    info!(
      hidden = overflow
        .values()
        .map(|info| info.hidden_count)
        .sum::<usize>(),
      "week has hidden events"
    );
  }

  Ok(WeekLayout {
    week_start: week.start(),
    week_row_index,
    assignments,
    row_count: rows,
    max_visible_rows,
    overflow,
    tiles,
    indicators
  })
}
