use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{
  debug,
  trace
};

use crate::datetime::WeekDates;
use crate::event::CalendarEvent;

/// The part of one event that falls inside one displayed week.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct EventSegment<'a> {
  pub event:            &'a CalendarEvent,
  pub week_row_index:   usize,
  pub start_day:        usize,
  pub end_day:          usize,
  pub is_first_segment: bool,
  pub is_last_segment:  bool
}

impl EventSegment<'_> {
  pub fn span_days(&self) -> usize {
    self.end_day - self.start_day + 1
  }

  pub fn covers_day(
    &self,
    day: usize
  ) -> bool {
    (self.start_day..=self.end_day)
      .contains(&day)
  }

  /// Bit `d` is set when the segment occupies day column `d`.
  pub fn day_mask(&self) -> u8 {
    let width = self.span_days() as u32;
    let bits = ((1u16 << width) - 1) as u8;
    bits << self.start_day
  }

  pub fn dates(
    &self,
    week: &WeekDates
  ) -> (NaiveDate, NaiveDate) {
    let dates = week.dates();
    (
      dates[self.start_day],
      dates[self.end_day]
    )
  }
}

/// Clips every event that touches `week` to that week, in input order.
///
/// Each event contributes at most one segment; events entirely outside the
/// week are skipped.
#[tracing::instrument(
  skip(events, tz),
  fields(
    week_start = %week.start(),
    event_count = events.len()
  )
)]
pub fn build_segments<'a>(
  events: &'a [CalendarEvent],
  week: &WeekDates,
  tz: &Tz,
  week_row_index: usize
) -> Vec<EventSegment<'a>> {
  let week_start = week.start();
  let week_end = week.end();

  let segments: Vec<EventSegment<'a>> =
    events
      .iter()
      .filter_map(|event| {
        let (event_start, event_end) =
          event.local_date_range(tz);
        if event_end < week_start
          || event_start > week_end
        {
          return None;
        }

        let clipped_start =
          event_start.max(week_start);
        let clipped_end =
          event_end.min(week_end);
        let start_day =
          week.day_index(clipped_start)?;
        let end_day =
          week.day_index(clipped_end)?;

        let segment = EventSegment {
          event,
          week_row_index,
          start_day,
          end_day,
          is_first_segment: clipped_start
            == event_start,
          is_last_segment: clipped_end
            == event_end
        };
        trace!(
          id = %event.id,
          start_day,
          end_day,
          first = segment.is_first_segment,
          last = segment.is_last_segment,
          "built segment"
        );
        Some(segment)
      })
      .collect();

  debug!(
    count = segments.len(),
    "built week segments"
  );
  segments
}

/// Builds one segment list per week row of a multi-week grid.
pub fn build_month_segments<'a>(
  events: &'a [CalendarEvent],
  weeks: &[WeekDates],
  tz: &Tz
) -> Vec<Vec<EventSegment<'a>>> {
  weeks
    .iter()
    .enumerate()
    .map(|(week_row_index, week)| {
      build_segments(
        events,
        week,
        tz,
        week_row_index
      )
    })
    .collect()
}

/// Orders segments for row packing: longer spans first, then earlier start.
///
/// The sort is stable, so ties keep their input order.
pub fn sort_segments(
  segments: &mut [EventSegment<'_>]
) {
  segments.sort_by(|a, b| {
    b.span_days()
      .cmp(&a.span_days())
      .then(a.start_day.cmp(&b.start_day))
  });
}
