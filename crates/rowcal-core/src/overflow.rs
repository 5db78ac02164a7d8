use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::datetime::DAYS_PER_WEEK;
use crate::event::CalendarEvent;
use crate::rows::RowAssignment;

/// Visible/hidden split of the events touching one day column.
#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct DayColumn<'a> {
  pub visible_events: Vec<&'a CalendarEvent>,
  pub hidden_events:  Vec<&'a CalendarEvent>
}

impl DayColumn<'_> {
  pub fn hidden_count(&self) -> usize {
    self.hidden_events.len()
  }
}

#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct OverflowInfo<'a> {
  pub hidden_count:   usize,
  pub hidden_events:  Vec<&'a CalendarEvent>,
  pub visible_events: Vec<&'a CalendarEvent>
}

impl<'a> From<DayColumn<'a>>
  for OverflowInfo<'a>
{
  fn from(column: DayColumn<'a>) -> Self {
    Self {
      hidden_count:   column.hidden_count(),
      hidden_events:  column.hidden_events,
      visible_events: column.visible_events
    }
  }
}

/// Splits every day column into visible and hidden events.
///
/// Counts are taken per segment per day, so a single hidden row can hide a
/// different number of events on each day. Event order follows the
/// assignment order.
pub fn partition_days<'a>(
  assignments: &[RowAssignment<'a>],
  max_visible_rows: usize
) -> [DayColumn<'a>; DAYS_PER_WEEK] {
  let mut columns: [DayColumn<'a>;
    DAYS_PER_WEEK] = Default::default();

  for assignment in assignments {
    let segment = &assignment.segment;
    for column in &mut columns
      [segment.start_day..=segment.end_day]
    {
      if assignment.row < max_visible_rows {
        column
          .visible_events
          .push(segment.event);
      } else {
        column
          .hidden_events
          .push(segment.event);
      }
    }
  }

  columns
}

/// Overflow for the day columns that hide at least one event.
///
/// Days without an entry have nothing hidden.
#[tracing::instrument(
  skip(assignments),
  fields(assignment_count = assignments.len())
)]
pub fn calculate_overflow<'a>(
  assignments: &[RowAssignment<'a>],
  max_visible_rows: usize
) -> BTreeMap<usize, OverflowInfo<'a>> {
  let overflow: BTreeMap<
    usize,
    OverflowInfo<'a>
  > = partition_days(
    assignments,
    max_visible_rows
  )
  .into_iter()
  .enumerate()
  .filter(|(_, column)| {
    column.hidden_count() > 0
  })
  .map(|(day, column)| {
    (day, OverflowInfo::from(column))
  })
  .collect();

  debug!(
    days = overflow.len(),
    "calculated overflow"
  );
  overflow
}
