use serde::Serialize;
use tracing::debug;

use crate::segment::EventSegment;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct RowAssignment<'a> {
  pub segment: EventSegment<'a>,
  pub row:     usize
}

/// Greedy first-fit packing: each segment takes the lowest row whose
/// occupied days do not intersect its own.
///
/// Segments are placed in the order given; callers wanting the usual
/// longest-first layout sort with [`crate::segment::sort_segments`] first.
/// Row count is unbounded here, visibility is decided later.
#[tracing::instrument(
  skip_all,
  fields(segment_count = segments.len())
)]
pub fn assign_rows<'a>(
  segments: &[EventSegment<'a>]
) -> Vec<RowAssignment<'a>> {
  let mut occupied: Vec<u8> = Vec::new();
  let mut assignments =
    Vec::with_capacity(segments.len());

  for segment in segments {
    let mask = segment.day_mask();
    let row = match occupied
      .iter()
      .position(|used| used & mask == 0)
    {
      | Some(row) => row,
      | None => {
        occupied.push(0);
        occupied.len() - 1
      }
    };
    occupied[row] |= mask;
    assignments.push(RowAssignment {
      segment: *segment,
      row
    });
  }

  debug!(
    rows = occupied.len(),
    "assigned rows"
  );
  assignments
}

pub fn row_count(
  assignments: &[RowAssignment<'_>]
) -> usize {
  assignments
    .iter()
    .map(|assignment| assignment.row + 1)
    .max()
    .unwrap_or(0)
}
