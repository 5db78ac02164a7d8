use tracing::trace;

/// How many rows of tiles a week row can show.
///
/// The first pass ignores the overflow indicator. If every assigned row
/// (`required_rows`) fits that count and the configured cap, it is used as
/// is. Otherwise the indicator height is reserved as well and the result is
/// capped. `configured_cap == 0` means no cap. The result is never below 1.
pub fn compute_max_visible_rows(
  available_height: f64,
  tile_slot_height: f64,
  configured_cap: usize,
  overflow_indicator_height: f64,
  reserved_height: f64,
  required_rows: usize
) -> usize {
  let without_indicator = rows_fitting(
    available_height - reserved_height,
    tile_slot_height
  );
  let within_cap = configured_cap == 0
    || required_rows <= configured_cap;

  if required_rows <= without_indicator
    && within_cap
  {
    trace!(
      rows = without_indicator,
      required_rows,
      "all rows fit"
    );
    return without_indicator;
  }

  let with_indicator = rows_fitting(
    available_height
      - reserved_height
      - overflow_indicator_height,
    tile_slot_height
  );
  let rows = if configured_cap == 0 {
    with_indicator
  } else {
    with_indicator.min(configured_cap)
  };

  trace!(
    rows,
    required_rows,
    without_indicator,
    with_indicator,
    configured_cap,
    "reserved overflow indicator"
  );
  rows
}

fn rows_fitting(
  height: f64,
  slot: f64
) -> usize {
  if !height.is_finite()
    || !slot.is_finite()
    || slot <= 0.0
    || height < slot
  {
    return 1;
  }
  ((height / slot).floor() as usize)
    .max(1)
}

#[cfg(test)]
mod tests {
  use super::compute_max_visible_rows;

  #[test]
  fn uses_full_height_when_everything_fits()
  {
    // 100px minus 20px header, 20px slots: 4 rows, 3 needed.
    assert_eq!(
      compute_max_visible_rows(
        100.0, 20.0, 0, 15.0, 20.0, 3
      ),
      4
    );
  }

  #[test]
  fn reserves_indicator_space_when_rows_overflow_height()
  {
    // Without indicator 4 rows fit but 6 are needed; with a 15px
    // indicator only 3 fit.
    assert_eq!(
      compute_max_visible_rows(
        100.0, 20.0, 0, 15.0, 20.0, 6
      ),
      3
    );
  }

  #[test]
  fn cap_forces_indicator_even_when_height_is_plenty()
  {
    // Height fits 10 rows but the cap is 2 and 3 are needed.
    assert_eq!(
      compute_max_visible_rows(
        220.0, 20.0, 2, 15.0, 20.0, 3
      ),
      2
    );
  }

  #[test]
  fn cap_is_not_applied_when_no_overflow() {
    // Two rows needed, cap two: no indicator, full height count.
    assert_eq!(
      compute_max_visible_rows(
        220.0, 20.0, 2, 15.0, 20.0, 2
      ),
      10
    );
  }

  #[test]
  fn degenerate_budgets_still_show_one_row()
  {
    assert_eq!(
      compute_max_visible_rows(
        0.0, 20.0, 0, 15.0, 20.0, 5
      ),
      1
    );
    assert_eq!(
      compute_max_visible_rows(
        -50.0, 20.0, 3, 15.0, 0.0, 5
      ),
      1
    );
    assert_eq!(
      compute_max_visible_rows(
        100.0, 0.0, 0, 15.0, 0.0, 5
      ),
      1
    );
    assert_eq!(
      compute_max_visible_rows(
        f64::NAN,
        20.0,
        0,
        15.0,
        0.0,
        5
      ),
      1
    );
  }

  #[test]
  fn single_row_cap_with_three_events() {
    assert_eq!(
      compute_max_visible_rows(
        200.0, 24.0, 1, 16.0, 20.0, 3
      ),
      1
    );
  }

  #[test]
  fn more_height_never_means_fewer_rows() {
    for cap in [0usize, 1, 2, 5] {
      for required in 0..8usize {
        let mut previous = 0;
        for step in 0..400 {
          let height =
            f64::from(step) * 0.75;
          let rows =
            compute_max_visible_rows(
              height, 22.0, cap, 18.0,
              24.0, required
            );
          assert!(rows >= 1);
          assert!(
            rows >= previous,
            "cap {cap} required \
             {required} height \
             {height}: {rows} < \
             {previous}"
          );
          previous = rows;
        }
      }
    }
  }
}
