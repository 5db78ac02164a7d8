use chrono::{
  DateTime,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  Utc
};
use chrono_tz::Tz;
use serde::{
  Deserialize,
  Serialize
};
use tracing::warn;

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct CalendarEvent {
  pub id: String,

  pub title: String,

  pub start: DateTime<Utc>,

  pub end: DateTime<Utc>,

  /// Date-only event: the UTC date of `start`/`end` is the calendar date,
  /// whatever the layout timezone.
  #[serde(default)]
  pub all_day: bool,

  #[serde(default)]
  pub color: Option<String>
}

impl CalendarEvent {
  pub fn new(
    id: impl Into<String>,
    title: impl Into<String>,
    start: DateTime<Utc>,
    end: DateTime<Utc>
  ) -> Self {
    Self {
      id: id.into(),
      title: title.into(),
      start,
      end,
      all_day: false,
      color: None
    }
  }

  pub fn all_day(
    id: impl Into<String>,
    title: impl Into<String>,
    start: DateTime<Utc>,
    end: DateTime<Utc>
  ) -> Self {
    Self {
      all_day: true,
      ..Self::new(id, title, start, end)
    }
  }

  /// Inclusive local date range covered by this event in `tz`.
  ///
  /// An end that lands exactly on midnight after the start is exclusive,
  /// so a `[Mon 00:00, Wed 00:00)` event covers Monday and Tuesday only.
  /// All-day events skip the timezone conversion.
  pub fn local_date_range(
    &self,
    tz: &Tz
  ) -> (NaiveDate, NaiveDate) {
    let (local_start, local_end) =
      if self.all_day {
        (
          self.start.naive_utc(),
          self.end.naive_utc()
        )
      } else {
        (
          self
            .start
            .with_timezone(tz)
            .naive_local(),
          self
            .end
            .with_timezone(tz)
            .naive_local()
        )
      };
    let start_date = local_start.date();

    if self.end < self.start {
      warn!(
        id = %self.id,
        start = %self.start,
        end = %self.end,
        "event ends before it starts; treating as single day"
      );
      return (start_date, start_date);
    }

    (
      start_date,
      exclusive_end_date(
        start_date,
        local_end
      )
    )
  }
}

fn exclusive_end_date(
  start_date: NaiveDate,
  local_end: NaiveDateTime
) -> NaiveDate {
  let end_date = local_end.date();
  if local_end.time() == NaiveTime::MIN
    && end_date > start_date
  {
    end_date.pred_opt().unwrap_or(end_date)
  } else {
    end_date
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    DateTime,
    NaiveDate,
    TimeZone,
    Utc
  };

  use super::CalendarEvent;

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  fn utc(
    d: u32,
    h: u32,
    min: u32
  ) -> DateTime<Utc> {
    Utc
      .with_ymd_and_hms(
        2026, 10, d, h, min, 0
      )
      .single()
      .expect("valid instant")
  }

  #[test]
  fn midnight_end_is_exclusive() {
    let event = CalendarEvent::new(
      "a",
      "Offsite",
      utc(12, 0, 0),
      utc(14, 0, 0)
    );
    assert_eq!(
      event
        .local_date_range(&chrono_tz::UTC),
      (
        date(2026, 10, 12),
        date(2026, 10, 13)
      )
    );
  }

  #[test]
  fn zero_length_midnight_event_keeps_its_day()
  {
    let at = utc(12, 0, 0);
    let event = CalendarEvent::new(
      "a", "Marker", at, at
    );
    assert_eq!(
      event
        .local_date_range(&chrono_tz::UTC),
      (
        date(2026, 10, 12),
        date(2026, 10, 12)
      )
    );
  }

  #[test]
  fn reversed_event_collapses_to_start_date()
  {
    let event = CalendarEvent::new(
      "a",
      "Broken",
      utc(15, 9, 0),
      utc(13, 9, 0)
    );
    assert_eq!(
      event
        .local_date_range(&chrono_tz::UTC),
      (
        date(2026, 10, 15),
        date(2026, 10, 15)
      )
    );
  }

  #[test]
  fn dates_follow_the_layout_timezone() {
    // 23:30 UTC on the 12th is already the 13th in Berlin.
    let event = CalendarEvent::new(
      "a",
      "Late call",
      utc(12, 23, 30),
      utc(12, 23, 45)
    );
    let (start, end) = event
      .local_date_range(
        &chrono_tz::Europe::Berlin
      );
    assert_eq!(start, date(2026, 10, 13));
    assert_eq!(end, date(2026, 10, 13));
  }

  #[test]
  fn all_day_event_ignores_layout_timezone()
  {
    // Tuesday only, stored as [Tue 00:00Z, Wed 00:00Z).
    let event = CalendarEvent::all_day(
      "a",
      "Holiday",
      utc(13, 0, 0),
      utc(14, 0, 0)
    );
    let tuesday = date(2026, 10, 13);
    for tz in [
      chrono_tz::America::New_York,
      chrono_tz::Pacific::Auckland,
      chrono_tz::UTC
    ] {
      assert_eq!(
        event.local_date_range(&tz),
        (tuesday, tuesday),
        "{tz}"
      );
    }

    let timed = CalendarEvent {
      all_day: false,
      ..event
    };
    assert_eq!(
      timed.local_date_range(
        &chrono_tz::America::New_York
      ),
      (date(2026, 10, 12), tuesday)
    );
  }

  #[test]
  fn all_day_flag_defaults_to_false_in_json()
  {
    let event: CalendarEvent =
      serde_json::from_str(
        r#"{"id":"a","title":"A","start":"2026-10-13T00:00:00Z","end":"2026-10-14T00:00:00Z"}"#
      )
      .expect("parse event");
    assert!(!event.all_day);
  }
}
