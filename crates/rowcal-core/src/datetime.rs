use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::sync::LazyLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Datelike,
  Duration,
  NaiveDate,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

use crate::error::LayoutError;

pub const DAYS_PER_WEEK: usize = 7;

const TIMEZONE_CONFIG_FILE: &str =
  "rowcal-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "ROWCAL_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "ROWCAL_TIME_CONFIG";

static RELATIVE_DATE_RE: LazyLock<
  Result<Regex, regex::Error>
> = LazyLock::new(|| {
  Regex::new(
    r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dw])$"
  )
});

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

/// Seven consecutive calendar days shown as one week row.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct WeekDates {
  start: NaiveDate
}

impl WeekDates {
  pub fn starting(
    start: NaiveDate
  ) -> Self {
    Self { start }
  }

  pub fn from_dates(
    dates: &[NaiveDate]
  ) -> Result<Self, LayoutError> {
    if dates.len() != DAYS_PER_WEEK {
      return Err(
        LayoutError::WeekLength {
          actual: dates.len()
        }
      );
    }

    for pair in dates.windows(2) {
      if pair[0].succ_opt()
        != Some(pair[1])
      {
        return Err(
          LayoutError::NonConsecutiveWeek {
            previous: pair[0],
            next:     pair[1]
          }
        );
      }
    }

    Ok(Self { start: dates[0] })
  }

  pub fn start(&self) -> NaiveDate {
    self.start
  }

  pub fn end(&self) -> NaiveDate {
    add_days(self.start, 6)
  }

  pub fn dates(
    &self
  ) -> [NaiveDate; DAYS_PER_WEEK] {
    std::array::from_fn(|idx| {
      add_days(self.start, idx as i64)
    })
  }

  /// Column of `date` within this week, computed from whole-day
  /// differences so clock changes never move a boundary.
  pub fn day_index(
    &self,
    date: NaiveDate
  ) -> Option<usize> {
    let offset = date
      .signed_duration_since(self.start)
      .num_days();
    if (0..DAYS_PER_WEEK as i64)
      .contains(&offset)
    {
      Some(offset as usize)
    } else {
      None
    }
  }

  pub fn next(&self) -> Self {
    Self {
      start: add_days(self.start, 7)
    }
  }
}

#[must_use]
pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}

#[must_use]
pub fn start_of_week(
  date: NaiveDate,
  first_day: Weekday
) -> NaiveDate {
  let back = (7
    + date
      .weekday()
      .num_days_from_monday()
    - first_day.num_days_from_monday())
    % 7;
  add_days(date, -(back as i64))
}

/// Start dates of every week row needed to show `month` in a grid whose
/// weeks begin on `first_day`.
pub fn week_starts_for_month(
  year: i32,
  month: u32,
  first_day: Weekday
) -> anyhow::Result<Vec<NaiveDate>> {
  let first =
    NaiveDate::from_ymd_opt(
      year, month, 1
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid month: \
         {year}-{month:02}"
      )
    })?;
  let last = if month == 12 {
    NaiveDate::from_ymd_opt(
      year + 1,
      1,
      1
    )
  } else {
    NaiveDate::from_ymd_opt(
      year,
      month + 1,
      1
    )
  }
  .and_then(|next| next.pred_opt())
  .ok_or_else(|| {
    anyhow!(
      "cannot compute end of month \
       {year}-{month:02}"
    )
  })?;

  let mut starts = Vec::new();
  let mut cursor =
    start_of_week(first, first_day);
  while cursor <= last {
    starts.push(cursor);
    cursor = add_days(cursor, 7);
  }
  Ok(starts)
}

pub fn today_in(tz: &Tz) -> NaiveDate {
  Utc::now()
    .with_timezone(tz)
    .date_naive()
}

/// Resolves the layout timezone: an explicit configured id wins, then
/// `ROWCAL_TIMEZONE`, then a `rowcal-time.toml` file, then UTC.
///
/// A source that is present but names an unknown zone is an error.
pub fn resolve_timezone(
  configured: Option<&str>
) -> anyhow::Result<Tz> {
  resolve_timezone_from(
    configured,
    std::env::var(TIMEZONE_ENV_VAR).ok(),
    timezone_config_path()
  )
}

fn resolve_timezone_from(
  configured: Option<&str>,
  env_value: Option<String>,
  config_file: Option<PathBuf>
) -> anyhow::Result<Tz> {
  if let Some(raw) = configured
    && let Some(tz) =
      parse_timezone(raw, "config")?
  {
    return Ok(tz);
  }

  if let Some(raw) = env_value
    && let Some(tz) = parse_timezone(
      &raw,
      TIMEZONE_ENV_VAR
    )?
  {
    return Ok(tz);
  }

  if let Some(path) = config_file
    && let Some(tz) =
      load_timezone_from_file(&path)?
  {
    return Ok(tz);
  }

  tracing::debug!(
    "no timezone configured; using UTC"
  );
  Ok(chrono_tz::UTC)
}

fn timezone_config_path()
-> Option<PathBuf> {
  if let Ok(raw) = std::env::var(
    TIMEZONE_CONFIG_ENV_VAR
  ) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  std::env::current_dir().ok().map(
    |dir| {
      dir.join(TIMEZONE_CONFIG_FILE)
    }
  )
}

pub(crate) fn load_timezone_from_file(
  path: &Path
) -> anyhow::Result<Option<Tz>> {
  if !path.exists() {
    tracing::debug!(
      file = %path.display(),
      "timezone config file not found"
    );
    return Ok(None);
  }

  let raw = fs::read_to_string(path)
    .with_context(|| {
      format!(
        "failed reading timezone \
         config {}",
        path.display()
      )
    })?;

  let parsed =
    toml::from_str::<TimezoneConfig>(
      &raw
    )
    .with_context(|| {
      format!(
        "failed parsing timezone \
         config {}",
        path.display()
      )
    })?;

  let timezone =
    parsed.timezone.or_else(|| {
      parsed.time.and_then(|section| {
        section.timezone
      })
    });
  let Some(timezone) = timezone else {
    tracing::warn!(
      file = %path.display(),
      "timezone config had no timezone field"
    );
    return Ok(None);
  };

  parse_timezone(
    timezone.as_str(),
    &format!("file:{}", path.display())
  )
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> anyhow::Result<Option<Tz>> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return Ok(None);
  }

  let tz =
    trimmed.parse::<Tz>().map_err(
      |err| {
        anyhow!(
          "invalid timezone from \
           {source}: {trimmed:?} \
           ({err})"
        )
      }
    )?;
  tracing::info!(
    source,
    timezone = %trimmed,
    "configured layout timezone"
  );
  Ok(Some(tz))
}

#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return Ok(add_days(today, 1));
    }
    | "yesterday" => {
      return Ok(add_days(today, -1));
    }
    | _ => {}
  }

  if let Some(target_weekday) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today,
      target_weekday
    ));
  }

  let rel_re = RELATIVE_DATE_RE
    .as_ref()
    .map_err(|e| {
      anyhow!(
        "internal regex compile \
         failure: {e}"
      )
    })?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let sign = caps
      .name("sign")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative sign")
      })?;
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let unit = caps
      .name("unit")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative unit")
      })?;

    let days = match unit {
      | "d" => num,
      | "w" => num.saturating_mul(7),
      | _ => {
        return Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ));
      }
    };

    return Ok(
      if sign == "-" {
        add_days(today, -days)
      } else {
        add_days(today, days)
      }
    );
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(date);
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, weekday \
     names (e.g. monday), +Nd/-Nd, \
     +Nw/-Nw, YYYY-MM-DD"
  })
}

pub fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  add_days(from, delta)
}
