use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::{
  debug,
  info,
  warn
};

use crate::event::CalendarEvent;

/// Loads events from a file holding either a JSON array or one event per
/// line (blank lines ignored).
#[tracing::instrument(
  skip(path),
  fields(file = %path.display())
)]
pub fn load_events(
  path: &Path
) -> anyhow::Result<Vec<CalendarEvent>> {
  let text = fs::read_to_string(path)
    .with_context(|| {
      format!(
        "failed to read {}",
        path.display()
      )
    })?;

  let events = if text
    .trim_start()
    .starts_with('[')
  {
    debug!(
      "parsing events as json array"
    );
    serde_json::from_str::<
      Vec<CalendarEvent>
    >(&text)
    .with_context(|| {
      format!(
        "failed parsing {}",
        path.display()
      )
    })?
  } else {
    parse_jsonl(&text).with_context(
      || {
        format!(
          "failed parsing {}",
          path.display()
        )
      }
    )?
  };

  let mut seen = HashSet::new();
  for event in &events {
    if !seen.insert(event.id.as_str()) {
      warn!(
        id = %event.id,
        "duplicate event id"
      );
    }
  }

  info!(
    count = events.len(),
    "loaded events"
  );
  Ok(events)
}

fn parse_jsonl(
  text: &str
) -> anyhow::Result<Vec<CalendarEvent>> {
  let mut out = Vec::new();
  for (idx, line) in
    text.lines().enumerate()
  {
    let trimmed = line.trim();
    if trimmed.is_empty() {
      continue;
    }

    let event: CalendarEvent =
      serde_json::from_str(trimmed)
        .with_context(|| {
          format!("line {}", idx + 1)
        })?;
    out.push(event);
  }

  debug!(
    count = out.len(),
    "loaded events from jsonl"
  );
  Ok(out)
}
