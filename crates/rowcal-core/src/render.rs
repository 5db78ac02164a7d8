use std::io::{
  self,
  IsTerminal,
  Write
};

use unicode_width::UnicodeWidthStr;

use crate::config::{
  Config,
  KEY_COLOR
};
use crate::datetime::{
  DAYS_PER_WEEK,
  WeekDates
};
use crate::event::CalendarEvent;
use crate::layout::WeekLayout;
use crate::rows::RowAssignment;

/// How a tile's text is produced.
#[derive(
  Debug, Clone, Copy, Default,
)]
pub enum TileLabel {
  #[default]
  Default,
  Custom(fn(&CalendarEvent) -> String)
}

impl TileLabel {
  fn label(
    &self,
    event: &CalendarEvent
  ) -> String {
    match self {
      | TileLabel::Default => {
        event.title.clone()
      }
      | TileLabel::Custom(f) => f(event)
    }
  }
}

#[derive(Debug, Clone)]
pub struct Renderer {
  color: bool,
  label: TileLabel
}

impl Renderer {
  pub fn new(
    cfg: &Config
  ) -> anyhow::Result<Self> {
    let color = cfg
      .get_bool(KEY_COLOR)?
      .unwrap_or(true);

    Ok(Self {
      color,
      label: TileLabel::Default
    })
  }

  pub fn plain() -> Self {
    Self {
      color: false,
      label: TileLabel::Default
    }
  }

  pub fn with_label(
    mut self,
    label: TileLabel
  ) -> Self {
    self.label = label;
    self
  }

  #[tracing::instrument(
    skip(self, layout),
    fields(week_start = %layout.week_start)
  )]
  pub fn print_week(
    &self,
    layout: &WeekLayout<'_>
  ) -> anyhow::Result<()> {
    let out = io::stdout().lock();
    self.write_week(out, layout)
  }

  #[tracing::instrument(skip(
    self, layout
  ))]
  pub fn print_segments(
    &self,
    layout: &WeekLayout<'_>
  ) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    for assignment in &layout.assignments
    {
      writeln!(
        out,
        "{}",
        serde_json::to_string(
          assignment
        )?
      )?;
    }
    Ok(())
  }

  /// Writes one line per visible row and a trailing `+N more` line when
  /// any day overflows.
  pub fn write_week<W: Write>(
    &self,
    mut writer: W,
    layout: &WeekLayout<'_>
  ) -> anyhow::Result<()> {
    let week = WeekDates::starting(
      layout.week_start
    );
    let headers: Vec<String> = week
      .dates()
      .iter()
      .map(|date| {
        date.format("%a %d").to_string()
      })
      .collect();

    let mut rows = Vec::new();
    let visible_rows = layout
      .row_count
      .min(layout.max_visible_rows);
    for row in 0..visible_rows {
      let mut cells = vec![
        String::new();
        DAYS_PER_WEEK
      ];
      for assignment in layout
        .visible_assignments()
        .filter(|a| a.row == row)
      {
        self.fill_cells(
          &mut cells,
          assignment
        );
      }
      rows.push(cells);
    }

    if !layout.overflow.is_empty() {
      let cells = (0..DAYS_PER_WEEK)
        .map(|day| {
          match layout.hidden_count(day)
          {
            | 0 => String::new(),
            | n => format!("+{n} more")
          }
        })
        .collect();
      rows.push(cells);
    }

    write_table(
      &mut writer,
      headers,
      rows
    )
  }

  fn fill_cells(
    &self,
    cells: &mut [String],
    assignment: &RowAssignment<'_>
  ) {
    let segment = &assignment.segment;
    let event = segment.event;
    for day in
      segment.start_day..=segment.end_day
    {
      let mut text =
        if day == segment.start_day {
          self.label.label(event)
        } else {
          "~".to_string()
        };
      if day == segment.start_day
        && !segment.is_first_segment
      {
        text = format!("<{text}");
      }
      if day == segment.end_day
        && !segment.is_last_segment
      {
        text.push('>');
      }
      cells[day] = match event
        .color
        .as_deref()
        .and_then(ansi_code)
      {
        | Some(code) => {
          self.paint(&text, code)
        }
        | None => text
      };
    }
  }

  fn paint(
    &self,
    text: &str,
    code: &str
  ) -> String {
    if !self.color
      || !io::stdout().is_terminal()
    {
      return text.to_string();
    }
    format!("\x1b[{code}m{text}\x1b[0m")
  }
}

fn ansi_code(
  color: &str
) -> Option<&'static str> {
  match color
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "red" => Some("31"),
    | "green" => Some("32"),
    | "yellow" => Some("33"),
    | "blue" => Some("34"),
    | "magenta" | "purple" => {
      Some("35")
    }
    | "cyan" => Some("36"),
    | _ => None
  }
}

fn write_table<W: Write>(
  mut writer: W,
  headers: Vec<String>,
  rows: Vec<Vec<String>>
) -> anyhow::Result<()> {
  let column_count = headers.len();
  let mut widths =
    vec![0usize; column_count];

  for (idx, header) in
    headers.iter().enumerate()
  {
    widths[idx] = widths[idx].max(
      UnicodeWidthStr::width(
        header.as_str()
      )
    );
  }

  for row in &rows {
    for (idx, cell) in
      row.iter().enumerate()
    {
      widths[idx] = widths[idx].max(
        UnicodeWidthStr::width(
          strip_ansi(cell).as_str()
        )
      );
    }
  }

  for idx in 0..column_count {
    write!(
      writer,
      "{:width$} ",
      headers[idx],
      width = widths[idx]
    )?;
  }
  writeln!(writer)?;

  for width in &widths {
    write!(
      writer,
      "{:-<width$} ",
      "",
      width = *width
    )?;
  }
  writeln!(writer)?;

  for row in rows {
    for (idx, cell) in
      row.iter().enumerate()
    {
      let visible_width =
        UnicodeWidthStr::width(
          strip_ansi(cell).as_str()
        );
      let padding = widths[idx]
        .saturating_sub(visible_width);
      write!(
        writer,
        "{}{} ",
        cell,
        " ".repeat(padding)
      )?;
    }
    writeln!(writer)?;
  }

  Ok(())
}

fn strip_ansi(s: &str) -> String {
  let mut out =
    String::with_capacity(s.len());
  let mut escaped = false;

  for ch in s.chars() {
    if escaped {
      if ch == 'm' {
        escaped = false;
      }
      continue;
    }

    if ch == '\x1b' {
      escaped = true;
      continue;
    }

    out.push(ch);
  }

  out
}

#[cfg(test)]
mod tests {
  use chrono::{
    DateTime,
    NaiveDate,
    Utc
  };

  use super::{
    Renderer,
    TileLabel,
    strip_ansi
  };
  use crate::config::{
    Config,
    LayoutConfig
  };
  use crate::datetime::WeekDates;
  use crate::event::CalendarEvent;
  use crate::layout::{
    Viewport,
    layout_week
  };

  fn day(offset: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(
      2026,
      10,
      12 + offset
    )
    .expect("valid date")
    .and_hms_opt(10, 0, 0)
    .expect("valid time")
    .and_utc()
  }

  fn render(
    events: &[CalendarEvent],
    config: &LayoutConfig,
    renderer: &Renderer
  ) -> String {
    let week = WeekDates::starting(
      NaiveDate::from_ymd_opt(
        2026, 10, 12
      )
      .expect("date")
    );
    let layout = layout_week(
      events,
      &week,
      Viewport::new(700.0, 300.0),
      config
    )
    .expect("layout");
    let mut out = Vec::new();
    renderer
      .write_week(&mut out, &layout)
      .expect("render");
    String::from_utf8(out)
      .expect("utf8")
  }

  #[test]
  fn renders_rows_and_overflow_line() {
    let events = vec![
      CalendarEvent::new(
        "a",
        "Standup",
        day(4),
        day(4)
      ),
      CalendarEvent::new(
        "b",
        "Review",
        day(4),
        day(4)
      ),
      CalendarEvent::new(
        "c",
        "Retro",
        day(4),
        day(4)
      ),
    ];
    let config = LayoutConfig {
      max_visible_events_per_day: 1,
      ..LayoutConfig::default()
    };
    let text = render(
      &events,
      &config,
      &Renderer::plain()
    );
    let lines: Vec<&str> =
      text.lines().collect();

    assert_eq!(lines.len(), 4);
    assert!(
      lines[0].starts_with("Mon 12")
    );
    assert!(lines[2].contains("Standup"));
    assert!(lines[3].contains("+2 more"));
    assert!(!text.contains("Review"));
  }

  #[test]
  fn marks_continuations_across_week_edges()
  {
    let events =
      vec![CalendarEvent::new(
        "a",
        "Trip",
        day(5),
        day(8)
      )];
    let text = render(
      &events,
      &LayoutConfig::default(),
      &Renderer::plain()
    );
    let row = text
      .lines()
      .nth(2)
      .expect("row line");
    assert!(row.contains("Trip"));
    assert!(row.contains("~>"));
  }

  #[test]
  fn custom_label_strategy_is_used() {
    fn shout(
      event: &CalendarEvent
    ) -> String {
      event.title.to_uppercase()
    }
    let events =
      vec![CalendarEvent::new(
        "a",
        "Lunch",
        day(0),
        day(0)
      )];
    let renderer = Renderer::plain()
      .with_label(TileLabel::Custom(
        shout
      ));
    let text = render(
      &events,
      &LayoutConfig::default(),
      &renderer
    );
    assert!(text.contains("LUNCH"));
  }

  #[test]
  fn renderer_rejects_unknown_color_setting()
  {
    let mut cfg = Config::defaults();
    cfg.apply_overrides([(
      "rc.color".to_string(),
      "maybe".to_string()
    )]);
    let err = Renderer::new(&cfg)
      .expect_err("bad color value");
    assert!(
      err.to_string().contains("color")
    );

    cfg.apply_overrides([(
      "color".to_string(),
      "no".to_string()
    )]);
    assert!(Renderer::new(&cfg).is_ok());
  }

  #[test]
  fn strip_ansi_removes_escape_codes() {
    assert_eq!(
      strip_ansi("\x1b[31mred\x1b[0m"),
      "red"
    );
  }
}
