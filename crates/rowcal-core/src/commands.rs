use anyhow::Context;
use chrono::{
  Datelike,
  NaiveDate
};
use tracing::{
  debug,
  info,
  instrument
};

use crate::cli::{
  Command,
  ViewArgs
};
use crate::config::LayoutConfig;
use crate::datetime::{
  WeekDates,
  parse_date_expr,
  start_of_week,
  today_in,
  week_starts_for_month
};
use crate::layout::{
  Viewport,
  layout_month,
  layout_week
};
use crate::render::Renderer;
use crate::source::load_events;

#[instrument(skip(
  layout_cfg, renderer, command
))]
pub fn dispatch(
  layout_cfg: &LayoutConfig,
  renderer: &Renderer,
  command: Command
) -> anyhow::Result<()> {
  match command {
    | Command::Week(view) => {
      cmd_week(layout_cfg, renderer, &view)
    }
    | Command::Month(view) => {
      cmd_month(
        layout_cfg,
        renderer,
        &view
      )
    }
    | Command::Segments(view) => {
      cmd_segments(
        layout_cfg,
        renderer,
        &view
      )
    }
  }
}

fn focus_date(
  layout_cfg: &LayoutConfig,
  view: &ViewArgs
) -> anyhow::Result<NaiveDate> {
  let today =
    today_in(&layout_cfg.timezone);
  let date =
    parse_date_expr(&view.date, today)
      .with_context(|| {
        format!(
          "invalid --date {:?}",
          view.date
        )
      })?;
  debug!(%date, %today, "resolved focus date");
  Ok(date)
}

fn focus_week(
  layout_cfg: &LayoutConfig,
  view: &ViewArgs
) -> anyhow::Result<WeekDates> {
  let date = focus_date(layout_cfg, view)?;
  Ok(WeekDates::starting(start_of_week(
    date,
    layout_cfg.first_day_of_week
  )))
}

fn viewport(view: &ViewArgs) -> Viewport {
  Viewport::new(view.width, view.height)
}

#[instrument(skip(layout_cfg, renderer))]
fn cmd_week(
  layout_cfg: &LayoutConfig,
  renderer: &Renderer,
  view: &ViewArgs
) -> anyhow::Result<()> {
  let events = load_events(&view.events)?;
  let week = focus_week(layout_cfg, view)?;
  let layout = layout_week(
    &events,
    &week,
    viewport(view),
    layout_cfg
  )?;
  renderer.print_week(&layout)
}

#[instrument(skip(layout_cfg, renderer))]
fn cmd_month(
  layout_cfg: &LayoutConfig,
  renderer: &Renderer,
  view: &ViewArgs
) -> anyhow::Result<()> {
  let events = load_events(&view.events)?;
  let date = focus_date(layout_cfg, view)?;
  let weeks: Vec<WeekDates> =
    week_starts_for_month(
      date.year(),
      date.month(),
      layout_cfg.first_day_of_week
    )?
    .into_iter()
    .map(WeekDates::starting)
    .collect();
  info!(
    weeks = weeks.len(),
    month = %date.format("%Y-%m"),
    "laying out month"
  );

  let layouts = layout_month(
    &events,
    &weeks,
    viewport(view),
    layout_cfg
  )?;
  for (idx, layout) in
    layouts.iter().enumerate()
  {
    if idx > 0 {
      println!();
    }
    renderer.print_week(layout)?;
  }
  Ok(())
}

#[instrument(skip(layout_cfg, renderer))]
fn cmd_segments(
  layout_cfg: &LayoutConfig,
  renderer: &Renderer,
  view: &ViewArgs
) -> anyhow::Result<()> {
  let events = load_events(&view.events)?;
  let week = focus_week(layout_cfg, view)?;
  let layout = layout_week(
    &events,
    &week,
    viewport(view),
    layout_cfg
  )?;
  renderer.print_segments(&layout)
}
