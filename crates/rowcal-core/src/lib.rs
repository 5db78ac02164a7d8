pub mod budget;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod error;
pub mod event;
pub mod layout;
pub mod overflow;
pub mod render;
pub mod rows;
pub mod segment;
pub mod source;

use std::ffi::OsString;

use clap::Parser;
use tracing::{
  debug,
  info,
  trace
};

pub use crate::error::LayoutError;
pub use crate::layout::{
  Viewport,
  WeekLayout,
  layout_month,
  layout_week
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting rowcal CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.rcfile.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );
  for (key, value) in cfg.iter() {
    trace!(key = %key, value = %value, "effective config");
  }

  let layout_cfg =
    config::LayoutConfig::from_config(
      &cfg
    )?;
  let renderer =
    render::Renderer::new(&cfg)?;

  commands::dispatch(
    &layout_cfg,
    &renderer,
    cli.command
  )?;

  info!("done");
  Ok(())
}
