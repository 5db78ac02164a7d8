use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{
  ArgAction,
  Args,
  Parser,
  Subcommand
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
  pub cleaned_args: Vec<OsString>,
  pub rc_overrides: Vec<(String, String)>
}

#[derive(Debug, Clone)]
pub struct KeyVal {
  pub key:   String,
  pub value: String
}

impl std::str::FromStr for KeyVal {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let (k, v) =
      s.split_once('=').ok_or_else(|| {
        anyhow!(
          "expected KEY=VALUE, got: {s}"
        )
      })?;
    Ok(Self {
      key:   k.trim().to_string(),
      value: v.trim().to_string()
    })
  }
}

#[derive(Parser, Debug, Clone)]
#[command(
  name = "rowcal",
  version,
  about = "Rowcal: multi-day event row layout for week and month grids",
  disable_help_subcommand = true
)]
pub struct GlobalCli {
  #[arg(
    short = 'v',
    long = "verbose",
    action = ArgAction::Count,
    global = true
  )]
  pub verbose: u8,

  #[arg(
    short = 'q',
    long = "quiet",
    action = ArgAction::Count,
    global = true
  )]
  pub quiet: u8,

  #[arg(
    long = "rc",
    value_parser = clap::builder::ValueParser::new(
      |s: &str| s.parse::<KeyVal>()
    ),
    action = ArgAction::Append,
    global = true
  )]
  pub rc_overrides: Vec<KeyVal>,

  #[arg(long = "rcfile", global = true)]
  pub rcfile: Option<PathBuf>,

  #[command(subcommand)]
  pub command: Command
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
  /// Lay out the week containing a date.
  Week(ViewArgs),
  /// Lay out every week of the month containing a date.
  Month(ViewArgs),
  /// Print the week's segments and rows as JSON lines.
  Segments(ViewArgs)
}

#[derive(Args, Debug, Clone)]
pub struct ViewArgs {
  #[arg(long = "events")]
  pub events: PathBuf,

  #[arg(
    long = "date",
    default_value = "today"
  )]
  pub date: String,

  #[arg(
    long = "height",
    default_value_t = 120.0
  )]
  pub height: f64,

  #[arg(
    long = "width",
    default_value_t = 700.0
  )]
  pub width: f64
}

pub fn init_tracing(
  verbose: u8,
  quiet: u8
) -> anyhow::Result<()> {
  let default_level = if quiet >= 2 {
    "error"
  } else if quiet == 1 {
    "warn"
  } else if verbose >= 3 {
    "trace"
  } else if verbose == 2 {
    "debug"
  } else if verbose == 1 {
    "info"
  } else {
    "warn"
  };

  let env_filter =
    EnvFilter::try_from_default_env()
      .or_else(|_| {
        EnvFilter::try_new(default_level)
      })
      .map_err(|e| {
        anyhow!(
          "invalid RUST_LOG / log \
           filter: {e}"
        )
      })?;

  let init_result =
    tracing_subscriber::fmt()
      .with_env_filter(env_filter)
      .with_target(true)
      .with_level(true)
      .with_writer(std::io::stderr)
      .with_ansi(
        std::io::stderr().is_terminal()
      )
      .try_init();

  if let Err(err) = init_result {
    debug!(
      error = %err,
      "tracing subscriber already set, continuing"
    );
  }

  Ok(())
}

/// Pulls positional `rc.key=value` / `rc.key:value` overrides out of the
/// argument list before clap sees it.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(
  raw: &[OsString]
) -> anyhow::Result<PreprocessedArgs> {
  let mut cleaned =
    Vec::with_capacity(raw.len());
  let mut overrides: Vec<(
    String,
    String
  )> = Vec::new();

  let mut iter = raw.iter().cloned();
  if let Some(bin) = iter.next() {
    cleaned.push(bin);
  }

  for arg in iter {
    let s = arg.to_string_lossy();
    if let Some(rest) =
      s.strip_prefix("rc.")
    {
      let parsed = if let Some((k, v)) =
        rest.split_once('=')
      {
        Some((
          format!("rc.{k}"),
          v.to_string()
        ))
      } else {
        rest.split_once(':').map(
          |(k, v)| {
            (
              format!("rc.{k}"),
              v.to_string()
            )
          }
        )
      };

      if let Some((k, v)) = parsed {
        debug!(
          key = %k,
          value = %v,
          "captured positional rc override"
        );
        overrides.push((k, v));
        continue;
      }
    }

    cleaned.push(arg);
  }

  Ok(PreprocessedArgs {
    cleaned_args: cleaned,
    rc_overrides: overrides
  })
}

#[cfg(test)]
mod tests {
  use std::ffi::OsString;

  use clap::Parser;

  use super::{
    Command,
    GlobalCli,
    preprocess_args
  };

  fn args(
    raw: &[&str]
  ) -> Vec<OsString> {
    raw
      .iter()
      .map(OsString::from)
      .collect()
  }

  #[test]
  fn positional_rc_overrides_are_extracted()
  {
    let pre = preprocess_args(&args(&[
      "rowcal",
      "week",
      "rc.max.visible.events=2",
      "--events",
      "e.jsonl",
      "rc.week.start:sunday",
    ]))
    .expect("preprocess");

    assert_eq!(
      pre.rc_overrides,
      vec![
        (
          "rc.max.visible.events"
            .to_string(),
          "2".to_string()
        ),
        (
          "rc.week.start".to_string(),
          "sunday".to_string()
        ),
      ]
    );
    assert_eq!(
      pre.cleaned_args,
      args(&[
        "rowcal", "week", "--events",
        "e.jsonl"
      ])
    );
  }

  #[test]
  fn parses_view_subcommand() {
    let cli = GlobalCli::parse_from(args(&[
      "rowcal",
      "-vv",
      "month",
      "--events",
      "e.jsonl",
      "--date",
      "2026-10-01",
      "--height",
      "90",
      "--rc",
      "tile.height=18",
    ]));
    assert_eq!(cli.verbose, 2);
    assert_eq!(cli.rc_overrides.len(), 1);
    assert_eq!(
      cli.rc_overrides[0].key,
      "tile.height"
    );
    let Command::Month(view) = cli.command
    else {
      panic!("expected month command");
    };
    assert_eq!(view.date, "2026-10-01");
    assert_eq!(view.height, 90.0);
    assert_eq!(view.width, 700.0);
  }
}
