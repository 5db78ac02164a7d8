use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::str::FromStr;

use anyhow::{
  Context,
  anyhow
};
use chrono::Weekday;
use chrono_tz::Tz;
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::datetime::{
  parse_weekday_name,
  resolve_timezone
};

pub const KEY_TILE_HEIGHT: &str =
  "tile.height";
pub const KEY_TILE_SPACING_VERTICAL:
  &str = "tile.spacing.vertical";
pub const KEY_TILE_SPACING_HORIZONTAL:
  &str = "tile.spacing.horizontal";
pub const KEY_DATE_LABEL_HEIGHT: &str =
  "date.label.height";
pub const KEY_OVERFLOW_INDICATOR_HEIGHT:
  &str = "overflow.indicator.height";
pub const KEY_MAX_VISIBLE_EVENTS: &str =
  "max.visible.events";
pub const KEY_WEEK_START: &str =
  "week.start";
pub const KEY_TIMEZONE: &str =
  "timezone";
pub const KEY_COLOR: &str = "color";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Config {
  pub fn defaults() -> Self {
    let mut cfg = Config {
      map:          HashMap::new(),
      loaded_files: vec![]
    };

    for (key, value) in [
      (KEY_TILE_HEIGHT, "24"),
      (KEY_TILE_SPACING_VERTICAL, "2"),
      (KEY_TILE_SPACING_HORIZONTAL, "2"),
      (KEY_DATE_LABEL_HEIGHT, "20"),
      (
        KEY_OVERFLOW_INDICATOR_HEIGHT,
        "16"
      ),
      (KEY_MAX_VISIBLE_EVENTS, "0"),
      (KEY_WEEK_START, "monday"),
      (KEY_COLOR, "on")
    ] {
      cfg.map.insert(
        key.to_string(),
        value.to_string()
      );
    }

    cfg
  }

  #[tracing::instrument(skip(
    rcfile_override
  ))]
  pub fn load(
    rcfile_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Self::defaults();

    let rcfile = resolve_rcfile_path(
      rcfile_override
    )?;
    if let Some(path) = rcfile {
      info!(rcfile = %path.display(), "loading rcfile");
      cfg.load_file(&path)?;
    } else {
      info!(
        "no rcfile found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> anyhow::Result<Option<bool>> {
    let Some(raw) = self.map.get(key)
    else {
      return Ok(None);
    };
    parse_bool(raw).map(Some).ok_or_else(
      || {
        anyhow!(
          "invalid value for {key}: \
           {raw:?} (expected on/off)"
        )
      }
    )
  }

  fn get_parsed<T>(
    &self,
    key: &str
  ) -> anyhow::Result<Option<T>>
  where
    T: FromStr,
    T::Err: std::fmt::Display
  {
    let Some(raw) = self.map.get(key)
    else {
      return Ok(None);
    };
    raw
      .trim()
      .parse::<T>()
      .map(Some)
      .map_err(|e| {
        anyhow!(
          "invalid value for {key}: \
           {raw:?} ({e})"
        )
      })
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }

      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

/// Typed layout options handed to every layout pass.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
  pub tile_height:               f64,
  pub tile_vertical_spacing:     f64,
  pub tile_horizontal_spacing:   f64,
  pub date_label_height:         f64,
  pub overflow_indicator_height: f64,
  /// `0` means unlimited.
  pub max_visible_events_per_day:
    usize,
  pub first_day_of_week:         Weekday,
  pub timezone:                  Tz
}

impl Default for LayoutConfig {
  fn default() -> Self {
    Self {
      tile_height:                24.0,
      tile_vertical_spacing:      2.0,
      tile_horizontal_spacing:    2.0,
      date_label_height:          20.0,
      overflow_indicator_height:  16.0,
      max_visible_events_per_day: 0,
      first_day_of_week:
        Weekday::Mon,
      timezone:
        chrono_tz::UTC
    }
  }
}

impl LayoutConfig {
  #[tracing::instrument(skip(cfg))]
  pub fn from_config(
    cfg: &Config
  ) -> anyhow::Result<Self> {
    let defaults = Self::default();

    let first_day_of_week =
      match cfg.get(KEY_WEEK_START) {
        | Some(raw) => {
          parse_weekday_name(&raw)
            .ok_or_else(|| {
              anyhow!(
                "invalid value for \
                 {KEY_WEEK_START}: \
                 {raw:?}"
              )
            })?
        }
        | None => {
          defaults.first_day_of_week
        }
      };

    let layout = Self {
      tile_height: non_negative(
        cfg,
        KEY_TILE_HEIGHT,
        defaults.tile_height
      )?,
      tile_vertical_spacing:
        non_negative(
          cfg,
          KEY_TILE_SPACING_VERTICAL,
          defaults
            .tile_vertical_spacing
        )?,
      tile_horizontal_spacing:
        non_negative(
          cfg,
          KEY_TILE_SPACING_HORIZONTAL,
          defaults
            .tile_horizontal_spacing
        )?,
      date_label_height: non_negative(
        cfg,
        KEY_DATE_LABEL_HEIGHT,
        defaults.date_label_height
      )?,
      overflow_indicator_height:
        non_negative(
          cfg,
          KEY_OVERFLOW_INDICATOR_HEIGHT,
          defaults
            .overflow_indicator_height
        )?,
      max_visible_events_per_day: cfg
        .get_parsed::<usize>(
          KEY_MAX_VISIBLE_EVENTS
        )?
        .unwrap_or(
          defaults
            .max_visible_events_per_day
        ),
      first_day_of_week,
      timezone: layout_timezone(cfg)?
    };

    debug!(?layout, "resolved layout config");
    Ok(layout)
  }

  pub fn tile_slot_height(&self) -> f64 {
    self.tile_height
      + self.tile_vertical_spacing
  }
}

fn layout_timezone(
  cfg: &Config
) -> anyhow::Result<Tz> {
  resolve_timezone(
    cfg.get(KEY_TIMEZONE).as_deref()
  )
  .with_context(|| {
    format!(
      "failed to resolve {KEY_TIMEZONE}"
    )
  })
}

fn non_negative(
  cfg: &Config,
  key: &str,
  default: f64
) -> anyhow::Result<f64> {
  let value = cfg
    .get_parsed::<f64>(key)?
    .unwrap_or(default);
  if !value.is_finite() || value < 0.0
  {
    return Err(anyhow!(
      "{key} must be a finite, \
       non-negative number, got \
       {value}"
    ));
  }
  Ok(value)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rcfile_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var("ROWCALRC")
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    debug!(
      "cannot determine home \
       directory; skipping ~/.rowcalrc"
    );
    return Ok(None);
  };
  let candidate = home.join(".rowcalrc");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Some(true),
    | "0" | "n" | "no" | "off"
    | "false" => Some(false),
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use chrono::Weekday;

  use super::{
    Config,
    KEY_COLOR,
    LayoutConfig
  };

  fn with(
    pairs: &[(&str, &str)]
  ) -> Config {
    let mut cfg = Config::defaults();
    cfg.apply_overrides(
      pairs.iter().map(|(k, v)| {
        (k.to_string(), v.to_string())
      })
    );
    cfg
  }

  #[test]
  fn defaults_match_layout_default() {
    let layout =
      LayoutConfig::from_config(
        &with(&[(
          "timezone", "UTC"
        )])
      )
      .expect("layout config");
    assert_eq!(
      layout,
      LayoutConfig::default()
    );
    assert_eq!(
      layout.tile_slot_height(),
      26.0
    );
  }

  #[test]
  fn overrides_strip_rc_prefix() {
    let layout =
      LayoutConfig::from_config(
        &with(&[
          ("rc.max.visible.events", "3"),
          ("rc.week.start", "sunday"),
          ("tile.height", "18.5"),
          ("timezone", "Europe/Berlin")
        ])
      )
      .expect("layout config");
    assert_eq!(
      layout.max_visible_events_per_day,
      3
    );
    assert_eq!(
      layout.first_day_of_week,
      Weekday::Sun
    );
    assert_eq!(layout.tile_height, 18.5);
    assert_eq!(
      layout.timezone,
      chrono_tz::Europe::Berlin
    );
  }

  #[test]
  fn rejects_negative_heights() {
    let err =
      LayoutConfig::from_config(
        &with(&[(
          "date.label.height",
          "-4"
        )])
      )
      .expect_err("negative height");
    assert!(
      err
        .to_string()
        .contains("date.label.height")
    );
  }

  #[test]
  fn rejects_unknown_timezone() {
    assert!(
      LayoutConfig::from_config(
        &with(&[(
          "timezone",
          "Mars/Olympus"
        )])
      )
      .is_err()
    );
  }

  #[test]
  fn rejects_unknown_weekday() {
    assert!(
      LayoutConfig::from_config(
        &with(&[(
          "week.start",
          "someday"
        )])
      )
      .is_err()
    );
  }

  #[test]
  fn color_flag_parses_as_bool() {
    assert_eq!(
      with(&[("color", "off")])
        .get_bool(KEY_COLOR)
        .expect("bool"),
      Some(false)
    );
    assert_eq!(
      Config::defaults()
        .get_bool(KEY_COLOR)
        .expect("bool"),
      Some(true)
    );
    assert!(
      with(&[("color", "sometimes")])
        .get_bool(KEY_COLOR)
        .is_err()
    );
  }
}
