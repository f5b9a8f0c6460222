use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono::NaiveDate;
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  info,
  warn
};

use crate::datetime::parse_weekday_name;
use crate::rotation::{
  Participant,
  RotationConfig
};

pub const CONFIG_ENV_VAR: &str =
  "BINDUTY_CONFIG";
pub const TIMEZONE_ENV_VAR: &str =
  "BINDUTY_TIMEZONE";
const CONFIG_DIR_NAME: &str = "binduty";
const CONFIG_FILE_NAME: &str =
  "roster.toml";
const ANCHOR_FORMAT: &str = "%Y-%m-%d";

const DEFAULT_TENANTS: [&str; 5] = [
  "Basser",
  "Berman",
  "Galet",
  "Leshinsky",
  "Vale"
];
const DEFAULT_WEEKDAY: &str =
  "wednesday";
const DEFAULT_ANCHOR: &str =
  "2025-08-13";

/// On-disk roster, before validation.
#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct RosterFile {
  pub duty_weekday: String,
  pub anchor:       String,
  #[serde(default)]
  pub timezone:     Option<String>,
  #[serde(default)]
  pub color:        Option<bool>,
  pub tenants:      Vec<TenantEntry>
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct TenantEntry {
  #[serde(default)]
  pub id:   Option<String>,
  pub name: String
}

/// Everything a run needs, validated.
#[derive(Debug, Clone)]
pub struct Settings {
  pub rotation: RotationConfig,
  pub timezone: Option<String>,
  pub color:    bool,
  pub source:   Option<PathBuf>
}

impl Default for RosterFile {
  fn default() -> Self {
    Self {
      duty_weekday: DEFAULT_WEEKDAY
        .to_string(),
      anchor: DEFAULT_ANCHOR.to_string(),
      timezone: None,
      color: None,
      tenants: DEFAULT_TENANTS
        .iter()
        .map(|name| TenantEntry {
          id:   None,
          name: (*name).to_string()
        })
        .collect()
    }
  }
}

impl RosterFile {
  #[tracing::instrument]
  pub fn load(
    path: &Path
  ) -> anyhow::Result<Self> {
    let text = fs::read_to_string(path)
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;
    Self::parse(&text).with_context(
      || {
        format!(
          "failed to parse roster {}",
          path.display()
        )
      }
    )
  }

  pub fn parse(
    text: &str
  ) -> anyhow::Result<Self> {
    toml::from_str::<Self>(text)
      .map_err(|e| anyhow!("{e}"))
  }

  /// Environment settings, which sit
  /// between the roster file and `--rc`
  /// overrides.
  pub fn apply_env<F>(
    &mut self,
    lookup: F
  ) where
    F: Fn(&str) -> Option<String>
  {
    if let Some(tz) =
      lookup(TIMEZONE_ENV_VAR)
      && !tz.trim().is_empty()
    {
      debug!(timezone = %tz, "timezone from environment");
      self.timezone = Some(tz);
    }
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
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
      match key.as_str() {
        | "duty_weekday" | "weekday" => {
          self.duty_weekday = v;
        }
        | "anchor" => self.anchor = v,
        | "timezone" => {
          self.timezone = Some(v);
        }
        | "color" => {
          self.color = Some(parse_bool(&v));
        }
        | other => {
          return Err(anyhow!(
            "unknown setting: {other}"
          ));
        }
      }
    }
    Ok(())
  }

  pub fn into_settings(
    self,
    source: Option<PathBuf>
  ) -> anyhow::Result<Settings> {
    let weekday = parse_weekday_name(
      &self.duty_weekday
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid duty_weekday: {}",
        self.duty_weekday
      )
    })?;
    let anchor =
      NaiveDate::parse_from_str(
        self.anchor.trim(),
        ANCHOR_FORMAT
      )
      .with_context(|| {
        format!(
          "invalid anchor date (expected \
           YYYY-MM-DD): {}",
          self.anchor
        )
      })?;

    let participants = self
      .tenants
      .into_iter()
      .map(|entry| {
        let id = entry
          .id
          .filter(|id| !id.trim().is_empty())
          .unwrap_or_else(|| {
            slugify(&entry.name)
          });
        Participant::new(id, entry.name)
      })
      .collect();

    let rotation = RotationConfig::new(
      participants,
      weekday,
      anchor
    )
    .context("invalid roster")?;

    Ok(Settings {
      rotation,
      timezone: self.timezone,
      color: self.color.unwrap_or(true),
      source
    })
  }
}

impl Settings {
  /// Roster from `override_path`, the
  /// environment, the user config dir, or
  /// the built-in house list, in that
  /// order. `BINDUTY_TIMEZONE` beats the
  /// file and `overrides` beat both.
  pub fn load<I>(
    override_path: Option<&Path>,
    overrides: I
  ) -> anyhow::Result<Self>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    Self::load_with_env(
      override_path,
      overrides,
      |var| std::env::var(var).ok()
    )
  }

  #[tracing::instrument(skip(
    overrides, env
  ))]
  pub fn load_with_env<I, F>(
    override_path: Option<&Path>,
    overrides: I,
    env: F
  ) -> anyhow::Result<Self>
  where
    I: IntoIterator<
      Item = (String, String)
    >,
    F: Fn(&str) -> Option<String>
  {
    let path = resolve_roster_path(
      override_path,
      &env
    );
    let mut roster = match &path {
      | Some(path) => {
        info!(roster = %path.display(), "loading roster");
        RosterFile::load(path)?
      }
      | None => {
        warn!(
          "no roster file found; using \
           built-in roster"
        );
        RosterFile::default()
      }
    };

    roster.apply_env(&env);
    roster.apply_overrides(overrides)?;
    roster.into_settings(path)
  }
}

#[tracing::instrument(skip(env))]
fn resolve_roster_path<F>(
  override_path: Option<&Path>,
  env: &F
) -> Option<PathBuf>
where
  F: Fn(&str) -> Option<String>
{
  if let Some(path) = override_path {
    return Some(expand_tilde(path));
  }

  if let Some(raw) = env(CONFIG_ENV_VAR)
  {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(expand_tilde(
        Path::new(trimmed)
      ));
    }
  }

  let candidate = dirs::config_dir()?
    .join(CONFIG_DIR_NAME)
    .join(CONFIG_FILE_NAME);
  if candidate.exists() {
    return Some(candidate);
  }

  debug!(candidate = %candidate.display(), "default roster path does not exist");
  None
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

fn slugify(name: &str) -> String {
  let mut slug = String::with_capacity(
    name.len()
  );
  for ch in name.trim().chars() {
    if ch.is_alphanumeric() {
      slug.extend(ch.to_lowercase());
    } else if !slug.ends_with('-') {
      slug.push('-');
    }
  }
  slug.trim_matches('-').to_string()
}

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    Weekday
  };

  use super::{
    RosterFile,
    TIMEZONE_ENV_VAR,
    slugify
  };

  #[test]
  fn default_roster_is_the_house() {
    let settings = RosterFile::default()
      .into_settings(None)
      .expect("default roster is valid");
    let ids: Vec<&str> = settings
      .rotation
      .participants()
      .iter()
      .map(|p| p.id.as_str())
      .collect();
    assert_eq!(
      ids,
      vec![
        "basser",
        "berman",
        "galet",
        "leshinsky",
        "vale"
      ]
    );
    assert_eq!(
      settings.rotation.duty_weekday(),
      Weekday::Wed
    );
    assert_eq!(
      settings.rotation.anchor(),
      NaiveDate::from_ymd_opt(2025, 8, 13)
        .expect("valid date")
    );
    assert!(settings.color);
  }

  #[test]
  fn parses_toml_roster() {
    let roster = RosterFile::parse(
      r#"
duty_weekday = "thu"
anchor = "2025-09-04"
timezone = "Europe/London"
color = false

[[tenants]]
id = "a"
name = "Ada"

[[tenants]]
name = "Bo Peep"
"#
    )
    .expect("parse roster");
    let settings = roster
      .into_settings(None)
      .expect("valid roster");
    assert_eq!(
      settings.rotation.duty_weekday(),
      Weekday::Thu
    );
    assert_eq!(
      settings.rotation.participants()[1]
        .id,
      "bo-peep"
    );
    assert_eq!(
      settings.timezone.as_deref(),
      Some("Europe/London")
    );
    assert!(!settings.color);
  }

  #[test]
  fn overrides_replace_fields() {
    let mut roster = RosterFile::default();
    roster
      .apply_overrides(vec![
        (
          "rc.duty_weekday".to_string(),
          "friday".to_string()
        ),
        (
          "anchor".to_string(),
          "2025-01-03".to_string()
        ),
        (
          "color".to_string(),
          "off".to_string()
        ),
      ])
      .expect("known keys");
    let settings = roster
      .into_settings(None)
      .expect("valid roster");
    assert_eq!(
      settings.rotation.duty_weekday(),
      Weekday::Fri
    );
    assert!(!settings.color);
  }

  #[test]
  fn rejects_unknown_override() {
    let mut roster = RosterFile::default();
    let err = roster
      .apply_overrides(vec![(
        "colour".to_string(),
        "on".to_string()
      )])
      .expect_err("unknown key");
    assert!(
      err.to_string().contains("colour")
    );
  }

  #[test]
  fn rejects_bad_values() {
    let mut roster = RosterFile::default();
    roster.duty_weekday =
      "someday".to_string();
    assert!(
      roster.into_settings(None).is_err()
    );

    let mut roster = RosterFile::default();
    roster.anchor = "13/08/2025".to_string();
    assert!(
      roster.into_settings(None).is_err()
    );

    let mut roster = RosterFile::default();
    roster.tenants.clear();
    let err = roster
      .into_settings(None)
      .expect_err("empty roster");
    assert!(
      format!("{err:#}")
        .contains("at least one participant")
    );
  }

  #[test]
  fn timezone_prefers_rc_then_env_then_file() {
    let file = || {
      let mut roster = RosterFile::default();
      roster.timezone =
        Some("Europe/London".to_string());
      roster
    };
    let tokyo = |var: &str| {
      (var == TIMEZONE_ENV_VAR)
        .then(|| "Asia/Tokyo".to_string())
    };

    let mut roster = file();
    roster.apply_env(|_: &str| None);
    assert_eq!(
      roster.timezone.as_deref(),
      Some("Europe/London")
    );

    let mut roster = file();
    roster.apply_env(|_: &str| {
      Some("  ".to_string())
    });
    assert_eq!(
      roster.timezone.as_deref(),
      Some("Europe/London")
    );

    let mut roster = file();
    roster.apply_env(tokyo);
    assert_eq!(
      roster.timezone.as_deref(),
      Some("Asia/Tokyo")
    );

    let mut roster = file();
    roster.apply_env(tokyo);
    roster
      .apply_overrides(vec![(
        "rc.timezone".to_string(),
        "Pacific/Honolulu".to_string()
      )])
      .expect("known key");
    assert_eq!(
      roster.timezone.as_deref(),
      Some("Pacific/Honolulu")
    );
  }

  #[test]
  fn slugs_names() {
    assert_eq!(slugify("Bo  Peep!"), "bo-peep");
    assert_eq!(slugify("Vale"), "vale");
  }
}
