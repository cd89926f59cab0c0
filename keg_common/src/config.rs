use log::LevelFilter;
use serde_derive::Deserialize;
use std::{fs, path::Path, str::FromStr};
use thiserror::Error;

/// How a reader treats a stream whose record layout differs from its own.
///
/// Writers and readers must agree on this choice, since it changes the bytes
/// on the wire: under [`Backwards`](Compatibility::Backwards) every record is
/// preceded by its fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Compatibility {
  /// Record layouts must match exactly.
  #[default]
  Strict,
  /// A stream written with an older record layout (a prefix of the reader's
  /// components) is accepted, and the missing components are filled with
  /// zero values.
  Backwards,
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("could not read config: {0}")]
  Io(#[from] std::io::Error),
  #[error("could not parse config: {0}")]
  Toml(#[from] toml::de::Error),
}

#[derive(Debug, Error)]
#[error("invalid compatibility (expected `strict` or `backwards`): {0}")]
pub struct InvalidCompatibility(String);

impl FromStr for Compatibility {
  type Err = InvalidCompatibility;

  fn from_str(s: &str) -> Result<Self, InvalidCompatibility> {
    match s {
      "strict" => Ok(Compatibility::Strict),
      "backwards" => Ok(Compatibility::Backwards),
      _ => Err(InvalidCompatibility(s.into())),
    }
  }
}

/// The host configuration file. Everything has a default, so an empty string
/// parses to a valid config.
///
/// ```toml
/// [codec]
/// compatibility = "backwards"
/// logging-level = "debug"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
  #[serde(default)]
  codec: CodecSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CodecSection {
  #[serde(default)]
  compatibility: Compatibility,
  #[serde(default = "default_level", rename = "logging-level")]
  logging_level: String,
}

fn default_level() -> String { "info".into() }

impl Default for CodecSection {
  fn default() -> Self {
    CodecSection { compatibility: Compatibility::default(), logging_level: default_level() }
  }
}

impl Config {
  pub fn from_toml(src: &str) -> Result<Config, ConfigError> { Ok(toml::from_str(src)?) }

  pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    Self::from_toml(&fs::read_to_string(path)?)
  }

  pub fn compatibility(&self) -> Compatibility { self.codec.compatibility }

  /// The diagnostic severity threshold. This is purely observational; the
  /// host decides whether to apply it to its logger.
  pub fn logging_level(&self) -> LevelFilter {
    self.codec.logging_level.parse().unwrap_or_else(|_| {
      warn!("invalid logging-level `{}`, using `info`", self.codec.logging_level);
      LevelFilter::Info
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn defaults() {
    let config = Config::from_toml("").unwrap();
    assert_eq!(config.compatibility(), Compatibility::Strict);
    assert_eq!(config.logging_level(), LevelFilter::Info);
  }

  #[test]
  fn parse_simple_values() {
    let config = Config::from_toml(
      r#"
      [codec]
      compatibility = "backwards"
      logging-level = "debug"
      "#,
    )
    .unwrap();
    assert_eq!(config.compatibility(), Compatibility::Backwards);
    assert_eq!(config.logging_level(), LevelFilter::Debug);
  }

  #[test]
  fn rejects_unknown_keys() {
    assert!(Config::from_toml("[codec]\ncompatibillity = \"strict\"\n").is_err());
    assert!(Config::from_toml("[kodec]\n").is_err());
  }

  #[test]
  fn bad_level_falls_back() {
    let config = Config::from_toml("[codec]\nlogging-level = \"shout\"\n").unwrap();
    assert_eq!(config.logging_level(), LevelFilter::Info);
  }
}
