// Copyright 2018-2026 the Deno authors. MIT license.

use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::DEFAULT_CONCURRENCY;
use crate::FilterSet;
use crate::InvalidFilterError;
use crate::LogLevel;
use crate::Options;

pub const RC_FILE_NAME: &str = ".ncurc.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Error reading config file {}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("Unable to parse config file JSON: {0}")]
  Parse(String),
  #[error("config file JSON should be an object")]
  NotAnObject,
  #[error("Invalid config file")]
  Deserialize(#[source] serde_json::Error),
  #[error(transparent)]
  InvalidFilter(#[from] InvalidFilterError),
}

/// A list of patterns written either as an array or as one comma or
/// space separated string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PatternList {
  One(String),
  Many(Vec<String>),
}

impl PatternList {
  pub fn patterns(&self) -> Vec<&str> {
    match self {
      PatternList::One(text) => text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect(),
      PatternList::Many(items) => items
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect(),
    }
  }
}

/// The settings of an upgrade rc file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpgradeRc {
  pub peer: bool,
  pub minimal: bool,
  pub json_upgraded: bool,
  pub pre: bool,
  pub deprecated: bool,
  pub concurrency: Option<usize>,
  #[serde(rename = "loglevel")]
  pub log_level: Option<LogLevel>,
  pub filter: Option<PatternList>,
  pub reject: Option<PatternList>,
  pub max_peer_iterations: Option<usize>,
}

impl UpgradeRc {
  pub fn parse(text: &str) -> Result<Self, ConfigError> {
    let value =
      match jsonc_parser::parse_to_serde_value::<Option<Value>>(text, &Default::default()) {
        Ok(None) => json!({}),
        Ok(Some(value)) if value.is_object() => value,
        Ok(Some(_)) => return Err(ConfigError::NotAnObject),
        Err(err) => return Err(ConfigError::Parse(err.to_string())),
      };
    Self::from_value(value)
  }

  fn from_value(value: Value) -> Result<Self, ConfigError> {
    serde_json::from_value(value).map_err(ConfigError::Deserialize)
  }

  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let text =
      std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
      })?;
    log::debug!("Loaded upgrade config from {}", path.display());
    Self::parse(&text)
  }

  /// Loads the rc file from `dir` when one exists.
  pub fn discover(dir: &Path) -> Result<Option<Self>, ConfigError> {
    let path = dir.join(RC_FILE_NAME);
    if !path.is_file() {
      return Ok(None);
    }
    Self::load(&path).map(Some)
  }

  pub fn filter_set(&self) -> Result<Option<FilterSet>, ConfigError> {
    let filter = self
      .filter
      .as_ref()
      .map(PatternList::patterns)
      .unwrap_or_default();
    let reject = self
      .reject
      .as_ref()
      .map(PatternList::patterns)
      .unwrap_or_default();
    let set = FilterSet::from_filter_and_reject(filter, reject)?;
    Ok(if set.is_empty() { None } else { Some(set) })
  }

  pub fn into_options(self) -> Result<Options, ConfigError> {
    let filter_set = self.filter_set()?;
    let mut options = Options {
      peer: self.peer,
      minimal: self.minimal,
      json_upgraded: self.json_upgraded,
      log_level: self.log_level.unwrap_or_default(),
      pre: self.pre,
      deprecated: self.deprecated,
      concurrency: self.concurrency.unwrap_or(DEFAULT_CONCURRENCY).max(1),
      max_peer_iterations: self.max_peer_iterations,
      ..Default::default()
    };
    if let Some(filter_set) = filter_set {
      options = options.with_filter_results(filter_set);
    }
    Ok(options)
  }
}
