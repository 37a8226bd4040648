// Copyright 2018-2026 the Deno authors. MIT license.

use std::fmt;
use std::sync::Arc;

use deno_error::JsErrorBox;
use deno_semver::Version;
use ncu_version_spec::SpecifierRange;
use serde::Deserialize;
use serde::Serialize;

use crate::PeerDependencyMap;

pub const DEFAULT_CONCURRENCY: usize = 8;

/// How much the engine reports while resolving.
#[derive(
  Debug,
  Default,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
  Silent,
  Error,
  #[default]
  Warn,
  Info,
  Verbose,
}

impl LogLevel {
  /// Gets if records at `level` should be emitted.
  pub fn allows(self, level: log::Level) -> bool {
    let required = match level {
      log::Level::Error => LogLevel::Error,
      log::Level::Warn => LogLevel::Warn,
      log::Level::Info => LogLevel::Info,
      log::Level::Debug | log::Level::Trace => LogLevel::Verbose,
    };
    self >= required
  }
}

/// What a filter sees about one dependency before it is upgraded.
#[derive(Debug, Clone, Copy)]
pub struct UpgradeCandidate<'a> {
  pub current_version: &'a str,
  /// `None` when the current specifier is not a valid range.
  pub current_version_semver: Option<&'a SpecifierRange>,
  pub upgraded_version: &'a str,
  pub upgraded_version_semver: Option<&'a Version>,
}

/// Decides whether a dependency takes part in the upgrade.
///
/// An error aborts the whole resolution.
pub trait UpgradeFilter {
  fn keep(
    &self,
    dep: &str,
    candidate: &UpgradeCandidate<'_>,
  ) -> Result<bool, JsErrorBox>;
}

impl<F> UpgradeFilter for F
where
  F: Fn(&str, &UpgradeCandidate<'_>) -> Result<bool, JsErrorBox>,
{
  fn keep(
    &self,
    dep: &str,
    candidate: &UpgradeCandidate<'_>,
  ) -> Result<bool, JsErrorBox> {
    (self)(dep, candidate)
  }
}

#[derive(Clone)]
pub struct Options {
  /// Expand the dependency set to satisfy peer dependencies.
  pub peer: bool,
  pub minimal: bool,
  pub json_upgraded: bool,
  pub filter_results: Option<Arc<dyn UpgradeFilter>>,
  /// Peer requirements accumulated by earlier passes.
  pub peer_dependencies: Option<PeerDependencyMap>,
  pub log_level: LogLevel,
  /// Consider pre-release versions.
  pub pre: bool,
  /// Consider deprecated versions.
  pub deprecated: bool,
  /// Maximum registry lookups in flight at once.
  pub concurrency: usize,
  /// Fail instead of resolving more than this many passes.
  pub max_peer_iterations: Option<usize>,
}

impl Default for Options {
  fn default() -> Self {
    Self {
      peer: false,
      minimal: false,
      json_upgraded: false,
      filter_results: None,
      peer_dependencies: None,
      log_level: LogLevel::default(),
      pre: false,
      deprecated: false,
      concurrency: DEFAULT_CONCURRENCY,
      max_peer_iterations: None,
    }
  }
}

impl Options {
  pub fn with_filter_results(
    mut self,
    filter: impl UpgradeFilter + 'static,
  ) -> Self {
    self.filter_results = Some(Arc::new(filter));
    self
  }

  /// Only upgrades that leave the current range are reported.
  pub fn is_minimal(&self) -> bool {
    self.json_upgraded && self.minimal
  }
}

impl fmt::Debug for Options {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Options")
      .field("peer", &self.peer)
      .field("minimal", &self.minimal)
      .field("json_upgraded", &self.json_upgraded)
      .field("filter_results", &self.filter_results.is_some())
      .field("peer_dependencies", &self.peer_dependencies)
      .field("log_level", &self.log_level)
      .field("pre", &self.pre)
      .field("deprecated", &self.deprecated)
      .field("concurrency", &self.concurrency)
      .field("max_peer_iterations", &self.max_peer_iterations)
      .finish()
  }
}
