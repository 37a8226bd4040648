// Copyright 2018-2026 the Deno authors. MIT license.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use deno_error::JsErrorBox;
use deno_semver::Version;
use deno_semver::VersionReq;
use futures::StreamExt;
use ncu_version_spec::NpmAlias;
use ncu_version_spec::satisfies;
use serde::Deserialize;
use serde::Serialize;

use crate::DependencyMap;
use crate::Options;

pub const NOT_FOUND_ERROR: &str = "404 Not Found";

/// The registry outcome for one dependency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionResult {
  /// `None` when no version could be resolved.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub version: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl VersionResult {
  pub fn found(version: impl Into<String>) -> Self {
    Self {
      version: Some(version.into()),
      error: None,
    }
  }

  pub fn failed(error: impl Into<String>) -> Self {
    Self {
      version: None,
      error: Some(error.into()),
    }
  }
}

pub type VersionResults = BTreeMap<String, VersionResult>;

/// Dependency name to the peer requirements its resolved version declares.
pub type PeerDependencyMap = BTreeMap<String, DependencyMap>;

/// A fault of the querier itself rather than of a single dependency.
#[derive(Debug, Clone, thiserror::Error)]
#[error(transparent)]
pub struct RegistryQueryError(pub Arc<JsErrorBox>);

impl From<JsErrorBox> for RegistryQueryError {
  fn from(err: JsErrorBox) -> Self {
    Self(Arc::new(err))
  }
}

#[async_trait(?Send)]
pub trait RegistryVersionQuerier {
  /// Resolves the latest acceptable version of every dependency.
  ///
  /// The returned map has an entry for every key of `dependencies`.
  async fn query_versions(
    &self,
    dependencies: &DependencyMap,
    options: &Options,
  ) -> Result<VersionResults, RegistryQueryError>;

  /// Gets the peer requirements of each `name -> version` entry, with an
  /// empty map for packages that declare none.
  async fn get_peer_dependencies(
    &self,
    dependencies: &DependencyMap,
    options: &Options,
  ) -> Result<PeerDependencyMap, RegistryQueryError>;
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
  pub name: String,
  #[serde(default)]
  pub versions: HashMap<String, PackageVersionInfo>,
  #[serde(default, rename = "dist-tags")]
  pub dist_tags: HashMap<String, String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageVersionInfo {
  pub version: String,
  #[serde(default, skip_serializing_if = "DependencyMap::is_empty")]
  pub peer_dependencies: DependencyMap,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub deprecated: Option<String>,
}

/// Fetches package documents. Transport and caching live behind this.
#[async_trait(?Send)]
pub trait PackageInfoLoader {
  /// Gets `None` when the registry has no such package.
  async fn load_package_info(
    &self,
    name: &str,
  ) -> Result<Option<Arc<PackageInfo>>, JsErrorBox>;
}

struct VersionPredicate<'a> {
  pre: bool,
  deprecated: bool,
  peer_ranges: Vec<&'a str>,
}

impl<'a> VersionPredicate<'a> {
  fn new(name: &str, options: &'a Options) -> Self {
    let peer_ranges = options
      .peer_dependencies
      .iter()
      .flat_map(|peers| peers.values())
      .filter_map(|peers| peers.get(name))
      .map(|range| range.as_str())
      .collect();
    Self {
      pre: options.pre,
      deprecated: options.deprecated,
      peer_ranges,
    }
  }

  fn allows(&self, version: &Version, info: &PackageVersionInfo) -> bool {
    if !self.deprecated && info.deprecated.is_some() {
      return false;
    }
    if !self.pre && !version.pre.is_empty() {
      return false;
    }
    let text = version.to_string();
    self.peer_ranges.iter().all(|range| satisfies(&text, range))
  }
}

/// The `latest` dist-tag when acceptable, otherwise the greatest acceptable
/// version.
fn find_latest_version(
  info: &PackageInfo,
  predicate: &VersionPredicate<'_>,
) -> Option<Version> {
  if let Some(tagged) = info.dist_tags.get("latest") {
    if let (Some(version_info), Ok(version)) =
      (info.versions.get(tagged), Version::parse_from_npm(tagged))
    {
      if predicate.allows(&version, version_info) {
        return Some(version);
      }
    }
  }

  let mut maybe_best_version: Option<Version> = None;
  for (text, version_info) in &info.versions {
    let Ok(version) = Version::parse_from_npm(text) else {
      continue;
    };
    if !predicate.allows(&version, version_info) {
      continue;
    }
    let is_best_version = maybe_best_version
      .as_ref()
      .map(|best_version| best_version.cmp(&version).is_lt())
      .unwrap_or(true);
    if is_best_version {
      maybe_best_version = Some(version);
    }
  }
  maybe_best_version
}

/// The exact version when published, otherwise the greatest version the
/// text matches as a range.
fn find_version_info<'a>(
  info: &'a PackageInfo,
  version_text: &str,
) -> Option<&'a PackageVersionInfo> {
  if let Some(version_info) = info.versions.get(version_text) {
    return Some(version_info);
  }
  let version_req = VersionReq::parse_from_npm(version_text).ok()?;
  let mut maybe_best: Option<(Version, &PackageVersionInfo)> = None;
  for (text, version_info) in &info.versions {
    let Ok(version) = Version::parse_from_npm(text) else {
      continue;
    };
    if !version_req.matches(&version) {
      continue;
    }
    if maybe_best.as_ref().is_none_or(|(best, _)| best < &version) {
      maybe_best = Some((version, version_info));
    }
  }
  maybe_best.map(|(_, version_info)| version_info)
}

/// Splits `npm:real-name@spec` into the package to look up and its spec.
fn registry_name<'a>(dep: &'a str, spec: &'a str) -> (&'a str, &'a str) {
  match NpmAlias::parse(spec) {
    Some(alias) => (alias.name, alias.version_spec),
    None => (dep, spec),
  }
}

/// Answers version queries from package documents.
pub struct PackageInfoRegistry<TLoader: PackageInfoLoader> {
  loader: TLoader,
}

impl<TLoader: PackageInfoLoader> PackageInfoRegistry<TLoader> {
  pub fn new(loader: TLoader) -> Self {
    Self { loader }
  }

  pub fn loader(&self) -> &TLoader {
    &self.loader
  }

  async fn query_latest_version(
    &self,
    dep: &str,
    spec: &str,
    options: &Options,
  ) -> VersionResult {
    let (name, _) = registry_name(dep, spec);
    let info = match self.loader.load_package_info(name).await {
      Ok(Some(info)) => info,
      Ok(None) => {
        log_if!(
          options,
          Debug,
          "Package {} was not found in the registry",
          name
        );
        return VersionResult::failed(NOT_FOUND_ERROR);
      }
      Err(err) => {
        log_if!(
          options,
          Debug,
          "Failed loading package info for {}: {:#}",
          name,
          err
        );
        return VersionResult::failed(err.to_string());
      }
    };
    let predicate = VersionPredicate::new(name, options);
    match find_latest_version(&info, &predicate) {
      Some(version) => VersionResult::found(version.to_string()),
      None => VersionResult::default(),
    }
  }

  async fn query_peer_dependencies(
    &self,
    dep: &str,
    version: &str,
    options: &Options,
  ) -> DependencyMap {
    let (name, version) = registry_name(dep, version);
    match self.loader.load_package_info(name).await {
      Ok(Some(info)) => find_version_info(&info, version)
        .map(|version_info| version_info.peer_dependencies.clone())
        .unwrap_or_default(),
      Ok(None) => DependencyMap::new(),
      Err(err) => {
        log_if!(
          options,
          Debug,
          "Failed loading package info for {}: {:#}",
          name,
          err
        );
        DependencyMap::new()
      }
    }
  }
}

#[async_trait(?Send)]
impl<TLoader: PackageInfoLoader> RegistryVersionQuerier
  for PackageInfoRegistry<TLoader>
{
  async fn query_versions(
    &self,
    dependencies: &DependencyMap,
    options: &Options,
  ) -> Result<VersionResults, RegistryQueryError> {
    let results = futures::stream::iter(dependencies.iter().map(
      |(dep, spec)| async move {
        let result = self.query_latest_version(dep, spec, options).await;
        (dep.clone(), result)
      },
    ))
    .buffer_unordered(options.concurrency.max(1))
    .collect::<Vec<_>>()
    .await;
    Ok(results.into_iter().collect())
  }

  async fn get_peer_dependencies(
    &self,
    dependencies: &DependencyMap,
    options: &Options,
  ) -> Result<PeerDependencyMap, RegistryQueryError> {
    let results = futures::stream::iter(dependencies.iter().map(
      |(dep, version)| async move {
        let peers = self.query_peer_dependencies(dep, version, options).await;
        (dep.clone(), peers)
      },
    ))
    .buffer_unordered(options.concurrency.max(1))
    .collect::<Vec<_>>()
    .await;
    Ok(results.into_iter().collect())
  }
}
