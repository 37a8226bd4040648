// Copyright 2018-2026 the Deno authors. MIT license.

use std::borrow::Cow;

use deno_error::JsErrorBox;
use deno_semver::Version;
use ncu_version_spec::NpmAlias;
use ncu_version_spec::SpecifierRange;
use ncu_version_spec::satisfies;

use crate::DependencyMap;
use crate::LogLevel;
use crate::Options;
use crate::PeerDependencyMap;
use crate::RegistryQueryError;
use crate::RegistryVersionQuerier;
use crate::UpgradeCandidate;
use crate::VersionResults;
use crate::upgrade::upgrade_dependencies;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
  #[error("Failed querying the registry")]
  Query(#[from] RegistryQueryError),
  #[error("Failed filtering upgrade of {dep}")]
  Filter {
    dep: String,
    #[source]
    source: JsErrorBox,
  },
  #[error("Peer dependencies did not settle within {limit} passes")]
  PeerIterationLimit { limit: usize },
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpgradeResult {
  pub upgraded_dependencies: DependencyMap,
  pub latest_version_results: VersionResults,
  /// The peer requirements of the last pass, when any were gathered.
  pub peer_dependencies: Option<PeerDependencyMap>,
}

struct LevelOutcome {
  upgraded_dependencies: DependencyMap,
  latest_version_results: VersionResults,
  /// Set when the accumulated peer requirements changed.
  next_peer_dependencies: Option<PeerDependencyMap>,
}

/// Gets the upgraded specifiers for `current_dependencies` along with the
/// registry results they were computed from.
///
/// With `options.peer` set, the peer requirements of every upgraded
/// package are gathered and the resolution runs again over the upgraded
/// set until those requirements stop changing. Later passes win when the
/// same dependency is upgraded more than once.
pub async fn upgrade_package_definitions(
  querier: &dyn RegistryVersionQuerier,
  current_dependencies: &DependencyMap,
  options: &Options,
) -> Result<UpgradeResult, ResolveError> {
  let mut current_dependencies = Cow::Borrowed(current_dependencies);
  let mut options = Cow::Borrowed(options);
  let mut result = UpgradeResult::default();
  let mut pass = 1;

  loop {
    let LevelOutcome {
      upgraded_dependencies,
      latest_version_results,
      next_peer_dependencies,
    } = resolve_level(querier, &current_dependencies, &options).await?;
    result
      .upgraded_dependencies
      .extend(upgraded_dependencies.clone());
    result.latest_version_results.extend(latest_version_results);

    let Some(peer_dependencies) = next_peer_dependencies else {
      result.peer_dependencies = options.peer_dependencies.clone();
      return Ok(result);
    };
    if let Some(limit) = options.max_peer_iterations {
      if pass >= limit {
        return Err(ResolveError::PeerIterationLimit { limit });
      }
    }

    let mut next_dependencies = current_dependencies.into_owned();
    next_dependencies.extend(upgraded_dependencies);
    introduce_peers(&mut next_dependencies, &peer_dependencies);
    log_if!(
      options,
      Debug,
      "Resolving pass {} over {} dependencies",
      pass + 1,
      next_dependencies.len()
    );
    current_dependencies = Cow::Owned(next_dependencies);
    options = Cow::Owned(Options {
      peer_dependencies: Some(peer_dependencies),
      log_level: LogLevel::Silent,
      ..options.into_owned()
    });
    pass += 1;
  }
}

/// Adds peer requirements on packages that are not dependencies yet,
/// using the required range as their current specifier.
fn introduce_peers(
  dependencies: &mut DependencyMap,
  peer_dependencies: &PeerDependencyMap,
) {
  for peers in peer_dependencies.values() {
    for (name, range) in peers {
      if !dependencies.contains_key(name) {
        dependencies.insert(name.clone(), range.clone());
      }
    }
  }
}

async fn resolve_level(
  querier: &dyn RegistryVersionQuerier,
  current_dependencies: &DependencyMap,
  options: &Options,
) -> Result<LevelOutcome, ResolveError> {
  let latest_version_results = querier
    .query_versions(current_dependencies, options)
    .await?;

  let mut latest_versions = DependencyMap::new();
  for (dep, result) in &latest_version_results {
    let Some(version) = &result.version else {
      if let Some(error) = &result.error {
        log_if!(options, Warn, "{}: {}", dep, error);
      }
      continue;
    };
    let Some(current) = current_dependencies.get(dep) else {
      continue;
    };
    if let Some(filter) = &options.filter_results {
      let current_semver = SpecifierRange::parse(strip_alias(current)).ok();
      let upgraded_semver = Version::parse_from_npm(version).ok();
      let candidate = UpgradeCandidate {
        current_version: current,
        current_version_semver: current_semver.as_ref(),
        upgraded_version: version,
        upgraded_version_semver: upgraded_semver.as_ref(),
      };
      let keep = filter.keep(dep, &candidate).map_err(|source| {
        ResolveError::Filter {
          dep: dep.clone(),
          source,
        }
      })?;
      if !keep {
        continue;
      }
    }
    latest_versions.insert(dep.clone(), version.clone());
  }

  let (mut upgraded_dependencies, failures) =
    upgrade_dependencies(current_dependencies, &latest_versions);
  for (dep, err) in failures {
    log_if!(options, Debug, "Could not upgrade {}: {:#}", dep, err);
  }

  if options.is_minimal() {
    upgraded_dependencies.retain(|dep, _| {
      match (latest_versions.get(dep), current_dependencies.get(dep)) {
        (Some(latest), Some(current)) => !satisfies(latest, current),
        _ => true,
      }
    });
  }

  log_if!(
    options,
    Info,
    "{} of {} dependencies can be upgraded",
    upgraded_dependencies.len(),
    current_dependencies.len()
  );

  if !options.peer || upgraded_dependencies.is_empty() {
    return Ok(LevelOutcome {
      upgraded_dependencies,
      latest_version_results,
      next_peer_dependencies: None,
    });
  }

  // peers are read from the versions being upgraded to
  let upgraded_latest_versions = upgraded_dependencies
    .keys()
    .filter_map(|dep| {
      let latest = latest_versions.get(dep)?;
      let current = current_dependencies.get(dep)?;
      let version = match NpmAlias::parse(current) {
        Some(alias) => alias.with_version_spec(latest),
        None => latest.clone(),
      };
      Some((dep.clone(), version))
    })
    .collect::<DependencyMap>();
  let upgraded_peer_dependencies = querier
    .get_peer_dependencies(&upgraded_latest_versions, options)
    .await?;

  let mut peer_dependencies =
    options.peer_dependencies.clone().unwrap_or_default();
  peer_dependencies.extend(upgraded_peer_dependencies);
  let next_peer_dependencies =
    if options.peer_dependencies.as_ref() == Some(&peer_dependencies) {
      None
    } else {
      log_if!(
        options,
        Debug,
        "Peer requirements now cover {} packages",
        peer_dependencies.len()
      );
      Some(peer_dependencies)
    };

  Ok(LevelOutcome {
    upgraded_dependencies,
    latest_version_results,
    next_peer_dependencies,
  })
}

fn strip_alias(spec: &str) -> &str {
  NpmAlias::parse(spec)
    .map(|alias| alias.version_spec)
    .unwrap_or(spec)
}

#[cfg(test)]
mod test {
  use std::collections::BTreeMap;

  use async_trait::async_trait;
  use parking_lot::Mutex;
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::VersionResult;

  fn deps(entries: &[(&str, &str)]) -> DependencyMap {
    entries
      .iter()
      .map(|(name, spec)| (name.to_string(), spec.to_string()))
      .collect()
  }

  #[derive(Debug, Clone, PartialEq, Eq)]
  struct QueryCall {
    dependencies: DependencyMap,
    log_level: LogLevel,
    peer_dependencies: Option<PeerDependencyMap>,
  }

  #[derive(Default)]
  struct StubQuerier {
    latest: BTreeMap<String, String>,
    peers: PeerDependencyMap,
    fail: bool,
    version_calls: Mutex<Vec<QueryCall>>,
    peer_calls: Mutex<Vec<DependencyMap>>,
  }

  impl StubQuerier {
    fn with_latest(mut self, name: &str, version: &str) -> Self {
      self.latest.insert(name.to_string(), version.to_string());
      self
    }

    fn with_peers(mut self, name: &str, peers: &[(&str, &str)]) -> Self {
      self.peers.insert(name.to_string(), deps(peers));
      self
    }
  }

  #[async_trait(?Send)]
  impl RegistryVersionQuerier for StubQuerier {
    async fn query_versions(
      &self,
      dependencies: &DependencyMap,
      options: &Options,
    ) -> Result<VersionResults, RegistryQueryError> {
      if self.fail {
        return Err(JsErrorBox::generic("registry unavailable").into());
      }
      self.version_calls.lock().push(QueryCall {
        dependencies: dependencies.clone(),
        log_level: options.log_level,
        peer_dependencies: options.peer_dependencies.clone(),
      });
      Ok(
        dependencies
          .keys()
          .map(|dep| {
            let result = match self.latest.get(dep) {
              Some(version) => VersionResult::found(version.clone()),
              None => VersionResult::default(),
            };
            (dep.clone(), result)
          })
          .collect(),
      )
    }

    async fn get_peer_dependencies(
      &self,
      dependencies: &DependencyMap,
      _options: &Options,
    ) -> Result<PeerDependencyMap, RegistryQueryError> {
      self.peer_calls.lock().push(dependencies.clone());
      Ok(
        dependencies
          .keys()
          .map(|dep| {
            (dep.clone(), self.peers.get(dep).cloned().unwrap_or_default())
          })
          .collect(),
      )
    }
  }

  fn peer_options() -> Options {
    Options {
      peer: true,
      ..Default::default()
    }
  }

  #[tokio::test]
  async fn single_pass_without_peers() {
    let querier = StubQuerier::default()
      .with_latest("a", "2.0.0")
      .with_latest("b", "1.0.0")
      .with_peers("a", &[("c", "^1.0.0")]);
    let result = upgrade_package_definitions(
      &querier,
      &deps(&[("a", "^1.0.0"), ("b", "^1.0.0")]),
      &Options::default(),
    )
    .await
    .unwrap();
    assert_eq!(result.upgraded_dependencies, deps(&[("a", "^2.0.0")]));
    assert_eq!(result.latest_version_results.len(), 2);
    assert_eq!(result.peer_dependencies, None);
    assert_eq!(querier.version_calls.lock().len(), 1);
    assert!(querier.peer_calls.lock().is_empty());
  }

  #[tokio::test]
  async fn recursive_passes_are_silent() {
    let querier = StubQuerier::default()
      .with_latest("a", "2.0.0")
      .with_peers("a", &[]);
    let options = Options {
      log_level: LogLevel::Verbose,
      ..peer_options()
    };
    let result = upgrade_package_definitions(
      &querier,
      &deps(&[("a", "1.0.0")]),
      &options,
    )
    .await
    .unwrap();
    assert_eq!(result.upgraded_dependencies, deps(&[("a", "2.0.0")]));
    assert_eq!(
      result.peer_dependencies,
      Some(PeerDependencyMap::from([("a".to_string(), DependencyMap::new())]))
    );

    let calls = querier.version_calls.lock();
    assert_eq!(
      *calls,
      vec![
        QueryCall {
          dependencies: deps(&[("a", "1.0.0")]),
          log_level: LogLevel::Verbose,
          peer_dependencies: None,
        },
        QueryCall {
          dependencies: deps(&[("a", "2.0.0")]),
          log_level: LogLevel::Silent,
          peer_dependencies: Some(PeerDependencyMap::from([(
            "a".to_string(),
            DependencyMap::new()
          )])),
        },
      ]
    );
    // the second pass upgrades nothing so it never asks for peers
    assert_eq!(*querier.peer_calls.lock(), vec![deps(&[("a", "2.0.0")])]);
  }

  #[tokio::test]
  async fn introduces_peer_requirements() {
    let querier = StubQuerier::default()
      .with_latest("a", "2.0.0")
      .with_latest("b", "1.5.0")
      .with_peers("a", &[("b", "^1.0.0")]);
    let result = upgrade_package_definitions(
      &querier,
      &deps(&[("a", "1.0.0")]),
      &peer_options(),
    )
    .await
    .unwrap();
    assert_eq!(
      result.upgraded_dependencies,
      deps(&[("a", "2.0.0"), ("b", "^1.5.0")])
    );
    assert_eq!(
      querier.version_calls.lock()[1].dependencies,
      deps(&[("a", "2.0.0"), ("b", "^1.0.0")])
    );
  }

  #[tokio::test]
  async fn accumulated_peers_can_already_be_settled() {
    let querier = StubQuerier::default()
      .with_latest("a", "2.0.0")
      .with_peers("a", &[("b", "^1.0.0")]);
    let accumulated = PeerDependencyMap::from([(
      "a".to_string(),
      deps(&[("b", "^1.0.0")]),
    )]);
    let options = Options {
      peer_dependencies: Some(accumulated.clone()),
      ..peer_options()
    };
    let result = upgrade_package_definitions(
      &querier,
      &deps(&[("a", "^1.0.0")]),
      &options,
    )
    .await
    .unwrap();
    assert_eq!(result.upgraded_dependencies, deps(&[("a", "^2.0.0")]));
    assert_eq!(result.peer_dependencies, Some(accumulated));
    assert_eq!(querier.version_calls.lock().len(), 1);
  }

  #[tokio::test]
  async fn filter_sees_candidate() {
    let querier = StubQuerier::default()
      .with_latest("a", "2.0.0")
      .with_latest("b", "3.0.0");
    let seen = std::rc::Rc::new(Mutex::new(Vec::new()));
    let seen_in_filter = seen.clone();
    let options = Options::default().with_filter_results(
      move |dep: &str,
            candidate: &UpgradeCandidate<'_>|
            -> Result<bool, JsErrorBox> {
        seen_in_filter.lock().push((
          dep.to_string(),
          candidate.current_version.to_string(),
          candidate.current_version_semver.is_some(),
          candidate.upgraded_version_semver.map(|v| v.major),
        ));
        Ok(dep == "a")
      },
    );
    let result = upgrade_package_definitions(
      &querier,
      &deps(&[("a", "^1.0.0"), ("b", "npm:other@^2.0.0")]),
      &options,
    )
    .await
    .unwrap();
    assert_eq!(result.upgraded_dependencies, deps(&[("a", "^2.0.0")]));
    assert_eq!(
      *seen.lock(),
      vec![
        ("a".to_string(), "^1.0.0".to_string(), true, Some(2)),
        ("b".to_string(), "npm:other@^2.0.0".to_string(), true, Some(3)),
      ]
    );
  }

  #[tokio::test]
  async fn filter_errors_abort() {
    let querier = StubQuerier::default().with_latest("a", "2.0.0");
    let options = Options::default().with_filter_results(
      |_: &str, _: &UpgradeCandidate<'_>| -> Result<bool, JsErrorBox> {
        Err(JsErrorBox::generic("boom"))
      },
    );
    let err = upgrade_package_definitions(
      &querier,
      &deps(&[("a", "^1.0.0")]),
      &options,
    )
    .await
    .unwrap_err();
    match err {
      ResolveError::Filter { dep, .. } => assert_eq!(dep, "a"),
      err => panic!("unexpected error: {err:#}"),
    }
  }

  #[tokio::test]
  async fn minimal_drops_satisfied_ranges() {
    let querier = StubQuerier::default()
      .with_latest("a", "1.5.0")
      .with_latest("b", "2.0.0");
    let options = Options {
      minimal: true,
      json_upgraded: true,
      ..Default::default()
    };
    let current = deps(&[("a", "^1.0.0"), ("b", "^1.0.0")]);
    let result = upgrade_package_definitions(&querier, &current, &options)
      .await
      .unwrap();
    assert_eq!(result.upgraded_dependencies, deps(&[("b", "^2.0.0")]));

    // both flags are needed
    let options = Options {
      minimal: true,
      ..Default::default()
    };
    let result = upgrade_package_definitions(&querier, &current, &options)
      .await
      .unwrap();
    assert_eq!(
      result.upgraded_dependencies,
      deps(&[("a", "^1.5.0"), ("b", "^2.0.0")])
    );
  }

  #[tokio::test]
  async fn peer_queries_use_alias_form() {
    let querier = StubQuerier::default().with_latest("colors", "5.0.0");
    upgrade_package_definitions(
      &querier,
      &deps(&[("colors", "npm:chalk@^4.0.0")]),
      &peer_options(),
    )
    .await
    .unwrap();
    assert_eq!(
      querier.peer_calls.lock()[0],
      deps(&[("colors", "npm:chalk@5.0.0")])
    );
  }

  #[tokio::test]
  async fn querier_faults_are_fatal() {
    let querier = StubQuerier {
      fail: true,
      ..Default::default()
    };
    let err = upgrade_package_definitions(
      &querier,
      &deps(&[("a", "^1.0.0")]),
      &Options::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ResolveError::Query(_)));
  }

  #[tokio::test]
  async fn iteration_limit() {
    let querier = StubQuerier::default()
      .with_latest("a", "2.0.0")
      .with_latest("b", "1.5.0")
      .with_peers("a", &[("b", "^1.0.0")]);
    let options = Options {
      max_peer_iterations: Some(1),
      ..peer_options()
    };
    let err = upgrade_package_definitions(
      &querier,
      &deps(&[("a", "1.0.0")]),
      &options,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ResolveError::PeerIterationLimit { limit: 1 }));

    let options = Options {
      max_peer_iterations: Some(3),
      ..peer_options()
    };
    let result = upgrade_package_definitions(
      &querier,
      &deps(&[("a", "1.0.0")]),
      &options,
    )
    .await;
    assert!(result.is_ok());
  }
}
