// Copyright 2018-2026 the Deno authors. MIT license.

use ncu_version_spec::DEFAULT_WILDCARD;
use ncu_version_spec::RewriteError;
use ncu_version_spec::get_preferred_wildcard;
use ncu_version_spec::is_upgradeable;
use ncu_version_spec::upgrade_version_spec;

use crate::DependencyMap;

/// Rewrites each current specifier that has a newer latest version.
///
/// `latest_versions` maps dependency names to the version to target.
/// Dependencies without a current specifier, without a newer version or
/// whose specifier cannot be rewritten are left out. Rewrite failures are
/// returned alongside so callers can report them.
pub fn upgrade_dependencies(
  current_dependencies: &DependencyMap,
  latest_versions: &DependencyMap,
) -> (DependencyMap, Vec<(String, RewriteError)>) {
  let preferred_wildcard =
    get_preferred_wildcard(current_dependencies).unwrap_or(DEFAULT_WILDCARD);
  let mut upgraded = DependencyMap::new();
  let mut failures = Vec::new();
  for (dep, latest) in latest_versions {
    let Some(current) = current_dependencies.get(dep) else {
      continue;
    };
    if !is_upgradeable(current, latest) {
      continue;
    }
    match upgrade_version_spec(current, latest, Some(preferred_wildcard)) {
      Ok(spec) if spec != *current => {
        upgraded.insert(dep.clone(), spec);
      }
      Ok(_) => {}
      Err(err) => failures.push((dep.clone(), err)),
    }
  }
  (upgraded, failures)
}

#[cfg(test)]
mod test {
  use pretty_assertions::assert_eq;

  use super::*;

  fn deps(entries: &[(&str, &str)]) -> DependencyMap {
    entries
      .iter()
      .map(|(name, spec)| (name.to_string(), spec.to_string()))
      .collect()
  }

  #[test]
  fn upgrades_outdated_dependencies() {
    let (upgraded, failures) = upgrade_dependencies(
      &deps(&[
        ("mongodb", "^1.4.29"),
        ("express", "~4.13.0"),
        ("lodash", "3.2.x"),
        ("current", "^2.0.0"),
      ]),
      &deps(&[
        ("mongodb", "1.4.30"),
        ("express", "4.16.3"),
        ("lodash", "3.10.1"),
        ("current", "2.0.0"),
      ]),
    );
    assert_eq!(
      upgraded,
      deps(&[
        ("mongodb", "^1.4.30"),
        ("express", "~4.16.3"),
        ("lodash", "3.10.x"),
      ])
    );
    assert!(failures.is_empty());
  }

  #[test]
  fn uses_project_wildcard_for_bare_partials() {
    let (upgraded, _) = upgrade_dependencies(
      &deps(&[("a", "1.2"), ("b", "3.x"), ("c", "4.x")]),
      &deps(&[("a", "1.9.0"), ("b", "5.0.0")]),
    );
    assert_eq!(upgraded, deps(&[("a", "1.9.x"), ("b", "5.x")]));
  }

  #[test]
  fn skips_downgrades_and_unknown_specifiers() {
    let (upgraded, failures) = upgrade_dependencies(
      &deps(&[
        ("a", "^3.0.0"),
        ("b", "github:owner/repo"),
        ("c", "*"),
        ("d", "latest"),
      ]),
      &deps(&[
        ("a", "2.0.0"),
        ("b", "1.0.0"),
        ("c", "1.0.0"),
        ("d", "1.0.0"),
        ("not-current", "1.0.0"),
      ]),
    );
    assert_eq!(upgraded, DependencyMap::new());
    assert!(failures.is_empty());
  }

  #[test]
  fn keeps_aliases() {
    let (upgraded, _) = upgrade_dependencies(
      &deps(&[("colors", "npm:chalk@^4.1.0")]),
      &deps(&[("colors", "5.3.0")]),
    );
    assert_eq!(upgraded, deps(&[("colors", "npm:chalk@^5.3.0")]));
  }
}
