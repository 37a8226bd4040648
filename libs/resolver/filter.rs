// Copyright 2018-2026 the Deno authors. MIT license.

use deno_error::JsErrorBox;

use crate::DependencyMap;
use crate::UpgradeCandidate;
use crate::UpgradeFilter;

#[derive(Debug, thiserror::Error)]
#[error("Invalid filter \"{input}\"")]
pub struct InvalidFilterError {
  input: String,
  #[source]
  source: regex::Error,
}

#[derive(Debug, Clone, Copy)]
enum FilterKind {
  Exclude,
  Include,
}

/// A package name pattern: a name, a `*` glob or a `/regex/`.
#[derive(Debug, Clone)]
pub struct Filter {
  kind: FilterKind,
  regex: regex::Regex,
}

fn pattern_to_regex(pattern: &str) -> Result<regex::Regex, regex::Error> {
  if let Some(inner) = pattern
    .strip_prefix('/')
    .and_then(|rest| rest.strip_suffix('/'))
    .filter(|inner| !inner.is_empty())
  {
    return regex::Regex::new(inner);
  }
  let escaped = regex::escape(pattern);
  let unescaped_star = escaped.replace(r"\*", ".*");
  regex::Regex::new(&format!("^{}$", unescaped_star))
}

impl Filter {
  /// Parses a pattern, where a leading `!` excludes.
  pub fn parse(input: &str) -> Result<Self, InvalidFilterError> {
    let (kind, pattern) = match input.strip_prefix('!') {
      Some(pattern) => (FilterKind::Exclude, pattern),
      None => (FilterKind::Include, input),
    };
    let regex =
      pattern_to_regex(pattern).map_err(|source| InvalidFilterError {
        input: input.to_string(),
        source,
      })?;
    Ok(Filter { kind, regex })
  }

  pub fn matches(&self, name: &str) -> bool {
    self.regex.is_match(name)
  }
}

/// Include and exclude patterns over dependency names.
///
/// Exclusions always win. With only exclusions every other name is
/// included, and an empty set includes everything.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
  filters: Vec<Filter>,
  has_include: bool,
}

impl FilterSet {
  pub fn from_filter_strings<'a>(
    filter_strings: impl IntoIterator<Item = &'a str>,
  ) -> Result<Self, InvalidFilterError> {
    let filters = filter_strings
      .into_iter()
      .map(Filter::parse)
      .collect::<Result<Vec<_>, _>>()?;
    let has_include = filters
      .iter()
      .any(|f| matches!(f.kind, FilterKind::Include));
    Ok(FilterSet {
      filters,
      has_include,
    })
  }

  /// Builds a set from `filter` patterns and `reject` patterns.
  pub fn from_filter_and_reject<'a>(
    filter: impl IntoIterator<Item = &'a str>,
    reject: impl IntoIterator<Item = &'a str>,
  ) -> Result<Self, InvalidFilterError> {
    let mut set = Self::from_filter_strings(filter)?;
    for pattern in reject {
      let mut filter = Filter::parse(pattern)?;
      filter.kind = FilterKind::Exclude;
      set.filters.push(filter);
    }
    Ok(set)
  }

  pub fn is_empty(&self) -> bool {
    self.filters.is_empty()
  }

  pub fn matches(&self, name: &str) -> bool {
    let mut included = !self.has_include;
    for filter in &self.filters {
      match filter.kind {
        FilterKind::Include => {
          included = included || filter.matches(name);
        }
        FilterKind::Exclude => {
          if filter.matches(name) {
            return false;
          }
        }
      }
    }
    included
  }

  /// Keeps the dependencies whose names match.
  pub fn filter_dependencies(
    &self,
    dependencies: &DependencyMap,
  ) -> DependencyMap {
    dependencies
      .iter()
      .filter(|(name, _)| self.matches(name))
      .map(|(name, spec)| (name.clone(), spec.clone()))
      .collect()
  }
}

impl UpgradeFilter for FilterSet {
  fn keep(
    &self,
    dep: &str,
    _candidate: &UpgradeCandidate<'_>,
  ) -> Result<bool, JsErrorBox> {
    Ok(self.matches(dep))
  }
}
