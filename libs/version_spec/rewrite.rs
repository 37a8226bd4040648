// Copyright 2018-2026 the Deno authors. MIT license.

use deno_semver::Version;
use deno_semver::VersionReq;
use monch::with_failure_handling;

use crate::NpmAlias;
use crate::WildcardToken;
use crate::range::Comparator;
use crate::range::Operator;
use crate::range::Partial;
use crate::range::RangeItem;
use crate::range::RangeParseError;
use crate::range::RangeSet;
use crate::range::Segment;
use crate::range::SpecifierRange;
use crate::range::partial;

#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
  #[error(transparent)]
  InvalidSpecifier(#[from] RangeParseError),
  #[error("Invalid target version \"{0}\"")]
  InvalidTargetVersion(String),
}

struct TargetVersion {
  version: Version,
  major: u64,
  minor: u64,
  patch: u64,
  qualifier: String,
}

impl TargetVersion {
  fn parse(text: &str) -> Result<Self, RewriteError> {
    let invalid = || RewriteError::InvalidTargetVersion(text.to_string());
    let version = Version::parse_from_npm(text).map_err(|_| invalid())?;
    // normalized text drops any `v` or `=` prefix
    let normalized = version.to_string();
    let partial =
      with_failure_handling(partial)(&normalized).map_err(|_| invalid())?;
    match (partial.major, partial.minor, partial.patch) {
      (
        Segment::Number(major),
        Some(Segment::Number(minor)),
        Some(Segment::Number(patch)),
      ) => Ok(TargetVersion {
        version,
        major,
        minor,
        patch,
        qualifier: partial.qualifier,
      }),
      _ => Err(invalid()),
    }
  }

  fn position(&self, index: usize) -> u64 {
    match index {
      0 => self.major,
      1 => self.minor,
      _ => self.patch,
    }
  }

  fn is_admitted_by(&self, operator: Operator, partial: &Partial) -> bool {
    satisfies_version(
      &self.version,
      &format!("{}{}", operator.as_str(), partial),
    )
  }
}

/// Produces a specifier that targets `target_version` while keeping the
/// notation of `current`.
///
/// Operators, `v` prefixes, wildcard characters and omitted positions are
/// carried over, so `^1.2.3` becomes `^1.5.0` and `1.2.x` becomes `1.9.x`.
/// An exact pin stays an exact pin. `preferred_wildcard` only matters for
/// bare partial versions like `1.2`, whose omitted position is filled in
/// when the project prefers `.x` or `.*`.
///
/// Lower bounds move up to the target and `>` is written as `>=` so the
/// target stays admitted. Upper bounds (`<`, `<=` and the end of a hyphen
/// range) are kept when they already admit the target and are otherwise
/// raised just past it at their own precision, so `>=1.0.0 <2.0.0`
/// becomes `>=3.1.0 <4.0.0` for `3.1.0`.
pub fn upgrade_version_spec(
  current: &str,
  target_version: &str,
  preferred_wildcard: Option<WildcardToken>,
) -> Result<String, RewriteError> {
  if let Some(alias) = NpmAlias::parse(current) {
    let version_spec = upgrade_version_spec(
      alias.version_spec,
      target_version,
      preferred_wildcard,
    )?;
    return Ok(alias.with_version_spec(&version_spec));
  }

  let range = SpecifierRange::parse(current)?;
  let target = TargetVersion::parse(target_version)?;
  if range.is_wildcard() {
    return Ok(current.to_string());
  }

  let fill = preferred_wildcard.and_then(WildcardToken::segment_char);
  let mut sets: Vec<RangeSet> = Vec::with_capacity(range.sets.len());
  let mut separators = Vec::new();
  for (i, set) in range.sets.iter().enumerate() {
    let rewritten = RangeSet {
      items: set
        .items
        .iter()
        .map(|item| rewrite_item(item, &target, fill))
        .collect(),
      separators: set.separators.clone(),
    };
    // `^1.0.0 || ^2.0.0` collapses once both point at the target
    if sets.contains(&rewritten) {
      continue;
    }
    if i > 0 {
      separators.push(
        range
          .separators
          .get(i - 1)
          .cloned()
          .unwrap_or_else(|| " || ".to_string()),
      );
    }
    sets.push(rewritten);
  }

  Ok(
    SpecifierRange {
      leading: range.leading,
      sets,
      separators,
      trailing: range.trailing,
    }
    .to_string(),
  )
}

fn rewrite_item(
  item: &RangeItem,
  target: &TargetVersion,
  fill: Option<char>,
) -> RangeItem {
  match item {
    RangeItem::Comparator(comparator) => {
      RangeItem::Comparator(rewrite_comparator(comparator, target, fill))
    }
    RangeItem::Hyphen {
      start,
      separator,
      end,
    } => RangeItem::Hyphen {
      start: rewrite_partial(start, target, None),
      separator: separator.clone(),
      end: rewrite_upper_bound(end, Operator::LessOrEqual, target),
    },
  }
}

fn rewrite_comparator(
  comparator: &Comparator,
  target: &TargetVersion,
  fill: Option<char>,
) -> Comparator {
  let operator = comparator.operator;
  let partial = &comparator.partial;
  let (operator, partial) = match operator {
    Operator::Less | Operator::LessOrEqual => {
      (operator, rewrite_upper_bound(partial, operator, target))
    }
    Operator::Greater if !partial.is_wildcard() => (
      Operator::GreaterOrEqual,
      rewrite_partial(partial, target, None),
    ),
    Operator::None => (operator, rewrite_partial(partial, target, fill)),
    _ => (operator, rewrite_partial(partial, target, None)),
  };
  Comparator {
    operator,
    spacing: comparator.spacing.clone(),
    partial,
  }
}

/// Keeps an upper bound that admits the target, otherwise moves it above
/// the target. An inclusive bound with wildcard or omitted positions
/// already spans the target once its numbers are replaced.
fn rewrite_upper_bound(
  partial: &Partial,
  operator: Operator,
  target: &TargetVersion,
) -> Partial {
  if partial.is_wildcard() || target.is_admitted_by(operator, partial) {
    return partial.clone();
  }
  let is_open = partial.minor.is_none_or(|s| s.is_wildcard())
    || partial.patch.is_none_or(|s| s.is_wildcard());
  if operator == Operator::LessOrEqual && is_open {
    rewrite_partial(partial, target, None)
  } else {
    raise_bound(partial, target)
  }
}

/// Puts the bound one step above the target at the bound's last non-zero
/// position, e.g. `<2.0.0` is `<4.0.0` for `3.1.0` and `<1.5.0` is
/// `<1.10.0` for `1.9.0`.
fn raise_bound(partial: &Partial, target: &TargetVersion) -> Partial {
  let written = [Some(partial.major), partial.minor, partial.patch];
  let precision = written
    .iter()
    .rposition(|s| matches!(s, Some(Segment::Number(n)) if *n > 0))
    .unwrap_or(0);
  let segment = |index: usize, written: Segment| -> Segment {
    if index < precision {
      Segment::Number(target.position(index))
    } else if index == precision {
      Segment::Number(target.position(index).saturating_add(1))
    } else if written.is_wildcard() {
      written
    } else {
      Segment::Number(0)
    }
  };
  Partial {
    v_prefix: partial.v_prefix,
    major: segment(0, partial.major),
    minor: partial.minor.map(|s| segment(1, s)),
    patch: partial.patch.map(|s| segment(2, s)),
    qualifier: String::new(),
  }
}

fn rewrite_partial(
  partial: &Partial,
  target: &TargetVersion,
  fill: Option<char>,
) -> Partial {
  if partial.is_wildcard() {
    return partial.clone();
  }
  // a partial that already writes a wildcard keeps its own style
  let fill = if partial.minor.is_some_and(|s| s.is_wildcard()) {
    None
  } else {
    fill
  };
  let minor = match partial.minor {
    Some(Segment::Number(_)) => Some(Segment::Number(target.minor)),
    Some(wildcard) => Some(wildcard),
    None => fill.map(Segment::Wildcard),
  };
  let patch = match (partial.minor, partial.patch) {
    (None, _) => None,
    (_, Some(Segment::Number(_))) => Some(Segment::Number(target.patch)),
    (_, Some(wildcard)) => Some(wildcard),
    (Some(_), None) => fill.map(Segment::Wildcard),
  };
  let qualifier = if matches!(patch, Some(Segment::Number(_))) {
    target.qualifier.clone()
  } else {
    String::new()
  };
  Partial {
    v_prefix: partial.v_prefix,
    major: Segment::Number(target.major),
    minor,
    patch,
    qualifier,
  }
}

/// Gets if `latest` is newer than what `current` pins down.
///
/// Unparseable and fully wildcarded specifiers are never upgradeable, nor
/// is a specifier whose bare version `latest` already satisfies, nor one
/// whose lower bound is above `latest`.
pub fn is_upgradeable(current: &str, latest: &str) -> bool {
  let current = NpmAlias::parse(current)
    .map(|alias| alias.version_spec)
    .unwrap_or(current);
  let Ok(range) = SpecifierRange::parse(current) else {
    return false;
  };
  if range.is_wildcard() {
    return false;
  }
  let Ok(latest) = Version::parse_from_npm(latest) else {
    return false;
  };

  let (operator, partial) = range.first_item().first_partial();
  let bare = partial.to_string();
  // `<7` is satisfied by its bare version `7` when latest is 7.0.0,
  // so test the whole range instead
  let satisfied_by = if operator == Operator::Less {
    current
  } else {
    bare.as_str()
  };
  if satisfies_version(&latest, satisfied_by) {
    return false;
  }

  match Version::parse_from_npm(&partial.lower_bound_text()) {
    Ok(lower_bound) => latest >= lower_bound,
    Err(_) => false,
  }
}

/// Gets if `version` is admitted by the specifier `spec`.
pub fn satisfies(version: &str, spec: &str) -> bool {
  let spec = NpmAlias::parse(spec)
    .map(|alias| alias.version_spec)
    .unwrap_or(spec);
  match Version::parse_from_npm(version) {
    Ok(version) => satisfies_version(&version, spec),
    Err(_) => false,
  }
}

fn satisfies_version(version: &Version, spec: &str) -> bool {
  match VersionReq::parse_from_npm(spec) {
    Ok(version_req) => {
      version_req.tag().is_none() && version_req.matches(version)
    }
    Err(_) => false,
  }
}
