// Copyright 2018-2026 the Deno authors. MIT license.

use std::fmt;

use crate::DependencyMap;

/// A notational marker describing how loose a version specifier is.
///
/// An exact pin carries no token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WildcardToken {
  /// `^1.2.3`
  Caret,
  /// `~1.2.3`
  Tilde,
  /// `1.2.*`
  DotStar,
  /// `1.2.x`
  DotX,
}

/// Every recognized wildcard in matching priority order.
pub const WILDCARDS: [WildcardToken; 4] = [
  WildcardToken::Caret,
  WildcardToken::Tilde,
  WildcardToken::DotStar,
  WildcardToken::DotX,
];

/// Used when a project shows no preference.
pub const DEFAULT_WILDCARD: WildcardToken = WildcardToken::Caret;

impl WildcardToken {
  pub fn as_str(self) -> &'static str {
    match self {
      WildcardToken::Caret => "^",
      WildcardToken::Tilde => "~",
      WildcardToken::DotStar => ".*",
      WildcardToken::DotX => ".x",
    }
  }

  /// The first token in priority order found in the specifier.
  pub fn find_in(spec: &str) -> Option<Self> {
    WILDCARDS
      .into_iter()
      .find(|wildcard| spec.contains(wildcard.as_str()))
  }

  /// The character written in a wildcarded segment for the
  /// segment-style tokens.
  pub fn segment_char(self) -> Option<char> {
    match self {
      WildcardToken::DotStar => Some('*'),
      WildcardToken::DotX => Some('x'),
      WildcardToken::Caret | WildcardToken::Tilde => None,
    }
  }
}

impl fmt::Display for WildcardToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Gets whether the project prefers `^`, `~`, `.*` or `.x` by counting
/// which token appears in the most specifiers.
///
/// Returns `None` when there are no dependencies or when no specifier
/// contains a wildcard. Equal counts resolve to the token that comes first
/// in [`WILDCARDS`].
pub fn get_preferred_wildcard(
  dependencies: &DependencyMap,
) -> Option<WildcardToken> {
  if dependencies.is_empty() {
    return None;
  }

  let mut counts = [0usize; WILDCARDS.len()];
  for spec in dependencies.values() {
    if let Some(wildcard) = WildcardToken::find_in(spec) {
      counts[wildcard as usize] += 1;
    }
  }

  let mut preferred: Option<(WildcardToken, usize)> = None;
  for (wildcard, count) in WILDCARDS.into_iter().zip(counts) {
    if count == 0 {
      continue;
    }
    // strictly greater keeps the earlier token on ties
    if preferred.is_none_or(|(_, best)| count > best) {
      preferred = Some((wildcard, count));
    }
  }
  preferred.map(|(wildcard, _)| wildcard)
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
  fn empty_has_no_preference() {
    assert_eq!(get_preferred_wildcard(&DependencyMap::new()), None);
  }

  #[test]
  fn single_token() {
    for wildcard in WILDCARDS {
      let spec = match wildcard {
        WildcardToken::Caret => "^1.0.0",
        WildcardToken::Tilde => "~1.0.0",
        WildcardToken::DotStar => "1.*",
        WildcardToken::DotX => "1.x",
      };
      let map = deps(&[("a", spec), ("b", spec), ("c", spec)]);
      assert_eq!(get_preferred_wildcard(&map), Some(wildcard));
    }
  }

  #[test]
  fn most_common_wins() {
    let map = deps(&[
      ("async", "0.9.x"),
      ("bluebird", "2.9.x"),
      ("cint", "^8.0.0"),
      ("commander", "~2.8.1"),
      ("lodash", "3.2.x"),
    ]);
    assert_eq!(get_preferred_wildcard(&map), Some(WildcardToken::DotX));
  }

  #[test]
  fn exact_pins_are_not_counted() {
    let map = deps(&[("a", "1.0.0"), ("b", "2.0.0"), ("c", "~1.0.0")]);
    assert_eq!(get_preferred_wildcard(&map), Some(WildcardToken::Tilde));

    let map = deps(&[("a", "1.0.0"), ("b", "2.0.0")]);
    assert_eq!(get_preferred_wildcard(&map), None);
  }

  #[test]
  fn ties_follow_priority_order() {
    let map = deps(&[("a", "1.x"), ("b", "~1.0.0"), ("c", "1.*")]);
    for _ in 0..3 {
      assert_eq!(get_preferred_wildcard(&map), Some(WildcardToken::Tilde));
    }

    let map = deps(&[("z", "1.x"), ("y", "^1.0.0")]);
    assert_eq!(get_preferred_wildcard(&map), Some(WildcardToken::Caret));
  }

  #[test]
  fn first_matching_token_classifies() {
    // contains both `~` and `.x`
    assert_eq!(WildcardToken::find_in("~1.2.x"), Some(WildcardToken::Tilde));
    assert_eq!(WildcardToken::find_in("1.2.3"), None);
  }
}
