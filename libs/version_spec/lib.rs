// Copyright 2018-2026 the Deno authors. MIT license.

#![deny(clippy::print_stderr)]
#![deny(clippy::print_stdout)]
#![deny(clippy::unused_async)]

use std::collections::BTreeMap;

mod alias;
mod range;
mod rewrite;
mod wildcard;

pub use alias::NpmAlias;
pub use range::Comparator;
pub use range::Operator;
pub use range::Partial;
pub use range::RangeItem;
pub use range::RangeParseError;
pub use range::RangeSet;
pub use range::Segment;
pub use range::SpecifierRange;
pub use rewrite::RewriteError;
pub use rewrite::is_upgradeable;
pub use rewrite::satisfies;
pub use rewrite::upgrade_version_spec;
pub use wildcard::DEFAULT_WILDCARD;
pub use wildcard::WILDCARDS;
pub use wildcard::WildcardToken;
pub use wildcard::get_preferred_wildcard;

/// Dependency name to version specifier, e.g. `"react" -> "^18.2.0"`.
pub type DependencyMap = BTreeMap<String, String>;
