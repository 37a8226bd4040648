// Copyright 2018-2026 the Deno authors. MIT license.

/// An npm alias specifier such as `npm:@scope/name@^1.0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NpmAlias<'a> {
  pub name: &'a str,
  pub version_spec: &'a str,
}

impl<'a> NpmAlias<'a> {
  pub fn parse(spec: &'a str) -> Option<Self> {
    let rest = spec.strip_prefix("npm:")?;
    let at_index = match rest.strip_prefix('@') {
      Some(scoped) => scoped.find('@')? + 1,
      None => rest.find('@')?,
    };
    let (name, version_spec) = (&rest[..at_index], &rest[at_index + 1..]);
    if name.is_empty() {
      return None;
    }
    Some(NpmAlias { name, version_spec })
  }

  pub fn with_version_spec(&self, version_spec: &str) -> String {
    format!("npm:{}@{}", self.name, version_spec)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn parses_aliases() {
    assert_eq!(
      NpmAlias::parse("npm:chalk@^5.0.0"),
      Some(NpmAlias {
        name: "chalk",
        version_spec: "^5.0.0",
      })
    );
    assert_eq!(
      NpmAlias::parse("npm:@types/node@~20.1.0"),
      Some(NpmAlias {
        name: "@types/node",
        version_spec: "~20.1.0",
      })
    );
    assert_eq!(NpmAlias::parse("npm:chalk"), None);
    assert_eq!(NpmAlias::parse("npm:@types/node"), None);
    assert_eq!(NpmAlias::parse("^5.0.0"), None);
  }

  #[test]
  fn recreates_with_new_version() {
    let alias = NpmAlias::parse("npm:@types/node@~20.1.0").unwrap();
    assert_eq!(alias.with_version_spec("~22.0.0"), "npm:@types/node@~22.0.0");
  }
}
