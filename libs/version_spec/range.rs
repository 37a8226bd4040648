// Copyright 2018-2026 the Deno authors. MIT license.

use std::fmt;

use monch::*;

/// Error returned when a specifier is not a valid npm range.
#[derive(Debug, thiserror::Error)]
#[error("Invalid version specifier \"{text}\"")]
pub struct RangeParseError {
  pub text: String,
  #[source]
  pub source: ParseErrorFailureError,
}

/// One position of a partial version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
  Number(u64),
  /// The wildcard character as written: `x`, `X` or `*`.
  Wildcard(char),
}

impl Segment {
  pub fn is_wildcard(&self) -> bool {
    matches!(self, Segment::Wildcard(_))
  }

  fn number_or_zero(&self) -> u64 {
    match self {
      Segment::Number(value) => *value,
      Segment::Wildcard(_) => 0,
    }
  }
}

impl fmt::Display for Segment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Segment::Number(value) => write!(f, "{value}"),
      Segment::Wildcard(c) => write!(f, "{c}"),
    }
  }
}

/// A version that may be missing or wildcard its minor and patch
/// positions, e.g. `1`, `1.2`, `1.x`, `v1.2.3-beta.1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Partial {
  pub v_prefix: Option<char>,
  pub major: Segment,
  pub minor: Option<Segment>,
  pub patch: Option<Segment>,
  /// Pre-release and build text including the leading `-` or `+`.
  pub qualifier: String,
}

impl Partial {
  /// Every written position is a wildcard.
  pub fn is_wildcard(&self) -> bool {
    self.major.is_wildcard()
  }

  /// The lowest version admitted by this partial.
  pub fn lower_bound_text(&self) -> String {
    let major = self.major.number_or_zero();
    let minor = self.minor.map(|s| s.number_or_zero()).unwrap_or(0);
    let patch = self.patch.map(|s| s.number_or_zero()).unwrap_or(0);
    if matches!(self.patch, Some(Segment::Number(_))) {
      format!("{major}.{minor}.{patch}{}", self.qualifier)
    } else {
      format!("{major}.{minor}.{patch}")
    }
  }
}

impl fmt::Display for Partial {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(c) = self.v_prefix {
      write!(f, "{c}")?;
    }
    write!(f, "{}", self.major)?;
    if let Some(minor) = &self.minor {
      write!(f, ".{minor}")?;
      if let Some(patch) = &self.patch {
        write!(f, ".{patch}")?;
      }
    }
    f.write_str(&self.qualifier)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
  None,
  Equal,
  Caret,
  Tilde,
  /// `~>`, an alias of `~`.
  TildeGreater,
  Greater,
  GreaterOrEqual,
  Less,
  LessOrEqual,
}

// longest operators first so `>=` is not read as `>`
const OPERATORS: [(&str, Operator); 8] = [
  (">=", Operator::GreaterOrEqual),
  ("<=", Operator::LessOrEqual),
  ("~>", Operator::TildeGreater),
  (">", Operator::Greater),
  ("<", Operator::Less),
  ("=", Operator::Equal),
  ("^", Operator::Caret),
  ("~", Operator::Tilde),
];

impl Operator {
  pub fn as_str(self) -> &'static str {
    match self {
      Operator::None => "",
      Operator::Equal => "=",
      Operator::Caret => "^",
      Operator::Tilde => "~",
      Operator::TildeGreater => "~>",
      Operator::Greater => ">",
      Operator::GreaterOrEqual => ">=",
      Operator::Less => "<",
      Operator::LessOrEqual => "<=",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Comparator {
  pub operator: Operator,
  /// Whitespace between the operator and the version, e.g. `>= 1.0.0`.
  pub spacing: String,
  pub partial: Partial,
}

impl fmt::Display for Comparator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{}{}", self.operator.as_str(), self.spacing, self.partial)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RangeItem {
  Comparator(Comparator),
  /// `1.0.0 - 2.0.0`
  Hyphen {
    start: Partial,
    separator: String,
    end: Partial,
  },
}

impl RangeItem {
  /// The operator and version of the lower end of this item.
  pub fn first_partial(&self) -> (Operator, &Partial) {
    match self {
      RangeItem::Comparator(comparator) => {
        (comparator.operator, &comparator.partial)
      }
      RangeItem::Hyphen { start, .. } => (Operator::None, start),
    }
  }
}

impl fmt::Display for RangeItem {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RangeItem::Comparator(comparator) => write!(f, "{comparator}"),
      RangeItem::Hyphen {
        start,
        separator,
        end,
      } => write!(f, "{start}{separator}{end}"),
    }
  }
}

/// Comparators that must all hold, e.g. `>=1.0.0 <2.0.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RangeSet {
  pub items: Vec<RangeItem>,
  /// The whitespace written between consecutive items.
  pub separators: Vec<String>,
}

impl fmt::Display for RangeSet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, item) in self.items.iter().enumerate() {
      if i > 0 {
        let separator = self.separators.get(i - 1);
        f.write_str(separator.map(|s| s.as_str()).unwrap_or(" "))?;
      }
      write!(f, "{item}")?;
    }
    Ok(())
  }
}

/// A parsed version specifier that remembers how it was written so it can
/// be printed back after its versions are replaced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpecifierRange {
  pub leading: String,
  /// Alternatives joined by `||`.
  pub sets: Vec<RangeSet>,
  /// The `||` separators including surrounding whitespace.
  pub separators: Vec<String>,
  pub trailing: String,
}

impl SpecifierRange {
  pub fn parse(text: &str) -> Result<Self, RangeParseError> {
    with_failure_handling(specifier_range)(text).map_err(|source| {
      RangeParseError {
        text: text.to_string(),
        source,
      }
    })
  }

  /// Matches any version, like `*`, `x` or `x.x`.
  pub fn is_wildcard(&self) -> bool {
    self.sets.iter().any(|set| {
      set.items.iter().all(|item| match item {
        RangeItem::Comparator(comparator) => {
          comparator.partial.is_wildcard()
            && matches!(
              comparator.operator,
              Operator::None
                | Operator::Equal
                | Operator::GreaterOrEqual
                | Operator::Caret
                | Operator::Tilde
                | Operator::TildeGreater
            )
        }
        RangeItem::Hyphen { start, end, .. } => {
          start.is_wildcard() && end.is_wildcard()
        }
      })
    })
  }

  /// The first item of the first alternative.
  pub fn first_item(&self) -> &RangeItem {
    // parsing guarantees at least one set with one item
    &self.sets[0].items[0]
  }
}

impl fmt::Display for SpecifierRange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.leading)?;
    for (i, set) in self.sets.iter().enumerate() {
      if i > 0 {
        let separator = self.separators.get(i - 1);
        f.write_str(separator.map(|s| s.as_str()).unwrap_or(" || "))?;
      }
      write!(f, "{set}")?;
    }
    f.write_str(&self.trailing)
  }
}

fn is_space(c: char) -> bool {
  c == ' ' || c == '\t'
}

// specifier ::= range ( logical-or range ) *
fn specifier_range(input: &str) -> ParseResult<'_, SpecifierRange> {
  let (input, leading) = take_while(is_space)(input)?;
  let (mut input, first) = range_set(input)?;
  let mut sets = vec![first];
  let mut separators = Vec::new();
  loop {
    let (rest, separator) = match logical_or(input) {
      Ok(result) => result,
      Err(ParseError::Backtrace) => break,
      Err(err) => return Err(err),
    };
    let (rest, set) = range_set(rest)?;
    separators.push(separator.to_string());
    sets.push(set);
    input = rest;
  }
  let (input, trailing) = take_while(is_space)(input)?;
  Ok((
    input,
    SpecifierRange {
      leading: leading.to_string(),
      sets,
      separators,
      trailing: trailing.to_string(),
    },
  ))
}

// logical-or ::= ( ' ' ) * '||' ( ' ' ) *
fn logical_or(input: &str) -> ParseResult<'_, &str> {
  let (rest, _) = take_while(is_space)(input)?;
  let (rest, _) = tag("||")(rest)?;
  let (rest, _) = take_while(is_space)(rest)?;
  Ok((rest, &input[..input.len() - rest.len()]))
}

// range ::= item ( ' ' item ) *
fn range_set(input: &str) -> ParseResult<'_, RangeSet> {
  let (mut input, first) = range_item(input)?;
  let mut items = vec![first];
  let mut separators = Vec::new();
  loop {
    let (rest, space) = take_while(is_space)(input)?;
    if space.is_empty() {
      break;
    }
    match range_item(rest) {
      Ok((rest, item)) => {
        separators.push(space.to_string());
        items.push(item);
        input = rest;
      }
      Err(ParseError::Backtrace) => break,
      Err(err) => return Err(err),
    }
  }
  Ok((input, RangeSet { items, separators }))
}

// item ::= hyphen | simple
fn range_item(input: &str) -> ParseResult<'_, RangeItem> {
  or(hyphen, map(comparator, RangeItem::Comparator))(input)
}

// hyphen ::= partial ' - ' partial
fn hyphen(input: &str) -> ParseResult<'_, RangeItem> {
  let (input, start) = partial(input)?;
  let (input, separator) = hyphen_separator(input)?;
  let (input, end) = partial(input)?;
  Ok((
    input,
    RangeItem::Hyphen {
      start,
      separator: separator.to_string(),
      end,
    },
  ))
}

fn hyphen_separator(input: &str) -> ParseResult<'_, &str> {
  let (rest, leading) = take_while(is_space)(input)?;
  if leading.is_empty() {
    return ParseError::backtrace();
  }
  let (rest, _) = ch('-')(rest)?;
  let (rest, trailing) = take_while(is_space)(rest)?;
  if trailing.is_empty() {
    return ParseError::backtrace();
  }
  Ok((rest, &input[..input.len() - rest.len()]))
}

// simple ::= ( operator ( ' ' ) * ) ? partial
fn comparator(input: &str) -> ParseResult<'_, Comparator> {
  let (input, operator) = operator(input)?;
  let (input, spacing) = if operator == Operator::None {
    (input, "")
  } else {
    take_while(is_space)(input)?
  };
  let (input, partial) = partial(input)?;
  Ok((
    input,
    Comparator {
      operator,
      spacing: spacing.to_string(),
      partial,
    },
  ))
}

fn operator(input: &str) -> ParseResult<'_, Operator> {
  for (text, operator) in OPERATORS {
    if let Some(rest) = input.strip_prefix(text) {
      return Ok((rest, operator));
    }
  }
  Ok((input, Operator::None))
}

// partial ::= 'v' ? xr ( '.' xr ( '.' xr qualifier ? )? )?
pub(crate) fn partial(input: &str) -> ParseResult<'_, Partial> {
  let (input, v_prefix) = maybe(or(ch('v'), ch('V')))(input)?;
  let (input, major) = segment(input)?;
  let (input, minor) = maybe(preceded(ch('.'), segment))(input)?;
  let (input, patch) = if minor.is_some() {
    maybe(preceded(ch('.'), segment))(input)?
  } else {
    (input, None)
  };
  let (input, qualifier) = if matches!(patch, Some(Segment::Number(_))) {
    qualifier(input)?
  } else {
    (input, "")
  };
  Ok((
    input,
    Partial {
      v_prefix,
      major,
      minor,
      patch,
      qualifier: qualifier.to_string(),
    },
  ))
}

// xr ::= 'x' | 'X' | '*' | nr
fn segment(input: &str) -> ParseResult<'_, Segment> {
  let (rest, c) = next_char(input)?;
  match c {
    'x' | 'X' | '*' => Ok((rest, Segment::Wildcard(c))),
    _ => number(input),
  }
}

// nr ::= ['0'-'9'] +
fn number(input: &str) -> ParseResult<'_, Segment> {
  let (rest, digits) = take_while(|c| c.is_ascii_digit())(input)?;
  if digits.is_empty() {
    return ParseError::backtrace();
  }
  match digits.parse::<u64>() {
    Ok(value) => Ok((rest, Segment::Number(value))),
    Err(err) => ParseError::fail(
      input,
      format!("Error parsing '{digits}' to u64.\n\n{err:#}"),
    ),
  }
}

// qualifier ::= ( '-' parts )? ( '+' parts )?
fn qualifier(input: &str) -> ParseResult<'_, &str> {
  let (rest, _) = maybe(preceded(ch('-'), parts))(input)?;
  let (rest, _) = maybe(preceded(ch('+'), parts))(rest)?;
  Ok((rest, &input[..input.len() - rest.len()]))
}

// parts ::= part ( '.' part ) *
fn parts(input: &str) -> ParseResult<'_, ()> {
  let (mut input, _) = part(input)?;
  loop {
    match preceded(ch('.'), part)(input) {
      Ok((rest, _)) => input = rest,
      Err(ParseError::Backtrace) => return Ok((input, ())),
      Err(err) => return Err(err),
    }
  }
}

// part ::= [-0-9A-Za-z]+
fn part(input: &str) -> ParseResult<'_, &str> {
  let (rest, text) =
    take_while(|c| c.is_ascii_alphanumeric() || c == '-')(input)?;
  if text.is_empty() {
    return ParseError::backtrace();
  }
  Ok((rest, text))
}
