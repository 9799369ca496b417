//! Target specification parsing and expansion
//!
//! A target specification names one or more remote records:
//!
//! - `edge-group` - a literal name
//! - `edge-group[1:3]` - an inclusive numeric range, expands to
//!   `edge-group1`, `edge-group2`, `edge-group3`
//! - `edge-*` - a wildcard, matched against names that already exist
//!
//! A specification is parsed once into [`TargetSpec`] and never
//! re-interpreted downstream.

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashSet;
use std::fmt;

/// Upper bound on the number of names a single range may expand to.
pub const MAX_EXPANSION: u64 = 10_000;

/// Matches a single `[start:end]` token. Bounds are validated after capture
/// so that `[a:b]` is reported as malformed instead of passing as a literal.
const RANGE_TOKEN: &str = r"\[([^\[\]:]*):([^\[\]]*)\]";

/// A parsed target specification
#[derive(Debug, Clone)]
pub enum TargetSpec {
    /// Exactly one name
    Literal(String),
    /// `prefix[start:end]suffix`, inclusive on both ends
    Range {
        prefix: String,
        start: u64,
        end: u64,
        suffix: String,
    },
    /// A name containing one or more `*`
    Wildcard { pattern: String, matcher: Regex },
}

impl TargetSpec {
    /// Parse a specification string
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(Error::validation(spec, "specification is empty"));
        }

        let token = Regex::new(RANGE_TOKEN).map_err(|e| Error::validation(spec, e.to_string()))?;
        let ranges: Vec<_> = token.captures_iter(spec).collect();
        let has_wildcard = spec.contains('*');

        match (ranges.as_slice(), has_wildcard) {
            ([], false) => Ok(Self::Literal(spec.to_string())),
            ([], true) => Self::wildcard(spec),
            ([_], true) => Err(Error::validation(
                spec,
                "a range and a wildcard cannot be combined",
            )),
            ([caps], false) => {
                let whole = caps.get(0).map_or(0..0, |m| m.range());
                let start = parse_bound(spec, caps.get(1).map_or("", |m| m.as_str()))?;
                let end = parse_bound(spec, caps.get(2).map_or("", |m| m.as_str()))?;

                if start > end {
                    return Err(Error::InvalidRange {
                        spec: spec.to_string(),
                        start,
                        end,
                    });
                }
                if end - start >= MAX_EXPANSION {
                    return Err(Error::validation(
                        spec,
                        format!("range expands to more than {MAX_EXPANSION} names"),
                    ));
                }

                Ok(Self::Range {
                    prefix: spec[..whole.start].to_string(),
                    start,
                    end,
                    suffix: spec[whole.end..].to_string(),
                })
            }
            _ => Err(Error::validation(
                spec,
                "only one [start:end] range is allowed",
            )),
        }
    }

    fn wildcard(spec: &str) -> Result<Self> {
        let body = spec
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let matcher =
            Regex::new(&format!("^{body}$")).map_err(|e| Error::validation(spec, e.to_string()))?;

        Ok(Self::Wildcard {
            pattern: spec.to_string(),
            matcher,
        })
    }

    /// Expand to concrete names, in ascending order for ranges
    ///
    /// Wildcards cannot be expanded: they only select names that already exist.
    pub fn expand(&self) -> Result<Vec<String>> {
        match self {
            Self::Literal(name) => Ok(vec![name.clone()]),
            Self::Range {
                prefix,
                start,
                end,
                suffix,
            } => Ok((*start..=*end)
                .map(|i| format!("{prefix}{i}{suffix}"))
                .collect()),
            Self::Wildcard { pattern, .. } => Err(Error::validation(
                pattern.as_str(),
                "wildcards can only match existing names, not create new ones",
            )),
        }
    }

    /// Check whether a concrete name is selected by this specification
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Literal(literal) => literal == name,
            Self::Range {
                prefix,
                start,
                end,
                suffix,
            } => name
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_suffix(suffix.as_str()))
                .and_then(|digits| {
                    let n: u64 = digits.parse().ok()?;
                    // "007" is not a name this range would have produced
                    (n.to_string() == digits).then_some(n)
                })
                .is_some_and(|n| (*start..=*end).contains(&n)),
            Self::Wildcard { matcher, .. } => matcher.is_match(name),
        }
    }

    /// Select the observed names this specification matches, keeping their order
    pub fn select<'a, I>(&self, observed: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        observed.into_iter().filter(|n| self.matches(n)).collect()
    }

    /// Longest literal text every matching name starts with
    ///
    /// Used to narrow a remote search before filtering client-side.
    pub fn search_prefix(&self) -> &str {
        match self {
            Self::Literal(name) => name,
            Self::Range { prefix, .. } => prefix,
            Self::Wildcard { pattern, .. } => pattern.split('*').next().unwrap_or(""),
        }
    }

    /// Whether this is a wildcard specification
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard { .. })
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(name) => write!(f, "{name}"),
            Self::Range {
                prefix,
                start,
                end,
                suffix,
            } => write!(f, "{prefix}[{start}:{end}]{suffix}"),
            Self::Wildcard { pattern, .. } => write!(f, "{pattern}"),
        }
    }
}

fn parse_bound(spec: &str, bound: &str) -> Result<u64> {
    if bound.is_empty() || !bound.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::validation(
            spec,
            format!("range bound '{bound}' is not a non-negative integer"),
        ));
    }
    bound
        .parse()
        .map_err(|_| Error::validation(spec, format!("range bound '{bound}' is too large")))
}

/// Parse every specification, failing on the first invalid one
pub fn parse_all<S: AsRef<str>>(specs: &[S]) -> Result<Vec<TargetSpec>> {
    specs.iter().map(|s| TargetSpec::parse(s.as_ref())).collect()
}

/// Expand several specifications into one name list
///
/// Names are kept in first-seen order and duplicates dropped, so overlapping
/// specifications (`g[1:3]` and `g2`) never produce the same target twice.
pub fn expand_all(specs: &[TargetSpec]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for spec in specs {
        for name in spec.expand()? {
            if seen.insert(name.clone()) {
                names.push(name);
            }
        }
    }
    Ok(names)
}
