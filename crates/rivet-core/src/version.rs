//! Toolchain version parsing, comparison, and range matching.
//!
//! Rivet versions carry four numeric components plus an optional
//! prerelease label:
//! - Numeric components compare lexicographically
//! - A release (no label) sorts *after* any prerelease of the same numbers
//! - Two labels compare ordinally, case-insensitive
//!
//! Parsing accepts 2-4 dot-separated numeric components (missing trailing
//! components default to 0) and an optional `-label` suffix.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use rivet_util::errors::RivetError;

/// A parsed library version.
#[derive(Debug, Clone, Default)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub revision: u64,
    pub prerelease: Option<String>,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            revision: 0,
            prerelease: None,
        }
    }

    pub fn with_prerelease(mut self, label: impl Into<String>) -> Self {
        self.prerelease = Some(label.into());
        self
    }

    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    fn numeric(&self) -> (u64, u64, u64, u64) {
        (self.major, self.minor, self.patch, self.revision)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.numeric().cmp(&other.numeric()) {
            Ordering::Equal => {}
            ord => return ord,
        }
        match (&self.prerelease, &other.prerelease) {
            (None, None) => Ordering::Equal,
            // A release is greater than any prerelease of the same numbers
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.numeric().hash(state);
        self.prerelease.as_ref().map(|l| l.to_lowercase()).hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.revision != 0 {
            write!(f, ".{}", self.revision)?;
        }
        if let Some(ref label) = self.prerelease {
            write!(f, "-{label}")?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = RivetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_err = |reason: &str| RivetError::VersionParse {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(parse_err("empty version string"));
        }

        let (numbers, label) = match trimmed.split_once('-') {
            Some((_, l)) if l.is_empty() => return Err(parse_err("empty prerelease label")),
            Some((n, l)) => (n, Some(l.to_string())),
            None => (trimmed, None),
        };

        let parts: Vec<&str> = numbers.split('.').collect();
        if parts.len() < 2 || parts.len() > 4 {
            return Err(parse_err("expected 2-4 numeric components"));
        }

        let mut components = [0u64; 4];
        for (i, part) in parts.iter().enumerate() {
            components[i] = part
                .parse::<u64>()
                .map_err(|_| parse_err("non-numeric component"))?;
        }

        Ok(Version {
            major: components[0],
            minor: components[1],
            patch: components[2],
            revision: components[3],
            prerelease: label,
        })
    }
}

/// An optionally bounded interval over [`Version`].
///
/// A range with no bounds is unconstrained and matches every version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

/// One end of a [`VersionRange`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub version: Version,
    pub inclusive: bool,
}

impl VersionRange {
    /// An unconstrained range.
    pub fn any() -> Self {
        Self {
            lower: None,
            upper: None,
        }
    }

    /// The degenerate range matching exactly `version`.
    pub fn exact(version: Version) -> Self {
        Self {
            lower: Some(Bound {
                version: version.clone(),
                inclusive: true,
            }),
            upper: Some(Bound {
                version,
                inclusive: true,
            }),
        }
    }

    /// Parse a range expression.
    ///
    /// Interval syntax: `[1.0,2.0)`, `[1.0,]`, `(,2.0)`, `[1.0]` (exact).
    /// A bare version string parses as an exact range.
    pub fn parse(spec: &str) -> Result<Self, RivetError> {
        let s = spec.trim();
        if !s.starts_with('[') && !s.starts_with('(') {
            return Ok(Self::exact(s.parse()?));
        }

        let parse_err = |reason: &str| RivetError::VersionParse {
            input: spec.to_string(),
            reason: reason.to_string(),
        };

        if !s.ends_with(']') && !s.ends_with(')') {
            return Err(parse_err("unterminated interval"));
        }

        let open_inclusive = s.starts_with('[');
        let close_inclusive = s.ends_with(']');
        let inner = &s[1..s.len() - 1];

        if let Some((lower, upper)) = inner.split_once(',') {
            let lower = lower.trim();
            let upper = upper.trim();
            Ok(VersionRange {
                lower: if lower.is_empty() {
                    None
                } else {
                    Some(Bound {
                        version: lower.parse()?,
                        inclusive: open_inclusive,
                    })
                },
                upper: if upper.is_empty() {
                    None
                } else {
                    Some(Bound {
                        version: upper.parse()?,
                        inclusive: close_inclusive,
                    })
                },
            })
        } else {
            // Exact interval: [1.0] means exactly 1.0
            if !open_inclusive || !close_inclusive {
                return Err(parse_err("exact interval must use square brackets"));
            }
            Ok(Self::exact(inner.trim().parse()?))
        }
    }

    /// Check whether a version falls within this range.
    pub fn satisfies(&self, version: &Version) -> bool {
        if let Some(ref lower) = self.lower {
            let cmp = version.cmp(&lower.version);
            if lower.inclusive {
                if cmp == Ordering::Less {
                    return false;
                }
            } else if cmp != Ordering::Greater {
                return false;
            }
        }
        if let Some(ref upper) = self.upper {
            let cmp = version.cmp(&upper.version);
            if upper.inclusive {
                if cmp == Ordering::Greater {
                    return false;
                }
            } else if cmp != Ordering::Less {
                return false;
            }
        }
        true
    }

    /// The single version this range matches, when it is a degenerate
    /// `[v,v]` interval.
    pub fn as_exact(&self) -> Option<&Version> {
        match (&self.lower, &self.upper) {
            (Some(l), Some(u)) if l.inclusive && u.inclusive && l.version == u.version => {
                Some(&l.version)
            }
            _ => None,
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(version) = self.as_exact() {
            return write!(f, "{version}");
        }
        match &self.lower {
            Some(l) => write!(f, "{}{}", if l.inclusive { '[' } else { '(' }, l.version)?,
            None => write!(f, "(")?,
        }
        write!(f, ",")?;
        match &self.upper {
            Some(u) => write!(f, "{}{}", u.version, if u.inclusive { ']' } else { ')' }),
            None => write!(f, ")"),
        }
    }
}
