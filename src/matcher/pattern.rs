//! Pattern matching implementation.

use std::fmt;

use crate::crypto::Address;

use super::{CharClass, PatternSpec};

/// A single check against a 40-character address body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// Body starts with the string
    Prefix(String),
    /// Body ends with the string
    Suffix(String),
    /// String occurs anywhere in the body
    Contains(String),
    /// Every character belongs to the class
    Class(CharClass),
    /// Body reads the same in both directions
    Mirror,
}

impl Constraint {
    /// Whether `body` satisfies this constraint.
    #[inline]
    pub fn holds(&self, body: &str) -> bool {
        match self {
            Constraint::Prefix(p) => body.starts_with(p.as_str()),
            Constraint::Suffix(s) => body.ends_with(s.as_str()),
            Constraint::Contains(c) => body.contains(c.as_str()),
            Constraint::Class(class) => body.bytes().all(|c| class.admits(c)),
            Constraint::Mirror => body.bytes().eq(body.bytes().rev()),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Prefix(p) => write!(f, "prefix {}", p),
            Constraint::Suffix(s) => write!(f, "suffix {}", s),
            Constraint::Contains(c) => write!(f, "contains {}", c),
            Constraint::Class(class) => write!(f, "{}", class),
            Constraint::Mirror => f.write_str("mirror"),
        }
    }
}

/// A compiled pattern: the conjunction of its constraints.
///
/// Immutable once built and safe to share between workers.
#[derive(Debug, Clone)]
pub struct Pattern {
    spec: PatternSpec,
    constraints: Vec<Constraint>,
}

impl Pattern {
    /// Builds the constraint list from an already validated, normalized spec.
    pub(crate) fn compile(spec: PatternSpec) -> Self {
        let mut constraints = Vec::new();

        // Cheap positional checks first so most candidates bail early
        if let Some(prefix) = &spec.prefix {
            constraints.push(Constraint::Prefix(prefix.clone()));
        }
        if let Some(suffix) = &spec.suffix {
            constraints.push(Constraint::Suffix(suffix.clone()));
        }
        if let Some(class) = spec.char_class() {
            constraints.push(Constraint::Class(class));
        }
        if let Some(contains) = &spec.contains {
            constraints.push(Constraint::Contains(contains.clone()));
        }
        if spec.mirror {
            constraints.push(Constraint::Mirror);
        }

        Self { spec, constraints }
    }

    /// Returns the normalized spec this pattern was built from.
    pub fn spec(&self) -> &PatternSpec {
        &self.spec
    }

    /// Returns the constraints, in evaluation order.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Returns whether matching uses the EIP-55 rendering.
    pub fn case_sensitive(&self) -> bool {
        self.spec.case_sensitive
    }

    /// Matches an address against this pattern.
    ///
    /// Uses the lowercase rendering, or the EIP-55 checksum rendering when
    /// the pattern is case-sensitive.
    #[inline]
    pub fn matches(&self, address: &Address) -> bool {
        let body = if self.spec.case_sensitive {
            address.checksum_body()
        } else {
            address.to_hex()
        };
        self.matches_body(&body)
    }

    /// Matches a 40-character body that is already in the right casing.
    #[inline]
    pub fn matches_body(&self, body: &str) -> bool {
        self.constraints.iter().all(|c| c.holds(body))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, constraint) in self.constraints.iter().enumerate() {
            if i > 0 {
                f.write_str(" + ")?;
            }
            write!(f, "{}", constraint)?;
        }
        if self.spec.case_sensitive {
            f.write_str(" (case-sensitive)")?;
        }
        Ok(())
    }
}
