//! User-facing pattern configuration and its validation.

use std::fmt;

use crate::error::ConfigError;

use super::Pattern;

/// Number of hex characters in an address body.
pub const ADDRESS_HEX_LEN: usize = 40;

/// A whole-address character class constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// Only `a`-`f` (either case), no digits
    Letters,
    /// Only `0`-`9`
    Numbers,
}

impl CharClass {
    /// Whether `c` belongs to this class.
    #[inline]
    pub fn admits(self, c: u8) -> bool {
        match self {
            CharClass::Letters => matches!(c, b'a'..=b'f' | b'A'..=b'F'),
            CharClass::Numbers => c.is_ascii_digit(),
        }
    }

    /// Number of hex values in this class.
    pub fn size(self) -> u32 {
        match self {
            CharClass::Letters => 6,
            CharClass::Numbers => 10,
        }
    }

    fn name(self) -> &'static str {
        match self {
            CharClass::Letters => "letters-only",
            CharClass::Numbers => "numbers-only",
        }
    }
}

impl fmt::Display for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the caller wants the address to look like.
///
/// All configured constraints must hold at once. Build one with the
/// `with_*` methods, then turn it into a [`Pattern`] with
/// [`PatternSpec::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternSpec {
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub contains: Option<String>,
    pub letters_only: bool,
    pub numbers_only: bool,
    pub mirror: bool,
    pub case_sensitive: bool,
}

impl PatternSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn with_contains(mut self, contains: impl Into<String>) -> Self {
        self.contains = Some(contains.into());
        self
    }

    pub fn letters_only(mut self) -> Self {
        self.letters_only = true;
        self
    }

    pub fn numbers_only(mut self) -> Self {
        self.numbers_only = true;
        self
    }

    pub fn mirror(mut self) -> Self {
        self.mirror = true;
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// The character class constraint, if any.
    pub fn char_class(&self) -> Option<CharClass> {
        match (self.letters_only, self.numbers_only) {
            (true, false) => Some(CharClass::Letters),
            (false, true) => Some(CharClass::Numbers),
            _ => None,
        }
    }

    /// Checks the spec and compiles it into a [`Pattern`].
    ///
    /// Anything that would make a match structurally impossible is
    /// rejected here. When matching is case-insensitive, the positional
    /// strings are lowercased. A leading `0x` on the prefix is dropped.
    pub fn validate(&self) -> Result<Pattern, ConfigError> {
        let has_positional =
            self.prefix.is_some() || self.suffix.is_some() || self.contains.is_some();
        if !has_positional && !self.letters_only && !self.numbers_only && !self.mirror {
            return Err(ConfigError::NoConstraint);
        }

        if self.letters_only && self.numbers_only {
            return Err(ConfigError::ConflictingCharClass);
        }

        let prefix = self
            .prefix
            .as_deref()
            .map(|p| p.strip_prefix("0x").unwrap_or(p))
            .map(|p| self.normalize("Prefix", p))
            .transpose()?;
        let suffix = self
            .suffix
            .as_deref()
            .map(|s| self.normalize("Suffix", s))
            .transpose()?;
        let contains = self
            .contains
            .as_deref()
            .map(|c| self.normalize("Contains", c))
            .transpose()?;

        let prefix_len = prefix.as_ref().map_or(0, String::len);
        let suffix_len = suffix.as_ref().map_or(0, String::len);
        if prefix_len + suffix_len > ADDRESS_HEX_LEN {
            return Err(ConfigError::PrefixSuffixTooLong);
        }

        if let Some(class) = self.char_class() {
            for (field, value) in [("Prefix", &prefix), ("Suffix", &suffix), ("Contains", &contains)]
            {
                if let Some(value) = value {
                    if !value.bytes().all(|c| class.admits(c)) {
                        return Err(ConfigError::ImpossibleForClass {
                            field,
                            value: value.clone(),
                            class: class.name(),
                        });
                    }
                }
            }
        }

        if self.mirror {
            let pinned = pinned_positions(prefix.as_deref(), suffix.as_deref());
            let conflict = (0..ADDRESS_HEX_LEN / 2).any(|i| {
                matches!(
                    (pinned[i], pinned[ADDRESS_HEX_LEN - 1 - i]),
                    (Some(a), Some(b)) if a != b
                )
            });
            if conflict {
                return Err(ConfigError::MirrorConflict);
            }
        }

        Ok(Pattern::compile(PatternSpec {
            prefix,
            suffix,
            contains,
            letters_only: self.letters_only,
            numbers_only: self.numbers_only,
            mirror: self.mirror,
            case_sensitive: self.case_sensitive,
        }))
    }

    fn normalize(&self, field: &'static str, value: &str) -> Result<String, ConfigError> {
        if value.is_empty() {
            return Err(ConfigError::EmptyPattern { field });
        }

        if !value.bytes().all(|c| c.is_ascii_hexdigit()) {
            let allowed = if self.case_sensitive {
                "0-9, a-f, A-F"
            } else {
                "0-9, a-f"
            };
            return Err(ConfigError::InvalidCharacter {
                field,
                value: value.to_string(),
                allowed,
            });
        }

        if value.len() > ADDRESS_HEX_LEN {
            return Err(ConfigError::TooLong { field });
        }

        Ok(if self.case_sensitive {
            value.to_string()
        } else {
            value.to_ascii_lowercase()
        })
    }
}

/// Characters fixed by prefix and suffix, indexed by address position.
pub(crate) fn pinned_positions(
    prefix: Option<&str>,
    suffix: Option<&str>,
) -> [Option<u8>; ADDRESS_HEX_LEN] {
    let mut pinned = [None; ADDRESS_HEX_LEN];
    if let Some(prefix) = prefix {
        for (i, c) in prefix.bytes().enumerate().take(ADDRESS_HEX_LEN) {
            pinned[i] = Some(c);
        }
    }
    if let Some(suffix) = suffix {
        let start = ADDRESS_HEX_LEN.saturating_sub(suffix.len());
        for (i, c) in suffix.bytes().enumerate().take(ADDRESS_HEX_LEN) {
            pinned[start + i] = Some(c);
        }
    }
    pinned
}
