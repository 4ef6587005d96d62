//! Pattern matching for Ethereum addresses.
//!
//! Supports multiple constraints, combined with logical AND:
//! - Prefix, suffix and substring matches
//! - Letters-only or numbers-only character classes
//! - Mirror (palindrome) bodies
//!
//! Matching runs on the lowercase rendering, or on the EIP-55 checksum
//! rendering when case-sensitive.

mod pattern;
mod spec;

pub use pattern::{Constraint, Pattern};
pub use spec::{CharClass, PatternSpec, ADDRESS_HEX_LEN};

pub(crate) use spec::pinned_positions;
