//! Shared `Result` alias.
//!
//! Domain errors are plain enums owned by each crate. Anything that crosses
//! the network or the filesystem wraps them in a rootcause [`Report`].

use rootcause::Report;

/// Result whose error is a [`Report`] over the context `C`.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
