//! Step definitions.
//!
//! Quoted step arguments are parsed into the enums of
//! `ermis_tests::expectations`; an unknown value fails the step.

mod aliases;
mod credentials;

use std::fmt::Display;
use std::str::FromStr;

/// Parse a quoted step argument or fail the step.
pub(crate) fn parse_arg<T>(value: &str) -> T
where
    T: FromStr,
    T::Err: Display,
{
    value.parse().unwrap_or_else(|e| panic!("{}", e))
}
