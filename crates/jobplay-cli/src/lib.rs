//! jobplay CLI library: the command implementations behind the `jobplay`
//! binary, exposed so integration tests can drive them directly.

pub mod commands;
