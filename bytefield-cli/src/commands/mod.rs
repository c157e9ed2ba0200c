//! Subcommand implementations

pub mod inspect;
pub mod layout;
pub mod set;
