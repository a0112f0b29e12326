//! Subcommand implementations

pub mod settings;
pub mod status;
pub mod view;
