//! CLI commands.

pub mod run;

pub use run::RunCommand;
