//! Command-line interface module.

mod args;
pub mod build;
pub mod convert;

pub use args::{BuildArgs, Cli, Commands, ConvertArgs, WidgetArgs};
