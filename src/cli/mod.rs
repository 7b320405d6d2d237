pub mod args;
pub mod commands;

pub use args::{Cli, Commands, InputArgs, InputFormat, ResampleArgs};
pub use commands::run;
