//! Built-in commands.

mod clear;
mod help;
mod ffmpeg;

pub use clear::Clear;
pub use help::{Help, help_lines};
pub use ffmpeg::{Ffmpeg, engine_args};

use crate::command::Command;
use crate::config::ShellConfig;

/// The built-in commands in registration order: `clear`, `help` and the
/// processing command named by [`ShellConfig::engine_keyword`].
pub fn builtins(config: &ShellConfig) -> Vec<Command> {
    vec![
        Command::new("clear", "Clears the screen", Clear),
        Command::new("help", "Prints command list", Help),
        Command::new(
            config.engine_keyword.clone(),
            config.engine_description.clone(),
            Ffmpeg,
        ),
    ]
}
