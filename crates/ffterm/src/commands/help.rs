//! The `help` command.

use async_trait::async_trait;

use crate::command::{CommandHandler, CommandSummary};
use crate::session::ShellSession;
use crate::shell::ShellError;

/// Lines printed by `help`: a heading, a blank line, then one line per
/// command with its name padded to `width` columns.
pub fn help_lines(commands: &[CommandSummary], width: usize) -> Vec<String> {
    let mut lines = vec!["Available commands.".to_string(), String::new()];
    lines.extend(
        commands
            .iter()
            .map(|c| format!("  {:<width$} {}", c.name, c.description)),
    );
    lines
}

/// Lists every registered command.
#[derive(Debug, Clone, Copy, Default)]
pub struct Help;

impl Help {
    /// Write the command listing without prompting.
    pub fn render(session: &mut ShellSession) {
        let lines = help_lines(session.commands(), session.config().help_column_width);
        for line in &lines {
            session.write_line(line);
        }
    }
}

#[async_trait]
impl CommandHandler for Help {
    async fn execute(&self, session: &mut ShellSession) -> Result<(), ShellError> {
        Help::render(session);
        session.prompt_again(true);
        Ok(())
    }
}
