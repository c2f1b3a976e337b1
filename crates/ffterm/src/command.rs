//! Command registry.
//!
//! Commands are registered once when the shell is built and resolved by
//! name on every dispatch. Adding a command never touches the dispatcher:
//! a handler is any [`CommandHandler`], including plain closures wrapped by
//! [`Command::from_fn`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::session::ShellSession;
use crate::shell::ShellError;

/// Runs a command against the session.
///
/// The raw command line is still in [`ShellSession::active_command`] while
/// the handler runs. Handlers decide how to re-prompt; the dispatcher only
/// clears the buffer afterwards.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Execute the command.
    async fn execute(&self, session: &mut ShellSession) -> Result<(), ShellError>;
}

/// Adapter turning a synchronous closure into a [`CommandHandler`].
pub struct FnHandler<F>(F);

impl<F> std::fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> CommandHandler for FnHandler<F>
where
    F: Fn(&mut ShellSession) -> Result<(), ShellError> + Send + Sync,
{
    async fn execute(&self, session: &mut ShellSession) -> Result<(), ShellError> {
        (self.0)(session)
    }
}

/// A named command.
#[derive(Clone)]
pub struct Command {
    name: String,
    description: String,
    handler: Arc<dyn CommandHandler>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl Command {
    /// Create a command from a handler.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: impl CommandHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            handler: Arc::new(handler),
        }
    }

    /// Create a command from a synchronous closure.
    pub fn from_fn<F>(name: impl Into<String>, description: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut ShellSession) -> Result<(), ShellError> + Send + Sync + 'static,
    {
        Self::new(name, description, FnHandler(f))
    }

    /// The name typed to run the command.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// One-line description shown by `help`.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The command's handler.
    pub fn handler(&self) -> Arc<dyn CommandHandler> {
        Arc::clone(&self.handler)
    }

    /// Name and description, without the handler.
    pub fn summary(&self) -> CommandSummary {
        CommandSummary {
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }
}

/// Name and description of a registered command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSummary {
    /// Command name
    pub name: String,
    /// One-line description
    pub description: String,
}

/// Commands by name, in registration order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    commands: Vec<Command>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command.
    ///
    /// A command with the same name is replaced and keeps its original
    /// position in the listing.
    pub fn register(&mut self, command: Command) {
        match self.commands.iter_mut().find(|c| c.name == command.name) {
            Some(existing) => *existing = command,
            None => self.commands.push(command),
        }
    }

    /// Look up a command by exact name.
    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.name == name)
    }

    /// Commands in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns true if no command is registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Summaries of every command in registration order.
    pub fn summaries(&self) -> Vec<CommandSummary> {
        self.commands.iter().map(Command::summary).collect()
    }
}

/// The first whitespace-delimited token of a command line.
///
/// Returns `None` for a blank line.
pub fn command_name(line: &str) -> Option<&str> {
    line.split_whitespace().next()
}
