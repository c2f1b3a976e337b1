use async_trait::async_trait;

use crate::command::CommandHandler;
use crate::session::ShellSession;
use crate::shell::ShellError;

/// Resets the surface and re-renders the prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct Clear;

#[async_trait]
impl CommandHandler for Clear {
    async fn execute(&self, session: &mut ShellSession) -> Result<(), ShellError> {
        session.clear_screen();
        Ok(())
    }
}
