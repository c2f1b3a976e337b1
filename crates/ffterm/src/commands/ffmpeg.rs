//! The processing command.
//!
//! One invocation stages at most one referenced input, runs the engine
//! with the rest of the line as its argument vector, streams the engine's
//! log to the surface and, when an input was staged, collects every new
//! root entry as generated output.

use async_trait::async_trait;
use futures::StreamExt;

use crate::command::CommandHandler;
use crate::engine::{EngineError, RunEvent};
use crate::session::ShellSession;
use crate::shell::ShellError;
use crate::sync;

/// Runs the engine on the current command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ffmpeg;

/// Split a command line into engine arguments.
///
/// The first token is dropped when it equals `keyword` ignoring ASCII case;
/// everything else is passed through in order.
pub fn engine_args(line: &str, keyword: &str) -> Vec<String> {
    let mut tokens = line.split_whitespace().peekable();
    if tokens
        .peek()
        .is_some_and(|first| first.eq_ignore_ascii_case(keyword))
    {
        tokens.next();
    }
    tokens.map(str::to_string).collect()
}

#[async_trait]
impl CommandHandler for Ffmpeg {
    async fn execute(&self, session: &mut ShellSession) -> Result<(), ShellError> {
        let keyword = session.config().engine_keyword.clone();

        if !session.engine_state().is_ready() {
            session.write_line(&format!("{keyword}: {}", EngineError::NotLoaded));
            session.prompt_again(false);
            return Ok(());
        }

        let line = session.active_command().to_string();
        let engine = session.engine();
        let policy = session.config().staging_policy;
        let files = session.staged_files().to_vec();

        let staged = sync::stage_if_referenced(&*engine, &line, &files, policy)
            .await
            .map(|file| file.map(|file| file.name.clone()));
        let staged = match staged {
            Ok(staged) => staged,
            Err(e) => {
                tracing::warn!(error = %e, "staging failed");
                session.write_line(&format!("{keyword}: {e}"));
                None
            }
        };

        let args = engine_args(&line, &keyword);
        tracing::debug!(?args, "running engine");

        let mut outcome = Ok(());
        let mut events = engine.run(args);
        while let Some(event) = events.next().await {
            match event {
                RunEvent::Log(log) => {
                    if !session.config().is_suppressed(&log.message) {
                        session.write_line(&log.message);
                    }
                }
                RunEvent::Exited(result) => {
                    outcome = result;
                    break;
                }
            }
        }
        drop(events);

        match outcome {
            Err(e) => {
                tracing::warn!(error = %e, "engine run failed");
                session.write_line(&format!("{keyword}: {e}"));
            }
            Ok(()) if staged.is_some() => {
                let ignore =
                    sync::build_ignore_set(&session.config().housekeeping_entries, &files);
                match sync::diff_and_collect(&*engine, &ignore).await {
                    Ok(files) => session.publish_generated_files(files).await,
                    Err(e) => {
                        tracing::warn!(error = %e, "collecting generated files failed");
                        session.write_line(&format!("{keyword}: {e}"));
                    }
                }
            }
            Ok(()) => {}
        }

        session.prompt_again(false);
        Ok(())
    }
}
