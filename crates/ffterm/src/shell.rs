//! The interactive shell.
//!
//! [`Shell`] ties the pieces together: it turns key and data events into
//! edits of the line buffer, dispatches completed lines through the
//! command registry, drives the engine's load lifecycle and tracks whether
//! a surface is mounted.
//!
//! # Example
//!
//! ```rust,ignore
//! use ffterm::{MemoryEngine, Shell, Transcript};
//!
//! let mut shell = Shell::builder().engine(MemoryEngine::new()).build();
//! shell.mount(Transcript::new());
//! assert!(shell.setup().await);
//! shell.submit("help").await?;
//! ```

use std::sync::Arc;

use thiserror::Error;

use crate::command::{Command, Registry, command_name};
use crate::commands::{Help, builtins};
use crate::config::ShellConfig;
use crate::engine::{Engine, EngineError, EngineState, MemoryEngine};
use crate::files::StagedFile;
use crate::input::{KeyAction, KeyCode, KeyEvent, KeyOutcome, is_printable};
use crate::session::{GeneratedFilesHandler, Phase, ShellSession};
use crate::surface::Surface;
use crate::sync::SyncError;

/// Errors returned by shell operations and command handlers.
#[derive(Debug, Error)]
pub enum ShellError {
    /// A line was submitted while another command was still running
    #[error("a command is already running")]
    Busy,
    /// Engine error
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// Staging or collection error
    #[error(transparent)]
    Sync(#[from] SyncError),
    /// A command handler failed
    #[error("{0}")]
    Handler(String),
}

/// Whether the shell is attached to a surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MountState {
    /// No surface; output is discarded
    #[default]
    Detached,
    /// Rendering to a surface
    Mounted,
}

/// Builder for creating a [`Shell`].
pub struct ShellBuilder {
    config: ShellConfig,
    engine: Option<Arc<dyn Engine>>,
    commands: Vec<Command>,
    staged_files: Vec<StagedFile>,
    generated_handler: Option<Arc<dyn GeneratedFilesHandler>>,
}

impl std::fmt::Debug for ShellBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellBuilder")
            .field("config", &self.config)
            .field("has_engine", &self.engine.is_some())
            .field("commands", &self.commands)
            .field("staged_files", &self.staged_files.len())
            .field("has_generated_handler", &self.generated_handler.is_some())
            .finish()
    }
}

impl Default for ShellBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellBuilder {
    /// Create a builder with the default configuration.
    ///
    /// Uses [`MemoryEngine`] unless another engine is set.
    pub fn new() -> Self {
        Self {
            config: ShellConfig::default(),
            engine: None,
            commands: Vec::new(),
            staged_files: Vec::new(),
            generated_handler: None,
        }
    }

    /// Set the shell configuration.
    pub fn config(mut self, config: ShellConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the processing engine.
    pub fn engine(mut self, engine: impl Engine + 'static) -> Self {
        self.engine = Some(Arc::new(engine));
        self
    }

    /// Set the processing engine from an Arc.
    ///
    /// Useful when the caller keeps a handle to inspect the engine.
    pub fn engine_arc(mut self, engine: Arc<dyn Engine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Register an additional command.
    ///
    /// Registered after the built-ins; a command named like a built-in
    /// replaces it.
    pub fn command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    /// Set the initial staged files.
    pub fn staged_files(mut self, files: Vec<StagedFile>) -> Self {
        self.staged_files = files;
        self
    }

    /// Set the generated-files handler.
    pub fn on_generated_files(mut self, handler: impl GeneratedFilesHandler + 'static) -> Self {
        self.generated_handler = Some(Arc::new(handler));
        self
    }

    /// Build the shell. It starts detached with the engine unloaded.
    pub fn build(self) -> Shell {
        let mut registry = Registry::new();
        for command in builtins(&self.config).into_iter().chain(self.commands) {
            registry.register(command);
        }

        let engine = self
            .engine
            .unwrap_or_else(|| Arc::new(MemoryEngine::new()));
        let mut session = ShellSession::new(self.config, registry.summaries(), engine);
        session.set_staged_files(self.staged_files);
        if let Some(handler) = self.generated_handler {
            session.set_generated_handler(handler);
        }

        Shell {
            registry,
            session,
            mount_state: MountState::Detached,
        }
    }
}

/// An interactive command shell over a processing engine.
#[derive(Debug)]
pub struct Shell {
    registry: Registry,
    session: ShellSession,
    mount_state: MountState,
}

impl Shell {
    /// Create a new shell builder.
    pub fn builder() -> ShellBuilder {
        ShellBuilder::new()
    }

    /// The session state.
    pub fn session(&self) -> &ShellSession {
        &self.session
    }

    /// Mutable session state, for hosts that write to the surface directly.
    pub fn session_mut(&mut self) -> &mut ShellSession {
        &mut self.session
    }

    /// Registered commands.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Current mount state.
    pub fn mount_state(&self) -> MountState {
        self.mount_state
    }

    /// Returns true while a surface is mounted.
    pub fn is_mounted(&self) -> bool {
        self.mount_state == MountState::Mounted
    }

    /// Attach a surface.
    ///
    /// Returns false and drops `surface` if a surface is already mounted.
    pub fn mount(&mut self, surface: impl Surface + 'static) -> bool {
        if self.is_mounted() {
            tracing::debug!("surface already mounted");
            return false;
        }
        self.session.attach(Box::new(surface));
        self.mount_state = MountState::Mounted;
        true
    }

    /// Detach the surface. Does nothing when already detached.
    pub fn dispose(&mut self) {
        if self.session.detach().is_some() {
            tracing::debug!("surface disposed");
        }
        self.mount_state = MountState::Detached;
    }

    /// Replace the staged file set used by later invocations.
    pub fn update_staged_files(&mut self, files: Vec<StagedFile>) {
        self.session.set_staged_files(files);
    }

    /// Replace the generated-files handler.
    pub fn set_generated_files_callback(&mut self, handler: impl GeneratedFilesHandler + 'static) {
        self.session.set_generated_handler(Arc::new(handler));
    }

    /// Load the engine.
    ///
    /// Renders the command list, blocks input while the engine loads, then
    /// unblocks and prompts. Returns whether the engine is ready. Once the
    /// engine is ready, later calls only prompt; after a failure they retry.
    pub async fn setup(&mut self) -> bool {
        if self.session.engine_state().is_ready() {
            self.session.prompt_again(false);
            return true;
        }

        self.run_help();
        self.session.set_blocked(true);
        let loading_message = self.session.config().loading_message.clone();
        self.session.write_line(&loading_message);
        self.session.set_engine_state(EngineState::Loading);
        tracing::info!("loading engine");

        let engine = self.session.engine();
        let ready = match engine.load().await {
            Ok(()) => {
                tracing::info!("engine ready");
                self.session.set_engine_state(EngineState::Ready);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "engine failed to load");
                self.session.set_engine_state(EngineState::LoadFailed);
                false
            }
        };

        self.session.set_blocked(false);
        self.session.prompt_again(false);
        ready
    }

    /// Handle a key event.
    ///
    /// Backspace and Enter act when pressed. Ctrl+C and Ctrl+V act when
    /// released; Ctrl+V asks the host to paste. Everything is discarded
    /// while input is blocked.
    pub async fn handle_key(&mut self, event: KeyEvent) -> Result<KeyOutcome, ShellError> {
        if self.session.is_blocked() {
            return Ok(KeyOutcome::Blocked);
        }

        match (event.code, event.action) {
            (KeyCode::Backspace, KeyAction::Down) => {
                self.on_backspace();
            }
            (KeyCode::Enter, KeyAction::Down) => self.on_enter().await?,
            (KeyCode::Char(c), KeyAction::Up) if event.modifiers.ctrl => {
                match c.to_ascii_lowercase() {
                    'c' => self.interrupt(),
                    'v' => return Ok(KeyOutcome::PasteRequested),
                    _ => {}
                }
            }
            _ => {}
        }
        Ok(KeyOutcome::Handled)
    }

    /// Handle text produced by the keyboard or a paste.
    ///
    /// A single character is typed input and must be printable; longer
    /// text is a paste and is appended as is. Multi-character data that
    /// starts with a control character is a terminal escape sequence (arrow,
    /// Home and function keys) and is discarded. Returns false if discarded.
    pub fn handle_data(&mut self, data: &str) -> bool {
        let mut chars = data.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => self.on_printable_key(ch),
            (Some(first), Some(_)) if is_printable(first) => self.on_paste(data),
            _ => false,
        }
    }

    /// Append a typed character and echo it.
    pub fn on_printable_key(&mut self, ch: char) -> bool {
        self.session.push_char(ch)
    }

    /// Append pasted text and echo it.
    pub fn on_paste(&mut self, text: &str) -> bool {
        self.session.push_str(text)
    }

    /// Erase the last typed character.
    pub fn on_backspace(&mut self) -> bool {
        self.session.accepts_input() && self.session.pop_char()
    }

    /// Dispatch the line buffer.
    ///
    /// An empty line re-prompts. An unknown command prints
    /// `<name>: command not found`. A handler error is printed and the
    /// shell re-prompts; it never ends the session.
    pub async fn on_enter(&mut self) -> Result<(), ShellError> {
        if self.session.phase() == Phase::Dispatching {
            return Err(ShellError::Busy);
        }
        if self.session.is_blocked() {
            return Ok(());
        }

        let line = self.session.begin_dispatch();
        self.dispatch(&line).await;
        self.session.end_dispatch();
        Ok(())
    }

    /// Replace the line buffer with `line` without echoing it and dispatch.
    pub async fn submit(&mut self, line: &str) -> Result<(), ShellError> {
        if self.session.phase() == Phase::Dispatching {
            return Err(ShellError::Busy);
        }
        if self.session.is_blocked() {
            return Ok(());
        }
        self.session.replace_line(line);
        self.on_enter().await
    }

    /// Render the command list and prompt.
    pub fn run_help(&mut self) {
        Help::render(&mut self.session);
        self.session.prompt_again(true);
    }

    /// Reset the surface and prompt.
    pub fn clear_screen(&mut self) {
        self.session.clear_screen();
    }

    /// Render the prompt and empty the line buffer.
    pub fn prompt_again(&mut self, leading_break: bool) {
        self.session.prompt_again(leading_break);
    }

    fn interrupt(&mut self) {
        self.session.write("^C");
        self.session.prompt_again(true);
    }

    async fn dispatch(&mut self, line: &str) {
        let Some(name) = command_name(line) else {
            self.session.prompt_again(true);
            return;
        };

        self.session.write_line("");
        let Some(handler) = self.registry.get(name).map(Command::handler) else {
            tracing::debug!(name, "unknown command");
            self.session.write_line(&format!("{name}: command not found"));
            self.session.prompt_again(true);
            return;
        };

        tracing::debug!(name, "dispatching command");
        if let Err(e) = handler.execute(&mut self.session).await {
            tracing::warn!(name, error = %e, "command failed");
            self.session.write_line(&format!("{name}: {e}"));
            self.session.prompt_again(true);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::input::Modifiers;
    use crate::surface::Transcript;

    fn mounted() -> (Shell, Transcript) {
        let transcript = Transcript::new();
        let mut shell = Shell::builder().build();
        assert!(shell.mount(transcript.clone()));
        (shell, transcript)
    }

    fn type_line(shell: &mut Shell, line: &str) {
        for ch in line.chars() {
            assert!(shell.handle_data(&ch.to_string()));
        }
    }

    #[test]
    fn test_builtins_are_registered_in_order() {
        let shell = Shell::builder().build();
        let names: Vec<_> = shell.registry().iter().map(Command::name).collect();
        assert_eq!(names, vec!["clear", "help", "ffmpeg"]);
    }

    #[test]
    fn test_keyword_renames_processing_command() {
        let config = ShellConfig {
            engine_keyword: "ff".to_string(),
            ..ShellConfig::default()
        };
        let shell = Shell::builder().config(config).build();
        assert!(shell.registry().get("ff").is_some());
        assert!(shell.registry().get("ffmpeg").is_none());
    }

    #[test]
    fn test_mount_twice_is_rejected() {
        let (mut shell, _) = mounted();
        let second = Transcript::new();
        assert!(!shell.mount(second.clone()));
        shell.prompt_again(false);
        assert_eq!(second.text(), "");
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let (mut shell, transcript) = mounted();
        shell.dispose();
        shell.dispose();
        assert!(!shell.is_mounted());
        shell.prompt_again(true);
        assert_eq!(transcript.text(), "");
        assert!(shell.mount(Transcript::new()));
    }

    #[tokio::test]
    async fn test_empty_line_prompts_without_dispatch() {
        let (mut shell, transcript) = mounted();
        type_line(&mut shell, "   ");
        shell.on_enter().await.unwrap();
        assert_eq!(transcript.text(), "   \r\n$ ");
        assert_eq!(shell.session().active_command(), "");
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let (mut shell, transcript) = mounted();
        type_line(&mut shell, "foo bar");
        shell.on_enter().await.unwrap();
        assert_eq!(
            transcript.text(),
            "foo bar\r\nfoo: command not found\r\n\r\n$ "
        );
        assert_eq!(shell.session().phase(), Phase::Prompting);
    }

    #[tokio::test]
    async fn test_handler_error_is_printed_and_shell_recovers() {
        let transcript = Transcript::new();
        let mut shell = Shell::builder()
            .command(Command::from_fn("boom", "Fails", |_| {
                Err(ShellError::Handler("exploded".to_string()))
            }))
            .build();
        shell.mount(transcript.clone());

        shell.submit("boom").await.unwrap();
        assert_eq!(transcript.text(), "\r\nboom: exploded\r\n\r\n$ ");
        assert_eq!(shell.session().active_command(), "");
        assert_eq!(shell.session().phase(), Phase::Prompting);
    }

    #[tokio::test]
    async fn test_dispatch_while_dispatching_is_busy() {
        let (mut shell, _) = mounted();
        shell.session.set_phase(Phase::Dispatching);
        assert!(matches!(shell.on_enter().await, Err(ShellError::Busy)));
        assert!(matches!(shell.submit("help").await, Err(ShellError::Busy)));
    }

    #[tokio::test]
    async fn test_blocked_keys_are_discarded() {
        let (mut shell, transcript) = mounted();
        shell.session.set_blocked(true);
        let outcome = shell
            .handle_key(KeyEvent::down(KeyCode::Enter))
            .await
            .unwrap();
        assert_eq!(outcome, KeyOutcome::Blocked);
        assert!(!shell.handle_data("a"));
        assert!(!shell.on_backspace());
        assert_eq!(transcript.text(), "");
    }

    #[tokio::test]
    async fn test_backspace_acts_on_key_down_only() {
        let (mut shell, transcript) = mounted();
        type_line(&mut shell, "ab");
        shell
            .handle_key(KeyEvent::up(KeyCode::Backspace))
            .await
            .unwrap();
        assert_eq!(shell.session().active_command(), "ab");
        shell
            .handle_key(KeyEvent::down(KeyCode::Backspace))
            .await
            .unwrap();
        assert_eq!(shell.session().active_command(), "a");
        assert_eq!(transcript.text(), "ab\u{8} \u{8}");
    }

    #[tokio::test]
    async fn test_ctrl_c_abandons_line() {
        let (mut shell, transcript) = mounted();
        type_line(&mut shell, "ffm");
        let event = KeyEvent::up(KeyCode::Char('c')).with_modifiers(Modifiers::CTRL);
        assert_eq!(shell.handle_key(event).await.unwrap(), KeyOutcome::Handled);
        assert_eq!(shell.session().active_command(), "");
        assert_eq!(transcript.text(), "ffm^C\r\n$ ");
    }

    #[tokio::test]
    async fn test_ctrl_v_requests_paste_on_release() {
        let (mut shell, _) = mounted();
        let press = KeyEvent::down(KeyCode::Char('v')).with_modifiers(Modifiers::CTRL);
        let release = KeyEvent::up(KeyCode::Char('V')).with_modifiers(Modifiers::CTRL);
        assert_eq!(shell.handle_key(press).await.unwrap(), KeyOutcome::Handled);
        assert_eq!(
            shell.handle_key(release).await.unwrap(),
            KeyOutcome::PasteRequested
        );
    }

    #[test]
    fn test_data_filters_single_characters_only() {
        let (mut shell, transcript) = mounted();
        assert!(!shell.handle_data("\u{7f}"));
        assert!(!shell.handle_data(""));
        assert!(shell.handle_data("é"));
        assert!(shell.handle_data("-i in\tput.mp4"));
        assert_eq!(shell.session().active_command(), "é-i in\tput.mp4");
        assert_eq!(transcript.text(), "é-i in\tput.mp4");
    }

    #[test]
    fn test_escape_sequences_are_discarded() {
        let (mut shell, transcript) = mounted();
        assert!(shell.handle_data("h"));
        for sequence in ["\x1b[A", "\x1b[H", "\x1bOP", "\x1b[15~", "\u{7f}\u{7f}"] {
            assert!(!shell.handle_data(sequence), "{sequence:?} should be discarded");
        }
        assert_eq!(shell.session().active_command(), "h");
        assert_eq!(transcript.text(), "h");
    }

    #[tokio::test]
    async fn test_setup_retries_after_failure() {
        let engine = Arc::new(MemoryEngine::new().with_load_failure("missing"));
        let mut shell = Shell::builder().engine_arc(engine.clone()).build();

        assert!(!shell.setup().await);
        assert_eq!(shell.session().engine_state(), EngineState::LoadFailed);
        assert!(!shell.session().is_blocked());
        assert!(!shell.setup().await);
        assert_eq!(engine.load_attempts(), 2);
    }

    #[tokio::test]
    async fn test_setup_after_ready_only_prompts() {
        let engine = Arc::new(MemoryEngine::new());
        let (mut shell, transcript) = {
            let transcript = Transcript::new();
            let mut shell = Shell::builder().engine_arc(engine.clone()).build();
            shell.mount(transcript.clone());
            (shell, transcript)
        };

        assert!(shell.setup().await);
        transcript.clear();
        assert!(shell.setup().await);
        assert_eq!(transcript.text(), "\r$ ");
        assert_eq!(engine.load_attempts(), 1);
    }
}
