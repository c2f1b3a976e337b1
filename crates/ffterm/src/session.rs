//! Mutable state of a mounted shell.
//!
//! A [`ShellSession`] is handed to command handlers by mutable reference.
//! It owns the line buffer, the input-blocked flag, the engine handle and
//! the staged and generated file sets, and it is the shell's only path to
//! the rendering surface.

use std::sync::Arc;

use async_trait::async_trait;
use unicode_width::UnicodeWidthChar;

use crate::command::CommandSummary;
use crate::config::ShellConfig;
use crate::engine::{Engine, EngineState};
use crate::files::{GeneratedFile, StagedFile};
use crate::input::is_printable;
use crate::surface::{ERASE_CHAR, LINE_BREAK, Surface, erase_columns};

/// Receives the generated files of each processing run.
#[async_trait]
pub trait GeneratedFilesHandler: Send + Sync {
    /// Called with the complete generated set of a run.
    async fn on_generated_files(&self, files: &[GeneratedFile]);
}

#[async_trait]
impl<F> GeneratedFilesHandler for F
where
    F: Fn(&[GeneratedFile]) + Send + Sync,
{
    async fn on_generated_files(&self, files: &[GeneratedFile]) {
        self(files)
    }
}

/// Where the shell is in its command cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the first character of a command
    #[default]
    Prompting,
    /// The line buffer holds user input
    Editing,
    /// A command handler is running
    Dispatching,
}

/// State of one mounted shell.
pub struct ShellSession {
    config: ShellConfig,
    commands: Vec<CommandSummary>,
    active_command: String,
    blocked: bool,
    phase: Phase,
    engine: Arc<dyn Engine>,
    engine_state: EngineState,
    staged_files: Vec<StagedFile>,
    generated_files: Vec<GeneratedFile>,
    generated_handler: Option<Arc<dyn GeneratedFilesHandler>>,
    surface: Option<Box<dyn Surface>>,
}

impl std::fmt::Debug for ShellSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellSession")
            .field("active_command", &self.active_command)
            .field("blocked", &self.blocked)
            .field("phase", &self.phase)
            .field("engine_state", &self.engine_state)
            .field("staged_files", &self.staged_files.len())
            .field("generated_files", &self.generated_files.len())
            .field("mounted", &self.surface.is_some())
            .finish_non_exhaustive()
    }
}

impl ShellSession {
    pub(crate) fn new(
        config: ShellConfig,
        commands: Vec<CommandSummary>,
        engine: Arc<dyn Engine>,
    ) -> Self {
        Self {
            config,
            commands,
            active_command: String::new(),
            blocked: false,
            phase: Phase::Prompting,
            engine,
            engine_state: EngineState::Unloaded,
            staged_files: Vec::new(),
            generated_files: Vec::new(),
            generated_handler: None,
            surface: None,
        }
    }

    /// The characters typed since the last prompt, without the prompt.
    pub fn active_command(&self) -> &str {
        &self.active_command
    }

    /// Returns true while keystrokes are being discarded.
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// Current phase of the command cycle.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The prompt prefix.
    pub fn prompt(&self) -> &str {
        &self.config.prompt
    }

    /// Shell configuration.
    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Registered commands in registration order.
    pub fn commands(&self) -> &[CommandSummary] {
        &self.commands
    }

    /// Handle to the engine.
    pub fn engine(&self) -> Arc<dyn Engine> {
        Arc::clone(&self.engine)
    }

    /// Lifecycle state of the engine.
    pub fn engine_state(&self) -> EngineState {
        self.engine_state
    }

    /// Files available for staging.
    pub fn staged_files(&self) -> &[StagedFile] {
        &self.staged_files
    }

    /// Files produced by the most recent run that staged an input.
    pub fn generated_files(&self) -> &[GeneratedFile] {
        &self.generated_files
    }

    /// Write text to the surface. Discarded while no surface is mounted.
    pub fn write(&mut self, text: &str) {
        if let Some(surface) = self.surface.as_mut() {
            surface.write(text);
        }
    }

    /// Write a line to the surface.
    pub fn write_line(&mut self, text: &str) {
        if let Some(surface) = self.surface.as_mut() {
            surface.write_line(text);
        }
    }

    /// Render the prompt, optionally on a new line, and empty the buffer.
    pub fn prompt_again(&mut self, leading_break: bool) {
        self.active_command.clear();
        self.phase = Phase::Prompting;
        let line = if leading_break {
            format!("{LINE_BREAK}{}", self.config.prompt)
        } else {
            format!("\r{}", self.config.prompt)
        };
        self.write(&line);
    }

    /// Reset the surface and render the prompt on the first line.
    pub fn clear_screen(&mut self) {
        if let Some(surface) = self.surface.as_mut() {
            surface.reset();
        }
        self.prompt_again(false);
    }

    /// Replace the generated set and hand it to the generated-files handler.
    pub async fn publish_generated_files(&mut self, files: Vec<GeneratedFile>) {
        self.generated_files = files;
        if let Some(handler) = self.generated_handler.clone() {
            handler.on_generated_files(&self.generated_files).await;
        }
    }

    pub(crate) fn set_staged_files(&mut self, files: Vec<StagedFile>) {
        self.staged_files = files;
    }

    pub(crate) fn set_generated_handler(&mut self, handler: Arc<dyn GeneratedFilesHandler>) {
        self.generated_handler = Some(handler);
    }

    pub(crate) fn set_blocked(&mut self, blocked: bool) {
        self.blocked = blocked;
    }

    #[cfg(test)]
    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn set_engine_state(&mut self, state: EngineState) {
        self.engine_state = state;
    }

    pub(crate) fn attach(&mut self, surface: Box<dyn Surface>) {
        self.surface = Some(surface);
    }

    pub(crate) fn detach(&mut self) -> Option<Box<dyn Surface>> {
        self.surface.take()
    }

    pub(crate) fn accepts_input(&self) -> bool {
        !self.blocked && self.phase != Phase::Dispatching
    }

    /// Append a typed character. Returns false if it was discarded.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if !self.accepts_input() || !is_printable(ch) {
            return false;
        }
        self.active_command.push(ch);
        self.phase = Phase::Editing;
        let mut buf = [0u8; 4];
        self.write(ch.encode_utf8(&mut buf));
        true
    }

    /// Append pasted text as one edit. Returns false if it was discarded.
    pub(crate) fn push_str(&mut self, text: &str) -> bool {
        if !self.accepts_input() || text.is_empty() {
            return false;
        }
        self.active_command.push_str(text);
        self.phase = Phase::Editing;
        self.write(text);
        true
    }

    /// Erase the last typed character. Never erases into the prompt.
    ///
    /// Wide characters are erased across every cell they occupy; zero-width
    /// characters leave the surface untouched.
    pub(crate) fn pop_char(&mut self) -> bool {
        let Some(ch) = self.active_command.pop() else {
            return false;
        };
        if self.active_command.is_empty() {
            self.phase = Phase::Prompting;
        }
        match ch.width().unwrap_or(1) {
            0 => {}
            1 => self.write(ERASE_CHAR),
            columns => self.write(&erase_columns(columns)),
        }
        true
    }

    /// Replace the line buffer without echoing.
    pub(crate) fn replace_line(&mut self, line: &str) {
        self.active_command.clear();
        self.active_command.push_str(line);
        self.phase = Phase::Editing;
    }

    /// Take the line buffer for dispatch.
    pub(crate) fn begin_dispatch(&mut self) -> String {
        self.phase = Phase::Dispatching;
        self.active_command.clone()
    }

    /// Empty the buffer after a handler returns. The handler's prompt, if
    /// any, stays on the surface.
    pub(crate) fn end_dispatch(&mut self) {
        self.active_command.clear();
        if self.phase == Phase::Dispatching {
            self.phase = Phase::Prompting;
        }
    }
}
