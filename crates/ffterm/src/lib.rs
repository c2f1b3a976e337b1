//! ffterm: an interactive command shell for a media processing engine
//!
//! ffterm reads keystrokes into a line buffer, dispatches completed lines to
//! registered commands and drives an [`Engine`] that owns a private virtual
//! filesystem. Before a run, the input file the command line references is
//! staged into that filesystem; after the run, every new root entry is
//! collected and handed back as a [`GeneratedFile`].

mod command;
mod commands;
mod config;
mod engine;
mod files;
mod input;
mod mime;
mod session;
mod shell;
mod surface;
mod sync;

pub use command::{Command, CommandHandler, CommandSummary, FnHandler, Registry, command_name};
pub use commands::{Clear, Ffmpeg, Help, builtins, engine_args, help_lines};
pub use config::{ConfigError, ShellConfig};
pub use engine::{
    END_OF_RUN_MARKER, Engine, EngineError, EngineState, LogLine, MemoryEngine, MemoryFs,
    RunEvent, RunEvents,
};
pub use files::{GeneratedFile, StagedData, StagedFile};
pub use input::{KeyAction, KeyCode, KeyEvent, KeyOutcome, Modifiers, is_printable};
pub use mime::{DEFAULT_MIME_TYPE, mime_type_for_extension, mime_type_for_name};
pub use session::{GeneratedFilesHandler, Phase, ShellSession};
pub use shell::{MountState, Shell, ShellBuilder, ShellError};
pub use surface::{ERASE_CHAR, LINE_BREAK, Surface, Transcript, erase_columns};
pub use sync::{
    HOUSEKEEPING_ENTRIES, ROOT_DIRECTORY, StagingPolicy, SyncError, build_ignore_set,
    diff_and_collect, find_referenced, references_by_substring, references_by_token,
    stage_if_referenced,
};
