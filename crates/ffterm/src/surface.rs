//! The rendering surface the shell writes to.

/// Line terminator written by the shell.
pub const LINE_BREAK: &str = "\r\n";

/// Sequence that erases the character before the cursor.
pub const ERASE_CHAR: &str = "\u{8} \u{8}";

/// Sequence that erases the `columns` terminal cells before the cursor.
pub fn erase_columns(columns: usize) -> String {
    let back = "\u{8}".repeat(columns);
    format!("{back}{}{back}", " ".repeat(columns))
}

/// A line-oriented terminal surface.
///
/// Implementations render text; the shell decides what to write. Text may
/// contain `\r` and `\n` control characters and is written verbatim.
pub trait Surface: Send {
    /// Write text at the cursor.
    fn write(&mut self, text: &str);

    /// Write text followed by a line break.
    fn write_line(&mut self, text: &str) {
        self.write(text);
        self.write(LINE_BREAK);
    }

    /// Clear the surface and move the cursor home.
    fn reset(&mut self);
}

impl<S: Surface + ?Sized> Surface for Box<S> {
    fn write(&mut self, text: &str) {
        (**self).write(text)
    }

    fn write_line(&mut self, text: &str) {
        (**self).write_line(text)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

/// A surface that records everything written to it.
///
/// Clones share the same recording, so a test can keep one handle while the
/// shell owns another.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    inner: std::sync::Arc<std::sync::Mutex<TranscriptInner>>,
}

#[derive(Debug, Default)]
struct TranscriptInner {
    text: String,
    resets: usize,
}

impl Transcript {
    /// Create an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written since the last reset.
    pub fn text(&self) -> String {
        self.lock().text.clone()
    }

    /// Number of times the surface was reset.
    pub fn resets(&self) -> usize {
        self.lock().resets
    }

    /// Forget the recorded text without counting a reset.
    pub fn clear(&self) {
        self.lock().text.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TranscriptInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Surface for Transcript {
    fn write(&mut self, text: &str) {
        self.lock().text.push_str(text);
    }

    fn reset(&mut self) {
        let mut inner = self.lock();
        inner.text.clear();
        inner.resets += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_line_appends_break() {
        let mut surface = Transcript::new();
        surface.write("a");
        surface.write_line("b");
        assert_eq!(surface.text(), "ab\r\n");
    }

    #[test]
    fn test_erase_columns() {
        assert_eq!(erase_columns(1), ERASE_CHAR);
        assert_eq!(erase_columns(2), "\u{8}\u{8}  \u{8}\u{8}");
    }

    #[test]
    fn test_clones_share_recording() {
        let handle = Transcript::new();
        let mut boxed: Box<dyn Surface> = Box::new(handle.clone());
        boxed.write_line("hello");
        boxed.reset();
        boxed.write("$ ");
        assert_eq!(handle.text(), "$ ");
        assert_eq!(handle.resets(), 1);
    }
}
