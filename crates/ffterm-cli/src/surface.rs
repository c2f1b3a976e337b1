//! Terminal surface over standard output.

use std::io::{self, Write};

use ffterm::Surface;

/// Clears the screen and homes the cursor.
const RESET_SEQUENCE: &str = "\x1b[2J\x1b[H";

/// Writes shell output to stdout, flushing after every write.
#[derive(Debug)]
pub struct StdioSurface {
    out: io::Stdout,
}

impl StdioSurface {
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }
}

impl Default for StdioSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for StdioSurface {
    fn write(&mut self, text: &str) {
        let mut out = self.out.lock();
        if let Err(e) = out.write_all(text.as_bytes()).and_then(|()| out.flush()) {
            tracing::debug!(error = %e, "stdout write failed");
        }
    }

    fn reset(&mut self) {
        self.write(RESET_SEQUENCE);
    }
}
