//! A scripted console for tests.

use std::io::{BufRead, Cursor, Error, Result, Write};
use std::time::Duration;

use crate::sys::{Capabilities, Console, When};

/// The configurations of a fake console.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FakeMode {
    Cooked,
    Raw,
}

/// A console that runs on a script.
///
/// Input comes in two batches. Buffered input is there from the start, just
/// like keys typed before a prompt. Typed input arrives once the console
/// switches to cooked mode, just like a user's answer to a prompt. Discarding
/// input only affects what has arrived so far.
#[derive(Debug)]
pub(crate) struct FakeConsole {
    terminal: bool,
    exclusive: bool,
    mode: FakeMode,
    ignore_writes: bool,
    rejected: Option<FakeMode>,
    writes: Vec<(FakeMode, When)>,
    buffer: Cursor<Vec<u8>>,
    typed: Vec<u8>,
    fail_waits: bool,
    waits: usize,
    output: Vec<u8>,
    scroll_locked: bool,
    exit_mode: Option<FakeMode>,
    capabilities: Capabilities,
}

impl FakeConsole {
    pub fn new() -> Self {
        Self {
            terminal: true,
            exclusive: false,
            mode: FakeMode::Cooked,
            ignore_writes: false,
            rejected: None,
            writes: Vec::new(),
            buffer: Cursor::new(Vec::new()),
            typed: Vec::new(),
            fail_waits: false,
            waits: 0,
            output: Vec::new(),
            scroll_locked: false,
            exit_mode: None,
            capabilities: Capabilities {
                dim: true,
                blink: true,
                clear_scrollback: true,
            },
        }
    }

    /// Pretend that standard input or output is redirected.
    pub fn not_a_terminal(&mut self) -> &mut Self {
        self.terminal = false;
        self
    }

    /// Stand in for the process' one console, like the native console does.
    pub fn exclusive(&mut self) -> &mut Self {
        self.exclusive = true;
        self
    }

    /// Set the mode without recording a write.
    pub fn set_mode(&mut self, mode: FakeMode) -> &mut Self {
        self.mode = mode;
        self
    }

    /// Accept writes without applying them.
    pub fn ignore_writes(&mut self) -> &mut Self {
        self.ignore_writes = true;
        self
    }

    /// Fail writes of the given mode.
    pub fn reject(&mut self, mode: FakeMode) -> &mut Self {
        self.rejected = Some(mode);
        self
    }

    /// Make input available right away.
    pub fn set_buffered(&mut self, bytes: &[u8]) -> &mut Self {
        self.buffer = Cursor::new(bytes.to_vec());
        self
    }

    /// Make input available after the next switch to cooked mode.
    pub fn type_later(&mut self, bytes: &[u8]) -> &mut Self {
        self.typed.extend_from_slice(bytes);
        self
    }

    /// Fail all waits for input.
    pub fn fail_waits(&mut self) -> &mut Self {
        self.fail_waits = true;
        self
    }

    /// Use the capabilities of a console without dim, blink, and scrollback
    /// clearing.
    pub fn limited(&mut self) -> &mut Self {
        self.capabilities = Capabilities {
            dim: false,
            blink: false,
            clear_scrollback: false,
        };
        self
    }

    pub fn mode(&self) -> FakeMode {
        self.mode
    }

    pub fn writes(&self) -> &[(FakeMode, When)] {
        &self.writes
    }

    pub fn remaining(&self) -> &[u8] {
        let position = (self.buffer.position() as usize).min(self.buffer.get_ref().len());
        &self.buffer.get_ref()[position..]
    }

    pub fn waits(&self) -> usize {
        self.waits
    }

    pub fn written(&self) -> &str {
        std::str::from_utf8(&self.output).unwrap_or("<not UTF-8>")
    }

    pub fn clear_output(&mut self) {
        self.output.clear();
    }

    pub fn is_scroll_locked(&self) -> bool {
        self.scroll_locked
    }

    pub fn exit_mode(&self) -> Option<FakeMode> {
        self.exit_mode
    }
}

impl Default for FakeConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for FakeConsole {
    type Mode = FakeMode;

    fn is_terminal(&self) -> bool {
        self.terminal
    }

    fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    fn read_mode(&self) -> Result<FakeMode> {
        Ok(self.mode)
    }

    fn write_mode(&mut self, mode: &FakeMode, when: When) -> Result<()> {
        if self.rejected == Some(*mode) {
            return Err(Error::other("mode rejected"));
        }

        self.writes.push((*mode, when));
        if !self.ignore_writes {
            self.mode = *mode;
            if *mode == FakeMode::Cooked && !self.typed.is_empty() {
                self.buffer = Cursor::new(std::mem::take(&mut self.typed));
            }
        }
        Ok(())
    }

    fn raw_mode(&self, _original: &FakeMode) -> FakeMode {
        FakeMode::Raw
    }

    fn discard_input(&mut self) -> Result<()> {
        self.buffer = Cursor::new(Vec::new());
        Ok(())
    }

    fn wait_readable(&mut self, _timeout: Duration) -> Result<bool> {
        self.waits += 1;
        if self.fail_waits {
            return Err(Error::other("poll failed"));
        }
        Ok(!self.remaining().is_empty())
    }

    fn input(&mut self) -> &mut dyn BufRead {
        &mut self.buffer
    }

    fn output(&mut self) -> &mut dyn Write {
        &mut self.output
    }

    fn lock_scroll(&mut self) -> Result<()> {
        self.scroll_locked = true;
        Ok(())
    }

    fn unlock_scroll(&mut self) -> Result<()> {
        self.scroll_locked = false;
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn restore_at_exit(&mut self, original: Option<&FakeMode>) {
        self.exit_mode = original.copied();
    }
}
