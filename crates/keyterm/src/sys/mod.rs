//! The platform layer.
//!
//! [`Console`] captures everything a session needs from the operating system:
//! reading and writing the terminal configuration, discarding and waiting for
//! input, line-oriented reading, and unbuffered output. The native
//! implementation is selected at compile time. Everything above this module is
//! written against the trait only, which also lets the session logic run
//! against a scripted console in tests.

use std::io::{BufRead, Result, Write};
use std::time::Duration;

#[cfg(target_family = "unix")]
pub(crate) type RawHandle = std::os::fd::RawFd;

#[cfg(target_family = "windows")]
pub(crate) type RawHandle = std::os::windows::io::RawHandle;

#[cfg(target_family = "unix")]
mod unix;

#[cfg(target_family = "unix")]
pub use unix::{NativeConsole, Termios as NativeMode};

#[cfg(all(
    target_os = "linux",
    any(
        target_arch = "x86",
        target_arch = "x86_64",
        target_arch = "arm",
        target_arch = "aarch64",
        target_arch = "riscv64"
    )
))]
pub(crate) use unix::IntoResult;

#[cfg(target_family = "windows")]
mod windows;

#[cfg(target_family = "windows")]
pub use windows::{ConsoleModes as NativeMode, NativeConsole};

/// The timing of terminal configuration updates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum When {
    /// Immediately apply the update.
    Now,
    /// Apply the update after flushing output and discarding pending input.
    AfterFlush,
}

/// The console capabilities relevant to styling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// The console renders faint text.
    pub dim: bool,
    /// The console renders blinking text.
    pub blink: bool,
    /// The console clears its scrollback.
    pub clear_scrollback: bool,
}

/// A console.
///
/// A console owns the process' standard input and output for the lifetime of
/// a session. Its mode is an opaque snapshot of the terminal configuration,
/// which can be compared for equality to verify that an update took effect.
pub trait Console {
    /// The snapshot of a terminal configuration.
    type Mode: Clone + PartialEq + std::fmt::Debug;

    /// Determine whether both standard input and standard output are
    /// terminals.
    fn is_terminal(&self) -> bool;

    /// Determine whether this console stands for the process' standard
    /// streams, which admit only one session at a time.
    fn is_exclusive(&self) -> bool {
        false
    }

    /// Read the current terminal configuration.
    fn read_mode(&self) -> Result<Self::Mode>;

    /// Write the terminal configuration.
    fn write_mode(&mut self, mode: &Self::Mode, when: When) -> Result<()>;

    /// Derive the raw-mode configuration from the original one.
    ///
    /// Raw mode disables echo, line buffering, and signal-generating keys but
    /// keeps output processing, so that newlines still translate and control
    /// sequences still work.
    fn raw_mode(&self, original: &Self::Mode) -> Self::Mode;

    /// Derive the configuration for line input.
    ///
    /// By default, that is the original configuration.
    fn cooked_mode(&self, original: &Self::Mode, _raw: &Self::Mode) -> Self::Mode {
        original.clone()
    }

    /// Discard all input that has not been read yet.
    fn discard_input(&mut self) -> Result<()>;

    /// Wait for input to become readable without consuming it.
    ///
    /// This method returns `false` if the timeout elapsed first.
    fn wait_readable(&mut self, timeout: Duration) -> Result<bool>;

    /// Access the input stream.
    fn input(&mut self) -> &mut dyn BufRead;

    /// Access the output stream.
    ///
    /// Output is unbuffered, or at least flushed after every write.
    fn output(&mut self) -> &mut dyn Write;

    /// Confine the terminal to its visible window.
    fn lock_scroll(&mut self) -> Result<()>;

    /// Undo [`Console::lock_scroll`].
    fn unlock_scroll(&mut self) -> Result<()>;

    /// Get the console's styling capabilities.
    fn capabilities(&self) -> Capabilities;

    /// Register the original configuration for restoration at process exit,
    /// or clear the registration when `None`.
    fn restore_at_exit(&mut self, _original: Option<&Self::Mode>) {}
}

/// The escape sequence to clear the screen including scrollback.
pub(crate) const CLEAR_ALL: &str = "\x1b[1;1H\x1b[3J\x1b[2J";

/// The escape sequence to clear the visible screen only.
pub(crate) const CLEAR_SCREEN: &str = "\x1b[1;1H\x1b[2J";
