//! Module to isolate unsafe libc operations.
//!
//! This module abstracts over the underlying libc invocations for managing the
//! terminal configuration, waiting for input, reading from the terminal, and
//! writing to the terminal. They are safe, as long as the file descriptors are
//! valid, which holds for standard input and output for the lifetime of the
//! process.

use std::ffi::c_void;
use std::io::{stdin, stdout, BufRead, BufReader, Error, ErrorKind, IsTerminal, Read, Result, Write};
use std::ptr::{from_mut, from_ref};
use std::sync::{Mutex, Once};
use std::time::Duration;

use super::{Capabilities, Console, RawHandle, When};

/// A trait for converting status codes to Rust results.
///
/// The implementations for pairs of signed and unsigned primitive integers of
/// the same size differ solely in the declared types for `Self` and `Unsigned`.
/// Hence, we delegate to a declarative macro.
pub(crate) trait IntoResult {
    /// The unsigned version of `Self`.
    type Unsigned;

    /// Actually convert a signed status code to a Rust result.
    ///
    /// If the status code is negative, this method returns the last OS error.
    /// Otherwise, it returns the wrapped unsigned status code.
    fn into_result(self) -> Result<Self::Unsigned>;
}

macro_rules! into_result {
    ($signed:ty, $unsigned:ty) => {
        impl IntoResult for $signed {
            type Unsigned = $unsigned;

            fn into_result(self) -> Result<Self::Unsigned> {
                if self < 0 {
                    Err(Error::last_os_error())
                } else {
                    Ok(self as Self::Unsigned)
                }
            }
        }
    };
}

into_result!(i32, u32);
into_result!(isize, usize);

// ------------------------------------------------------------------------------------------------

impl When {
    fn action(&self) -> i32 {
        match self {
            Self::Now => libc::TCSANOW,
            Self::AfterFlush => libc::TCSAFLUSH,
        }
    }
}

// ------------------------------------------------------------------------------------------------

/// The actual terminal attributes.
///
/// By wrapping the underlying libc type, this struct enables a meaningful
/// debug representation as well as a comparison covering every field that
/// `tcsetattr` may silently fail to apply.
#[derive(Clone)]
pub struct Termios {
    inner: libc::termios,
}

impl Termios {
    /// Read the configuration for the terminal with the given file descriptor.
    fn read(handle: RawHandle) -> Result<Self> {
        let mut attributes = std::mem::MaybeUninit::uninit();
        unsafe { libc::tcgetattr(handle, attributes.as_mut_ptr()) }.into_result()?;
        Ok(Self {
            inner: unsafe { attributes.assume_init() },
        })
    }

    /// Write this configuration to the terminal with the file descriptor.
    fn write(&self, handle: RawHandle, when: When) -> Result<()> {
        unsafe { libc::tcsetattr(handle, when.action(), from_ref(&self.inner)) }.into_result()?;
        Ok(())
    }

    /// Create the raw-mode version of this configuration.
    ///
    /// `cfmakeraw` also disables output processing, which would break newline
    /// translation and control sequences. So we turn that back on, along with
    /// extended input processing.
    fn to_raw(&self) -> Self {
        let mut raw = self.clone();
        unsafe { libc::cfmakeraw(from_mut(&mut raw.inner)) };
        raw.inner.c_oflag |= libc::OPOST;
        raw.inner.c_lflag |= libc::IEXTEN;
        raw
    }

    fn input_speed(&self) -> libc::speed_t {
        unsafe { libc::cfgetispeed(from_ref(&self.inner)) }
    }

    fn output_speed(&self) -> libc::speed_t {
        unsafe { libc::cfgetospeed(from_ref(&self.inner)) }
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    fn line_discipline(&self) -> u8 {
        self.inner.c_line
    }

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    fn line_discipline(&self) -> u8 {
        0
    }
}

impl PartialEq for Termios {
    fn eq(&self, other: &Self) -> bool {
        self.inner.c_iflag == other.inner.c_iflag
            && self.inner.c_oflag == other.inner.c_oflag
            && self.inner.c_cflag == other.inner.c_cflag
            && self.inner.c_lflag == other.inner.c_lflag
            && self.inner.c_cc == other.inner.c_cc
            && self.input_speed() == other.input_speed()
            && self.output_speed() == other.output_speed()
            && self.line_discipline() == other.line_discipline()
    }
}

impl std::fmt::Debug for Termios {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Determine enabled flags
        let mut flags = Vec::new();
        let mut append = |s| {
            flags.push(s);
        };

        for (name, value) in [
            ("BRKINT", libc::BRKINT),
            ("ICRNL", libc::ICRNL),
            ("IGNBRK", libc::IGNBRK),
            ("IGNCR", libc::IGNCR),
            ("INLCR", libc::INLCR),
            ("IXANY", libc::IXANY),
            ("IXOFF", libc::IXOFF),
            ("IXON", libc::IXON),
        ] {
            if self.inner.c_iflag & value != 0 {
                append(name);
            }
        }

        for (name, value) in [
            ("OPOST", libc::OPOST),
            ("OCRNL", libc::OCRNL),
            ("ONOCR", libc::ONOCR),
            ("ONLRET", libc::ONLRET),
        ] {
            if self.inner.c_oflag & value != 0 {
                append(name);
            }
        }

        for (name, value) in [
            ("ECHO", libc::ECHO),
            ("ECHOE", libc::ECHOE),
            ("ECHOK", libc::ECHOK),
            ("ECHONL", libc::ECHONL),
            ("ICANON", libc::ICANON),
            ("IEXTEN", libc::IEXTEN),
            ("ISIG", libc::ISIG),
            ("NOFLSH", libc::NOFLSH),
        ] {
            if self.inner.c_lflag & value != 0 {
                append(name);
            }
        }

        struct Flags(Vec<&'static str>);

        impl std::fmt::Debug for Flags {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_list().entries(self.0.iter()).finish()
            }
        }

        f.debug_struct("Termios")
            .field("flags", &Flags(flags))
            .field("vmin", &self.inner.c_cc[libc::VMIN])
            .field("vtime", &self.inner.c_cc[libc::VTIME])
            .finish()
    }
}

// ------------------------------------------------------------------------------------------------

/// The configuration to restore when the process exits.
static EXIT_MODE: Mutex<Option<Termios>> = Mutex::new(None);

/// The registration of the exit hook.
static EXIT_HOOK: Once = Once::new();

extern "C" fn restore_at_exit() {
    let mode = EXIT_MODE.lock().unwrap_or_else(|e| e.into_inner()).take();
    if let Some(mode) = mode {
        let _ = mode.write(libc::STDIN_FILENO, When::Now);
    }
}

// ------------------------------------------------------------------------------------------------

/// A terminal reader.
///
/// # Safety
///
/// The owner of a terminal reader must ensure that the instance does not
/// outlive its file descriptor.
#[derive(Debug)]
pub(crate) struct Reader {
    handle: RawHandle,
}

impl Reader {
    /// Create a new reader with a raw file descriptor.
    pub fn new(handle: RawHandle) -> Self {
        Self { handle }
    }
}

impl Read for Reader {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        unsafe {
            libc::read(
                self.handle,
                buf.as_mut_ptr() as *mut c_void,
                buf.len() as libc::size_t,
            )
        }
        .into_result()
    }
}

/// A terminal writer.
///
/// Writes go straight to the file descriptor, so there is nothing to flush.
#[derive(Debug)]
pub(crate) struct Writer {
    handle: RawHandle,
}

impl Writer {
    /// Create a new writer with a raw file descriptor.
    pub fn new(handle: RawHandle) -> Self {
        Self { handle }
    }
}

impl Write for Writer {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        unsafe {
            libc::write(
                self.handle,
                buf.as_ptr() as *const c_void,
                buf.len() as libc::size_t,
            )
        }
        .into_result()
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------

/// The process' console on Unix.
///
/// The terminal configuration is read from and written to standard input.
/// Output goes to standard output without any buffering in user space.
#[derive(Debug)]
pub struct NativeConsole {
    reader: BufReader<Reader>,
    writer: Writer,
}

impl NativeConsole {
    /// Create a new console for standard input and output.
    ///
    /// This method is fallible on Windows only.
    pub fn new() -> Result<Self> {
        Ok(Self {
            reader: BufReader::new(Reader::new(libc::STDIN_FILENO)),
            writer: Writer::new(libc::STDOUT_FILENO),
        })
    }
}

impl Console for NativeConsole {
    type Mode = Termios;

    fn is_exclusive(&self) -> bool {
        true
    }

    fn is_terminal(&self) -> bool {
        stdin().is_terminal() && stdout().is_terminal()
    }

    fn read_mode(&self) -> Result<Termios> {
        Termios::read(libc::STDIN_FILENO)
    }

    fn write_mode(&mut self, mode: &Termios, when: When) -> Result<()> {
        mode.write(libc::STDIN_FILENO, when)
    }

    fn raw_mode(&self, original: &Termios) -> Termios {
        original.to_raw()
    }

    fn discard_input(&mut self) -> Result<()> {
        let buffered = self.reader.buffer().len();
        self.reader.consume(buffered);
        unsafe { libc::tcflush(libc::STDIN_FILENO, libc::TCIFLUSH) }.into_result()?;
        Ok(())
    }

    fn wait_readable(&mut self, timeout: Duration) -> Result<bool> {
        if !self.reader.buffer().is_empty() {
            return Ok(true);
        }

        let mut fds = libc::pollfd {
            fd: libc::STDIN_FILENO,
            events: libc::POLLIN,
            revents: 0,
        };
        let millis = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;

        unsafe { libc::poll(from_mut(&mut fds), 1, millis) }.into_result()?;
        if fds.revents & (libc::POLLERR | libc::POLLNVAL | libc::POLLHUP) != 0 {
            return Err(Error::new(
                ErrorKind::BrokenPipe,
                "terminal input is in an error state",
            ));
        }

        Ok(fds.revents & libc::POLLIN != 0)
    }

    fn input(&mut self) -> &mut dyn BufRead {
        &mut self.reader
    }

    fn output(&mut self) -> &mut dyn Write {
        &mut self.writer
    }

    fn lock_scroll(&mut self) -> Result<()> {
        // Reset the scroll region to the full window.
        self.writer.write_all(b"\x1b[;r")
    }

    fn unlock_scroll(&mut self) -> Result<()> {
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            dim: true,
            blink: true,
            clear_scrollback: true,
        }
    }

    fn restore_at_exit(&mut self, original: Option<&Termios>) {
        EXIT_HOOK.call_once(|| {
            if unsafe { libc::atexit(restore_at_exit) } != 0 {
                tracing::warn!("could not register exit hook for restoring the terminal");
            }
        });

        *EXIT_MODE.lock().unwrap_or_else(|e| e.into_inner()) = original.cloned();
    }
}
