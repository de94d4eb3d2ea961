//! Module to isolate unsafe Windows operations.
//!
//! This module abstracts over the underlying Windows API invocations for
//! managing the console configuration, waiting for input, reading from the
//! console, and writing to the console. They are safe, as long as the handles
//! are valid, which holds for the standard handles for the lifetime of the
//! process.

use std::io::{stdin, stdout, BufRead, BufReader, Error, IsTerminal, Read, Result, Write};
use std::ptr::{from_mut, null_mut};
use std::sync::{Mutex, Once};
use std::time::Duration;

use windows_sys::Win32::Foundation::{INVALID_HANDLE_VALUE, WAIT_FAILED, WAIT_OBJECT_0, WAIT_TIMEOUT};
use windows_sys::Win32::Storage::FileSystem::{ReadFile, WriteFile};
use windows_sys::Win32::System::Console;
use windows_sys::Win32::System::Threading::WaitForSingleObject;
use windows_sys::Win32::UI::WindowsAndMessaging::{
    GetWindowLongW, SetWindowLongW, GWL_STYLE, WS_MAXIMIZEBOX, WS_SIZEBOX,
};

use super::{Capabilities, Console, RawHandle, When};

/// A trait for converting Windows status BOOL to Rust std::io results.
trait IntoResult {
    /// Convert the return type into an error.
    fn into_result(self) -> Result<()>;
}

impl IntoResult for i32 {
    #[inline]
    fn into_result(self) -> Result<()> {
        if self != 0 {
            Ok(())
        } else {
            Err(Error::last_os_error())
        }
    }
}

// ----------------------------------------------------------------------------------------------------------

/// The console modes for input and output.
///
/// Unlike Unix, Windows configures input and output independently. Hence,
/// a snapshot of the console configuration comprises two modes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConsoleModes {
    input: u32,
    output: u32,
}

impl ConsoleModes {
    /// Derive the raw modes from these modes.
    fn to_raw(self) -> Self {
        Self {
            input: self.input
                & !Console::ENABLE_ECHO_INPUT
                & !Console::ENABLE_LINE_INPUT
                & !Console::ENABLE_PROCESSED_INPUT,
            output: self.output
                | Console::ENABLE_PROCESSED_OUTPUT
                | Console::ENABLE_VIRTUAL_TERMINAL_PROCESSING,
        }
    }
}

// ----------------------------------------------------------------------------------------------------------

/// The console modes to restore when the process exits.
static EXIT_MODE: Mutex<Option<ConsoleModes>> = Mutex::new(None);

/// The registration of the exit hook.
static EXIT_HOOK: Once = Once::new();

extern "C" fn restore_at_exit() {
    let mode = EXIT_MODE.lock().unwrap_or_else(|e| e.into_inner()).take();
    if let Some(mode) = mode {
        // Handles cannot live in a static, so look them up again.
        let input = unsafe { Console::GetStdHandle(Console::STD_INPUT_HANDLE) };
        let output = unsafe { Console::GetStdHandle(Console::STD_OUTPUT_HANDLE) };
        if input != INVALID_HANDLE_VALUE && output != INVALID_HANDLE_VALUE {
            let _ = NativeConsole::write(input, mode.input);
            let _ = NativeConsole::write(output, mode.output);
        }
    }
}

// ----------------------------------------------------------------------------------------------------------

/// A console reader.
///
/// # Safety
///
/// The owner of a console reader must ensure that the instance does not
/// outlive its handle.
#[derive(Debug)]
pub(crate) struct Reader {
    handle: RawHandle,
}

impl Reader {
    /// Create a new reader with a raw handle.
    pub fn new(handle: RawHandle) -> Self {
        Self { handle }
    }
}

impl Read for Reader {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut did_read = 0;
        unsafe {
            ReadFile(
                self.handle,
                buf.as_mut_ptr(),
                buf.len().min(u32::MAX as usize) as u32,
                from_mut(&mut did_read),
                null_mut(),
            )
        }
        .into_result()?;
        Ok(did_read as usize)
    }
}

/// A console writer.
///
/// # Safety
///
/// The owner of a console writer must ensure that the instance does not
/// outlive its handle.
#[derive(Debug)]
pub(crate) struct Writer {
    handle: RawHandle,
}

impl Writer {
    /// Create a new writer with a raw handle.
    pub fn new(handle: RawHandle) -> Self {
        Self { handle }
    }
}

impl Write for Writer {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let mut did_write = 0;
        unsafe {
            WriteFile(
                self.handle,
                buf.as_ptr(),
                buf.len().min(u32::MAX as usize) as u32,
                from_mut(&mut did_write),
                null_mut(),
            )
        }
        .into_result()?;
        Ok(did_write as usize)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

// ----------------------------------------------------------------------------------------------------------

/// The process' console on Windows.
///
/// Key state does not flow through console input on Windows, so raw mode only
/// needs to turn off echo, line input, and Ctrl-C processing as well as turn
/// on virtual terminal processing for output.
#[derive(Debug)]
pub struct NativeConsole {
    input: RawHandle,
    output: RawHandle,
    reader: BufReader<Reader>,
    writer: Writer,
    buffer_size: Option<(i16, i16)>,
}

impl NativeConsole {
    /// Create a new console for the standard handles.
    pub fn new() -> Result<Self> {
        let input = unsafe { Console::GetStdHandle(Console::STD_INPUT_HANDLE) };
        let output = unsafe { Console::GetStdHandle(Console::STD_OUTPUT_HANDLE) };
        if input == INVALID_HANDLE_VALUE || output == INVALID_HANDLE_VALUE {
            return Err(Error::last_os_error());
        }

        Ok(Self {
            input,
            output,
            reader: BufReader::new(Reader::new(input)),
            writer: Writer::new(output),
            buffer_size: None,
        })
    }

    fn read(handle: RawHandle) -> Result<u32> {
        let mut mode = 0;
        unsafe { Console::GetConsoleMode(handle, from_mut(&mut mode)) }.into_result()?;
        Ok(mode)
    }

    fn write(handle: RawHandle, mode: u32) -> Result<()> {
        unsafe { Console::SetConsoleMode(handle, mode) }.into_result()
    }
}

// Raw handles are pointers, which makes Rust wary. But the standard handles
// remain valid for the lifetime of the process.
unsafe impl Send for NativeConsole {}

impl Console for NativeConsole {
    type Mode = ConsoleModes;

    fn is_exclusive(&self) -> bool {
        true
    }

    fn is_terminal(&self) -> bool {
        stdin().is_terminal() && stdout().is_terminal()
    }

    fn read_mode(&self) -> Result<ConsoleModes> {
        // It's safe to exit early because we are just reading modes.
        Ok(ConsoleModes {
            input: Self::read(self.input)?,
            output: Self::read(self.output)?,
        })
    }

    fn write_mode(&mut self, mode: &ConsoleModes, when: When) -> Result<()> {
        if when == When::AfterFlush {
            if let Err(error) = self.discard_input() {
                tracing::debug!(%error, "could not discard input before updating console modes");
            }
        }

        // Since we may be trying to restore the original console modes, we
        // always try to apply both updates, even if one of them fails.
        let result1 = Self::write(self.input, mode.input);
        let result2 = Self::write(self.output, mode.output);
        result1.and(result2)
    }

    fn raw_mode(&self, original: &ConsoleModes) -> ConsoleModes {
        original.to_raw()
    }

    fn cooked_mode(&self, original: &ConsoleModes, raw: &ConsoleModes) -> ConsoleModes {
        // Keep control sequences working and suppress mouse and window events
        // while reading a line.
        ConsoleModes {
            input: original.input & !Console::ENABLE_MOUSE_INPUT & !Console::ENABLE_WINDOW_INPUT,
            output: raw.output,
        }
    }

    fn discard_input(&mut self) -> Result<()> {
        let buffered = self.reader.buffer().len();
        self.reader.consume(buffered);
        unsafe { Console::FlushConsoleInputBuffer(self.input) }.into_result()
    }

    fn wait_readable(&mut self, timeout: Duration) -> Result<bool> {
        if !self.reader.buffer().is_empty() {
            return Ok(true);
        }

        let millis = timeout.as_millis().min((u32::MAX - 1) as u128) as u32;
        match unsafe { WaitForSingleObject(self.input, millis) } {
            WAIT_OBJECT_0 => Ok(true),
            WAIT_TIMEOUT => Ok(false),
            WAIT_FAILED => Err(Error::last_os_error()),
            _ => Err(Error::other("unexpected result waiting for console input")),
        }
    }

    fn input(&mut self) -> &mut dyn BufRead {
        &mut self.reader
    }

    fn output(&mut self) -> &mut dyn Write {
        &mut self.writer
    }

    fn lock_scroll(&mut self) -> Result<()> {
        let mut info = unsafe { std::mem::zeroed::<Console::CONSOLE_SCREEN_BUFFER_INFO>() };
        unsafe { Console::GetConsoleScreenBufferInfo(self.output, from_mut(&mut info)) }
            .into_result()?;
        self.buffer_size = Some((info.dwSize.X, info.dwSize.Y));

        // Shrink the buffer to the window, which leaves nothing to scroll.
        let size = Console::COORD {
            X: info.dwSize.X,
            Y: info.srWindow.Bottom - info.srWindow.Top + 1,
        };
        unsafe { Console::SetConsoleScreenBufferSize(self.output, size) }.into_result()?;

        // Also keep users from resizing the window.
        let window = unsafe { Console::GetConsoleWindow() };
        if !window.is_null() {
            let style = unsafe { GetWindowLongW(window, GWL_STYLE) } as u32;
            let style = style & !WS_MAXIMIZEBOX & !WS_SIZEBOX;
            unsafe { SetWindowLongW(window, GWL_STYLE, style as i32) };
        }

        Ok(())
    }

    fn unlock_scroll(&mut self) -> Result<()> {
        if let Some((x, y)) = self.buffer_size.take() {
            let size = Console::COORD { X: x, Y: y };
            unsafe { Console::SetConsoleScreenBufferSize(self.output, size) }.into_result()?;
        }
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            dim: false,
            blink: false,
            clear_scrollback: false,
        }
    }

    fn restore_at_exit(&mut self, original: Option<&ConsoleModes>) {
        EXIT_HOOK.call_once(|| {
            if unsafe { libc::atexit(restore_at_exit) } != 0 {
                tracing::warn!("could not register exit hook for restoring the console");
            }
        });

        *EXIT_MODE.lock().unwrap_or_else(|e| e.into_inner()) = original.copied();
    }
}
