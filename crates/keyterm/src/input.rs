//! Line input.
//!
//! Reading a line requires the terminal's original, cooked configuration with
//! echo and line editing, whereas a session otherwise runs in raw mode. Every
//! read hence happens inside a [`Cooked`] scope: Its prologue discards unread
//! input and switches to cooked mode. Its epilogue discards whatever the read
//! left behind and switches back to raw mode. If the scope ends early, e.g.,
//! because waiting for input failed, the drop handler still runs the epilogue,
//! so the terminal never remains in cooked mode by mistake.

use std::io::BufRead;
use std::time::Duration;

use crate::sys::{Console, When};
use crate::Error;

/// The outcome of a timed scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scan<T> {
    /// A line arrived in time and was parsed into the value.
    Parsed(T),
    /// No line arrived in time. Nothing was read or parsed.
    TimedOut,
}

impl<T> Scan<T> {
    /// Determine whether the timeout was respected, i.e., input arrived in
    /// time.
    pub fn is_respected(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }

    /// Convert into the parsed value, if any.
    pub fn parsed(self) -> Option<T> {
        match self {
            Self::Parsed(value) => Some(value),
            Self::TimedOut => None,
        }
    }
}

// ------------------------------------------------------------------------------------------------

/// A scope with the terminal in cooked mode.
pub(crate) struct Cooked<'a, C: Console> {
    console: &'a mut C,
    raw: &'a C::Mode,
    active: bool,
}

impl<'a, C: Console> Cooked<'a, C> {
    /// Run the prologue.
    pub fn enter(console: &'a mut C, original: &C::Mode, raw: &'a C::Mode) -> Result<Self, Error> {
        let cooked = console.cooked_mode(original, raw);
        console.discard_input().map_err(|error| {
            tracing::debug!(%error, "could not discard input before line input");
            Error::PrologueFailed
        })?;

        // Construct the scope before the mode switch, so that a partially
        // applied configuration is reverted, too.
        let mut this = Self {
            console,
            raw,
            active: true,
        };

        this.console
            .write_mode(&cooked, When::AfterFlush)
            .map_err(|error| {
                tracing::debug!(%error, "could not switch to cooked mode");
                Error::PrologueFailed
            })?;

        match this.console.read_mode() {
            Ok(mode) if mode == cooked => {}
            Ok(mode) => {
                tracing::debug!(?mode, expected = ?cooked, "cooked mode did not take");
                return Err(Error::PrologueFailed);
            }
            Err(error) => {
                tracing::debug!(%error, "could not verify cooked mode");
                return Err(Error::PrologueFailed);
            }
        }

        tracing::debug!("entered cooked mode");
        Ok(this)
    }

    /// Access the console.
    pub fn console(&mut self) -> &mut C {
        &mut *self.console
    }

    fn epilogue(&mut self) -> Result<(), Error> {
        self.active = false;

        // Try both steps, even if the first one fails.
        let discarded = self.console.discard_input();
        let restored = self.console.write_mode(self.raw, When::AfterFlush);
        match discarded.and(restored) {
            Ok(()) => {
                tracing::debug!("re-entered raw mode");
                Ok(())
            }
            Err(error) => {
                tracing::debug!(%error, "could not switch back to raw mode");
                Err(Error::EpilogueFailed)
            }
        }
    }

    /// Run the epilogue.
    pub fn exit(mut self) -> Result<(), Error> {
        self.epilogue()
    }
}

impl<C: Console> Drop for Cooked<'_, C> {
    fn drop(&mut self) {
        if self.active {
            if let Err(error) = self.epilogue() {
                tracing::warn!(%error, "terminal may have been left in cooked mode");
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------

/// Determine whether the byte is whitespace, as in C's `isspace`.
fn is_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | b'\x0b' | b'\x0c')
}

/// Strip all trailing whitespace from the line.
///
/// A line consisting of whitespace only becomes the empty string.
pub fn trim_trailing(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut end = bytes.len();
    while end > 0 && is_space(bytes[end - 1]) {
        end -= 1;
    }

    // Whitespace is ASCII, so end falls on a character boundary.
    &line[..end]
}

/// Consume leading whitespace, including empty lines.
fn skip_space(input: &mut dyn BufRead) -> std::io::Result<()> {
    loop {
        let buffer = input.fill_buf()?;
        let available = buffer.len();
        if available == 0 {
            return Ok(());
        }

        let count = buffer.iter().take_while(|b| is_space(**b)).count();
        input.consume(count);
        if count < available {
            return Ok(());
        }
    }
}

/// Read at most `limit` bytes up to and including the next newline.
fn take_line(input: &mut dyn BufRead, limit: usize) -> std::io::Result<Vec<u8>> {
    let mut line = Vec::new();

    while line.len() < limit {
        let buffer = input.fill_buf()?;
        if buffer.is_empty() {
            break;
        }

        let window = &buffer[..buffer.len().min(limit - line.len())];
        let (count, done) = match window.iter().position(|b| *b == b'\n') {
            Some(index) => (index + 1, true),
            None => (window.len(), false),
        };

        line.extend_from_slice(&window[..count]);
        input.consume(count);
        if done {
            break;
        }
    }

    Ok(line)
}

/// Read one line in cooked mode, waiting at most `timeout` for it to arrive,
/// and pass it to the parser.
///
/// A zero timeout waits indefinitely. The line handed to the parser has its
/// terminator removed. If the timeout elapses first, the parser does not run.
pub(crate) fn scan<C, T, F>(
    console: &mut C,
    original: &C::Mode,
    raw: &C::Mode,
    timeout: Duration,
    parse: F,
) -> Result<Scan<T>, Error>
where
    C: Console,
    F: FnOnce(&str) -> T,
{
    let mut scope = Cooked::enter(console, original, raw)?;

    if !timeout.is_zero() {
        let ready = scope
            .console()
            .wait_readable(timeout)
            .map_err(Error::ReadinessWaitFailed)?;
        if !ready {
            tracing::debug!(?timeout, "line input timed out");
            scope.exit()?;
            return Ok(Scan::TimedOut);
        }
    }

    let line = take_line(scope.console().input(), usize::MAX)?;
    scope.exit()?;

    let line = String::from_utf8_lossy(&line);
    let line = line
        .strip_suffix('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or(&*line);
    Ok(Scan::Parsed(parse(line)))
}

/// Read one line in cooked mode.
///
/// This function skips leading whitespace including empty lines, reads at
/// most `capacity - 1` bytes up to the end of the line, and strips all
/// trailing whitespace.
pub(crate) fn read_line<C: Console>(
    console: &mut C,
    original: &C::Mode,
    raw: &C::Mode,
    capacity: usize,
) -> Result<String, Error> {
    let mut scope = Cooked::enter(console, original, raw)?;

    let limit = capacity.saturating_sub(1);
    let line = if limit == 0 {
        Vec::new()
    } else {
        let input = scope.console().input();
        skip_space(input)?;
        take_line(input, limit)?
    };

    scope.exit()?;
    Ok(trim_trailing(&String::from_utf8_lossy(&line)).to_string())
}

// ================================================================================================

#[cfg(test)]
mod test {
    use super::{read_line, scan, skip_space, take_line, trim_trailing, Scan};
    use crate::sys::When;
    use crate::testing::{FakeConsole, FakeMode};
    use crate::Error;
    use std::io::Cursor;
    use std::time::Duration;

    const COOKED: FakeMode = FakeMode::Cooked;
    const RAW: FakeMode = FakeMode::Raw;

    fn raw_console() -> FakeConsole {
        let mut console = FakeConsole::new();
        console.set_mode(RAW);
        console
    }

    #[test]
    fn test_trim_trailing() {
        assert_eq!(trim_trailing("hello world   \n"), "hello world");
        assert_eq!(trim_trailing("tab\t\r\n"), "tab");
        assert_eq!(trim_trailing("   \n"), "");
        assert_eq!(trim_trailing(""), "");
        assert_eq!(trim_trailing("grüße \x0b"), "grüße");
    }

    #[test]
    fn test_take_line() -> std::io::Result<()> {
        let mut input = Cursor::new(b"\n\n  hello world   \nnext".to_vec());
        skip_space(&mut input)?;
        assert_eq!(take_line(&mut input, 100)?, b"hello world   \n");
        assert_eq!(take_line(&mut input, 2)?, b"ne");
        assert_eq!(take_line(&mut input, 100)?, b"xt");
        assert_eq!(take_line(&mut input, 100)?, b"");
        Ok(())
    }

    #[test]
    fn test_read_line() -> Result<(), Error> {
        let mut console = raw_console();
        console.set_buffered(b"stale keys").type_later(b"  hello world   \nextra\n");

        let line = read_line(&mut console, &COOKED, &RAW, 256)?;
        assert_eq!(line, "hello world");

        // Stale input was discarded before, leftovers after.
        assert_eq!(console.mode(), RAW);
        assert_eq!(console.writes(), &[(COOKED, When::AfterFlush), (RAW, When::AfterFlush)]);
        assert!(console.remaining().is_empty());
        Ok(())
    }

    #[test]
    fn test_read_line_limits() -> Result<(), Error> {
        let mut console = raw_console();
        console.type_later(b"   \n\t\nabcdef\n");
        assert_eq!(read_line(&mut console, &COOKED, &RAW, 4)?, "abc");

        let mut console = raw_console();
        console.type_later(b"anything\n");
        assert_eq!(read_line(&mut console, &COOKED, &RAW, 1)?, "");
        assert_eq!(console.mode(), RAW);

        // Whitespace all the way to the end of input.
        let mut console = raw_console();
        console.type_later(b"   \n");
        assert_eq!(read_line(&mut console, &COOKED, &RAW, 16)?, "");
        Ok(())
    }

    #[test]
    fn test_scan_without_timeout() -> Result<(), Error> {
        let mut console = raw_console();
        console.type_later(b"42\r\n");

        let result = scan(&mut console, &COOKED, &RAW, Duration::ZERO, |s| s.parse::<i32>())?;
        assert_eq!(result, Scan::Parsed(Ok(42)));
        assert!(result.is_respected());
        assert_eq!(console.waits(), 0);
        assert_eq!(console.mode(), RAW);
        Ok(())
    }

    #[test]
    fn test_scan_timeout() -> Result<(), Error> {
        let mut console = raw_console();
        let mut target = 7;

        let result = scan(&mut console, &COOKED, &RAW, Duration::from_millis(50), |s| {
            target = s.len();
        })?;
        assert_eq!(result, Scan::TimedOut);
        assert_eq!(target, 7);
        assert_eq!(console.waits(), 1);
        assert_eq!(console.mode(), RAW);

        let mut console = raw_console();
        console.type_later(b"word\n");
        let result = scan(&mut console, &COOKED, &RAW, Duration::from_millis(50), str::to_owned)?;
        assert_eq!(result.parsed().as_deref(), Some("word"));
        Ok(())
    }

    #[test]
    fn test_readiness_failure_restores_raw() {
        let mut console = raw_console();
        console.fail_waits();

        let result = scan(&mut console, &COOKED, &RAW, Duration::from_millis(5), |_| ());
        assert!(matches!(result, Err(Error::ReadinessWaitFailed(_))));
        assert_eq!(console.mode(), RAW);
    }

    #[test]
    fn test_prologue_failure() {
        // Cooked mode is rejected outright.
        let mut console = raw_console();
        console.reject(COOKED);
        let result = read_line(&mut console, &COOKED, &RAW, 16);
        assert!(matches!(result, Err(Error::PrologueFailed)));
        assert_eq!(console.mode(), RAW);

        // Cooked mode is accepted but does not take effect.
        let mut console = raw_console();
        console.ignore_writes();
        let result = scan(&mut console, &COOKED, &RAW, Duration::ZERO, |_| ());
        assert!(matches!(result, Err(Error::PrologueFailed)));
        assert_eq!(console.writes().last(), Some(&(RAW, When::AfterFlush)));
    }

    #[test]
    fn test_epilogue_failure() {
        let mut console = raw_console();
        console.type_later(b"line\n").reject(RAW);
        let result = read_line(&mut console, &COOKED, &RAW, 16);
        assert!(matches!(result, Err(Error::EpilogueFailed)));
    }
}
