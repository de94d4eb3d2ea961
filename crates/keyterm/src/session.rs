use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::input::{self, Scan};
use crate::keys::{self, CancelToken, KeyOracle, Polling};
use crate::menu::{MenuEntry, Navigator, MENU_KEYS};
use crate::style::{Rgb, SetTitle, StyleState};
use crate::sys::{Console, NativeConsole, When, CLEAR_ALL, CLEAR_SCREEN};
use crate::{CleanupStatus, Error, Key, Options};

/// The flag for the one native session.
static ACTIVE: AtomicBool = AtomicBool::new(false);

/// The claim on the process' terminal.
#[derive(Debug)]
struct Exclusive(());

impl Exclusive {
    fn claim() -> Result<Self, Error> {
        ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(()))
            .map_err(|_| Error::Busy)
    }
}

impl Drop for Exclusive {
    fn drop(&mut self) {
        ACTIVE.store(false, Ordering::Release);
    }
}

// ====================================================================================================================

/// A console session.
///
/// A session puts the terminal into raw mode upon creation and restores the
/// original configuration upon [`Session::cleanup`] or drop, whichever comes
/// first. It also registers a hook that restores the terminal when the
/// process exits without dropping the session. In between, it tracks the
/// current text style and answers queries about live key state.
///
/// A process has at most one native session at a time. Starting another one,
/// whether through [`Session::open`] or [`Session::with_console`], fails with
/// [`Error::Busy`] until the active one has been cleaned up or dropped.
///
/// # Example
///
/// ```no_run
/// # use keyterm::{Error, Key, MenuEntry, Session};
/// let mut session = Session::open()?;
/// let entries = [
///     MenuEntry::new("Play", 1).with_detail("until the snake bites"),
///     MenuEntry::new("Quit", 0),
/// ];
/// if session.menu("Snake", &entries)? == Some(1) {
///     session.wait_click(Key::Enter)?;
/// }
/// if session.cleanup().is_warning() {
///     eprintln!("could not restore terminal; try `reset`");
/// }
/// # Ok::<(), Error>(())
/// ```
pub struct Session<C: Console = NativeConsole> {
    console: C,
    oracle: Box<dyn KeyOracle>,
    original: C::Mode,
    raw: C::Mode,
    style: StyleState,
    polling: Polling,
    options: Options,
    initialized: bool,
    claim: Option<Exclusive>,
}

impl Session<NativeConsole> {
    /// Start a native session with options read from the environment.
    pub fn open() -> Result<Self, Error> {
        Self::with_options(Options::from_environment())
    }

    /// Start a native session with the given options.
    pub fn with_options(options: Options) -> Result<Self, Error> {
        let console = NativeConsole::new()?;
        let oracle = keys::native(&options);
        Self::with_console(console, oracle, options)
    }
}

impl<C: Console> Session<C> {
    /// Start a session on the given console with the given key state oracle.
    ///
    /// This function claims exclusive consoles, checks for a terminal, and
    /// probes the oracle before touching the terminal configuration. After
    /// writing the raw-mode configuration, it reads the configuration back,
    /// since a terminal may accept only some changes. If the two differ, it restores the original
    /// configuration and fails.
    pub fn with_console(
        mut console: C,
        mut oracle: Box<dyn KeyOracle>,
        options: Options,
    ) -> Result<Self, Error> {
        let claim = if console.is_exclusive() {
            Some(Exclusive::claim()?)
        } else {
            None
        };
        if !console.is_terminal() {
            return Err(Error::NotATerminal);
        }
        oracle.probe()?;

        let original = console.read_mode()?;
        let raw = console.raw_mode(&original);

        if let Err(cause) = console.write_mode(&raw, When::Now) {
            if let Err(error) = console.write_mode(&original, When::Now) {
                tracing::warn!(%error, "could not restore terminal after failing to enter raw mode");
            }
            return Err(Error::ModeApplyFailed(cause));
        }

        match console.read_mode() {
            Ok(mode) if mode == raw => {}
            other => {
                tracing::debug!(mode = ?other.ok(), expected = ?raw, "raw mode did not take");
                if let Err(error) = console.write_mode(&original, When::Now) {
                    tracing::warn!(%error, "could not restore terminal after failing to enter raw mode");
                }
                return Err(Error::ModeVerifyFailed);
            }
        }

        tracing::debug!(?original, ?raw, "entered raw mode");
        console.restore_at_exit(Some(&original));

        if options.lock_scroll() {
            if let Err(error) = console.lock_scroll() {
                tracing::warn!(%error, "could not lock scrolling");
            }
        }

        let style = StyleState::new(console.capabilities());
        let polling = Polling::new(options.poll_interval(), CancelToken::new());
        let mut session = Self {
            console,
            oracle,
            original,
            raw,
            style,
            polling,
            options,
            initialized: true,
            claim,
        };

        // Dropping the session on error restores the terminal.
        session.style.reset(session.console.output())?;
        session.clear()?;
        Ok(session)
    }

    /// Determine whether the session is still active.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Get the options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Get the console.
    pub fn console(&self) -> &C {
        &self.console
    }

    /// Get the current text style.
    pub fn style(&self) -> &StyleState {
        &self.style
    }

    /// Get a token for cancelling this session's key waits.
    pub fn cancel_token(&self) -> CancelToken {
        self.polling.cancel_token().clone()
    }

    fn check(&self) -> Result<(), Error> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::Uninitialized)
        }
    }

    /// Restore the terminal.
    ///
    /// This method resets the text style, undoes the scroll lock, discards
    /// pending input, and restores the original terminal configuration. It
    /// does nothing if the session has been cleaned up before. Since the
    /// process must be able to exit either way, failing to restore the
    /// terminal only results in a warning. In either case, a new session may
    /// start afterwards.
    pub fn cleanup(&mut self) -> CleanupStatus {
        if !self.initialized {
            return CleanupStatus::Success;
        }
        self.initialized = false;

        let status = self.restore();
        self.claim = None;
        status
    }

    fn restore(&mut self) -> CleanupStatus {
        if let Err(error) = self.style.reset(self.console.output()) {
            tracing::warn!(%error, "could not reset style");
        }
        if let Err(error) = self.console.unlock_scroll() {
            tracing::warn!(%error, "could not unlock scrolling");
        }
        if let Err(error) = self.console.discard_input() {
            tracing::debug!(%error, "could not discard input");
        }

        let restored = self
            .console
            .write_mode(&self.original, When::AfterFlush)
            .and_then(|()| self.console.read_mode());
        match restored {
            Ok(mode) if mode == self.original => {
                self.console.restore_at_exit(None);
                tracing::debug!("restored terminal");
                CleanupStatus::Success
            }
            Ok(mode) => {
                tracing::warn!(?mode, expected = ?self.original, "terminal differs from original");
                CleanupStatus::Warning
            }
            Err(error) => {
                tracing::warn!(%error, "could not restore terminal");
                CleanupStatus::Warning
            }
        }
    }

    /// Clear the screen.
    ///
    /// Where the console supports it, this method also clears the scrollback.
    pub fn clear(&mut self) -> Result<(), Error> {
        self.check()?;
        let sequence = if self.console.capabilities().clear_scrollback {
            CLEAR_ALL
        } else {
            CLEAR_SCREEN
        };
        self.console.output().write_all(sequence.as_bytes())?;
        Ok(())
    }

    /// Determine whether the key is currently held down.
    pub fn key_state(&mut self, key: Key) -> Result<bool, Error> {
        self.check()?;
        self.oracle.is_pressed(key)
    }

    /// Wait for a click of the key.
    ///
    /// See [`Polling::wait_click`].
    pub fn wait_click(&mut self, key: Key) -> Result<(), Error> {
        self.check()?;
        self.polling.wait_click(self.oracle.as_mut(), key)
    }

    /// Wait for a click of one of the keys and return that key.
    ///
    /// See [`Polling::wait_clicks`].
    pub fn wait_clicks(&mut self, keys: &[Key]) -> Result<Key, Error> {
        self.check()?;
        self.polling.wait_clicks(self.oracle.as_mut(), keys)
    }

    /// Read a line within the timeout and parse it.
    ///
    /// A zero timeout waits indefinitely. Upon timeout, the parser does not
    /// run and the result is [`Scan::TimedOut`].
    pub fn scan<T, F>(&mut self, timeout: Duration, parse: F) -> Result<Scan<T>, Error>
    where
        F: FnOnce(&str) -> T,
    {
        self.check()?;
        input::scan(&mut self.console, &self.original, &self.raw, timeout, parse)
    }

    /// Read a line of at most `capacity - 1` bytes.
    ///
    /// The line has leading and trailing whitespace removed.
    pub fn read_line(&mut self, capacity: usize) -> Result<String, Error> {
        self.check()?;
        input::read_line(&mut self.console, &self.original, &self.raw, capacity)
    }

    /// Show a menu and return the value of the picked entry.
    ///
    /// For an empty list of entries, this method returns `None` right away
    /// without drawing anything.
    pub fn menu<T: Clone>(
        &mut self,
        prompt: &str,
        entries: &[MenuEntry<T>],
    ) -> Result<Option<T>, Error> {
        self.check()?;
        let Some(mut navigator) = Navigator::new(entries) else {
            return Ok(None);
        };

        self.style.reset(self.console.output())?;
        loop {
            self.clear()?;
            navigator.render(prompt, &mut self.style, self.console.output())?;

            let key = self.polling.wait_clicks(self.oracle.as_mut(), &MENU_KEYS)?;
            tracing::trace!(%key, selection = navigator.selection(), "menu click");
            if let Some(value) = navigator.click(key) {
                self.clear()?;
                return Ok(Some(value.clone()));
            }
        }
    }

    /// Set the foreground color.
    pub fn set_foreground(&mut self, color: Rgb) -> Result<(), Error> {
        self.check()?;
        Ok(self.style.set_foreground(self.console.output(), color)?)
    }

    /// Set the background color.
    pub fn set_background(&mut self, color: Rgb) -> Result<(), Error> {
        self.check()?;
        Ok(self.style.set_background(self.console.output(), color)?)
    }

    /// Swap foreground and background colors or undo the swap.
    pub fn set_reversed(&mut self, on: bool) -> Result<(), Error> {
        self.check()?;
        Ok(self.style.set_reversed(self.console.output(), on)?)
    }

    /// Turn bold on or off.
    pub fn set_bold(&mut self, on: bool) -> Result<(), Error> {
        self.check()?;
        Ok(self.style.set_bold(self.console.output(), on)?)
    }

    /// Turn dim on or off.
    pub fn set_dim(&mut self, on: bool) -> Result<(), Error> {
        self.check()?;
        Ok(self.style.set_dim(self.console.output(), on)?)
    }

    /// Turn underlining on or off.
    pub fn set_underlined(&mut self, on: bool) -> Result<(), Error> {
        self.check()?;
        Ok(self.style.set_underlined(self.console.output(), on)?)
    }

    /// Turn blinking on or off.
    pub fn set_blinking(&mut self, on: bool) -> Result<(), Error> {
        self.check()?;
        Ok(self.style.set_blinking(self.console.output(), on)?)
    }

    /// Reset the text style.
    pub fn reset_style(&mut self) -> Result<(), Error> {
        self.check()?;
        Ok(self.style.reset(self.console.output())?)
    }

    /// Set the window title.
    pub fn set_title(&mut self, title: &str) -> Result<(), Error> {
        self.check()?;
        write!(self.console.output(), "{}", SetTitle(title))?;
        Ok(())
    }
}

impl<C: Console> Write for Session<C> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.console.output().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.console.output().flush()
    }
}

impl<C: Console> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("original", &self.original)
            .field("raw", &self.raw)
            .field("style", &self.style)
            .field("polling", &self.polling)
            .field("options", &self.options)
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

impl<C: Console> Drop for Session<C> {
    fn drop(&mut self) {
        if self.cleanup().is_warning() {
            tracing::warn!("session dropped without restoring the terminal");
        }
    }
}

// ====================================================================================================================
