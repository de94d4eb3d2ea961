//! Session configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::util::{Overrides, ProcessEnv};

/// The default directory with symbolic links to input devices.
pub const INPUT_DIRECTORY: &str = "/dev/input/by-path/";

/// The default suffix for keyboard devices in the input directory.
pub const KEYBOARD_SUFFIX: &str = "kbd";

/// Options for configuring a console session.
///
/// Use [`Options::builder`] to adjust individual options or
/// [`Options::from_environment`] to pick up overrides from environment
/// variables:
///
///   * `KEYTERM_INPUT_DIR` replaces the input device directory.
///   * `KEYTERM_POLL_MS` sets the interval between key polls in milliseconds.
///   * `KEYTERM_NO_SCROLL_LOCK`, if non-empty, keeps the terminal's scrollback
///     enabled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    poll_interval: Duration,
    input_directory: PathBuf,
    keyboard_suffix: String,
    lock_scroll: bool,
}

impl Options {
    /// Create a new options object with the default values.
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::ZERO,
            input_directory: PathBuf::from(INPUT_DIRECTORY),
            keyboard_suffix: String::from(KEYBOARD_SUFFIX),
            lock_scroll: true,
        }
    }

    /// Create a new options builder with the default values.
    pub fn builder() -> OptionBuilder {
        OptionBuilder(Self::new())
    }

    /// Create a new options object with defaults overridden by environment
    /// variables.
    pub fn from_environment() -> Self {
        Self::with_environment(&ProcessEnv)
    }

    pub(crate) fn with_environment<E: Overrides>(env: &E) -> Self {
        let mut options = Self::new();

        if let Some(directory) = env.path("KEYTERM_INPUT_DIR") {
            options.input_directory = directory;
        }
        if let Some(interval) = env.millis("KEYTERM_POLL_MS") {
            options.poll_interval = interval;
        }
        if env.flag("KEYTERM_NO_SCROLL_LOCK") {
            options.lock_scroll = false;
        }

        options
    }

    /// Get the interval between successive key state polls.
    ///
    /// A zero interval means that waits spin without sleeping.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Get the directory with input devices.
    pub fn input_directory(&self) -> &Path {
        &self.input_directory
    }

    /// Get the file name suffix identifying keyboards in the input directory.
    pub fn keyboard_suffix(&self) -> &str {
        &self.keyboard_suffix
    }

    /// Determine whether the session confines the terminal to the visible
    /// window.
    pub fn lock_scroll(&self) -> bool {
        self.lock_scroll
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

/// A builder of options objects.
#[derive(Clone, Debug)]
pub struct OptionBuilder(Options);

impl OptionBuilder {
    /// Set the interval between key state polls.
    pub fn poll_interval(&mut self, interval: Duration) -> &mut Self {
        self.0.poll_interval = interval;
        self
    }

    /// Set the directory with input devices.
    pub fn input_directory<P: Into<PathBuf>>(&mut self, directory: P) -> &mut Self {
        self.0.input_directory = directory.into();
        self
    }

    /// Set the file name suffix identifying keyboards.
    pub fn keyboard_suffix<S: Into<String>>(&mut self, suffix: S) -> &mut Self {
        self.0.keyboard_suffix = suffix.into();
        self
    }

    /// Enable or disable confining the terminal to the visible window.
    pub fn lock_scroll(&mut self, lock: bool) -> &mut Self {
        self.0.lock_scroll = lock;
        self
    }

    /// Build the options.
    pub fn build(&self) -> Options {
        self.0.clone()
    }
}
