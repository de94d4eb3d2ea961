//! Keyterm's errors and status codes.
//!
//! All fallible operations return [`Error`]. The two status enumerations,
//! [`InitStatus`] and [`CleanupStatus`], condense the outcome of starting and
//! ending a session into the coarse codes that calling code typically reports
//! to the user.

/// A keyterm error.
///
/// Variants wrapping a [`std::io::Error`] expose it as their
/// [`source`](std::error::Error::source).
#[derive(Debug)]
pub enum Error {
    /// Standard input or standard output is not attached to a terminal.
    NotATerminal,

    /// Another native session is already active in this process.
    Busy,

    /// The platform lacks a capability the session depends on, e.g., a way to
    /// query key state.
    MissingCapability,

    /// Writing the raw-mode configuration failed.
    ModeApplyFailed(std::io::Error),

    /// The terminal accepted the raw-mode configuration but reports a
    /// different configuration when read back.
    ModeVerifyFailed,

    /// The input device directory could not be opened, so there is no way to
    /// find a keyboard.
    NoKeyboard,

    /// Querying key state failed for a reason other than a missing keyboard.
    KeyQueryFailed(std::io::Error),

    /// Waiting for terminal input to become readable failed.
    ReadinessWaitFailed(std::io::Error),

    /// Switching to cooked mode before line input failed.
    PrologueFailed,

    /// Switching back to raw mode after line input failed.
    EpilogueFailed,

    /// A wait for key clicks received an empty set of keys.
    NoKeys,

    /// A blocking wait was cancelled through its token.
    Cancelled,

    /// The session has already been cleaned up.
    Uninitialized,

    /// Any other I/O error.
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Error::*;

        match self {
            NotATerminal => f.write_str("standard input and output should be terminals but are not"),
            Busy => f.write_str("only one console session may be active at a time"),
            MissingCapability => f.write_str("console lacks a required capability"),
            ModeApplyFailed(_) => f.write_str("could not put terminal into raw mode"),
            ModeVerifyFailed => {
                f.write_str("terminal configuration differs from the one just written")
            }
            NoKeyboard => f.write_str("could not open input device directory to find keyboards"),
            KeyQueryFailed(_) => f.write_str("could not query key state"),
            ReadinessWaitFailed(_) => f.write_str("could not wait for terminal input"),
            PrologueFailed => f.write_str("could not switch terminal to line input"),
            EpilogueFailed => f.write_str("could not switch terminal back to raw mode"),
            NoKeys => f.write_str("waiting for a click requires at least one key"),
            Cancelled => f.write_str("wait was cancelled"),
            Uninitialized => f.write_str("console session has already been cleaned up"),
            Io(_) => f.write_str("terminal I/O failed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ModeApplyFailed(error)
            | Self::KeyQueryFailed(error)
            | Self::ReadinessWaitFailed(error)
            | Self::Io(error) => Some(error),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

// ====================================================================================================================

/// The outcome of initializing a console session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InitStatus {
    /// The session is ready.
    Success,
    /// The terminal or platform lacks some (unspecified) capability.
    MissingCapability,
    /// Initialization failed.
    Error,
    /// No keyboard could be found.
    NoKeyboard,
    /// Standard input or output is not a terminal.
    NotATerminal,
}

impl InitStatus {
    /// Determine the status for the result of initializing a session.
    pub fn of<T>(result: &Result<T, Error>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(error) => error.into(),
        }
    }
}

impl From<&Error> for InitStatus {
    fn from(value: &Error) -> Self {
        match value {
            Error::NotATerminal => Self::NotATerminal,
            Error::NoKeyboard => Self::NoKeyboard,
            Error::MissingCapability => Self::MissingCapability,
            _ => Self::Error,
        }
    }
}

/// The outcome of cleaning up a console session.
///
/// Cleanup never fails outright because the process must be able to exit
/// anyway. If the terminal could not be restored to its original
/// configuration, cleanup reports a warning, which calling code should pass on
/// to the user, since the shell may behave oddly afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CleanupStatus {
    /// The terminal has been restored.
    Success,
    /// The terminal could not be restored.
    Warning,
}

impl CleanupStatus {
    /// Determine whether this status is a warning.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warning)
    }
}

#[cfg(test)]
mod test {
    use super::{CleanupStatus, Error, InitStatus};

    #[test]
    fn test_init_status() {
        assert_eq!(InitStatus::of(&Ok::<(), Error>(())), InitStatus::Success);
        assert_eq!(
            InitStatus::of::<()>(&Err(Error::NotATerminal)),
            InitStatus::NotATerminal
        );
        assert_eq!(InitStatus::of::<()>(&Err(Error::NoKeyboard)), InitStatus::NoKeyboard);
        assert_eq!(
            InitStatus::of::<()>(&Err(Error::MissingCapability)),
            InitStatus::MissingCapability
        );
        assert_eq!(InitStatus::of::<()>(&Err(Error::ModeVerifyFailed)), InitStatus::Error);
        assert_eq!(
            InitStatus::of::<()>(&Err(Error::ModeApplyFailed(std::io::Error::other("nope")))),
            InitStatus::Error
        );
    }

    #[test]
    fn test_source() {
        use std::error::Error as _;

        let error = Error::ReadinessWaitFailed(std::io::ErrorKind::BrokenPipe.into());
        assert!(error.source().is_some());
        assert!(Error::PrologueFailed.source().is_none());
        assert!(!CleanupStatus::Success.is_warning());
        assert!(CleanupStatus::Warning.is_warning());
    }
}
