//! # Keyterm
//!
//! \[  [**Docs.rs**](https://docs.rs/keyterm/latest/keyterm/)
//! | [**Rust Crate**](https://crates.io/crates/keyterm)
//! | [**Repository**](https://github.com/apparebit/keyterm)
//! \]
//!
//! This crate provides **raw-mode console sessions for full-screen terminal
//! programs**, e.g., text games. Its only dependencies are
//! [`tracing`](https://crates.io/crates/tracing) for diagnostics and the
//! low-level crate enabling system calls, i.e.,
//! [`libc`](https://crates.io/crates/libc) on Unix and
//! [`windows-sys`](https://crates.io/crates/windows-sys) on Windows.
//!
//! A [`Session`] owns the terminal:
//!
//!   * Opening a session puts the terminal into raw mode, i.e., without echo,
//!     line editing, or signal keys, and verifies that the terminal really
//!     switched. Cleaning up, dropping the session, or exiting the process
//!     restores the original configuration.
//!   * [`Session::key_state`] tells whether a key is held down right now,
//!     independently of buffered input. [`Session::wait_click`] and
//!     [`Session::wait_clicks`] wait for complete press-and-release cycles.
//!   * [`Session::scan`] and [`Session::read_line`] temporarily switch back to
//!     the original, cooked configuration to read a line, optionally with a
//!     timeout.
//!   * [`Session::menu`] shows a list of [`MenuEntry`]s and lets the user pick
//!     one with the arrow and enter keys.
//!   * The style setters emit ANSI escape sequences and keep a mirror of the
//!     current style, so that bold and dim remain mutually exclusive.
//!
//! Key state comes straight from the operating system. On Windows, that takes
//! a single call. On Linux, it requires scanning the keyboards under
//! `/dev/input/by-path` on every query, which in turn requires read access to
//! the input devices, typically by being a member of the `input` group.
//!
//!
//! # Example
//!
//! ```no_run
//! # use std::time::Duration;
//! # use keyterm::{Error, Key, Scan, Session};
//! let mut session = Session::open()?;
//! write!(session, "Your name? ")?;
//! let name = session.read_line(64)?;
//!
//! write!(session, "Your age? You have 5 seconds. ")?;
//! match session.scan(Duration::from_secs(5), |s| s.trim().parse::<u8>())? {
//!     Scan::Parsed(Ok(age)) => write!(session, "{}, {}\n", name, age)?,
//!     Scan::Parsed(Err(_)) => write!(session, "That's not an age!\n")?,
//!     Scan::TimedOut => write!(session, "Too slow!\n")?,
//! }
//!
//! write!(session, "Press Q to quit.")?;
//! session.wait_click(Key::Q)?;
//! # use std::io::Write;
//! # Ok::<(), Error>(())
//! ```
//!
//!
//! # Diagnostics
//!
//! Keyterm logs mode transitions at debug level and skipped input devices at
//! trace level through [`tracing`](https://docs.rs/tracing). Since a session
//! owns the terminal, subscribers should write to a file instead of standard
//! output.

mod error;
mod input;
mod key;
pub mod keys;
pub mod menu;
pub mod opt;
mod session;
pub mod style;
pub mod sys;
mod util;

#[cfg(test)]
mod testing;

pub use error::{CleanupStatus, Error, InitStatus};
pub use input::{trim_trailing, Scan};
pub use key::Key;
pub use keys::{CancelToken, KeyOracle};
pub use menu::MenuEntry;
pub use opt::Options;
pub use session::Session;
pub use style::Rgb;
