//! Live key state.
//!
//! A [`KeyOracle`] answers whether a key is held down right now. It queries
//! the operating system directly and hence works independently of the terminal
//! input stream, pending line input included. There are two strategies:
//!
//!   * On Windows, [`AsyncKeyState`] asks the system for a key's state with a
//!     single call.
//!   * On Linux, there is no system-wide query. [`DeviceScan`] instead
//!     enumerates the keyboards among the input devices and asks each of them
//!     for its key bitmap, on every query, so that plugging in or removing a
//!     keyboard takes effect immediately.
//!
//! [`native`] picks the strategy for the current platform once, when a
//! session starts. On top of any oracle, [`Polling::wait_click`] and
//! [`Polling::wait_clicks`] implement edge-triggered waits: They first wait
//! out presses left over from before the call, then wait for a full
//! press-then-release cycle.
//!
//! Waits poll. By default, they spin without sleeping, which is acceptable for
//! short, user-driven waits only. [`Options`](crate::Options) configures a
//! poll interval, and a [`CancelToken`] aborts a wait from another thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::{Error, Key, Options};

// The key bitmap request uses the generic ioctl encoding, which other
// architectures such as powerpc, mips, and sparc do not share.
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
mod evdev;

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
pub use evdev::{BitmapQuery, DeviceScan, Ioctl, KeyBitmap, KEY_BITMAP_LEN};

#[cfg(target_family = "windows")]
mod async_state;

#[cfg(target_family = "windows")]
pub use async_state::AsyncKeyState;

/// An oracle for the live state of keys.
pub trait KeyOracle {
    /// Determine whether the key is currently held down.
    fn is_pressed(&mut self, key: Key) -> Result<bool, Error>;

    /// Check that the oracle can answer queries at all.
    ///
    /// Sessions probe their oracle before touching the terminal, so that a
    /// missing keyboard is reported during initialization already.
    fn probe(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

impl<O: KeyOracle + ?Sized> KeyOracle for Box<O> {
    fn is_pressed(&mut self, key: Key) -> Result<bool, Error> {
        (**self).is_pressed(key)
    }

    fn probe(&mut self) -> Result<(), Error> {
        (**self).probe()
    }
}

/// The oracle for platforms without a way of querying key state.
#[derive(Debug, Default)]
pub struct Unsupported;

impl KeyOracle for Unsupported {
    fn is_pressed(&mut self, _: Key) -> Result<bool, Error> {
        Err(Error::MissingCapability)
    }

    fn probe(&mut self) -> Result<(), Error> {
        Err(Error::MissingCapability)
    }
}

/// Create the key state oracle for the current platform.
#[allow(unused_variables)]
pub fn native(options: &Options) -> Box<dyn KeyOracle> {
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
    {
        Box::new(DeviceScan::new(
            options.input_directory(),
            options.keyboard_suffix(),
        ))
    }

    #[cfg(target_family = "windows")]
    {
        Box::new(AsyncKeyState)
    }

    #[cfg(not(any(
        all(
            target_os = "linux",
            any(
                target_arch = "x86",
                target_arch = "x86_64",
                target_arch = "arm",
                target_arch = "aarch64",
                target_arch = "riscv64"
            )
        ),
        target_family = "windows"
    )))]
    {
        Box::new(Unsupported)
    }
}

// ====================================================================================================================

/// A token for cancelling blocking waits.
///
/// Clones share the same flag. Cancelling is sticky until [`CancelToken::reset`].
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a new token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel all waits observing this token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Determine whether this token has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clear the cancellation.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The pacing of busy waits.
#[derive(Clone, Debug, Default)]
pub struct Polling {
    interval: Duration,
    cancel: CancelToken,
}

impl Polling {
    /// Create a new polling policy.
    pub fn new(interval: Duration, cancel: CancelToken) -> Self {
        Self { interval, cancel }
    }

    /// Get the cancel token.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Poll the condition until it holds.
    fn until<F>(&self, mut condition: F) -> Result<(), Error>
    where
        F: FnMut() -> Result<bool, Error>,
    {
        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if condition()? {
                return Ok(());
            }
            if !self.interval.is_zero() {
                std::thread::sleep(self.interval);
            }
        }
    }

    /// Wait for a click of the given key.
    ///
    /// If the key is already held down, this method first waits for its
    /// release, so that a press left over from before is not mistaken for a
    /// new one. It then waits for the key to be pressed and released again.
    pub fn wait_click(&self, oracle: &mut dyn KeyOracle, key: Key) -> Result<(), Error> {
        if oracle.is_pressed(key)? {
            tracing::trace!(%key, "waiting out stale press");
            self.until(|| Ok(!oracle.is_pressed(key)?))?;
        }

        self.until(|| oracle.is_pressed(key))?;
        self.until(|| Ok(!oracle.is_pressed(key)?))
    }

    /// Wait for a click of any one of the given keys.
    ///
    /// This method first waits for the release of all keys that are held down
    /// at the time of the call. It then polls the keys in the given order. The
    /// first key found pressed wins, even if another key was pressed during
    /// the same round of polling. Finally, it waits for the winning key's
    /// release and returns that key.
    pub fn wait_clicks(&self, oracle: &mut dyn KeyOracle, keys: &[Key]) -> Result<Key, Error> {
        if keys.is_empty() {
            return Err(Error::NoKeys);
        }

        for &key in keys {
            if oracle.is_pressed(key)? {
                tracing::trace!(%key, "waiting out stale press");
                self.until(|| Ok(!oracle.is_pressed(key)?))?;
            }
        }

        let mut winner = None;
        self.until(|| {
            for &key in keys {
                if oracle.is_pressed(key)? {
                    winner = Some(key);
                    return Ok(true);
                }
            }
            Ok(false)
        })?;

        // The loop above only returns successfully after setting the winner.
        let key = winner.ok_or(Error::NoKeys)?;
        self.until(|| Ok(!oracle.is_pressed(key)?))?;
        Ok(key)
    }
}

// ====================================================================================================================

#[cfg(test)]
pub(crate) mod test {
    use super::{native, CancelToken, KeyOracle, Polling};
    use crate::{Error, Key, Options};

    /// A key oracle that plays back a script.
    ///
    /// Time advances by one tick per query. A key is pressed during the
    /// half-open tick ranges given for it. Queries far past the end of the
    /// script fail, so that tests cannot hang.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedOracle {
        presses: Vec<(Key, usize, usize)>,
        tick: usize,
    }

    impl ScriptedOracle {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Hold the key during the given ticks.
        pub(crate) fn press(mut self, key: Key, from: usize, until: usize) -> Self {
            self.presses.push((key, from, until));
            self
        }

        /// Get the number of queries so far.
        pub(crate) fn tick(&self) -> usize {
            self.tick
        }

        fn end(&self) -> usize {
            self.presses.iter().map(|p| p.2).max().unwrap_or(0)
        }
    }

    impl KeyOracle for ScriptedOracle {
        fn is_pressed(&mut self, key: Key) -> Result<bool, Error> {
            if self.end() + 1_000 < self.tick {
                return Err(Error::KeyQueryFailed(std::io::Error::other(
                    "script ran out",
                )));
            }

            let now = self.tick;
            self.tick += 1;
            Ok(self
                .presses
                .iter()
                .any(|&(k, from, until)| k == key && from <= now && now < until))
        }
    }

    #[test]
    fn test_native_strategy() {
        let options = Options::builder()
            .input_directory("/nonexistent/keyterm/input")
            .build();
        let result = native(&options).probe();

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
        assert!(matches!(result, Err(Error::NoKeyboard)));

        #[cfg(target_family = "windows")]
        assert!(result.is_ok());

        #[cfg(not(any(
            all(
                target_os = "linux",
                any(
                    target_arch = "x86",
                    target_arch = "x86_64",
                    target_arch = "arm",
                    target_arch = "aarch64",
                    target_arch = "riscv64"
                )
            ),
            target_family = "windows"
        )))]
        assert!(matches!(result, Err(Error::MissingCapability)));
    }

    #[test]
    fn test_wait_click_debounces() -> Result<(), Error> {
        // Held from the start, released at 3, pressed again from 6 to 9.
        let mut oracle = ScriptedOracle::new()
            .press(Key::Enter, 0, 3)
            .press(Key::Enter, 6, 9);

        Polling::default().wait_click(&mut oracle, Key::Enter)?;

        // Query 9 observes the second release. Without waiting out the stale
        // press, the wait would have ended at query 3 already.
        assert_eq!(oracle.tick(), 10);
        Ok(())
    }

    #[test]
    fn test_wait_click_fresh() -> Result<(), Error> {
        let mut oracle = ScriptedOracle::new().press(Key::A, 2, 4);
        Polling::default().wait_click(&mut oracle, Key::A)?;
        assert_eq!(oracle.tick(), 5);
        Ok(())
    }

    #[test]
    fn test_wait_clicks() -> Result<(), Error> {
        let keys = [Key::Down, Key::Up, Key::Enter];

        // Up is stale and released at 4; Enter goes down at 10.
        let mut oracle = ScriptedOracle::new()
            .press(Key::Up, 0, 4)
            .press(Key::Enter, 10, 14);
        assert_eq!(Polling::default().wait_clicks(&mut oracle, &keys)?, Key::Enter);

        // Both go down together; the first key in slice order wins.
        let mut oracle = ScriptedOracle::new()
            .press(Key::Up, 5, 20)
            .press(Key::Down, 5, 9);
        assert_eq!(Polling::default().wait_clicks(&mut oracle, &keys)?, Key::Down);
        Ok(())
    }

    #[test]
    fn test_wait_clicks_needs_keys() {
        let mut oracle = ScriptedOracle::new();
        let result = Polling::default().wait_clicks(&mut oracle, &[]);
        assert!(matches!(result, Err(Error::NoKeys)));
        assert_eq!(oracle.tick(), 0);
    }

    #[test]
    fn test_cancel() {
        let token = CancelToken::new();
        let polling = Polling::new(std::time::Duration::ZERO, token.clone());
        token.cancel();

        let mut oracle = ScriptedOracle::new().press(Key::X, 100, 200);
        let result = polling.wait_click(&mut oracle, Key::X);
        assert!(matches!(result, Err(Error::Cancelled)));

        token.reset();
        assert!(!polling.cancel_token().is_cancelled());
    }

    #[test]
    fn test_query_errors_propagate() {
        let mut oracle = ScriptedOracle::new();
        let result = Polling::default().wait_click(&mut oracle, Key::Q);
        assert!(matches!(result, Err(Error::KeyQueryFailed(_))));
    }
}
