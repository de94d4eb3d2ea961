use windows_sys::Win32::UI::Input::KeyboardAndMouse::GetAsyncKeyState;

use super::KeyOracle;
use crate::{Error, Key};

/// A key state oracle asking Windows directly.
///
/// `GetAsyncKeyState` reports the physical key state at the time of the call,
/// independent of the calling thread's message queue, which is what a console
/// program without a window needs.
#[derive(Debug, Default)]
pub struct AsyncKeyState;

impl KeyOracle for AsyncKeyState {
    fn is_pressed(&mut self, key: Key) -> Result<bool, Error> {
        let state = unsafe { GetAsyncKeyState(key.virtual_key() as i32) };
        Ok(state as u16 & 0x8000 != 0)
    }
}
