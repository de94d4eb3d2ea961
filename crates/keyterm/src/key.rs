//! Abstract key identifiers.
//!
//! [`Key`] names the keys a console program can poll: the four arrow keys,
//! enter, digits, and the letters of the English alphabet. Each key knows its
//! Linux input event code and its Windows virtual-key code, so that the key
//! state oracles can translate without any platform conditionals.

/// A keyboard key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Enter,
    Digit0,
    Digit1,
    Digit2,
    Digit3,
    Digit4,
    Digit5,
    Digit6,
    Digit7,
    Digit8,
    Digit9,
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
}

use Key::*;

const DIGITS: [Key; 10] = [
    Digit0, Digit1, Digit2, Digit3, Digit4, Digit5, Digit6, Digit7, Digit8, Digit9,
];

const LETTERS: [Key; 26] = [
    A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
];

impl Key {
    /// Look up the key for an ASCII digit or letter.
    ///
    /// Letters are case-insensitive. This method returns `None` for all other
    /// characters.
    pub fn alnum(c: char) -> Option<Self> {
        let c = c.to_ascii_uppercase();
        match c {
            '0'..='9' => Some(DIGITS[c as usize - '0' as usize]),
            'A'..='Z' => Some(LETTERS[c as usize - 'A' as usize]),
            _ => None,
        }
    }

    /// Get the character for a digit or letter key.
    pub fn as_char(&self) -> Option<char> {
        let code = self.virtual_key();
        if self.is_alnum() {
            Some(char::from(code as u8))
        } else {
            None
        }
    }

    /// Determine whether this key is a digit or letter.
    pub fn is_alnum(&self) -> bool {
        !matches!(self, Up | Down | Left | Right | Enter)
    }

    /// Get the Linux input event code, as defined in
    /// `linux/input-event-codes.h`.
    pub const fn evdev_code(&self) -> u16 {
        match self {
            Up => 103,
            Down => 108,
            Left => 105,
            Right => 106,
            Enter => 28,
            Digit0 => 11,
            Digit1 => 2,
            Digit2 => 3,
            Digit3 => 4,
            Digit4 => 5,
            Digit5 => 6,
            Digit6 => 7,
            Digit7 => 8,
            Digit8 => 9,
            Digit9 => 10,
            Q => 16,
            W => 17,
            E => 18,
            R => 19,
            T => 20,
            Y => 21,
            U => 22,
            I => 23,
            O => 24,
            P => 25,
            A => 30,
            S => 31,
            D => 32,
            F => 33,
            G => 34,
            H => 35,
            J => 36,
            K => 37,
            L => 38,
            Z => 44,
            X => 45,
            C => 46,
            V => 47,
            B => 48,
            N => 49,
            M => 50,
        }
    }

    /// Get the Windows virtual-key code.
    ///
    /// Digits and letters use their uppercase ASCII codes.
    pub const fn virtual_key(&self) -> u16 {
        match self {
            Up => 0x26,
            Down => 0x28,
            Left => 0x25,
            Right => 0x27,
            Enter => 0x0d,
            _ => {
                let index = *self as u16 - Digit0 as u16;
                if index < 10 {
                    b'0' as u16 + index
                } else {
                    b'A' as u16 + index - 10
                }
            }
        }
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Up => f.write_str("↑"),
            Down => f.write_str("↓"),
            Left => f.write_str("←"),
            Right => f.write_str("→"),
            Enter => f.write_str("⏎"),
            _ => write!(f, "{}", char::from(self.virtual_key() as u8)),
        }
    }
}
