//! Menus.
//!
//! A menu shows a prompt followed by a list of entries, one of which is
//! selected. The selected entry is highlighted and shows its details, whereas
//! disabled entries are dimmed. Up and down move the selection, wrapping
//! around at either end. Enter picks the selected entry, unless it is
//! disabled. There is no way to leave a menu without picking an entry.
//!
//! The [`Navigator`] implements the menu's logic independently from the
//! terminal. [`Session::menu`](crate::Session::menu) drives it with the key
//! state oracle.

use std::io::{Result, Write};

use crate::style::{Rgb, StyleState};
use crate::Key;

/// The color of a menu's prompt.
pub const PROMPT_COLOR: Rgb = Rgb(242, 140, 40);

/// The keys navigating a menu.
pub const MENU_KEYS: [Key; 3] = [Key::Down, Key::Up, Key::Enter];

/// An entry in a menu.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MenuEntry<T> {
    name: String,
    value: T,
    detail: String,
    disabled: bool,
}

impl<T> MenuEntry<T> {
    /// Create a new enabled entry without details.
    pub fn new<S: Into<String>>(name: S, value: T) -> Self {
        Self {
            name: name.into(),
            value,
            detail: String::new(),
            disabled: false,
        }
    }

    /// Add details to this entry.
    pub fn with_detail<S: Into<String>>(mut self, detail: S) -> Self {
        self.detail = detail.into();
        self
    }

    /// Disable this entry.
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Get the name shown in the menu.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the value returned when this entry is picked.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Get the detail shown next to the selected entry.
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Determine whether this entry cannot be picked.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }
}

/// The state of a menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuState {
    /// The menu needs to be drawn.
    Rendering,
    /// The menu has been drawn and waits for a key.
    AwaitingInput,
    /// An entry has been picked.
    Done,
}

/// A menu's state machine.
#[derive(Debug)]
pub struct Navigator<'a, T> {
    entries: &'a [MenuEntry<T>],
    selection: usize,
    state: MenuState,
}

impl<'a, T> Navigator<'a, T> {
    /// Create a new navigator with the first entry selected.
    ///
    /// A menu without entries has nothing to select, so this function returns
    /// `None` for an empty slice.
    pub fn new(entries: &'a [MenuEntry<T>]) -> Option<Self> {
        if entries.is_empty() {
            None
        } else {
            Some(Self {
                entries,
                selection: 0,
                state: MenuState::Rendering,
            })
        }
    }

    /// Get the index of the selected entry.
    pub fn selection(&self) -> usize {
        self.selection
    }

    /// Get the current state.
    pub fn state(&self) -> MenuState {
        self.state
    }

    /// Draw the menu.
    pub fn render(&mut self, prompt: &str, style: &mut StyleState, out: &mut dyn Write) -> Result<()> {
        style.set_bold(out, true)?;
        style.set_foreground(out, PROMPT_COLOR)?;
        writeln!(out, "{}", prompt)?;
        style.reset(out)?;

        for (index, entry) in self.entries.iter().enumerate() {
            if entry.disabled {
                style.set_dim(out, true)?;
            }

            if index == self.selection {
                style.set_reversed(out, true)?;
                writeln!(out, " [ {} ] {}", entry.name, entry.detail)?;
                style.set_reversed(out, false)?;
            } else {
                writeln!(out, "   {}", entry.name)?;
            }

            style.set_dim(out, false)?;
        }

        self.state = MenuState::AwaitingInput;
        Ok(())
    }

    /// Process a key click.
    ///
    /// This method returns the picked entry's value after enter on an enabled
    /// entry. All other keys leave the menu in need of being redrawn.
    pub fn click(&mut self, key: Key) -> Option<&'a T> {
        let count = self.entries.len();

        match key {
            Key::Down => self.selection = (self.selection + 1) % count,
            Key::Up => {
                self.selection = if self.selection == 0 {
                    count - 1
                } else {
                    self.selection - 1
                }
            }
            Key::Enter => {
                let entry = &self.entries[self.selection];
                if !entry.disabled {
                    self.state = MenuState::Done;
                    return Some(&entry.value);
                }
            }
            _ => {}
        }

        self.state = MenuState::Rendering;
        None
    }
}

#[cfg(test)]
mod test {
    use super::{MenuEntry, MenuState, Navigator};
    use crate::style::StyleState;
    use crate::sys::Capabilities;
    use crate::Key;

    fn entries() -> Vec<MenuEntry<u32>> {
        vec![
            MenuEntry::new("New game", 1).with_detail("start from scratch"),
            MenuEntry::new("Continue", 2).disabled(),
            MenuEntry::new("Quit", 3),
        ]
    }

    #[test]
    fn test_navigation() {
        let entries = entries();
        let mut menu = Navigator::new(&entries).expect("entries");
        assert_eq!(menu.selection(), 0);
        assert_eq!(menu.state(), MenuState::Rendering);

        assert_eq!(menu.click(Key::Down), None);
        assert_eq!(menu.selection(), 1);
        assert_eq!(menu.click(Key::Up), None);
        assert_eq!(menu.click(Key::Up), None);
        assert_eq!(menu.selection(), 2);
        assert_eq!(menu.click(Key::Down), None);
        assert_eq!(menu.selection(), 0);
    }

    #[test]
    fn test_enter() {
        let entries = entries();
        let mut menu = Navigator::new(&entries).expect("entries");

        menu.click(Key::Down);
        assert_eq!(menu.click(Key::Enter), None);
        assert_eq!(menu.selection(), 1);
        assert_eq!(menu.state(), MenuState::Rendering);

        menu.click(Key::Down);
        assert_eq!(menu.click(Key::Enter), Some(&3));
        assert_eq!(menu.state(), MenuState::Done);
    }

    #[test]
    fn test_empty() {
        let entries: Vec<MenuEntry<u32>> = Vec::new();
        assert!(Navigator::new(&entries).is_none());
    }

    #[test]
    fn test_render() -> std::io::Result<()> {
        let entries = entries();
        let mut menu = Navigator::new(&entries).expect("entries");
        let mut style = StyleState::new(Capabilities {
            dim: true,
            blink: true,
            clear_scrollback: true,
        });
        let mut out = Vec::new();

        menu.render("Snake", &mut style, &mut out)?;
        assert_eq!(menu.state(), MenuState::AwaitingInput);

        let text = String::from_utf8(out).expect("valid UTF-8");
        assert!(text.starts_with("\x1b[1m\x1b[38;2;242;140;40mSnake\n\x1b[0m"));
        assert!(text.contains("\x1b[7m [ New game ] start from scratch\n\x1b[27m"));
        assert!(text.contains("\x1b[2m   Continue\n"));
        assert!(text.contains("   Quit\n"));
        assert!(!style.is_dim());
        Ok(())
    }
}
