//! Text styles.
//!
//! [`Sgr`] and [`SetTitle`] are commands: Writing their display to the
//! terminal executes them. [`StyleState`] mirrors the style the terminal
//! currently renders text in. It is the only way sessions change styles, which
//! lets the mirror express attributes relative to the current state. Notably,
//! bold and dim are mutually exclusive, and consoles that cannot render faint
//! text emulate dim by halving the current colors.

use std::io::{Result, Write};

use crate::sys::Capabilities;

/// A 24-bit color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// White.
    pub const WHITE: Self = Self(255, 255, 255);

    /// Black.
    pub const BLACK: Self = Self(0, 0, 0);

    /// Get this color at half intensity.
    pub const fn halved(&self) -> Self {
        Self(self.0 / 2, self.1 / 2, self.2 / 2)
    }
}

/// A select graphic rendition command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sgr {
    Reset,
    Foreground(Rgb),
    Background(Rgb),
    Bold,
    Dim,
    NormalIntensity,
    Underlined,
    NotUnderlined,
    Blinking,
    NotBlinking,
    Reversed,
    NotReversed,
}

impl std::fmt::Display for Sgr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Sgr::*;

        f.write_str("\x1b[")?;
        match self {
            Reset => f.write_str("0")?,
            Foreground(Rgb(r, g, b)) => write!(f, "38;2;{};{};{}", r, g, b)?,
            Background(Rgb(r, g, b)) => write!(f, "48;2;{};{};{}", r, g, b)?,
            Bold => f.write_str("1")?,
            Dim => f.write_str("2")?,
            NormalIntensity => f.write_str("22")?,
            Underlined => f.write_str("4")?,
            NotUnderlined => f.write_str("24")?,
            Blinking => f.write_str("5")?,
            NotBlinking => f.write_str("25")?,
            Reversed => f.write_str("7")?,
            NotReversed => f.write_str("27")?,
        }
        f.write_str("m")
    }
}

/// The command to set the window title.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetTitle<'a>(pub &'a str);

impl std::fmt::Display for SetTitle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\x1b]2;{}\x1b\\", self.0)
    }
}

// ====================================================================================================================

/// The mirror of the terminal's current text style.
///
/// Colors are recorded at full intensity, even while dim is emulated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleState {
    foreground: Rgb,
    background: Rgb,
    reversed: bool,
    bold: bool,
    dim: bool,
    underlined: bool,
    blinking: bool,
    capabilities: Capabilities,
}

impl StyleState {
    /// Create a new style mirror with the default style.
    ///
    /// The default style is white on black. Terminals may well be configured
    /// differently, but there is no portable way of asking.
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            foreground: Rgb::WHITE,
            background: Rgb::BLACK,
            reversed: false,
            bold: false,
            dim: false,
            underlined: false,
            blinking: false,
            capabilities,
        }
    }

    /// Get the foreground color.
    pub fn foreground(&self) -> Rgb {
        self.foreground
    }

    /// Get the background color.
    pub fn background(&self) -> Rgb {
        self.background
    }

    /// Determine whether foreground and background are swapped.
    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// Determine whether text is bold.
    pub fn is_bold(&self) -> bool {
        self.bold
    }

    /// Determine whether text is dim.
    pub fn is_dim(&self) -> bool {
        self.dim
    }

    /// Determine whether text is underlined.
    pub fn is_underlined(&self) -> bool {
        self.underlined
    }

    /// Determine whether text is blinking.
    pub fn is_blinking(&self) -> bool {
        self.blinking
    }

    fn emulates_dim(&self) -> bool {
        self.dim && !self.capabilities.dim
    }

    fn rendered(&self, color: Rgb) -> Rgb {
        if self.emulates_dim() {
            color.halved()
        } else {
            color
        }
    }

    /// Set the foreground color.
    pub fn set_foreground(&mut self, out: &mut dyn Write, color: Rgb) -> Result<()> {
        self.foreground = color;
        write!(out, "{}", Sgr::Foreground(self.rendered(color)))
    }

    /// Set the background color.
    pub fn set_background(&mut self, out: &mut dyn Write, color: Rgb) -> Result<()> {
        self.background = color;
        write!(out, "{}", Sgr::Background(self.rendered(color)))
    }

    /// Swap foreground and background colors or undo the swap.
    pub fn set_reversed(&mut self, out: &mut dyn Write, on: bool) -> Result<()> {
        self.reversed = on;
        let sgr = if on { Sgr::Reversed } else { Sgr::NotReversed };
        write!(out, "{}", sgr)
    }

    /// Turn bold on or off.
    ///
    /// Turning bold on also turns dim off.
    pub fn set_bold(&mut self, out: &mut dyn Write, on: bool) -> Result<()> {
        if on && self.dim {
            self.set_dim(out, false)?;
        }

        self.bold = on;
        if on {
            write!(out, "{}", Sgr::Bold)
        } else if self.dim && self.capabilities.dim {
            // Normal intensity ends faint text, too.
            write!(out, "{}{}", Sgr::NormalIntensity, Sgr::Dim)
        } else {
            write!(out, "{}", Sgr::NormalIntensity)
        }
    }

    /// Turn dim on or off.
    ///
    /// Turning dim on also turns bold off. If the console cannot render faint
    /// text, dim halves the colors and undim restores them.
    pub fn set_dim(&mut self, out: &mut dyn Write, on: bool) -> Result<()> {
        if on && self.bold {
            self.set_bold(out, false)?;
        }

        if self.capabilities.dim {
            self.dim = on;
            return if on {
                write!(out, "{}", Sgr::Dim)
            } else if self.bold {
                write!(out, "{}{}", Sgr::NormalIntensity, Sgr::Bold)
            } else {
                write!(out, "{}", Sgr::NormalIntensity)
            };
        }

        if self.dim == on {
            return Ok(());
        }
        self.dim = on;
        write!(
            out,
            "{}{}",
            Sgr::Foreground(self.rendered(self.foreground)),
            Sgr::Background(self.rendered(self.background))
        )
    }

    /// Turn underlining on or off.
    pub fn set_underlined(&mut self, out: &mut dyn Write, on: bool) -> Result<()> {
        self.underlined = on;
        let sgr = if on { Sgr::Underlined } else { Sgr::NotUnderlined };
        write!(out, "{}", sgr)
    }

    /// Turn blinking on or off.
    ///
    /// On consoles that cannot blink, this method only updates the mirror.
    pub fn set_blinking(&mut self, out: &mut dyn Write, on: bool) -> Result<()> {
        self.blinking = on;
        if !self.capabilities.blink {
            return Ok(());
        }

        let sgr = if on { Sgr::Blinking } else { Sgr::NotBlinking };
        write!(out, "{}", sgr)
    }

    /// Reset the style to the default.
    pub fn reset(&mut self, out: &mut dyn Write) -> Result<()> {
        *self = Self::new(self.capabilities);
        write!(out, "{}", Sgr::Reset)
    }
}
