//! Key state on Linux.
//!
//! Linux has no system-wide query for key state. Instead, every input device
//! under `/dev/input` reports the keys it has down through the `EVIOCGKEY`
//! ioctl. This module scans the symbolic links in `/dev/input/by-path`, which
//! conveniently carry a `kbd` suffix for keyboards, and asks each keyboard in
//! turn. Devices that cannot be opened or queried are skipped, since a
//! non-keyboard or access-restricted device must not spoil the answer.

use std::fs::File;
use std::io::Result;
use std::os::fd::AsRawFd;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

use super::KeyOracle;
use crate::sys::IntoResult;
use crate::{Error, Key};

/// The size of a key bitmap in bytes, covering key codes up to `KEY_MAX`.
pub const KEY_BITMAP_LEN: usize = (0x2ff + 1) / 8;

/// The keys held down on an input device, one bit per key code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyBitmap([u8; KEY_BITMAP_LEN]);

impl KeyBitmap {
    /// Create a new bitmap with no keys held down.
    pub const fn new() -> Self {
        Self([0; KEY_BITMAP_LEN])
    }

    /// Mark the key with the given code as held down.
    pub fn set(&mut self, code: u16) -> &mut Self {
        if let Some(byte) = self.0.get_mut(code as usize / 8) {
            *byte |= 1 << (code % 8);
        }
        self
    }

    /// Determine whether the key with the given code is held down.
    pub fn is_set(&self, code: u16) -> bool {
        self.0
            .get(code as usize / 8)
            .is_some_and(|byte| byte & (1 << (code % 8)) != 0)
    }
}

impl Default for KeyBitmap {
    fn default() -> Self {
        Self::new()
    }
}

impl AsMut<[u8]> for KeyBitmap {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

// ------------------------------------------------------------------------------------------------

/// A strategy for reading the key bitmap of one input device.
pub trait BitmapQuery {
    /// Read the key bitmap for the device at the given path.
    ///
    /// Implementations must not hold on to the device after returning.
    fn query(&mut self, path: &Path) -> Result<KeyBitmap>;
}

/// The real thing: open the device and issue `EVIOCGKEY`.
#[derive(Debug, Default)]
pub struct Ioctl;

impl Ioctl {
    /// Compute the `EVIOCGKEY` request code for a buffer of the given length.
    ///
    /// This is `_IOC(_IOC_READ, 'E', 0x18, len)` with the generic layout of
    /// the request bits, which x86, arm, and riscv share. The module is not
    /// compiled for other architectures.
    const fn request(len: usize) -> u64 {
        const READ: u64 = 2;
        (READ << 30) | ((len as u64) << 16) | ((b'E' as u64) << 8) | 0x18
    }
}

impl BitmapQuery for Ioctl {
    fn query(&mut self, path: &Path) -> Result<KeyBitmap> {
        // Opening follows the symbolic link. The file closes when dropped.
        let file = File::open(path)?;
        if !file.metadata()?.file_type().is_char_device() {
            return Err(std::io::Error::other("not a character device"));
        }

        let mut bitmap = KeyBitmap::new();
        let buffer = bitmap.as_mut();
        unsafe {
            libc::ioctl(
                file.as_raw_fd(),
                Self::request(buffer.len()) as _,
                buffer.as_mut_ptr(),
            )
        }
        .into_result()?;

        Ok(bitmap)
    }
}

// ------------------------------------------------------------------------------------------------

/// A key state oracle scanning all keyboards.
///
/// Every query lists the input directory afresh. Scanning on each query is
/// what makes hotplugging work and remains cheap enough for tight polling
/// loops, since the directory holds a handful of entries only.
pub struct DeviceScan {
    directory: PathBuf,
    suffix: String,
    query: Box<dyn BitmapQuery + Send>,
}

impl DeviceScan {
    /// Create a new device scan over the given directory.
    pub fn new<P: Into<PathBuf>, S: Into<String>>(directory: P, suffix: S) -> Self {
        Self::with_query(directory, suffix, Ioctl)
    }

    /// Create a new device scan with the given bitmap query.
    pub fn with_query(
        directory: impl Into<PathBuf>,
        suffix: impl Into<String>,
        query: impl BitmapQuery + Send + 'static,
    ) -> Self {
        Self {
            directory: directory.into(),
            suffix: suffix.into(),
            query: Box::new(query),
        }
    }

    /// Get the directory with input devices.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// List the candidate keyboards.
    ///
    /// Candidates are symbolic links or character devices whose names end in
    /// the keyboard suffix. Failing to open the directory means there is no
    /// way of finding a keyboard. Failing to read an individual entry only
    /// skips that entry.
    fn candidates(&self) -> std::result::Result<Vec<PathBuf>, Error> {
        let entries = std::fs::read_dir(&self.directory).map_err(|error| {
            tracing::debug!(directory = %self.directory.display(), %error, "cannot open input directory");
            Error::NoKeyboard
        })?;

        let mut candidates = Vec::new();
        for entry in entries {
            let Ok(entry) = entry else {
                continue;
            };
            let Ok(kind) = entry.file_type() else {
                continue;
            };
            if !kind.is_symlink() && !kind.is_char_device() {
                continue;
            }
            if !entry
                .file_name()
                .as_encoded_bytes()
                .ends_with(self.suffix.as_bytes())
            {
                continue;
            }

            candidates.push(entry.path());
        }

        Ok(candidates)
    }
}

impl std::fmt::Debug for DeviceScan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceScan")
            .field("directory", &self.directory)
            .field("suffix", &self.suffix)
            .finish_non_exhaustive()
    }
}

impl KeyOracle for DeviceScan {
    fn is_pressed(&mut self, key: Key) -> std::result::Result<bool, Error> {
        let code = key.evdev_code();

        for path in self.candidates()? {
            match self.query.query(&path) {
                Ok(bitmap) => {
                    if bitmap.is_set(code) {
                        return Ok(true);
                    }
                }
                Err(error) => {
                    tracing::trace!(device = %path.display(), %error, "skipping input device");
                }
            }
        }

        Ok(false)
    }

    fn probe(&mut self) -> std::result::Result<(), Error> {
        let count = self.candidates()?.len();
        tracing::debug!(directory = %self.directory.display(), count, "found keyboard candidates");
        Ok(())
    }
}

// ================================================================================================

#[cfg(test)]
mod test {
    use super::{BitmapQuery, DeviceScan, Ioctl, KeyBitmap, KEY_BITMAP_LEN};
    use crate::keys::KeyOracle;
    use crate::{Error, Key};
    use std::io::Result;
    use std::os::unix::fs::symlink;
    use std::path::Path;

    /// A bitmap query reading key codes from regular files.
    ///
    /// Each target file holds whitespace-separated key codes. A file holding
    /// `fail` instead causes the query to fail.
    struct FileQuery;

    impl BitmapQuery for FileQuery {
        fn query(&mut self, path: &Path) -> Result<KeyBitmap> {
            let content = std::fs::read_to_string(path)?;
            if content.trim() == "fail" {
                return Err(std::io::Error::other("not a keyboard"));
            }

            let mut bitmap = KeyBitmap::new();
            for code in content.split_whitespace() {
                bitmap.set(code.parse().map_err(std::io::Error::other)?);
            }
            Ok(bitmap)
        }
    }

    fn device(dir: &Path, name: &str, content: &str) -> Result<()> {
        let target = dir.join(format!("{}.dev", name));
        std::fs::write(&target, content)?;
        symlink(&target, dir.join(name))
    }

    #[test]
    fn test_bitmap() {
        let mut bitmap = KeyBitmap::new();
        assert!(!bitmap.is_set(Key::Enter.evdev_code()));
        bitmap.set(Key::Enter.evdev_code()).set(0x2ff);
        assert!(bitmap.is_set(28));
        assert!(bitmap.is_set(0x2ff));
        assert!(!bitmap.is_set(29));

        // Out-of-range codes are never set.
        bitmap.set(0x300);
        assert!(!bitmap.is_set(0x300));
        assert_eq!(KEY_BITMAP_LEN, 96);
    }

    #[test]
    fn test_request() {
        assert_eq!(Ioctl::request(KEY_BITMAP_LEN), 0x8060_4518);
    }

    #[test]
    fn test_skip_then_succeed() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        device(dir.path(), "pci-0000:00:14.0-usb-0:1:1.0-event-kbd", "fail")?;
        device(dir.path(), "platform-i8042-serio-0-event-kbd", "28 30")?;

        let mut scan = DeviceScan::with_query(dir.path(), "kbd", FileQuery);
        scan.probe()?;
        assert!(scan.is_pressed(Key::Enter)?);
        assert!(scan.is_pressed(Key::A)?);
        assert!(!scan.is_pressed(Key::B)?);
        Ok(())
    }

    #[test]
    fn test_filters() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;

        // The mouse has the right codes but the wrong suffix, and the regular
        // file has the right suffix but is neither link nor device.
        device(dir.path(), "platform-i8042-serio-1-event-mouse", "28")?;
        std::fs::write(dir.path().join("stray-kbd"), "28")?;

        let mut scan = DeviceScan::with_query(dir.path(), "kbd", FileQuery);
        assert!(!scan.is_pressed(Key::Enter)?);

        // A dangling link fails its query and is skipped, too.
        symlink(dir.path().join("gone"), dir.path().join("usb-gone-event-kbd"))?;
        assert!(!scan.is_pressed(Key::Enter)?);

        // Hotplugging takes effect on the next query.
        device(dir.path(), "usb-new-event-kbd", "28")?;
        assert!(scan.is_pressed(Key::Enter)?);
        Ok(())
    }

    #[test]
    fn test_no_keyboard() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut scan = DeviceScan::with_query(dir.path().join("missing"), "kbd", FileQuery);
        assert!(matches!(scan.probe(), Err(Error::NoKeyboard)));
        assert!(matches!(scan.is_pressed(Key::Up), Err(Error::NoKeyboard)));

        // An empty directory is fine; nothing is pressed.
        let mut scan = DeviceScan::with_query(dir.path(), "kbd", FileQuery);
        assert!(matches!(scan.is_pressed(Key::Up), Ok(false)));
        Ok(())
    }

    #[test]
    fn test_ioctl_rejects_regular_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("file");
        std::fs::write(&path, "28")?;
        assert!(Ioctl.query(&path).is_err());
        Ok(())
    }
}
