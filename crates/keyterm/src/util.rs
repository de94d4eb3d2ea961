use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// A source of configuration overrides.
///
/// Implementations only look up raw values. The provided methods interpret
/// them, treating empty values like missing ones.
pub(crate) trait Overrides {
    /// Look up the raw value of the named variable.
    fn lookup(&self, name: &str) -> Option<OsString>;

    /// Look up a path.
    fn path(&self, name: &str) -> Option<PathBuf> {
        self.lookup(name)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    }

    /// Look up a duration given in milliseconds.
    ///
    /// Malformed values are logged and ignored.
    fn millis(&self, name: &str) -> Option<Duration> {
        let value = self.lookup(name)?;
        let millis = value.to_str().and_then(|s| s.trim().parse::<u64>().ok());
        if millis.is_none() {
            tracing::warn!(variable = name, ?value, "ignoring malformed milliseconds");
        }
        millis.map(Duration::from_millis)
    }

    /// Determine whether the named flag is set, i.e., has a non-empty value.
    fn flag(&self, name: &str) -> bool {
        self.lookup(name).is_some_and(|value| !value.is_empty())
    }
}

/// The process environment.
#[derive(Debug, Default)]
pub(crate) struct ProcessEnv;

impl Overrides for ProcessEnv {
    fn lookup(&self, name: &str) -> Option<OsString> {
        std::env::var_os(name)
    }
}

#[cfg(test)]
mod test {
    use super::Overrides;
    use std::ffi::OsString;
    use std::path::Path;
    use std::time::Duration;

    /// A fixed list of variable bindings.
    #[derive(Debug, Default)]
    pub(crate) struct FakeEnv(Vec<(&'static str, &'static str)>);

    impl FakeEnv {
        pub(crate) fn with(mut self, name: &'static str, value: &'static str) -> Self {
            self.0.push((name, value));
            self
        }
    }

    impl Overrides for FakeEnv {
        fn lookup(&self, name: &str) -> Option<OsString> {
            self.0
                .iter()
                .rev()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| OsString::from(v))
        }
    }

    #[test]
    fn test_interpretation() {
        let env = FakeEnv::default()
            .with("EMPTY", "")
            .with("DIR", "/dev/input")
            .with("FAST", " 7 ")
            .with("SLOW", "later")
            .with("DIR", "/tmp");

        assert!(!env.flag("EMPTY"));
        assert!(env.flag("SLOW"));
        assert!(!env.flag("MISSING"));
        assert_eq!(env.path("EMPTY"), None);
        assert_eq!(env.path("DIR").as_deref(), Some(Path::new("/tmp")));
        assert_eq!(env.millis("FAST"), Some(Duration::from_millis(7)));
        assert_eq!(env.millis("SLOW"), None);
        assert_eq!(env.millis("MISSING"), None);
    }
}

#[cfg(test)]
pub(crate) use test::FakeEnv;
