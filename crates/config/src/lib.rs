//! Configuration for comicglass.
//!
//! Settings are layered, later layers winning:
//! 1. Built-in defaults ([`Config::default`]).
//! 2. A config file: TOML, YAML or JSON, picked by extension. Either given
//!    explicitly or looked up in the platform config directory.
//! 3. `COMICGLASS_*` environment variables. The first underscore after the
//!    prefix separates section from key, so `COMICGLASS_CACHE_MAX_ENTRIES`
//!    sets `cache.max_entries` and `COMICGLASS_LIBRARY_ROOT` sets
//!    `library.root`.
//! 4. Command-line [`Overrides`].
//!
//! The result is [validated](Config::validate) before anyone gets to see it.

pub mod error;
mod load;

pub use crate::load::{Overrides, default_config_file};
use crate::error::{ErrorKind, Result};
use comicglass_storage::{DEFAULT_EXTENSIONS, Extensions};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::num::NonZeroUsize;
use std::path::PathBuf;

pub const ENV_PREFIX: &str = "COMICGLASS_";
const DEFAULT_MAX_ENTRIES: NonZeroUsize = NonZeroUsize::new(10_000).unwrap();
const DEFAULT_PREWARM_CONCURRENCY: NonZeroUsize = NonZeroUsize::new(16).unwrap();

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub library: LibraryConfig,
    pub cache: CacheConfig,
    pub prewarm: PrewarmConfig,
    pub server: ServerConfig,
    pub log: LogConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Directory everything is served from. Relative paths are resolved
    /// against the working directory at startup.
    pub root: PathBuf,
    /// File extensions that show up in listings (matched by substring).
    pub extensions: Vec<String>,
}
impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("books"),
            extensions: DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of directories kept in the listing cache.
    pub max_entries: NonZeroUsize,
}
impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_entries: DEFAULT_MAX_ENTRIES }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrewarmConfig {
    /// Walk the whole library at startup.
    pub enabled: bool,
    /// Directory listings kept in flight while walking.
    pub concurrency: NonZeroUsize,
}
impl Default for PrewarmConfig {
    fn default() -> Self {
        Self { enabled: true, concurrency: DEFAULT_PREWARM_CONCURRENCY }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    /// Expose the `/.cache` diagnostics endpoint.
    pub inspect: bool,
    pub order: ListingOrder,
}
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 3000)),
            inspect: false,
            order: ListingOrder::default(),
        }
    }
}

/// How entries are ordered on the index page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListingOrder {
    /// Whatever order the directory scan produced.
    #[default]
    Scan,
    /// Directories first, then by name (case-insensitive).
    DirsFirst,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default `tracing` filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}
impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

impl Config {
    /// Checks invariants that serde can't express, and normalizes what it can.
    ///
    /// - The library root is made absolute (it does not have to exist yet).
    /// - The extension list must contain at least one usable entry.
    pub fn validate(mut self) -> Result<Self> {
        self.library.root = std::path::absolute(&self.library.root)
            .map_err(|_| ErrorKind::InvalidRoot(self.library.root.clone()))?;
        if self.extensions().is_empty() {
            exn::bail!(ErrorKind::NoExtensions);
        }
        Ok(self)
    }

    pub fn extensions(&self) -> Extensions {
        Extensions::new(self.library.extensions.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::path::Path;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.library.root, Path::new("books"));
        assert_eq!(config.extensions(), Extensions::default());
        assert_eq!(config.cache.max_entries.get(), 10_000);
        assert!(config.prewarm.enabled);
        assert_eq!(config.prewarm.concurrency.get(), 16);
        assert_eq!(config.server.listen.to_string(), "0.0.0.0:3000");
        assert_eq!(config.server.order, ListingOrder::Scan);
        assert!(!config.server.inspect);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_validate_makes_root_absolute() {
        // Jailed, since other tests move the working directory around.
        figment::Jail::expect_with(|_jail| {
            let config = Config::default().validate().unwrap();
            assert!(config.library.root.is_absolute());
            assert_eq!(config.library.root, std::env::current_dir().unwrap().join("books"));
            Ok(())
        });
    }

    #[rstest]
    #[case(vec![])]
    #[case(vec!["", " ", "."])]
    fn test_validate_rejects_empty_extension_list(#[case] extensions: Vec<&str>) {
        let mut config = Config::default();
        config.library.extensions = extensions.into_iter().map(String::from).collect();
        let err = config.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::NoExtensions));
    }

    #[test]
    fn test_validate_rejects_empty_root() {
        let mut config = Config::default();
        config.library.root = PathBuf::new();
        let err = config.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidRoot(_)));
    }
}
