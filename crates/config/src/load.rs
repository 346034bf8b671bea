use crate::error::{ErrorKind, Result};
use crate::{Config, ENV_PREFIX};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Values given on the command line; anything set here beats every other
/// source.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub root: Option<PathBuf>,
    pub listen: Option<SocketAddr>,
    pub max_entries: Option<NonZeroUsize>,
    pub prewarm: Option<bool>,
    pub json_logs: Option<bool>,
}
impl Overrides {
    fn apply(&self, mut figment: Figment) -> Figment {
        if let Some(root) = &self.root {
            figment = figment.merge(Serialized::default("library.root", root));
        }
        if let Some(listen) = &self.listen {
            figment = figment.merge(Serialized::default("server.listen", listen));
        }
        if let Some(max_entries) = &self.max_entries {
            figment = figment.merge(Serialized::default("cache.max_entries", max_entries));
        }
        if let Some(prewarm) = &self.prewarm {
            figment = figment.merge(Serialized::default("prewarm.enabled", prewarm));
        }
        if let Some(json) = &self.json_logs {
            figment = figment.merge(Serialized::default("log.json", json));
        }
        figment
    }
}

/// Where the config file lives when none is given explicitly, e.g.
/// `~/.config/comicglass/config.toml` on Linux.
pub fn default_config_file() -> Option<PathBuf> {
    ProjectDirs::from("", "", "comicglass").map(|dirs| dirs.config_dir().join("config.toml"))
}

impl Config {
    /// Loads, merges and validates configuration from every source.
    ///
    /// An explicitly given `file` must exist. Without one, the
    /// [default location](default_config_file) is used if there is a file
    /// there, and silently skipped otherwise.
    #[instrument(skip(overrides))]
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let file = match file {
            Some(file) if !file.is_file() => exn::bail!(ErrorKind::MissingFile(file.to_path_buf())),
            Some(file) => Some(file.to_path_buf()),
            None => default_config_file().filter(|file| file.is_file()),
        };
        if let Some(file) = &file {
            tracing::debug!(file = %file.display(), "Reading config file");
        }
        let config: Config = Self::figment(file.as_deref(), overrides).extract().or_raise(|| ErrorKind::Invalid)?;
        config.validate()
    }

    /// The merged (but not yet extracted) configuration sources.
    pub fn figment(file: Option<&Path>, overrides: &Overrides) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            figment = match file.extension().and_then(|ext| ext.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file(file)),
                Some("json") => figment.merge(Json::file(file)),
                _ => figment.merge(Toml::file(file)),
            };
        }
        // Section names never contain underscores, keys might:
        // COMICGLASS_CACHE_MAX_ENTRIES => cache.max_entries
        let env = Env::prefixed(ENV_PREFIX).map(|key| key.as_str().replacen('_', ".", 1).into());
        overrides.apply(figment.merge(env))
    }
}
