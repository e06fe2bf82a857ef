//! Resolve [`CacheSettings`] from flags, environment, config file and defaults.
//!
//! Precedence, highest first:
//!
//! 1. command-line overrides (`--cache-root`, `--chain`, `--bypass`)
//! 2. `CHAIN_CACHE_*` environment variables
//! 3. `chain-cache.toml` in the config directory
//! 4. built-in defaults
//!
//! The config directory is `$XDG_CONFIG_HOME/chain-cache` when that variable
//! is set, otherwise `<data dir>/chain-cache`. The cache root defaults to
//! `<config dir>/cache`.

use anyhow::{anyhow, bail, Context, Result};
use chain_cache_store::settings::{DEFAULT_CHAIN, DEFAULT_NAME_TTL, DEFAULT_PRICE_TTL};
use chain_cache_store::CacheSettings;
use chain_cache_types::env_utils::{env_string, env_var, is_truthy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const APP_DIR_NAME: &str = "chain-cache";
pub const CONFIG_FILE_NAME: &str = "chain-cache.toml";

pub const ENV_ROOT: &str = "CHAIN_CACHE_ROOT";
pub const ENV_CHAIN: &str = "CHAIN_CACHE_CHAIN";
pub const ENV_PRICE_TTL: &str = "CHAIN_CACHE_PRICE_TTL";
pub const ENV_NAME_TTL: &str = "CHAIN_CACHE_NAME_TTL";
pub const ENV_LOCK_TIMEOUT_MS: &str = "CHAIN_CACHE_LOCK_TIMEOUT_MS";
pub const ENV_BYPASS: &str = "CHAIN_CACHE_BYPASS";

/// Contents of `chain-cache.toml`.
///
/// ```toml
/// [settings]
/// cache_path = "~/chain-data/cache"
/// default_chain = "sepolia"
///
/// [ttl]
/// price = 600
/// name = 86400
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub settings: FileSettings,
    pub ttl: FileTtl,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileSettings {
    pub cache_path: Option<String>,
    pub default_chain: Option<String>,
}

/// TTLs in seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileTtl {
    pub price: Option<u64>,
    pub name: Option<u64>,
}

impl ConfigFile {
    /// Load `path`. A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("read config file {}", path.display()))
            }
        };
        Self::parse(&text).with_context(|| format!("parse config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// Knobs read from `CHAIN_CACHE_*`. Blank or unparsable values count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvKnobs {
    pub cache_root: Option<String>,
    pub chain: Option<String>,
    pub price_ttl: Option<u64>,
    pub name_ttl: Option<u64>,
    pub lock_timeout_ms: Option<u64>,
    pub bypass: Option<bool>,
}

impl EnvKnobs {
    pub fn from_env() -> Self {
        Self {
            cache_root: env_string(ENV_ROOT),
            chain: env_string(ENV_CHAIN),
            price_ttl: env_var(ENV_PRICE_TTL),
            name_ttl: env_var(ENV_NAME_TTL),
            lock_timeout_ms: env_var(ENV_LOCK_TIMEOUT_MS),
            bypass: env_string(ENV_BYPASS).map(|v| is_truthy(&v)),
        }
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub cache_root: Option<PathBuf>,
    pub chain: Option<String>,
    /// Only ever turns bypass on.
    pub bypass: bool,
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainCacheConfig {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub settings: CacheSettings,
}

impl ChainCacheConfig {
    /// Resolve from the process environment and the config file on disk.
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let config_dir = config_dir()?;
        let file = ConfigFile::load(&config_dir.join(CONFIG_FILE_NAME))?;
        let config = Self::resolve(
            &config_dir,
            &file,
            overrides,
            &EnvKnobs::from_env(),
            dirs::home_dir().as_deref(),
        );
        debug!(
            cache_root = %config.settings.cache_root.display(),
            chain = %config.settings.chain,
            bypass = config.settings.bypass,
            "resolved cache configuration"
        );
        Ok(config)
    }

    /// Apply precedence without touching the environment or the filesystem.
    pub fn resolve(
        config_dir: &Path,
        file: &ConfigFile,
        overrides: &Overrides,
        env: &EnvKnobs,
        home: Option<&Path>,
    ) -> Self {
        let cache_root = overrides
            .cache_root
            .as_ref()
            .map(|p| expand_home(&p.to_string_lossy(), home))
            .or_else(|| env.cache_root.as_deref().map(|p| expand_home(p, home)))
            .or_else(|| {
                file.settings
                    .cache_path
                    .as_deref()
                    .filter(|p| !p.trim().is_empty())
                    .map(|p| expand_home(p.trim(), home))
            })
            .unwrap_or_else(|| config_dir.join("cache"));

        let chain = overrides
            .chain
            .clone()
            .or_else(|| env.chain.clone())
            .or_else(|| {
                file.settings
                    .default_chain
                    .as_deref()
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| DEFAULT_CHAIN.to_string());

        let mut settings = CacheSettings::new(cache_root, chain);
        settings.price_ttl = env.price_ttl.or(file.ttl.price).unwrap_or(DEFAULT_PRICE_TTL);
        settings.name_ttl = env.name_ttl.or(file.ttl.name).unwrap_or(DEFAULT_NAME_TTL);
        if let Some(ms) = env.lock_timeout_ms {
            settings.lock_timeout = Duration::from_millis(ms);
        }
        settings.bypass = overrides.bypass || env.bypass.unwrap_or(false);

        Self {
            config_dir: config_dir.to_path_buf(),
            config_file: config_dir.join(CONFIG_FILE_NAME),
            settings,
        }
    }
}

/// Directory holding `chain-cache.toml` and, by default, the cache itself.
pub fn config_dir() -> Result<PathBuf> {
    resolve_config_dir(env_string("XDG_CONFIG_HOME").as_deref(), dirs::data_dir())
}

fn resolve_config_dir(xdg_config_home: Option<&str>, data_dir: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(xdg) = xdg_config_home {
        let xdg = Path::new(xdg);
        if !xdg.is_absolute() {
            bail!("XDG_CONFIG_HOME must be an absolute path: {}", xdg.display());
        }
        if !xdg.is_dir() {
            bail!("XDG_CONFIG_HOME does not exist: {}", xdg.display());
        }
        return Ok(xdg.join(APP_DIR_NAME));
    }
    data_dir
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| anyhow!("cannot determine a data directory; set {ENV_ROOT}"))
}

/// Expand a leading `~` or `$HOME` to `home`. Other paths are returned as-is.
pub fn expand_home(path: &str, home: Option<&Path>) -> PathBuf {
    let Some(home) = home else {
        return PathBuf::from(path);
    };
    for prefix in ["~", "$HOME"] {
        if path == prefix {
            return home.to_path_buf();
        }
        if let Some(rest) = path.strip_prefix(prefix) {
            if let Some(rest) = rest.strip_prefix('/') {
                return home.join(rest);
            }
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn home() -> Option<&'static Path> {
        Some(Path::new("/home/alice"))
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("~", home()), PathBuf::from("/home/alice"));
        assert_eq!(
            expand_home("~/cache", home()),
            PathBuf::from("/home/alice/cache")
        );
        assert_eq!(
            expand_home("$HOME/data/cache", home()),
            PathBuf::from("/home/alice/data/cache")
        );
        assert_eq!(expand_home("~bob/cache", home()), PathBuf::from("~bob/cache"));
        assert_eq!(expand_home("/var/cache", home()), PathBuf::from("/var/cache"));
        assert_eq!(expand_home("~/cache", None), PathBuf::from("~/cache"));
    }

    #[test]
    fn test_defaults() {
        let config = ChainCacheConfig::resolve(
            Path::new("/cfg/chain-cache"),
            &ConfigFile::default(),
            &Overrides::default(),
            &EnvKnobs::default(),
            home(),
        );
        assert_eq!(config.settings.cache_root, PathBuf::from("/cfg/chain-cache/cache"));
        assert_eq!(config.settings.chain, "mainnet");
        assert_eq!(config.settings.price_ttl, 300);
        assert_eq!(config.settings.name_ttl, 0);
        assert!(!config.settings.bypass);
        assert_eq!(
            config.config_file,
            PathBuf::from("/cfg/chain-cache/chain-cache.toml")
        );
    }

    #[test]
    fn test_precedence() -> Result<()> {
        let file = ConfigFile::parse(
            r#"
            [settings]
            cache_path = "~/file-cache"
            default_chain = "gnosis"

            [ttl]
            price = 600
            name = 86400
            "#,
        )?;
        let cfg_dir = Path::new("/cfg");

        let from_file = ChainCacheConfig::resolve(
            cfg_dir,
            &file,
            &Overrides::default(),
            &EnvKnobs::default(),
            home(),
        );
        assert_eq!(
            from_file.settings.cache_root,
            PathBuf::from("/home/alice/file-cache")
        );
        assert_eq!(from_file.settings.chain, "gnosis");
        assert_eq!(from_file.settings.price_ttl, 600);
        assert_eq!(from_file.settings.name_ttl, 86400);

        let env = EnvKnobs {
            cache_root: Some("/env/cache".into()),
            chain: Some("sepolia".into()),
            price_ttl: Some(60),
            lock_timeout_ms: Some(250),
            bypass: Some(true),
            ..EnvKnobs::default()
        };
        let from_env =
            ChainCacheConfig::resolve(cfg_dir, &file, &Overrides::default(), &env, home());
        assert_eq!(from_env.settings.cache_root, PathBuf::from("/env/cache"));
        assert_eq!(from_env.settings.chain, "sepolia");
        assert_eq!(from_env.settings.price_ttl, 60);
        assert_eq!(from_env.settings.name_ttl, 86400);
        assert_eq!(from_env.settings.lock_timeout, Duration::from_millis(250));
        assert!(from_env.settings.bypass);

        let overrides = Overrides {
            cache_root: Some(PathBuf::from("/cli/cache")),
            chain: Some("mainnet".into()),
            bypass: false,
        };
        let from_cli = ChainCacheConfig::resolve(cfg_dir, &file, &overrides, &env, home());
        assert_eq!(from_cli.settings.cache_root, PathBuf::from("/cli/cache"));
        assert_eq!(from_cli.settings.chain, "mainnet");
        // A false flag does not undo an environment opt-in.
        assert!(from_cli.settings.bypass);
        Ok(())
    }

    #[test]
    fn test_load_missing_file_is_default() -> Result<()> {
        let tmp = TempDir::new()?;
        let file = ConfigFile::load(&tmp.path().join(CONFIG_FILE_NAME))?;
        assert_eq!(file, ConfigFile::default());
        Ok(())
    }

    #[test]
    fn test_load_malformed_file_fails() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[settings]\ncache_path = 42\n")?;
        let err = ConfigFile::load(&path).unwrap_err();
        assert!(err.to_string().contains("parse config file"));

        std::fs::write(&path, "[settings]\ncache_dir = \"/x\"\n")?;
        assert!(ConfigFile::load(&path).is_err());
        Ok(())
    }

    #[test]
    fn test_config_dir_rules() -> Result<()> {
        let tmp = TempDir::new()?;
        let xdg = tmp.path().to_string_lossy().into_owned();
        assert_eq!(
            resolve_config_dir(Some(&xdg), None)?,
            tmp.path().join(APP_DIR_NAME)
        );
        assert!(resolve_config_dir(Some("relative/dir"), None).is_err());

        let missing = tmp.path().join("missing").to_string_lossy().into_owned();
        assert!(resolve_config_dir(Some(&missing), None).is_err());

        assert_eq!(
            resolve_config_dir(None, Some(PathBuf::from("/data")))?,
            PathBuf::from("/data/chain-cache")
        );
        assert!(resolve_config_dir(None, None).is_err());
        Ok(())
    }
}
