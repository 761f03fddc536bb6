use crate::fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Sub-directory of the user cache directory holding cache files
pub const CACHE_SUBDIR: &str = "treecache/eval-cache-v2";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding one `<fingerprint>.sqlite` file per input
    pub cache_dir: Option<PathBuf>,
    /// When false, the soft constructor hands out a no-op cache
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            enabled: true,
        }
    }
}

impl CacheConfig {
    /// Config rooted at an explicit directory
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: Some(dir.into()),
            enabled: true,
        }
    }

    pub fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(default_cache_dir)
    }

    pub fn cache_file(&self, fingerprint: &Fingerprint) -> PathBuf {
        cache_file_path(&self.resolved_cache_dir(), fingerprint)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("treecache.toml")
}

/// `$XDG_CACHE_HOME`, else `$HOME/.cache`, else `./.cache`, plus `CACHE_SUBDIR`
pub fn default_cache_dir() -> PathBuf {
    let base = std::env::var_os("XDG_CACHE_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")))
        .unwrap_or_else(|| PathBuf::from(".cache"));
    base.join(CACHE_SUBDIR)
}

pub fn cache_file_path(dir: &Path, fingerprint: &Fingerprint) -> PathBuf {
    dir.join(format!("{}.sqlite", fingerprint.to_hex()))
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<CacheConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: CacheConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn ensure_cache_dir(dir: &Path) -> std::io::Result<()> {
    if !dir.as_os_str().is_empty() && !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}
