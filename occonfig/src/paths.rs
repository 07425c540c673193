//! Locating the global and project configuration files.

use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::{Context, anyhow};
use log::debug;

use crate::{catalog::TtlCache, data::scope::ConfigScope, writer::PRODUCT_TAG};

pub const CONFIG_FILE_STEM: &str = "opencode";

const CANDIDATES: [&str; 2] = ["opencode.jsonc", "opencode.json"];

/// Which scope the user asked for on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeRequest {
    Global,
    Project,
    /// Project when a project file exists, otherwise global.
    #[default]
    Auto,
}

/// Directories the configuration files are resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocations {
    pub home: PathBuf,
    pub cwd: PathBuf,
    pub cache_dir: PathBuf,
}

impl ConfigLocations {
    pub fn new(home: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let cache_dir = home.join(".cache").join(PRODUCT_TAG);
        Self {
            home,
            cwd: cwd.into(),
            cache_dir,
        }
    }

    /// Resolve from `HOME` (or `USERPROFILE`), the working directory and
    /// `XDG_CACHE_HOME`.
    pub fn from_env() -> anyhow::Result<Self> {
        let home = env::var_os("HOME")
            .or_else(|| env::var_os("USERPROFILE"))
            .filter(|h| !h.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("cannot determine the home directory"))?;
        let cwd = env::current_dir().context("cannot read the working directory")?;

        let mut locations = Self::new(home, cwd);
        if let Some(xdg) = env::var_os("XDG_CACHE_HOME").filter(|x| !x.is_empty()) {
            locations.cache_dir = PathBuf::from(xdg).join(PRODUCT_TAG);
        }
        Ok(locations)
    }

    pub fn global_dir(&self) -> PathBuf {
        self.home.join(".config").join(CONFIG_FILE_STEM)
    }

    pub fn cache(&self) -> TtlCache {
        TtlCache::new(&self.cache_dir)
    }

    /// Existing `opencode.jsonc`, else existing `opencode.json`, else the
    /// `.jsonc` path to create.
    pub fn resolve_global_path(&self) -> PathBuf {
        let dir = self.global_dir();
        existing_candidate(&dir).unwrap_or_else(|| dir.join(CANDIDATES[0]))
    }

    /// Nearest config file at or above the working directory. The walk stops
    /// after the first directory containing `.git`.
    pub fn resolve_project_path(&self) -> Option<PathBuf> {
        for dir in self.cwd.ancestors() {
            if let Some(found) = existing_candidate(dir) {
                return Some(found);
            }
            if dir.join(".git").exists() {
                break;
            }
        }
        None
    }

    /// Project file path, defaulting to one in the working directory.
    pub fn project_path(&self) -> PathBuf {
        self.resolve_project_path()
            .unwrap_or_else(|| self.cwd.join(CANDIDATES[0]))
    }

    pub fn resolve(&self, request: ScopeRequest) -> (ConfigScope, PathBuf) {
        let resolved = match request {
            ScopeRequest::Global => (ConfigScope::Global, self.resolve_global_path()),
            ScopeRequest::Project => (ConfigScope::Project, self.project_path()),
            ScopeRequest::Auto => match self.resolve_project_path() {
                Some(path) => (ConfigScope::Project, path),
                None => (ConfigScope::Global, self.resolve_global_path()),
            },
        };
        debug!("{request:?} scope resolved to {} ({})", resolved.0, resolved.1.display());
        resolved
    }
}

fn existing_candidate(dir: &Path) -> Option<PathBuf> {
    CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}
