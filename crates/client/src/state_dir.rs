//! Platform-specific state directory management

use directories::ProjectDirs;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Locates config, data and log files for the client
pub struct StateDir {
    project_dirs: Option<ProjectDirs>,
    /// Override directory for testing or custom installations
    override_dir: Option<PathBuf>,
}

impl StateDir {
    pub fn new() -> Self {
        let project_dirs = ProjectDirs::from("edu", "CampusConnect", "campus");
        if project_dirs.is_none() {
            warn!("Failed to determine platform-specific directories, will use fallback");
        }
        Self {
            project_dirs,
            override_dir: None,
        }
    }

    /// Create a new StateDir rooted at an explicit directory
    pub fn with_override(path: impl Into<PathBuf>) -> Self {
        Self {
            project_dirs: None,
            override_dir: Some(path.into()),
        }
    }

    pub fn config_dir(&self) -> PathBuf {
        if let Some(override_dir) = &self.override_dir {
            return override_dir.join("config");
        }

        if let Some(project_dirs) = &self.project_dirs {
            project_dirs.config_dir().to_path_buf()
        } else {
            PathBuf::from("./config")
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        if let Some(override_dir) = &self.override_dir {
            return override_dir.join("data");
        }

        if let Some(project_dirs) = &self.project_dirs {
            project_dirs.data_dir().to_path_buf()
        } else {
            PathBuf::from("./data")
        }
    }

    /// Config file consulted when no explicit path is given
    pub fn config_path(&self) -> PathBuf {
        self.config_dir().join("campus.toml")
    }

    /// Default location of the persisted credential pair
    pub fn tokens_path(&self) -> PathBuf {
        self.data_dir().join("tokens.json")
    }

    pub fn log_path(&self, component: &str) -> PathBuf {
        self.data_dir().join(format!("{component}.log"))
    }

    /// Create the config and data directories
    pub async fn create_directories(&self) -> std::io::Result<()> {
        for dir in [self.config_dir(), self.data_dir()] {
            tokio::fs::create_dir_all(&dir).await?;
            debug!("Ensured directory exists: {}", dir.display());
        }
        Ok(())
    }
}

impl Default for StateDir {
    fn default() -> Self {
        Self::new()
    }
}
