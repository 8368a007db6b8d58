//! Server configuration.

use std::io;
use std::path::{self, PathBuf};

use trainrun_core::JobPaths;
use trainrun_runner::JobLauncher;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server bind address.
    pub bind_addr: String,

    /// Project root; models, output and public dirs live under it.
    pub base_dir: PathBuf,

    /// Interpreter used to run the training script.
    pub python: String,

    /// Training script, relative to `base_dir` unless absolute.
    pub script: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            base_dir: PathBuf::from("."),
            python: "python3".to_string(),
            script: PathBuf::from("src/python/train_model.py"),
        }
    }
}

impl Config {
    /// Directories handed to jobs and searched for artifacts.
    pub fn paths(&self) -> JobPaths {
        JobPaths::under(&self.base_dir)
    }

    pub fn script_path(&self) -> PathBuf {
        self.base_dir.join(&self.script)
    }

    /// Make `base_dir` absolute against the current directory.
    ///
    /// Jobs echo artifact paths back, and those only map to public URLs
    /// when they start with the same root the server strips.
    pub fn with_absolute_base_dir(mut self) -> io::Result<Self> {
        self.base_dir = path::absolute(&self.base_dir)?;
        Ok(self)
    }

    /// Launcher for training jobs.
    pub fn launcher(&self) -> JobLauncher {
        JobLauncher::new(&self.python)
            .with_arg(self.script_path().to_string_lossy())
            .with_paths(self.paths())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = Config {
            base_dir: PathBuf::from("/srv/app"),
            ..Config::default()
        };

        assert_eq!(
            config.script_path(),
            PathBuf::from("/srv/app/src/python/train_model.py")
        );
        assert_eq!(config.paths().public_dir, PathBuf::from("/srv/app/public"));

        let launcher = config.launcher();
        assert_eq!(launcher.program(), "python3");
        assert_eq!(launcher.paths(), &config.paths());
    }

    #[test]
    fn test_relative_base_dir_made_absolute() {
        let config = Config::default().with_absolute_base_dir().unwrap();
        let cwd = std::env::current_dir().unwrap();

        assert!(config.base_dir.is_absolute());
        assert_eq!(config.paths().public_dir, cwd.join("public"));
        assert_eq!(config.script_path(), cwd.join("src/python/train_model.py"));

        let pinned = Config {
            base_dir: PathBuf::from("/srv/app"),
            ..Config::default()
        }
        .with_absolute_base_dir()
        .unwrap();
        assert_eq!(pinned.base_dir, PathBuf::from("/srv/app"));
    }

    #[test]
    fn test_absolute_script_kept() {
        let config = Config {
            script: PathBuf::from("/opt/jobs/train.py"),
            ..Config::default()
        };
        assert_eq!(config.script_path(), PathBuf::from("/opt/jobs/train.py"));
    }
}
