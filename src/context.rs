//! Per-invocation context, built once at the program boundary.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::config::Config;
use crate::session::FileSessionStore;

/// Environment variable that overrides project detection.
pub const PROJECT_ENV: &str = "KAVACH_PROJECT";
/// Project name used outside a repository.
pub const GLOBAL_PROJECT: &str = "global";

/// Everything a command needs to know about where and when it runs.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
    pub work_dir: PathBuf,
    pub project: String,
    /// Local date, `YYYY-MM-DD`.
    pub today: String,
    pub task: Option<String>,
}

impl Context {
    /// Build the context for the current process: config from `--config`
    /// or discovery, cwd, project detection and today's date.
    pub fn init(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let work_dir = std::env::current_dir().context("cannot determine working directory")?;
        let config = Config::load(config_path, &work_dir)?;
        let env_project = std::env::var(PROJECT_ENV).ok();
        let project = detect_project(env_project.as_deref(), &work_dir);
        let today = chrono::Local::now().format("%Y-%m-%d").to_string();

        tracing::debug!(project = %project, today = %today, dir = %work_dir.display(), "context ready");

        Ok(Self {
            config,
            work_dir,
            project,
            today,
            task: None,
        })
    }

    pub fn with_task(mut self, task: Option<String>) -> Self {
        self.task = task;
        self
    }

    /// Session store at the configured path, or the platform default.
    pub fn session_store(&self) -> anyhow::Result<FileSessionStore> {
        let path = match &self.config.session_path {
            Some(path) => path.clone(),
            None => FileSessionStore::default_path()
                .context("no data directory available for the session file")?,
        };
        Ok(FileSessionStore::new(path, &self.project, &self.work_dir, &self.today))
    }
}

/// `KAVACH_PROJECT` when set and non-empty, else the directory name of a
/// git checkout, else [`GLOBAL_PROJECT`].
pub fn detect_project(env_project: Option<&str>, work_dir: &Path) -> String {
    if let Some(name) = env_project.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    if work_dir.join(".git").exists() {
        if let Some(name) = work_dir.file_name() {
            return name.to_string_lossy().into_owned();
        }
    }
    GLOBAL_PROJECT.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_env_override_wins() {
        let temp = TempDir::new().unwrap();
        assert_eq!(detect_project(Some("alpha"), temp.path()), "alpha");
        assert_eq!(detect_project(Some("  "), temp.path()), "global");
    }

    #[test]
    fn test_git_checkout_uses_dir_name() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("shop-api");
        std::fs::create_dir_all(repo.join(".git")).unwrap();
        assert_eq!(detect_project(None, &repo), "shop-api");
    }

    #[test]
    fn test_plain_dir_is_global() {
        let temp = TempDir::new().unwrap();
        assert_eq!(detect_project(None, temp.path()), GLOBAL_PROJECT);
    }
}
