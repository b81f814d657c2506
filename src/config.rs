use crate::constants::REQUEST_TIMEOUT_SECS;
use crate::controller::KeyBindings;

use clap::Parser;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

#[derive(Parser, Debug, Default)]
#[command(
    name = "rynx-inline",
    version,
    about = "Edit blog posts and pages in place, from the terminal"
)]
pub struct Cli {
    /// Post or page URL to open
    pub url: Option<String>,

    /// Config file (defaults to the platform config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Session cookie sent with every request, e.g. "sessionid=abc"
    #[arg(long)]
    pub cookie: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Directory for log files
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("no page URL given (pass one on the command line or set start_url)")]
    NoUrl,
    #[error("invalid page URL '{0}': {1}")]
    BadUrl(String, url::ParseError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub start_url: Option<String>,
    pub session_cookie: Option<String>,
    pub request_timeout_secs: u64,
    pub keys: KeyBindings,
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            start_url: None,
            session_cookie: None,
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            keys: KeyBindings::default(),
            log_dir: None,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "rynx-inline")
}

pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.json"))
}

pub fn default_log_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_local_dir().join("logs"))
}

impl Config {
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads the file named on the command line (or the default one) and
    /// lets the command-line flags win.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match cli.config.clone().or_else(default_config_path) {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };
        Ok(file.merge_cli(cli))
    }

    pub fn merge_cli(mut self, cli: &Cli) -> Self {
        if let Some(url) = &cli.url {
            self.start_url = Some(url.clone());
        }
        if let Some(cookie) = &cli.cookie {
            self.session_cookie = Some(cookie.clone());
        }
        if let Some(timeout) = cli.timeout {
            self.request_timeout_secs = timeout;
        }
        if let Some(dir) = &cli.log_dir {
            self.log_dir = Some(dir.clone());
        }
        self
    }

    pub fn page_url(&self) -> Result<Url, ConfigError> {
        let raw = self.start_url.as_deref().ok_or(ConfigError::NoUrl)?;
        Url::parse(raw).map_err(|e| ConfigError::BadUrl(raw.to_string(), e))
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.log_dir.clone().or_else(default_log_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyCode;
    use std::io::Write;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.request_timeout_secs, REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"start_url": "http://localhost:8000/blog/post/hi/", "keys": {{"cancel": "ctrl+q"}}}}"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.keys.cancel.code, KeyCode::Char('q'));
        assert_eq!(config.keys.save, KeyBindings::default().save);
        assert_eq!(config.page_url().unwrap().path(), "/blog/post/hi/");
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn cli_flags_override_file_values() {
        let config = Config {
            start_url: Some("http://a/".into()),
            request_timeout_secs: 5,
            ..Config::default()
        };
        let cli = Cli {
            url: Some("http://b/blog/page/about/".into()),
            cookie: Some("sessionid=xyz".into()),
            ..Cli::default()
        };
        let merged = config.merge_cli(&cli);
        assert_eq!(merged.start_url.as_deref(), Some("http://b/blog/page/about/"));
        assert_eq!(merged.session_cookie.as_deref(), Some("sessionid=xyz"));
        assert_eq!(merged.request_timeout_secs, 5);
    }

    #[test]
    fn page_url_is_required() {
        assert!(matches!(Config::default().page_url(), Err(ConfigError::NoUrl)));
        let bad = Config {
            start_url: Some("not a url".into()),
            ..Config::default()
        };
        assert!(matches!(bad.page_url(), Err(ConfigError::BadUrl(..))));
    }
}
