use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Dashboard settings.
///
/// Every field has a default; a TOML file may set any subset and
/// `ARANI_*` environment variables override both.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the recognition backend (default: http://localhost:5000).
    pub backend_url: String,
    /// Event log refresh cadence.
    pub poll_interval_ms: u64,
    /// Time the camera driver needs to let go of the device before the
    /// backend may open it.
    pub release_grace_ms: u64,
    /// Number of countdown ticks shown before capture starts.
    pub countdown_ticks: u32,
    pub countdown_tick_ms: u64,
    /// Progress animation cadence during capture.
    pub progress_tick_ms: u64,
    /// Progress percentage added per animation tick.
    pub progress_step: u8,
    /// Upper bound on a single backend request. Enrollment runs capture and
    /// training server-side, so this is generous.
    pub request_timeout_secs: u64,
    /// Directory CSV reports are written to.
    pub export_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:5000".to_string(),
            poll_interval_ms: 1500,
            release_grace_ms: 1000,
            countdown_ticks: 3,
            countdown_tick_ms: 1000,
            progress_tick_ms: 50,
            progress_step: 2,
            request_timeout_secs: 120,
            export_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Defaults with `ARANI_*` environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Load from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Ok(Self::from_file(path)?.with_overrides(|key| std::env::var(key).ok())),
            None => Ok(Self::from_env()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides from `lookup`. Values that fail to parse keep the
    /// current setting.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("ARANI_BACKEND_URL") {
            self.backend_url = url;
        }
        if let Some(dir) = lookup("ARANI_EXPORT_DIR") {
            self.export_dir = PathBuf::from(dir);
        }
        override_parsed(&lookup, "ARANI_POLL_INTERVAL_MS", &mut self.poll_interval_ms);
        override_parsed(&lookup, "ARANI_RELEASE_GRACE_MS", &mut self.release_grace_ms);
        override_parsed(&lookup, "ARANI_COUNTDOWN_TICKS", &mut self.countdown_ticks);
        override_parsed(&lookup, "ARANI_COUNTDOWN_TICK_MS", &mut self.countdown_tick_ms);
        override_parsed(&lookup, "ARANI_PROGRESS_TICK_MS", &mut self.progress_tick_ms);
        override_parsed(&lookup, "ARANI_PROGRESS_STEP", &mut self.progress_step);
        override_parsed(&lookup, "ARANI_REQUEST_TIMEOUT_SECS", &mut self.request_timeout_secs);
        self
    }

    // Zero periods would spin (or panic in `tokio::time::interval`), so the
    // accessors floor them at 1.

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn release_grace(&self) -> Duration {
        Duration::from_millis(self.release_grace_ms)
    }

    pub fn countdown_tick(&self) -> Duration {
        Duration::from_millis(self.countdown_tick_ms)
    }

    pub fn progress_tick(&self) -> Duration {
        Duration::from_millis(self.progress_tick_ms.max(1))
    }

    pub fn progress_step(&self) -> u8 {
        self.progress_step.max(1)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

fn override_parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    slot: &mut T,
) {
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *slot = value,
        Err(_) => tracing::warn!(key, value = %raw, "ignoring unparseable config override"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(1500));
        assert_eq!(config.release_grace(), Duration::from_secs(1));
        assert_eq!(config.countdown_ticks, 3);
        assert_eq!(config.countdown_tick(), Duration::from_secs(1));
        assert_eq!(config.progress_tick(), Duration::from_millis(50));
        assert_eq!(config.progress_step(), 2);
        assert_eq!(config.backend_url, "http://localhost:5000");
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::default().with_overrides(lookup(&[
            ("ARANI_BACKEND_URL", "http://10.0.0.5:5000"),
            ("ARANI_POLL_INTERVAL_MS", "500"),
            ("ARANI_COUNTDOWN_TICKS", "5"),
            ("ARANI_EXPORT_DIR", "/tmp/reports"),
        ]));
        assert_eq!(config.backend_url, "http://10.0.0.5:5000");
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.countdown_ticks, 5);
        assert_eq!(config.export_dir, PathBuf::from("/tmp/reports"));
    }

    #[test]
    fn test_bad_override_keeps_value() {
        let config = Config::default().with_overrides(lookup(&[
            ("ARANI_PROGRESS_STEP", "lots"),
            ("ARANI_RELEASE_GRACE_MS", "-1"),
        ]));
        assert_eq!(config.progress_step, 2);
        assert_eq!(config.release_grace_ms, 1000);
    }

    #[test]
    fn test_partial_toml_takes_defaults() {
        let config: Config = toml::from_str(
            r#"
            backend_url = "http://bridge:5000"
            progress_step = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.backend_url, "http://bridge:5000");
        assert_eq!(config.progress_step, 5);
        assert_eq!(config.poll_interval_ms, 1500);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arani.toml");
        std::fs::write(&path, "countdown_ticks = 1\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.countdown_ticks, 1);
    }

    #[test]
    fn test_load_without_file_reads_env() {
        assert_eq!(Config::load(None).unwrap(), Config::from_env());
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = Config::from_file(Path::new("/nonexistent/arani.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_zero_periods_are_floored() {
        let config = Config {
            poll_interval_ms: 0,
            progress_tick_ms: 0,
            progress_step: 0,
            ..Config::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
        assert_eq!(config.progress_tick(), Duration::from_millis(1));
        assert_eq!(config.progress_step(), 1);
    }
}
