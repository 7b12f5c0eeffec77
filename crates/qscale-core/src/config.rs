//! Scaler configuration.
//!
//! Loaded from an optional TOML file, then overridden field by field from
//! the command line. Defaults match the long-running production monitor.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use url::Url;

/// Errors raised while loading or validating configuration.
///
/// Any of these is fatal: the daemon exits before entering the loop.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Where the worker count is read from.
///
/// Two deployments of the monitor disagreed here; both remain selectable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerCountSource {
    /// Length of `GET /v2/apps/{app}/tasks`.
    #[default]
    Tasks,
    /// `app.tasksRunning` from `GET /v2/apps/{app}`.
    AppInfo,
}

/// Shape of the idle-candidate set key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleKeyShape {
    /// `{ns}:stt:{lang}:idle`
    #[default]
    Plain,
    /// `{ns}:stt:tok:{lang}:idle`
    Tokenized,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalerConfig {
    pub namespace: String,
    pub language: String,
    /// Marathon app id. Defaults to `tokenizer/{language}`.
    pub app: Option<String>,
    pub redis_url: String,
    pub marathon_url: String,
    pub statsd_addr: String,
    pub metrics_prefix: String,
    #[serde(deserialize_with = "de_duration", serialize_with = "ser_duration")]
    pub poll_interval: Duration,
    pub max_workers: u64,
    #[serde(deserialize_with = "de_duration", serialize_with = "ser_duration")]
    pub idle_window: Duration,
    #[serde(deserialize_with = "de_duration", serialize_with = "ser_duration")]
    pub call_timeout: Duration,
    #[serde(deserialize_with = "de_duration", serialize_with = "ser_duration")]
    pub tick_deadline: Duration,
    pub worker_count_source: WorkerCountSource,
    pub idle_key_shape: IdleKeyShape,
}

impl Default for ScalerConfig {
    fn default() -> Self {
        Self {
            namespace: "kluge".to_string(),
            language: "english".to_string(),
            app: None,
            redis_url: "tcp://redis.marathon.mesos:6379".to_string(),
            marathon_url: "http://10.213.221.89:8080".to_string(),
            statsd_addr: "statsd.stats.marathon.mesos:31990".to_string(),
            metrics_prefix: "redis-q".to_string(),
            poll_interval: Duration::from_secs(10),
            max_workers: 20,
            idle_window: Duration::from_secs(25),
            call_timeout: Duration::from_secs(5),
            tick_deadline: Duration::from_secs(30),
            worker_count_source: WorkerCountSource::Tasks,
            idle_key_shape: IdleKeyShape::Plain,
        }
    }
}

const DEFAULT_REDIS_PORT: u16 = 6379;
const DEFAULT_STATSD_PORT: u16 = 31990;

impl ScalerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ScalerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Marathon app id the worker pool runs under.
    pub fn app_id(&self) -> String {
        match &self.app {
            Some(app) => app.trim_matches('/').to_string(),
            None => format!("tokenizer/{}", self.language),
        }
    }

    /// Consecutive surplus ticks required before scaling down.
    ///
    /// `ceil(idle_window / poll_interval)`, never below one.
    pub fn idle_ticks_threshold(&self) -> u64 {
        let poll = self.poll_interval.as_millis().max(1);
        let ticks = self.idle_window.as_millis().div_ceil(poll);
        u64::try_from(ticks).unwrap_or(u64::MAX).max(1)
    }

    /// Redis connection URL. `tcp://` is accepted as an alias of `redis://`.
    ///
    /// Credentials and the db index are kept; a missing port becomes 6379
    /// and a missing db becomes 0.
    pub fn redis_connection_url(&self) -> Result<String, ConfigError> {
        let raw = self.redis_url.trim();
        let invalid = |why: &str| ConfigError::Invalid(format!("invalid redis_url {raw:?}: {why}"));
        let normalised = match raw.strip_prefix("tcp://") {
            Some(rest) => format!("redis://{rest}"),
            None => raw.to_string(),
        };
        let mut url = Url::parse(&normalised).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "redis" | "rediss") {
            return Err(invalid("scheme must be tcp, redis or rediss"));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid("missing host"));
        }
        if url.port().is_none() {
            url.set_port(Some(DEFAULT_REDIS_PORT))
                .map_err(|()| invalid("cannot set port"))?;
        }
        match url.path().trim_matches('/') {
            "" => url.set_path("/0"),
            db if db.parse::<u32>().is_ok() => {}
            _ => return Err(invalid("path must be a db index")),
        }
        Ok(url.to_string())
    }

    /// Statsd host and port. `host[:port]`, optionally with an `http://` or
    /// `udp://` scheme.
    pub fn statsd_endpoint(&self) -> Result<(String, u16), ConfigError> {
        let raw = self.statsd_addr.trim();
        let invalid = |why: &str| ConfigError::Invalid(format!("invalid statsd_addr {raw:?}: {why}"));
        // Parsed as udp so an explicit :80 is not folded into http's default.
        let normalised = match raw.strip_prefix("http://") {
            Some(rest) => format!("udp://{rest}"),
            None if raw.contains("://") => raw.to_string(),
            None => format!("udp://{raw}"),
        };
        let url = Url::parse(&normalised).map_err(|e| invalid(&e.to_string()))?;
        if url.scheme() != "udp" {
            return Err(invalid("scheme must be udp or http"));
        }
        if !url.path().trim_matches('/').is_empty() {
            return Err(invalid("unexpected path"));
        }
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("missing host"))?;
        Ok((host.to_string(), url.port().unwrap_or(DEFAULT_STATSD_PORT)))
    }

    /// Check every field required to start the loop.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::Invalid("namespace must not be empty".into()));
        }
        if self.language.trim().is_empty() {
            return Err(ConfigError::Invalid("language must not be empty".into()));
        }
        if self.app_id().is_empty() {
            return Err(ConfigError::Invalid("app must not be empty".into()));
        }
        if self.max_workers == 0 {
            return Err(ConfigError::Invalid("max_workers must be at least 1".into()));
        }
        for (name, value) in [
            ("poll_interval", self.poll_interval),
            ("idle_window", self.idle_window),
            ("call_timeout", self.call_timeout),
            ("tick_deadline", self.tick_deadline),
        ] {
            if value.is_zero() {
                return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
            }
        }
        let marathon = self.marathon_url.trim();
        if !(marathon.starts_with("http://") || marathon.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "marathon_url must be an http(s) URL: {marathon}"
            )));
        }
        self.redis_connection_url()?;
        self.statsd_endpoint()?;
        Ok(())
    }
}

/// Parse a duration string like "5s", "500ms", "1m". A bare number is seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        let mins = mins.trim().parse::<u64>().ok()?;
        mins.checked_mul(60).map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DurationValue {
    Secs(u64),
    Text(String),
}

fn de_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    match DurationValue::deserialize(deserializer)? {
        DurationValue::Secs(secs) => Ok(Duration::from_secs(secs)),
        DurationValue::Text(text) => parse_duration(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid duration: {text:?}"))),
    }
}

fn ser_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    if value.subsec_millis() == 0 {
        serializer.serialize_str(&format!("{}s", value.as_secs()))
    } else {
        serializer.serialize_str(&format!("{}ms", value.as_millis()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ScalerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.app_id(), "tokenizer/english");
        assert_eq!(config.idle_ticks_threshold(), 3);
    }

    #[test]
    fn parse_minimal_file() {
        let config: ScalerConfig = toml::from_str(
            r#"
namespace = "prod"
language = "german"
poll_interval = 5
idle_window = "60s"
worker_count_source = "app_info"
idle_key_shape = "tokenized"
"#,
        )
        .unwrap();
        assert_eq!(config.namespace, "prod");
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.idle_window, Duration::from_secs(60));
        assert_eq!(config.idle_ticks_threshold(), 12);
        assert_eq!(config.worker_count_source, WorkerCountSource::AppInfo);
        assert_eq!(config.idle_key_shape, IdleKeyShape::Tokenized);
        assert_eq!(config.app_id(), "tokenizer/german");
        // Unset fields keep their defaults.
        assert_eq!(config.max_workers, 20);
    }

    #[test]
    fn toml_roundtrip_keeps_durations() {
        let mut config = ScalerConfig::default();
        config.call_timeout = Duration::from_millis(1500);
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("call_timeout = \"1500ms\""));
        let back: ScalerConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.call_timeout, Duration::from_millis(1500));
        assert_eq!(back.poll_interval, Duration::from_secs(10));
    }

    #[test]
    fn rejects_bad_duration_string() {
        let result: Result<ScalerConfig, _> = toml::from_str("poll_interval = \"soon\"");
        assert!(result.is_err());
    }

    #[test]
    fn idle_threshold_rounds_up() {
        let mut config = ScalerConfig::default();
        config.poll_interval = Duration::from_secs(10);
        config.idle_window = Duration::from_secs(60);
        assert_eq!(config.idle_ticks_threshold(), 6);

        config.idle_window = Duration::from_secs(61);
        assert_eq!(config.idle_ticks_threshold(), 7);

        config.idle_window = Duration::from_secs(1);
        assert_eq!(config.idle_ticks_threshold(), 1);
    }

    #[test]
    fn explicit_app_id_is_trimmed() {
        let config = ScalerConfig {
            app: Some("/tokenizer/english/".to_string()),
            ..ScalerConfig::default()
        };
        assert_eq!(config.app_id(), "tokenizer/english");
    }

    #[test]
    fn redis_url_normalisation() {
        let mut config = ScalerConfig::default();
        assert_eq!(
            config.redis_connection_url().unwrap(),
            "redis://redis.marathon.mesos:6379/0"
        );

        config.redis_url = "tcp://localhost".to_string();
        assert_eq!(config.redis_connection_url().unwrap(), "redis://localhost:6379/0");

        config.redis_url = "localhost:6379".to_string();
        assert!(config.redis_connection_url().is_err());

        config.redis_url = "redis://".to_string();
        assert!(config.redis_connection_url().is_err());

        config.redis_url = "redis://cache:6379/notadb".to_string();
        assert!(config.redis_connection_url().is_err());
    }

    #[test]
    fn redis_url_keeps_db_index_and_credentials() {
        let mut config = ScalerConfig::default();

        config.redis_url = "redis://cache:6379/2".to_string();
        assert_eq!(config.redis_connection_url().unwrap(), "redis://cache:6379/2");

        config.redis_url = "redis://cache/1".to_string();
        assert_eq!(config.redis_connection_url().unwrap(), "redis://cache:6379/1");

        config.redis_url = "tcp://:hunter2@cache:6380/3".to_string();
        assert_eq!(
            config.redis_connection_url().unwrap(),
            "redis://:hunter2@cache:6380/3"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn statsd_endpoint_forms() {
        let mut config = ScalerConfig::default();
        assert_eq!(
            config.statsd_endpoint().unwrap(),
            ("statsd.stats.marathon.mesos".to_string(), 31990)
        );

        config.statsd_addr = "http://127.0.0.1:8125".to_string();
        assert_eq!(config.statsd_endpoint().unwrap(), ("127.0.0.1".to_string(), 8125));

        config.statsd_addr = "udp://metrics".to_string();
        assert_eq!(config.statsd_endpoint().unwrap(), ("metrics".to_string(), 31990));

        config.statsd_addr = "host:notaport".to_string();
        assert!(config.statsd_endpoint().is_err());

        config.statsd_addr = "http://stats:80".to_string();
        assert_eq!(config.statsd_endpoint().unwrap(), ("stats".to_string(), 80));

        config.statsd_addr = "tcp://stats:8125".to_string();
        assert!(config.statsd_endpoint().is_err());
    }

    #[test]
    fn validate_rejects_zero_values() {
        let config = ScalerConfig {
            max_workers: 0,
            ..ScalerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = ScalerConfig {
            poll_interval: Duration::ZERO,
            ..ScalerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn validate_rejects_non_http_marathon() {
        let config = ScalerConfig {
            marathon_url: "marathon:8080".to_string(),
            ..ScalerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn parse_duration_values() {
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("10"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration("fast"), None);
    }

    #[test]
    fn oversized_minutes_are_rejected_not_wrapped() {
        assert_eq!(parse_duration("999999999999999999m"), None);
        assert_eq!(parse_duration(&format!("{}m", u64::MAX)), None);

        let toml = "poll_interval = \"999999999999999999m\"\n";
        assert!(toml::from_str::<ScalerConfig>(toml).is_err());
    }
}
