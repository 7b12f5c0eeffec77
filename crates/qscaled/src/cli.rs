//! Command-line surface.
//!
//! Every config field can be set here; anything given on the command line
//! wins over the TOML file, which wins over the built-in defaults.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use qscale_core::{parse_duration, ConfigError, IdleKeyShape, ScalerConfig, WorkerCountSource};

#[derive(Debug, Parser)]
#[command(
    name = "qscaled",
    about = "Scale a Marathon worker pool from Redis queue depth",
    version
)]
pub struct Cli {
    /// TOML config file. Flags below override its values.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Queue namespace.
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Queue language.
    #[arg(short, long = "lang")]
    pub language: Option<String>,

    /// Marathon app id (default: tokenizer/{lang}).
    #[arg(long)]
    pub app: Option<String>,

    /// Redis server, e.g. tcp://redis.marathon.mesos:6379.
    #[arg(short, long = "redis-server")]
    pub redis_server: Option<String>,

    /// Marathon base URL.
    #[arg(short, long = "marathon-server")]
    pub marathon_server: Option<String>,

    /// Statsd host[:port].
    #[arg(short, long = "statsd-server")]
    pub statsd_server: Option<String>,

    /// Statsd metric prefix.
    #[arg(long)]
    pub metrics_prefix: Option<String>,

    /// Poll interval ("10", "10s", "500ms").
    #[arg(short, long = "poll", value_parser = duration_arg)]
    pub poll_interval: Option<Duration>,

    /// Upper bound on scale-up targets.
    #[arg(short = 'w', long)]
    pub max_workers: Option<u64>,

    /// How long a surplus must persist before scaling down.
    #[arg(long, value_parser = duration_arg)]
    pub idle_window: Option<Duration>,

    /// Bound on each store/orchestrator call.
    #[arg(long, value_parser = duration_arg)]
    pub call_timeout: Option<Duration>,

    /// Bound on a whole tick.
    #[arg(long, value_parser = duration_arg)]
    pub tick_deadline: Option<Duration>,

    /// Worker count source: tasks or app_info.
    #[arg(long, value_parser = worker_count_source_arg)]
    pub worker_count_source: Option<WorkerCountSource>,

    /// Idle set key shape: plain or tokenized.
    #[arg(long, value_parser = idle_key_shape_arg)]
    pub idle_key_shape: Option<IdleKeyShape>,

    /// Emit logs as JSON.
    #[arg(long)]
    pub log_json: bool,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    /// Build the effective configuration: defaults, then file, then flags.
    pub fn load_config(&self) -> Result<ScalerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ScalerConfig::from_file(path)?,
            None => ScalerConfig::default(),
        };
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut ScalerConfig) {
        if let Some(v) = &self.namespace {
            config.namespace = v.clone();
        }
        if let Some(v) = &self.language {
            config.language = v.clone();
        }
        if let Some(v) = &self.app {
            config.app = Some(v.clone());
        }
        if let Some(v) = &self.redis_server {
            config.redis_url = v.clone();
        }
        if let Some(v) = &self.marathon_server {
            config.marathon_url = v.clone();
        }
        if let Some(v) = &self.statsd_server {
            config.statsd_addr = v.clone();
        }
        if let Some(v) = &self.metrics_prefix {
            config.metrics_prefix = v.clone();
        }
        if let Some(v) = self.poll_interval {
            config.poll_interval = v;
        }
        if let Some(v) = self.max_workers {
            config.max_workers = v;
        }
        if let Some(v) = self.idle_window {
            config.idle_window = v;
        }
        if let Some(v) = self.call_timeout {
            config.call_timeout = v;
        }
        if let Some(v) = self.tick_deadline {
            config.tick_deadline = v;
        }
        if let Some(v) = self.worker_count_source {
            config.worker_count_source = v;
        }
        if let Some(v) = self.idle_key_shape {
            config.idle_key_shape = v;
        }
    }
}

fn duration_arg(s: &str) -> Result<Duration, String> {
    parse_duration(s).ok_or_else(|| format!("invalid duration: {s:?}"))
}

fn worker_count_source_arg(s: &str) -> Result<WorkerCountSource, String> {
    match s {
        "tasks" => Ok(WorkerCountSource::Tasks),
        "app_info" | "app-info" => Ok(WorkerCountSource::AppInfo),
        other => Err(format!("unknown worker count source: {other:?}")),
    }
}

fn idle_key_shape_arg(s: &str) -> Result<IdleKeyShape, String> {
    match s {
        "plain" => Ok(IdleKeyShape::Plain),
        "tokenized" => Ok(IdleKeyShape::Tokenized),
        other => Err(format!("unknown idle key shape: {other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["qscaled"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn no_flags_gives_defaults() {
        let config = parse(&[]).load_config().unwrap();
        assert_eq!(config.namespace, "kluge");
        assert_eq!(config.language, "english");
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.app_id(), "tokenizer/english");
    }

    #[test]
    fn short_flags_override_defaults() {
        let cli = parse(&[
            "-n", "prod", "-l", "german", "-p", "5", "-w", "40", "-s", "udp://stats:8125",
        ]);
        let config = cli.load_config().unwrap();
        assert_eq!(config.namespace, "prod");
        assert_eq!(config.language, "german");
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.max_workers, 40);
        assert_eq!(config.statsd_endpoint().unwrap(), ("stats".to_string(), 8125));
        assert_eq!(config.app_id(), "tokenizer/german");
    }

    #[test]
    fn variant_flags_parse() {
        let cli = parse(&[
            "--worker-count-source",
            "app_info",
            "--idle-key-shape",
            "tokenized",
            "--idle-window",
            "60s",
        ]);
        let config = cli.load_config().unwrap();
        assert_eq!(config.worker_count_source, WorkerCountSource::AppInfo);
        assert_eq!(config.idle_key_shape, IdleKeyShape::Tokenized);
        assert_eq!(config.idle_window, Duration::from_secs(60));
        assert_eq!(config.idle_ticks_threshold(), 6);
    }

    #[test]
    fn bad_values_rejected_at_parse_time() {
        assert!(Cli::try_parse_from(["qscaled", "--poll", "soon"]).is_err());
        assert!(Cli::try_parse_from(["qscaled", "--idle-key-shape", "round"]).is_err());
    }

    #[test]
    fn invalid_combination_fails_validation() {
        let cli = parse(&["--max-workers", "0"]);
        assert!(matches!(cli.load_config(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn flags_override_file() {
        let path = std::env::temp_dir().join(format!("qscaled-cli-{}.toml", std::process::id()));
        std::fs::write(&path, "namespace = \"staging\"\nmax_workers = 8\npoll_interval = \"2s\"\n")
            .unwrap();

        let cli = parse(&["-c", path.to_str().unwrap(), "-w", "12"]);
        let config = cli.load_config().unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.namespace, "staging");
        assert_eq!(config.max_workers, 12);
        assert_eq!(config.poll_interval, Duration::from_secs(2));
    }
}
