//! Validated agent configuration built from the command line

use std::net::SocketAddr;
use std::time::Duration;

use packetsleuth_capture::{CaptureConfig, SupervisorConfig};
use packetsleuth_core::{Error, Result};
use packetsleuth_metrics::{AggregatorConfig, InfluxConfig, PushConfig};

use crate::args::Cli;

/// Everything the agent needs to start
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub listen: SocketAddr,
    pub capture: CaptureConfig,
    pub supervisor: SupervisorConfig,
    pub aggregator: AggregatorConfig,
    /// Present only when push export is enabled
    pub influx: Option<InfluxConfig>,
    pub push: PushConfig,
}

impl AgentConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        positive("queue capacity", cli.queue_capacity)?;
        positive("max histogram keys", cli.max_histogram_keys)?;
        positive("export queue capacity", cli.influx.export_queue_capacity)?;
        positive("export batch size", cli.influx.export_batch_size)?;

        if cli.snaplen <= 0 {
            return Err(Error::Config(format!(
                "snaplen must be positive, got {}",
                cli.snaplen
            )));
        }
        if cli.poll_interval_ms == 0 {
            return Err(Error::Config(
                "poll interval must be at least 1 ms".to_string(),
            ));
        }

        let influx = if cli.influx.influx_enabled {
            let url = cli.influx.influx_url.trim();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::Config(format!(
                    "InfluxDB URL must start with http:// or https://, got '{}'",
                    url
                )));
            }
            Some(InfluxConfig {
                endpoint: url.to_string(),
                org: cli.influx.influx_org.clone(),
                bucket: cli.influx.influx_bucket.clone(),
                user: cli.influx.influx_user.clone(),
                password: cli.influx.influx_password.clone(),
                ..InfluxConfig::default()
            })
        } else {
            None
        };

        Ok(Self {
            listen: cli.listen,
            capture: CaptureConfig {
                snaplen: cli.snaplen,
                poll_interval: Duration::from_millis(cli.poll_interval_ms),
                promiscuous: !cli.no_promisc,
                ..CaptureConfig::default()
            },
            supervisor: SupervisorConfig {
                interfaces: cli.interfaces.clone(),
                include_loopback: cli.include_loopback,
                queue_capacity: cli.queue_capacity,
            },
            aggregator: AggregatorConfig {
                max_keys: cli.max_histogram_keys,
            },
            influx,
            push: PushConfig {
                queue_capacity: cli.influx.export_queue_capacity,
                batch_size: cli.influx.export_batch_size,
            },
        })
    }
}

fn positive(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(Error::Config(format!("{} must be greater than zero", name)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Result<AgentConfig> {
        let mut argv = vec!["packetsleuth"];
        argv.extend_from_slice(args);
        AgentConfig::from_cli(&Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn test_default_config() {
        let config = parse(&[]).unwrap();

        assert!(config.influx.is_none());
        assert!(config.capture.promiscuous);
        assert_eq!(config.capture.poll_interval, Duration::from_millis(250));
        assert_eq!(config.supervisor.queue_capacity, 100);
        assert_eq!(config.aggregator.max_keys, 1024);
        assert_eq!(config.push.batch_size, 500);
    }

    #[test]
    fn test_influx_enabled() {
        let config = parse(&[
            "--influx-enabled",
            "--influx-url",
            "https://influx.example:8086",
            "--influx-org",
            "ops",
        ])
        .unwrap();

        let influx = config.influx.unwrap();
        assert_eq!(influx.endpoint, "https://influx.example:8086");
        assert_eq!(influx.org, "ops");
    }

    #[test]
    fn test_influx_url_scheme_checked_only_when_enabled() {
        assert!(parse(&["--influx-url", "localhost:8086"]).is_ok());
        assert!(matches!(
            parse(&["--influx-enabled", "--influx-url", "localhost:8086"]),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_zero_sizes_rejected() {
        for flag in [
            "--queue-capacity",
            "--max-histogram-keys",
            "--export-queue-capacity",
            "--export-batch-size",
            "--poll-interval-ms",
        ] {
            assert!(
                matches!(parse(&[flag, "0"]), Err(Error::Config(_))),
                "{} 0 accepted",
                flag
            );
        }
        assert!(parse(&["--snaplen", "0"]).is_err());
    }

    #[test]
    fn test_capture_selection_passed_through() {
        let config = parse(&["-I", "eth0", "--include-loopback", "--no-promisc"]).unwrap();
        assert_eq!(config.supervisor.interfaces, vec!["eth0"]);
        assert!(config.supervisor.include_loopback);
        assert!(!config.capture.promiscuous);
    }
}
