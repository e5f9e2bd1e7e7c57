use std::{
    fmt::{self, Display},
    net::SocketAddr,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand};
use emitter::{
    config::{self, Config},
    emitter::{Emitter, Summary},
};
use emitter_payload::Variant;
use hyper::Uri;
use jemallocator::Jemalloc;
use metrics_exporter_prometheus::PrometheusBuilder;
use rustc_hash::FxHashMap;
use tokio::{runtime::Builder, signal, time::sleep};
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(thiserror::Error, Debug)]
enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Emitter returned an error: {0}")]
    Emitter(#[from] emitter::emitter::Error),
    #[error("Failed to load emitter config: {0}")]
    Config(#[from] config::Error),
    #[error("Failed to install prometheus exporter: {0}")]
    Prometheus(#[from] metrics_exporter_prometheus::BuildError),
}

#[derive(Default, Clone, Debug)]
struct CliKeyValues {
    inner: FxHashMap<String, String>,
}

impl CliKeyValues {
    #[cfg(test)]
    fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(String::as_str)
    }
}

impl Display for CliKeyValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        for (k, v) in &self.inner {
            write!(f, "{k}={v},")?;
        }
        Ok(())
    }
}

impl FromStr for CliKeyValues {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        // Pairs are separated by ',' but a value may itself hold ','. A
        // fragment without '=' therefore continues the previous value.
        let mut labels = FxHashMap::default();
        let mut current: Option<(String, String)> = None;

        for fragment in input.split(',').filter(|f| !f.is_empty()) {
            match fragment.split_once('=') {
                Some((key, value)) if !key.is_empty() => {
                    if let Some((k, v)) = current.take() {
                        labels.insert(k, v);
                    }
                    current = Some((key.to_string(), value.to_string()));
                }
                _ => match current.as_mut() {
                    Some((_, value)) => {
                        value.push(',');
                        value.push_str(fragment);
                    }
                    None => return Err(format!("expected KEY=VALUE, found '{fragment}'")),
                },
            }
        }
        if let Some((k, v)) = current {
            labels.insert(k, v);
        }

        Ok(Self { inner: labels })
    }
}

#[derive(Parser)]
#[clap(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Emit records until interrupted or the duration elapses
    Run(Box<RunArgs>),
    /// Validate configuration file and exit
    ConfigCheck(ConfigCheckArgs),
}

#[derive(Args)]
struct RunArgs {
    /// path on disk to the configuration file
    #[clap(long)]
    config_path: Option<PathBuf>,
    /// the URI to post records to, overrides configuration
    #[clap(long)]
    target_uri: Option<Uri>,
    /// the record shape to emit, 'basic' or 'warehouse'
    #[clap(long)]
    variant: Option<Variant>,
    /// the pause before each request in microseconds, overrides configuration
    #[clap(long)]
    delay_micros: Option<u64>,
    /// the time, in seconds, to emit for; unbounded when absent
    #[clap(long)]
    duration_seconds: Option<u64>,
    /// address to bind prometheus exporter to
    #[clap(long)]
    prometheus_addr: Option<SocketAddr>,
    /// additional labels to apply to all metrics, format KEY=VAL,KEY2=VAL
    #[clap(long, requires = "prometheus_addr")]
    global_labels: Option<CliKeyValues>,
}

#[derive(Args)]
struct ConfigCheckArgs {
    /// path on disk to the configuration file
    #[clap(long)]
    config_path: Option<PathBuf>,
}

fn get_config(args: &RunArgs, config: Config) -> Config {
    let mut config = config;
    if let Some(variant) = args.variant {
        config.payload.variant = variant;
    }
    if let Some(uri) = &args.target_uri {
        config.target_uri = Some(uri.clone());
    }
    if let Some(delay_micros) = args.delay_micros {
        config.throttle = Some(emitter_throttle::Config::Fixed { delay_micros });
    }
    config
}

async fn inner_main(
    config: Config,
    duration: Option<Duration>,
    prometheus_addr: Option<SocketAddr>,
    global_labels: CliKeyValues,
) -> Result<Summary, Error> {
    if let Some(addr) = prometheus_addr {
        let mut builder = PrometheusBuilder::new().with_http_listener(addr);
        for (k, v) in global_labels.inner {
            builder = builder.add_global_label(k, v);
        }
        builder.install()?;
        info!("prometheus exporter listening on {addr}");
    }

    let emitter = Emitter::new(config)?;
    let shutdown = async move {
        match duration {
            Some(duration) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("received ctrl-c"),
                    () = sleep(duration) => info!("duration exceeded, signaling for shutdown"),
                }
            }
            None => {
                if let Err(err) = signal::ctrl_c().await {
                    error!("unable to listen for ctrl-c: {err}");
                    std::future::pending::<()>().await;
                }
                info!("received ctrl-c");
            }
        }
    };

    Ok(emitter.spin(shutdown).await?)
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(false)
        .finish()
        .init();

    let version = env!("CARGO_PKG_VERSION");
    info!("Starting emitter {version}.");

    let args = match Cli::parse().command {
        Commands::Run(args) => args,
        Commands::ConfigCheck(args) => match Config::load(args.config_path.as_deref()) {
            Ok(_) => {
                info!("Configuration file is valid");
                std::process::exit(0)
            }
            Err(err) => {
                error!("Configuration validation failed: {err}");
                std::process::exit(1)
            }
        },
    };

    let config = get_config(&args, Config::load(args.config_path.as_deref())?);
    debug!("Resolved configuration: {config:?}");
    let duration = args.duration_seconds.map(Duration::from_secs);

    // A single sequential task; one thread is all it needs.
    let runtime = Builder::new_current_thread()
        .enable_io()
        .enable_time()
        .build()?;
    let summary = runtime.block_on(inner_main(
        config,
        duration,
        args.prometheus_addr,
        args.global_labels.clone().unwrap_or_default(),
    ))?;
    info!(
        requests_sent = summary.requests_sent,
        request_ok = summary.request_ok,
        request_failure = summary.request_failure,
        "Bye. :)"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_key_values_deserializes_empty_string_to_empty_set() {
        let deser = CliKeyValues::from_str("")
            .expect("String could not be converted into valid CliKeyValues")
            .to_string();
        assert_eq!("", deser);
    }

    #[test]
    fn cli_key_values_deserializes_kv_list() {
        let deser = CliKeyValues::from_str("first=one,second=two")
            .expect("String cannot be converted into CliKeyValues");
        assert_eq!(deser.get("first"), Some("one"));
        assert_eq!(deser.get("second"), Some("two"));
    }

    #[test]
    fn cli_key_values_keeps_commas_inside_values() {
        let deser = CliKeyValues::from_str("env=dev,tags=a:1,b:2,")
            .expect("String cannot be converted into CliKeyValues");
        assert_eq!(deser.get("env"), Some("dev"));
        assert_eq!(deser.get("tags"), Some("a:1,b:2"));
    }

    #[test]
    fn cli_key_values_rejects_leading_bare_value() {
        assert!(CliKeyValues::from_str("oops,first=one").is_err());
    }

    #[test]
    fn run_flags_override_configuration() {
        let cli = Cli::parse_from([
            "emitter",
            "run",
            "--variant",
            "basic",
            "--target-uri",
            "http://127.0.0.1:9000/log",
            "--delay-micros",
            "500",
        ]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };
        let config = get_config(&args, Config::default());
        assert_eq!(config.payload.variant, Variant::Basic);
        assert_eq!(
            config.target_uri().expect("invalid uri"),
            "http://127.0.0.1:9000/log"
        );
        assert_eq!(
            config.throttle(),
            emitter_throttle::Config::Fixed { delay_micros: 500 }
        );
    }

    #[test]
    fn run_without_flags_keeps_configuration() {
        let cli = Cli::parse_from(["emitter", "run"]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };
        let config = get_config(&args, Config::default());
        assert_eq!(config, Config::default());
        assert!(args.duration_seconds.is_none());
    }

    #[test]
    fn global_labels_require_prometheus() {
        let res = Cli::try_parse_from(["emitter", "run", "--global-labels", "a=b"]);
        assert!(res.is_err());
    }
}
