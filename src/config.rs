use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use url::Url;

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8080";
pub const DEFAULT_LIVE_PATH: &str = "/api/live";
pub const DEFAULT_UPLOAD_PATH: &str = "/api/upload";

#[derive(Parser, Debug, Clone)]
#[command(name = "pktview")]
#[command(version)]
#[command(
    about = "Terminal viewer for packets streamed live or parsed from an uploaded capture.",
    long_about = None,
    after_help = "Examples:\n  pktview --server http://sniffer:8080 --live\n  pktview --upload capture.pcap\n  RUST_LOG=debug pktview --log-file /tmp/pktview.log"
)]
pub struct Cli {
    /// Base URL of the capture server (http, https, ws or wss)
    #[arg(long, default_value = DEFAULT_SERVER)]
    pub server: String,

    /// Path of the live WebSocket endpoint
    #[arg(long, default_value = DEFAULT_LIVE_PATH)]
    pub live_path: String,

    /// Path of the capture upload endpoint
    #[arg(long, default_value = DEFAULT_UPLOAD_PATH)]
    pub upload_path: String,

    /// Where to write diagnostics (the terminal is taken by the UI)
    #[arg(long, default_value = "pktview.log")]
    pub log_file: PathBuf,

    /// Start live capture as soon as the viewer opens
    #[arg(long, conflicts_with = "upload")]
    pub live: bool,

    /// Upload this capture file as soon as the viewer opens
    #[arg(long, value_name = "FILE")]
    pub upload: Option<PathBuf>,

    /// UI input poll interval in milliseconds
    #[arg(long, default_value_t = 50)]
    pub tick_ms: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid server URL {input:?}: {source}")]
    BadUrl {
        input: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported server scheme {0:?} (expected http, https, ws or wss)")]
    Scheme(String),
}

/// Server endpoints derived from one base URL.
///
/// The live channel is secure exactly when the base is: `http`/`ws` map to
/// `ws`, `https`/`wss` map to `wss`. Uploads always go over the matching HTTP
/// scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
    live: Url,
    upload: Url,
}

impl Endpoints {
    pub fn new(server: &str, live_path: &str, upload_path: &str) -> Result<Self, ConfigError> {
        let base = Url::parse(server).map_err(|source| ConfigError::BadUrl {
            input: server.to_string(),
            source,
        })?;
        let secure = match base.scheme() {
            "http" | "ws" => false,
            "https" | "wss" => true,
            other => return Err(ConfigError::Scheme(other.to_string())),
        };
        let live = with_scheme(&base, if secure { "wss" } else { "ws" }, live_path)?;
        let upload = with_scheme(&base, if secure { "https" } else { "http" }, upload_path)?;
        Ok(Self { base, live, upload })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn live(&self) -> &Url {
        &self.live
    }

    pub fn upload(&self) -> &Url {
        &self.upload
    }

    pub fn is_secure(&self) -> bool {
        self.live.scheme() == "wss"
    }
}

fn with_scheme(base: &Url, scheme: &str, path: &str) -> Result<Url, ConfigError> {
    // `Url::set_scheme` refuses to move between special and non-special
    // schemes, so rebuild the URL from its string form.
    let rest = &base.as_str()[base.scheme().len()..];
    let rebuilt = format!("{scheme}{rest}");
    let mut url = Url::parse(&rebuilt).map_err(|source| ConfigError::BadUrl {
        input: rebuilt.clone(),
        source,
    })?;
    url.set_path(path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub endpoints: Endpoints,
    pub log_file: PathBuf,
    pub start_live: bool,
    pub upload_on_start: Option<PathBuf>,
    pub tick: Duration,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let endpoints = Endpoints::new(&cli.server, &cli.live_path, &cli.upload_path)?;
        Ok(Self {
            endpoints,
            log_file: cli.log_file,
            start_live: cli.live,
            upload_on_start: cli.upload,
            tick: Duration::from_millis(cli.tick_ms.max(1)),
        })
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Config, ConfigError, Endpoints, DEFAULT_LIVE_PATH, DEFAULT_UPLOAD_PATH};

    fn endpoints(server: &str) -> Endpoints {
        Endpoints::new(server, DEFAULT_LIVE_PATH, DEFAULT_UPLOAD_PATH).unwrap()
    }

    #[test]
    fn plain_http_uses_ws() {
        let e = endpoints("http://localhost:8080");
        assert_eq!(e.live().as_str(), "ws://localhost:8080/api/live");
        assert_eq!(e.upload().as_str(), "http://localhost:8080/api/upload");
        assert!(!e.is_secure());
    }

    #[test]
    fn https_uses_wss() {
        let e = endpoints("https://sniffer.example.com");
        assert_eq!(e.live().as_str(), "wss://sniffer.example.com/api/live");
        assert_eq!(e.upload().as_str(), "https://sniffer.example.com/api/upload");
        assert!(e.is_secure());
    }

    #[test]
    fn websocket_base_is_accepted() {
        let e = endpoints("wss://10.1.2.3:9443/ignored?x=1");
        assert_eq!(e.live().as_str(), "wss://10.1.2.3:9443/api/live");
        assert_eq!(e.upload().as_str(), "https://10.1.2.3:9443/api/upload");
    }

    #[test]
    fn custom_paths() {
        let e = Endpoints::new("http://h", "/live", "/upload").unwrap();
        assert_eq!(e.live().as_str(), "ws://h/live");
        assert_eq!(e.upload().as_str(), "http://h/upload");
    }

    #[test]
    fn rejects_other_schemes() {
        let err = Endpoints::new("ftp://h", "/a", "/b").unwrap_err();
        assert!(matches!(err, ConfigError::Scheme(s) if s == "ftp"));
    }

    #[test]
    fn rejects_garbage() {
        let err = Endpoints::new("not a url", "/a", "/b").unwrap_err();
        assert!(matches!(err, ConfigError::BadUrl { .. }));
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["pktview"]);
        let config = Config::from_cli(cli).unwrap();
        assert_eq!(config.endpoints.live().as_str(), "ws://127.0.0.1:8080/api/live");
        assert!(!config.start_live);
        assert!(config.upload_on_start.is_none());
        assert_eq!(config.tick.as_millis(), 50);
    }

    #[test]
    fn live_conflicts_with_upload() {
        let result = Cli::try_parse_from(["pktview", "--live", "--upload", "a.pcap"]);
        assert!(result.is_err());
    }
}
