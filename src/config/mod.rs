//! # Service configuration

use crate::api::ApiClient;
use color_eyre::eyre::WrapErr;
use color_eyre::Report;
use color_eyre::Result;
use log::*;
use serde::{de, Deserialize, Deserializer};
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use structopt::StructOpt;
use tokio::fs::read_to_string;
use tracing::instrument;
use tungstenite::http::Uri;

#[cfg(feature = "tls")]
use color_eyre::eyre::eyre;
#[cfg(feature = "tls")]
use std::{fs::File, io::BufReader};
#[cfg(feature = "tls")]
use tokio_rustls::rustls::internal::pemfile::{certs, pkcs8_private_keys};
#[cfg(feature = "tls")]
use tokio_rustls::rustls::{Certificate, PrivateKey};

/// Overrides the API base URL of the config file
pub const API_URL_ENV: &str = "STOREFRONT_API_URL";
/// Overrides the API token of the config file
pub const API_TOKEN_ENV: &str = "STOREFRONT_API_TOKEN";

/// The commandline flags
#[derive(Debug, StructOpt)]
pub struct Flags {
    /// Which config file to use
    #[structopt(long = "cfg", short = "c")]
    pub cfg: Option<PathBuf>,
    /// Which port to use (if cfg isn't present)
    #[structopt(long = "port", short = "p")]
    pub port: Option<u16>,
    #[structopt(subcommand)]
    pub cmd: Option<Subcommand>,
}

#[derive(Debug, StructOpt)]
pub enum Subcommand {
    /// Run the live preview hub (default)
    Serve,
    /// Render stored content to HTML
    Render(RenderOpts),
}

/// Where the content to render comes from
#[derive(Debug, StructOpt)]
pub struct RenderOpts {
    /// A local file with document JSON or legacy HTML
    #[structopt(long, parse(from_os_str), conflicts_with_all = &["product", "route"])]
    pub file: Option<PathBuf>,
    /// A product id to fetch
    #[structopt(long, conflicts_with = "route")]
    pub product: Option<String>,
    /// A storefront path such as `/alice/my-guide` or `/content/42`
    #[structopt(long)]
    pub route: Option<String>,
    /// Write the HTML here instead of stdout
    #[structopt(long, short = "o", parse(from_os_str))]
    pub out: Option<PathBuf>,
}

/// The type of connection we want
pub enum ConnSetup {
    /// A simple connection (localhost or behind a web-server)
    Basic,
    /// A TLS connection set up within this service
    #[cfg(feature = "tls")]
    Tls {
        /// The loaded keys
        keys: Vec<PrivateKey>,
        /// The loaded certificates
        certs: Vec<Certificate>,
    },
}

/// The setup that we are actually using
pub struct Setup {
    /// The address to bind to
    pub addr: String,
    /// The kind of connection we use
    pub conn: ConnSetup,
    pub preview: PreviewConfig,
    pub api: ApiConfig,
}

impl Flags {
    #[instrument]
    /// Load the configuration from a file
    pub async fn load_cfg(&self) -> Result<Setup, Report> {
        let mut setup = if let Some(cfg) = &self.cfg {
            let cfg_string: String = read_to_string(cfg)
                .await
                .wrap_err("Could not read config file")?;
            let config: Config =
                toml::from_str(&cfg_string).wrap_err("Could not parse config file")?;
            config.into_setup()?
        } else if let Some(port) = self.port {
            Setup {
                addr: format!("0.0.0.0:{}", port),
                conn: ConnSetup::Basic,
                preview: PreviewConfig::default(),
                api: ApiConfig::default(),
            }
        } else {
            Setup {
                addr: String::from("127.0.0.1:9002"),
                conn: ConnSetup::Basic,
                preview: PreviewConfig::default(),
                api: ApiConfig::default(),
            }
        };
        setup
            .api
            .apply_env(|key| std::env::var(key).ok().filter(|v| !v.is_empty()));
        Ok(setup)
    }
}

/// The TLS config options
#[derive(Debug, Deserialize)]
pub struct Tls {
    /// Whether the TLS config is actually used
    pub enabled: bool,
    /// Which certificate file to use
    pub cert: PathBuf,
    /// Which key file to use
    pub key: PathBuf,
}

#[cfg(feature = "tls")]
impl Tls {
    #[instrument]
    /// Load the TLS certificates
    pub fn load_certs(&self) -> Result<Vec<Certificate>> {
        let file = File::open(&self.cert)?;
        certs(&mut BufReader::new(file)).map_err(|()| eyre!("Invalid certificate"))
    }

    #[instrument]
    /// Load the TLS keys
    pub fn load_keys(&self) -> Result<Vec<PrivateKey>> {
        let file = File::open(&self.key)?;
        pkcs8_private_keys(&mut BufReader::new(file)).map_err(|()| eyre!("Invalid key"))
    }
}

/// The live preview options
#[derive(Debug, Clone, Deserialize)]
pub struct PreviewConfig {
    /// Where the public bio pages are served
    #[serde(default = "default_preview_url")]
    pub base_url: String,
    /// How long edits have to pause before the preview moves
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_preview_url() -> String {
    String::from("http://localhost:3000")
}

fn default_debounce_ms() -> u64 {
    500
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            base_url: default_preview_url(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl PreviewConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// The backend options
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_url")]
    pub base_url: String,
    /// Bearer token for authenticated endpoints
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

fn default_api_url() -> String {
    String::from("http://localhost:3001/api")
}

fn default_cache_ttl() -> u64 {
    300
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            token: None,
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

impl ApiConfig {
    /// Let the environment override the file
    pub fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, var: F) {
        if let Some(url) = var(API_URL_ENV) {
            debug!("Using API base URL from {}", API_URL_ENV);
            self.base_url = url;
        }
        if let Some(token) = var(API_TOKEN_ENV) {
            self.token = Some(token);
        }
    }

    pub fn client(&self) -> Result<ApiClient> {
        ApiClient::new(
            &self.base_url,
            self.token.clone(),
            Duration::from_secs(self.cache_ttl_secs),
        )
        .wrap_err("Could not set up the API client")
    }
}

/// A configuration for the system
#[derive(Deserialize)]
pub struct Config {
    /// The address to bind the service to
    #[serde(deserialize_with = "deserialize_from_str")]
    pub addr: Uri,
    /// The TLS options
    pub tls: Option<Tls>,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    fn into_setup(self) -> Result<Setup> {
        let conn = match self.tls {
            #[cfg(feature = "tls")]
            Some(tls) if tls.enabled => {
                let certs = tls
                    .load_certs()
                    .wrap_err("Could not load certificate file")?;
                let keys = tls.load_keys().wrap_err("Could not load key file")?;
                ConnSetup::Tls { certs, keys }
            }
            #[cfg(not(feature = "tls"))]
            Some(tls) if tls.enabled => {
                warn!("TLS is enabled in the config, but this build has no TLS support");
                ConnSetup::Basic
            }
            _ => ConnSetup::Basic,
        };
        Ok(Setup {
            addr: self.addr.to_string(),
            conn,
            preview: self.preview,
            api: self.api,
        })
    }
}

// Works for any type that implements FromStr with a displayable error
fn deserialize_from_str<'de, S, D>(deserializer: D) -> Result<S, D::Error>
where
    S: FromStr,
    S::Err: Display,
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    S::from_str(&s).map_err(de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config: Config = toml::from_str(
            r#"
            addr = "0.0.0.0:8080"

            [preview]
            base_url = "https://shop.example"

            [api]
            token = "abc"
            cache_ttl_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.addr.to_string(), "0.0.0.0:8080");
        assert!(config.tls.is_none());
        assert_eq!(config.preview.base_url, "https://shop.example");
        assert_eq!(config.preview.debounce(), Duration::from_millis(500));
        assert_eq!(config.api.base_url, "http://localhost:3001/api");
        assert_eq!(config.api.token.as_deref(), Some("abc"));
        assert_eq!(config.api.cache_ttl_secs, 60);
    }

    #[test]
    fn test_env_overrides() {
        let mut api = ApiConfig::default();
        api.apply_env(|key| match key {
            API_URL_ENV => Some(String::from("https://api.example/v1")),
            _ => None,
        });
        assert_eq!(api.base_url, "https://api.example/v1");
        assert_eq!(api.token, None);

        api.apply_env(|key| (key == API_TOKEN_ENV).then(|| String::from("t0k")));
        assert_eq!(api.token.as_deref(), Some("t0k"));
    }

    #[test]
    fn test_render_flags() {
        let flags = Flags::from_iter(vec!["storefront-preview", "-p", "9100", "render", "--product", "42"]);
        assert_eq!(flags.port, Some(9100));
        match flags.cmd {
            Some(Subcommand::Render(opts)) => {
                assert_eq!(opts.product.as_deref(), Some("42"));
                assert!(opts.file.is_none() && opts.out.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(Flags::from_iter_safe(vec![
            "storefront-preview",
            "render",
            "--file",
            "a.json",
            "--route",
            "/p/x",
        ]).is_err());
    }
}
