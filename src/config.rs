use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use reqwest::Url;

/// The default backend base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// The client's configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// The base URL every endpoint hangs off.
    pub api_url: Url,
    /// The JSON file backing the durable key-value store.
    pub store_path: PathBuf,
    /// The `User-Agent` sent with every request.
    pub user_agent: String,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let api_url = env::var("BRAINSCAN_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let store_path = match env::var("BRAINSCAN_STORE_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => default_store_path(),
        };

        Ok(Self {
            api_url: parse_api_url(&api_url)?,
            store_path,
            user_agent: env::var("BRAINSCAN_USER_AGENT")
                .unwrap_or_else(|_| format!("brainscan/{}", env!("CARGO_PKG_VERSION"))),
        })
    }

    /// Replaces the base URL, validating it.
    pub fn with_api_url(mut self, api_url: &str) -> Result<Self> {
        self.api_url = parse_api_url(api_url)?;
        Ok(self)
    }

    /// Replaces the store path.
    pub fn with_store_path(mut self, store_path: impl Into<PathBuf>) -> Self {
        self.store_path = store_path.into();
        self
    }
}

fn parse_api_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("Invalid API URL: {}", raw))?;

    if url.cannot_be_a_base() {
        anyhow::bail!("API URL must be a base URL (got {})", raw);
    }

    Ok(url)
}

fn default_store_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".brainscan")
        .join("storage.json")
}
