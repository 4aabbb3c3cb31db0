//! Harbor REST client.
//!
//! A thin blocking facade over `reqwest`: the client owns a current-thread
//! tokio runtime and blocks on one request at a time. Every request runs
//! under the process interrupt guard, so ctrl-c surfaces as [`Interrupted`].
//!
//! Resource managers hang off the client (`client.jobs()`), mirroring how the
//! command modules group their handlers.

pub mod jobs;

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::utils;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Path of the REST API below the Harbor root URL.
pub const API_PREFIX: &str = "api/";

pub use crate::utils::interrupt::Interrupted;

/// Connection options as given on the command line. Unset values fall back
/// to the environment in [`ClientConfig::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Option<u64>,
    pub insecure: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: Url,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
    pub insecure: bool,
}

impl ClientConfig {
    pub fn resolve(opts: &ConnectOptions) -> Result<Self> {
        Self::resolve_with(opts, |name| std::env::var(name).ok())
    }

    /// Resolve against an arbitrary variable lookup.
    pub fn resolve_with<F>(opts: &ConnectOptions, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_env = |names: &[&str]| utils::env_with(&lookup, names, "");
        let pick = |given: &Option<String>, names: &[&str]| {
            given
                .clone()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| from_env(names))
        };

        let url = pick(&opts.url, &["HARBOR_URL", "OS_BASEURL"]);
        if url.is_empty() {
            bail!("You must provide a Harbor URL via either --harbor-url or env[HARBOR_URL]");
        }
        let base_url = parse_endpoint(&url)?;

        let timeout = match opts.timeout {
            Some(secs) => secs,
            None => {
                let raw = utils::env_with(&lookup, &["HARBOR_TIMEOUT"], "");
                if raw.is_empty() {
                    DEFAULT_TIMEOUT_SECS
                } else {
                    raw.trim()
                        .parse()
                        .with_context(|| format!("invalid HARBOR_TIMEOUT value '{raw}'"))?
                }
            }
        };

        Ok(Self {
            base_url,
            username: pick(&opts.username, &["HARBOR_USERNAME", "OS_USERNAME"]),
            password: pick(&opts.password, &["HARBOR_PASSWORD", "OS_PASSWORD"]),
            timeout: Duration::from_secs(timeout),
            insecure: opts.insecure,
        })
    }
}

/// Parse a Harbor root URL. Only http(s) is accepted; the path always ends
/// in `/` so relative API paths join below it.
pub fn parse_endpoint(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim()).with_context(|| format!("invalid Harbor URL '{raw}'"))?;
    match url.scheme() {
        "http" | "https" => {}
        other => bail!("unsupported scheme '{other}' in Harbor URL '{raw}'"),
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

pub struct HarborClient {
    config: ClientConfig,
    http: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl HarborClient {
    /// Resolve the configuration and prepare the HTTP client. No request is
    /// made until a resource manager asks for one.
    pub fn connect(opts: ConnectOptions) -> Result<Self> {
        let config = ClientConfig::resolve(&opts)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start the async runtime")?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.insecure)
            .user_agent(concat!("harbor-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build the HTTP client")?;
        tracing::debug!(url = %config.base_url, timeout = ?config.timeout, "client ready");
        Ok(Self {
            config,
            http,
            runtime,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn jobs(&self) -> jobs::JobManager<'_> {
        jobs::JobManager::new(self)
    }

    /// Absolute URL of an API path such as `jobs/replication`.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let relative = format!("{API_PREFIX}{}", path.trim_start_matches('/'));
        self.config
            .base_url
            .join(&relative)
            .with_context(|| format!("invalid API path '{path}'"))
    }

    pub(crate) fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.endpoint(path)?;
        self.block_on(async {
            let response = self.send(Method::GET, url.clone(), query).await?;
            response
                .json::<T>()
                .await
                .with_context(|| format!("failed to decode response from {url}"))
        })
    }

    pub(crate) fn get_text(&self, path: &str) -> Result<String> {
        let url = self.endpoint(path)?;
        self.block_on(async {
            let response = self.send(Method::GET, url.clone(), &[]).await?;
            response
                .text()
                .await
                .with_context(|| format!("failed to read response from {url}"))
        })
    }

    async fn send(&self, method: Method, url: Url, query: &[(&str, String)]) -> Result<Response> {
        let mut request = self.http.request(method.clone(), url.clone()).query(query);
        if !self.config.username.is_empty() {
            request = request.basic_auth(&self.config.username, Some(&self.config.password));
        }
        tracing::debug!(%method, %url, ?query, "request");
        let response = request
            .send()
            .await
            .with_context(|| format!("{method} {url} failed"))?;
        let status = response.status();
        tracing::debug!(%status, %url, "response");
        if !status.is_success() {
            bail!("{method} {url} returned {status}");
        }
        Ok(response)
    }

    /// Drive `fut` to completion, giving up with [`Interrupted`] on ctrl-c.
    fn block_on<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.runtime
            .block_on(utils::interrupt::state().guard(fut))
    }
}
