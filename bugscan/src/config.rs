//! Explicit configuration for scan modes.
//!
//! Probes receive their configuration by value when they are constructed;
//! nothing is read from process-wide state during a scan.

use reqwest::Method;
use serde::Serialize;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default number of concurrent probes.
pub const DEFAULT_THREADS: usize = 64;

/// Server names recognised when the server list is `all`.
pub const ALL_SERVERS: &[&str] = &[
    "cloudflare",
    "cloudfront",
    "akamaighost",
    "akamai",
    "amazons3",
    "apache",
    "nginx",
    "varnish",
    "fastly",
    "microsoft",
    "azure",
    "cachefly",
    "alibaba",
    "tencent",
];

/// Lowercased server names a scan is looking for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerList(Vec<String>);

impl ServerList {
    pub fn all() -> Self {
        Self(ALL_SERVERS.iter().map(|s| s.to_string()).collect())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|s| s == name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for ServerList {
    fn default() -> Self {
        Self::all()
    }
}

impl FromStr for ServerList {
    type Err = Error;

    /// `all` or a comma separated list of names.
    fn from_str(s: &str) -> Result<Self> {
        let list = s.trim().to_lowercase();
        if list == "all" {
            return Ok(Self::all());
        }

        let mut names: Vec<String> = Vec::new();
        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }

        if names.is_empty() {
            return Err(Error::EmptyServerList);
        }
        Ok(Self(names))
    }
}

/// Which URL schemes to try for each target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Schemes {
    #[default]
    Http,
    Https,
    Both,
}

impl Schemes {
    pub fn from_flags(https: bool, both: bool) -> Self {
        match (https, both) {
            (_, true) => Self::Both,
            (true, false) => Self::Https,
            (false, false) => Self::Http,
        }
    }

    pub fn as_slice(&self) -> &'static [&'static str] {
        match self {
            Self::Http => &["http"],
            Self::Https => &["https"],
            Self::Both => &["http", "https"],
        }
    }
}

/// Format of the results file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Settings for the direct scan mode.
#[derive(Debug, Clone)]
pub struct DirectConfig {
    pub servers: ServerList,
    pub schemes: Schemes,
    /// HTTP method, case-insensitive.
    pub method: String,
    /// Deadline for one HTTP exchange, connect included.
    pub timeout: Duration,
    /// Deadline for resolving one host.
    pub dns_timeout: Duration,
    /// Where to write the grouped results, if anywhere.
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
}

impl Default for DirectConfig {
    fn default() -> Self {
        Self {
            servers: ServerList::all(),
            schemes: Schemes::Http,
            method: "HEAD".to_string(),
            timeout: Duration::from_secs(3),
            dns_timeout: Duration::from_secs(3),
            output: None,
            format: OutputFormat::Text,
        }
    }
}

impl DirectConfig {
    /// The configured method, upper-cased and validated.
    pub fn http_method(&self) -> Result<Method> {
        let upper = self.method.trim().to_ascii_uppercase();
        if upper.is_empty() {
            return Err(Error::InvalidMethod(self.method.clone()));
        }
        Method::from_bytes(upper.as_bytes()).map_err(|_| Error::InvalidMethod(self.method.clone()))
    }
}
