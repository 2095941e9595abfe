//! # Targets
//!
//! Parsing of scan targets and loading of domain lists.
//!
//! A target is a host with an optional port:
//!
//! - `example.com`
//! - `example.com:8080`
//! - `127.0.0.1`, `127.0.0.1:8080`
//! - `[::1]`, `[::1]:8443`
//!
//! ## Example
//!
//! ```rust
//! use bugscan::targets::{Target, TargetKind};
//!
//! let target: Target = "cdn.example.com:8080".parse().unwrap();
//! assert_eq!(target.host, "cdn.example.com");
//! assert_eq!(target.port, Some(8080));
//! assert_eq!(target.kind, TargetKind::Dns);
//! assert_eq!(target.to_string(), "cdn.example.com:8080");
//! ```
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// What kind of host a target names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Dns,
    IPv4,
    IPv6,
}

impl Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dns => write!(f, "dns"),
            Self::IPv4 => write!(f, "ipv4"),
            Self::IPv6 => write!(f, "ipv6"),
        }
    }
}

/// A host to probe, with an optional explicit port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Target {
    /// Host name or IP address, without IPv6 brackets.
    pub host: String,
    pub kind: TargetKind,
    pub port: Option<u16>,
}

impl Target {
    /// The host as an IP address, when the target is an IP literal.
    pub fn ip(&self) -> Option<IpAddr> {
        self.host.parse().ok()
    }

    /// `host[:port]` as it goes into a URL, with IPv6 hosts bracketed.
    pub fn authority(&self) -> String {
        let host = match self.kind {
            TargetKind::IPv6 => format!("[{}]", self.host),
            _ => self.host.clone(),
        };
        match self.port {
            Some(port) => format!("{host}:{port}"),
            None => host,
        }
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.authority())
    }
}

/// Checks a host name.
///
/// # Rules
/// - Maximum length: 253 characters
/// - Each label is 1 to 63 characters
/// - Labels cannot start or end with `-`
/// - Only ASCII alphanumerics, `-` and `_` are allowed
fn is_dns(host: &str) -> bool {
    let host = host.strip_suffix('.').unwrap_or(host);
    if host.is_empty() || host.len() > 253 {
        return false;
    }

    host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
}

fn invalid(target: &str, reason: &'static str) -> Error {
    Error::InvalidTarget {
        target: target.to_string(),
        reason,
    }
}

fn parse_port(target: &str, port: &str) -> Result<u16> {
    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(invalid(target, "port must be 1-65535")),
        Ok(port) => Ok(port),
    }
}

impl FromStr for Target {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let input = s.trim();
        if input.is_empty() {
            return Err(invalid(s, "empty target"));
        }
        if input.contains("://") || input.contains('/') {
            return Err(invalid(s, "expected host[:port], not a URL"));
        }

        // [v6] or [v6]:port
        if let Some(rest) = input.strip_prefix('[') {
            let (host, after) = rest
                .split_once(']')
                .ok_or_else(|| invalid(s, "unterminated IPv6 bracket"))?;
            let ip = Ipv6Addr::from_str(host).map_err(|_| invalid(s, "invalid IPv6 address"))?;
            let port = match after {
                "" => None,
                p => match p.strip_prefix(':') {
                    Some(p) => Some(parse_port(s, p)?),
                    None => return Err(invalid(s, "unexpected text after IPv6 address")),
                },
            };
            return Ok(Target {
                host: ip.to_string(),
                kind: TargetKind::IPv6,
                port,
            });
        }

        // Bare IPv6 has more than one colon and cannot carry a port.
        if let Ok(ip) = Ipv6Addr::from_str(input) {
            return Ok(Target {
                host: ip.to_string(),
                kind: TargetKind::IPv6,
                port: None,
            });
        }

        let (host, port) = match input.rsplit_once(':') {
            Some((host, port)) => (host, Some(parse_port(s, port)?)),
            None => (input, None),
        };

        let kind = if Ipv4Addr::from_str(host).is_ok() {
            TargetKind::IPv4
        } else if is_dns(host) {
            TargetKind::Dns
        } else {
            return Err(invalid(s, "not a valid host name or IP address"));
        };

        Ok(Target {
            host: host.to_ascii_lowercase(),
            kind,
            port,
        })
    }
}

impl TryFrom<&str> for Target {
    type Error = Error;
    fn try_from(value: &str) -> Result<Self> {
        value.parse()
    }
}

/// Parses a domain list.
///
/// One target per line. Blank lines and lines starting with `#` are
/// skipped, invalid lines are reported and skipped, duplicates are dropped
/// keeping the first occurrence.
pub fn parse_targets(content: &str) -> Vec<Target> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();

    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.parse::<Target>() {
            Ok(target) => {
                if seen.insert(target.clone()) {
                    targets.push(target);
                }
            }
            Err(e) => warn!(line = lineno + 1, "skipping target: {e}"),
        }
    }

    targets
}

/// Reads and parses a domain list file.
pub fn load_targets(path: impl AsRef<Path>) -> Result<Vec<Target>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| Error::ReadTargets {
        path: path.to_path_buf(),
        source,
    })?;
    let targets = parse_targets(&content);
    debug!(path = %path.display(), count = targets.len(), "loaded targets");
    if targets.is_empty() {
        warn!(path = %path.display(), "domain list contains no targets");
    }
    Ok(targets)
}
