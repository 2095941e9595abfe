//! # Direct scan mode
//!
//! Connects straight to every target, with no proxy in between, and sorts
//! the targets by the web server or CDN that answers.
//!
//! For each target the [`DirectProbe`]:
//!
//! 1. resolves the host to IPv4 addresses through the system resolver (IP
//!    literals skip DNS) and pins them for the HTTP client
//! 2. sends one request per configured scheme, without following redirects
//!    and without verifying certificates
//! 3. classifies the response headers (see [`classify`](classify::classify))
//! 4. records a [`DirectResponse`] and logs a colored result line
//!
//! Targets that fail to resolve or never answer produce nothing. Once the
//! scan is drained, [`GroupedReport`] groups the responses by server for the
//! terminal and for the results file.
use serde::Serialize;
use std::net::IpAddr;

use crate::targets::Target;

pub mod classify;
pub use classify::{Classification, Palette, ServerHeaders, Verdict};
pub mod dns;
pub use dns::{ResolverSource, SharedDns};
pub mod probe;
pub use probe::DirectProbe;
pub mod report;
pub use report::{GroupedReport, ServerGroup};

/// One HTTP answer from one target over one scheme.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectResponse {
    pub target: Target,
    pub scheme: &'static str,
    /// Resolved addresses, the first one is shown on the result line.
    pub ips: Vec<IpAddr>,
    pub status: u16,
    /// Server label as shown on the result line.
    pub server: String,
    /// Report group the response belongs to.
    pub group: String,
    pub palette: Palette,
    pub location: Option<String>,
}

impl DirectResponse {
    /// `IP  CODE  SERVER    HOST[ -> LOCATION]`, uncolored.
    pub fn summary_line(&self) -> String {
        let ip = self.ips.first().map(ToString::to_string).unwrap_or_default();
        let location = self
            .location
            .as_deref()
            .map(|l| format!(" -> {l}"))
            .unwrap_or_default();

        format!(
            "{:<15}  {:<3}  {:<16}    {}{}",
            ip, self.status, self.server, self.target, location
        )
    }
}
