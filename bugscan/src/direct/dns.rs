//! Name resolution for the direct scan mode.
//!
//! [`SharedDns`] is the only DNS path of a direct scan. The probe resolves a
//! target through it and pins the answer; the HTTP client resolves through
//! it too, so the request connects to the very addresses the result line
//! reports.
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{LookupIpStrategy, ResolverConfig, ResolverOpts};
use hickory_resolver::system_conf::read_system_conf;
use parking_lot::Mutex;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

use crate::error::{Error, Result};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Where the nameservers of a [`SharedDns`] come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverSource {
    /// The host's own configuration (`/etc/resolv.conf` and friends).
    System,
    /// Public nameservers, used when the host configuration is unreadable.
    Fallback,
}

/// Resolver settings: the system configuration, IPv4 only, with the scan's
/// DNS deadline.
pub(crate) fn resolver_config(
    dns_timeout: Duration,
) -> (ResolverConfig, ResolverOpts, ResolverSource) {
    let (config, mut opts, source) = match read_system_conf() {
        Ok((config, opts)) => (config, opts, ResolverSource::System),
        Err(e) => {
            warn!(error = %e, "cannot read system resolver configuration, using public nameservers");
            (
                ResolverConfig::default(),
                ResolverOpts::default(),
                ResolverSource::Fallback,
            )
        }
    };
    opts.ip_strategy = LookupIpStrategy::Ipv4Only;
    opts.timeout = dns_timeout;
    (config, opts, source)
}

async fn lookup_ipv4(
    resolver: &TokioAsyncResolver,
    host: &str,
    deadline: Duration,
) -> Result<Vec<IpAddr>> {
    let failed = |reason: String| Error::Dns {
        host: host.to_string(),
        reason,
    };

    let lookup = match timeout(deadline, resolver.lookup_ip(host)).await {
        Ok(Ok(lookup)) => lookup,
        Ok(Err(e)) => return Err(failed(e.to_string())),
        Err(_) => return Err(failed("timed out".to_string())),
    };

    let ips: Vec<IpAddr> = lookup.iter().filter(IpAddr::is_ipv4).collect();
    if ips.is_empty() {
        return Err(failed("no ipv4 address".to_string()));
    }
    Ok(ips)
}

/// Resolver shared by the probe and its HTTP client.
pub struct SharedDns {
    resolver: TokioAsyncResolver,
    source: ResolverSource,
    deadline: Duration,
    /// Host -> (addresses, number of live pins).
    pinned: Mutex<HashMap<String, (Vec<IpAddr>, usize)>>,
}

impl SharedDns {
    pub fn new(dns_timeout: Duration) -> Self {
        let (config, opts, source) = resolver_config(dns_timeout);
        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
            source,
            deadline: dns_timeout,
            pinned: Mutex::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> ResolverSource {
        self.source
    }

    /// IPv4 addresses of `host`, bounded by the DNS deadline.
    pub async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>> {
        lookup_ipv4(&self.resolver, host, self.deadline).await
    }

    /// Makes the HTTP client connect to `ips` for `host` until the returned
    /// guard is dropped.
    pub fn pin(&self, host: &str, ips: Vec<IpAddr>) -> PinGuard<'_> {
        let mut pinned = self.pinned.lock();
        let entry = pinned.entry(host.to_string()).or_insert_with(|| (Vec::new(), 0));
        entry.0 = ips;
        entry.1 += 1;
        PinGuard {
            dns: self,
            host: host.to_string(),
        }
    }

    pub(crate) fn pinned(&self, host: &str) -> Option<Vec<IpAddr>> {
        self.pinned.lock().get(host).map(|(ips, _)| ips.clone())
    }
}

/// Releases one pin on drop.
pub struct PinGuard<'a> {
    dns: &'a SharedDns,
    host: String,
}

impl Drop for PinGuard<'_> {
    fn drop(&mut self) {
        let mut pinned = self.dns.pinned.lock();
        if let Some((_, count)) = pinned.get_mut(&self.host) {
            *count -= 1;
            if *count == 0 {
                pinned.remove(&self.host);
            }
        }
    }
}

impl Resolve for SharedDns {
    fn resolve(&self, name: Name) -> Resolving {
        let host = name.as_str().to_string();
        let pinned = self.pinned(&host);
        let resolver = self.resolver.clone();
        let deadline = self.deadline;

        Box::pin(async move {
            let ips = match pinned {
                Some(ips) => ips,
                None => lookup_ipv4(&resolver, &host, deadline).await?,
            };
            // The client replaces port 0 with the one from the URL.
            let addrs: Addrs = Box::new(ips.into_iter().map(|ip| SocketAddr::new(ip, 0)));
            Ok::<_, BoxError>(addrs)
        })
    }
}
