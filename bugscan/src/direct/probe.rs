use async_trait::async_trait;
use reqwest::{Client, Method, redirect::Policy};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

use super::DirectResponse;
use super::classify::{ServerHeaders, Verdict, classify};
use super::dns::SharedDns;
use crate::config::{DirectConfig, Schemes, ServerList};
use crate::error::Result;
use crate::scanner::{Job, Probe, ScanContext};
use crate::targets::Target;

/// Probe for the direct scan mode.
///
/// Holds the HTTP client and DNS resolver shared by every job of a run. The
/// client resolves host names through the same [`SharedDns`], so a request
/// goes to the addresses the result reports.
pub struct DirectProbe {
    client: Client,
    dns: Arc<SharedDns>,
    method: Method,
    servers: ServerList,
    schemes: Schemes,
}

impl DirectProbe {
    pub fn new(config: &DirectConfig) -> Result<Self> {
        let method = config.http_method()?;
        let dns = Arc::new(SharedDns::new(config.dns_timeout));
        let client = Client::builder()
            .no_proxy()
            .dns_resolver(Arc::clone(&dns))
            .redirect(Policy::none())
            .danger_accept_invalid_certs(true)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            dns,
            method,
            servers: config.servers.clone(),
            schemes: config.schemes,
        })
    }

    pub fn dns(&self) -> &SharedDns {
        &self.dns
    }

    async fn resolve(&self, target: &Target) -> Option<Vec<IpAddr>> {
        if let Some(ip) = target.ip() {
            return Some(vec![ip]);
        }

        match self.dns.lookup(&target.host).await {
            Ok(ips) => Some(ips),
            Err(e) => {
                debug!(error = %e, "dns lookup failed");
                None
            }
        }
    }

    /// Sends one request per `(scheme, url)` attempt.
    ///
    /// A transport error moves on to the next attempt. A BalanceExhaust
    /// redirect drops the target: `None`, even if an earlier attempt already
    /// answered.
    async fn fetch_all(
        &self,
        target: &Target,
        ips: &[IpAddr],
        attempts: &[(&'static str, String)],
    ) -> Option<Vec<DirectResponse>> {
        let mut results = Vec::new();

        for &(scheme, ref url) in attempts {
            let response = match self.client.request(self.method.clone(), url).send().await {
                Ok(response) => response,
                Err(e) => {
                    debug!(%url, error = %e, "request failed");
                    continue;
                }
            };

            let status = response.status().as_u16();
            let headers = ServerHeaders::from_headers(response.headers());
            let classification = match classify(&self.servers, &headers) {
                Verdict::Abort => {
                    debug!(%url, "balance exhausted redirect, dropping target");
                    return None;
                }
                Verdict::Hit(classification) => classification,
            };

            results.push(DirectResponse {
                target: target.clone(),
                scheme,
                ips: ips.to_vec(),
                status,
                server: classification.label,
                group: classification.group,
                palette: classification.palette,
                location: headers.location,
            });
        }

        Some(results)
    }
}

#[async_trait]
impl Probe for DirectProbe {
    type Payload = Target;
    type Output = DirectResponse;

    async fn probe(&self, ctx: &ScanContext<DirectResponse>, job: Job<Target>) {
        let target = job.payload;
        let Some(ips) = self.resolve(&target).await else {
            return;
        };
        let _pin = target
            .ip()
            .is_none()
            .then(|| self.dns.pin(&target.host, ips.clone()));

        let attempts: Vec<(&'static str, String)> = self
            .schemes
            .as_slice()
            .iter()
            .map(|&scheme| (scheme, format!("{scheme}://{}", target.authority())))
            .collect();

        let Some(results) = self.fetch_all(&target, &ips, &attempts).await else {
            return;
        };
        for result in results {
            let line = result.palette.paint(&result.summary_line()).to_string();
            ctx.record_success(result);
            ctx.log(line);
        }
    }
}
