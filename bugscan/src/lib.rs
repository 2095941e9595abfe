//! # bugscan
//!
//! A library for building host reconnaissance scanners: probe many candidate
//! hostnames concurrently and classify what answers by server fingerprint.
//!
//! ## Features
//!
//! - **Scanner engine** ([`scanner`]) - a bounded worker pool that runs a
//!   probe over a list of jobs, collects successes from every worker without
//!   races, streams log lines safely and runs a single completion callback
//!   once the queue is drained
//! - **Direct scan mode** ([`direct`]) - resolves each host, sends an HTTP
//!   request over plain and/or TLS connections and classifies the `Server`
//!   header against a list of CDN and web server names
//! - **Target lists** ([`targets`]) - parsing and loading of `host[:port]`
//!   domain lists
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bugscan::config::DirectConfig;
//! use bugscan::direct::{DirectProbe, GroupedReport};
//! use bugscan::scanner::Scanner;
//! use bugscan::targets::Target;
//!
//! #[tokio::main]
//! async fn main() -> bugscan::Result<()> {
//!     let config = DirectConfig::default();
//!     let probe = DirectProbe::new(&config)?;
//!     let scanner = Scanner::new(64, probe)?;
//!
//!     for host in ["example.com", "example.org"] {
//!         let target: Target = host.parse()?;
//!         scanner.add(host, target)?;
//!     }
//!
//!     let report = scanner
//!         .run(|done| GroupedReport::from_responses(done.successes()))
//!         .await?;
//!     println!("{}", report.to_text());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **`scanner`** - generic concurrent job engine, knows nothing about DNS
//!   or HTTP
//! - **`direct`** - the direct scan mode: probe, classification, report
//! - **`targets`** - target parsing and domain list loading
//! - **`config`** - explicit configuration handed to probes at construction
//! - **`error`** - the crate's error type

pub mod config;
pub mod direct;
pub mod error;
pub mod scanner;
pub mod targets;

pub use error::{Error, Result};
