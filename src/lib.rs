//! hakstore - bug bounty recon asset store
//!
//! Tracks platforms, programs, root domains, subdomains, IP addresses and
//! vulnerabilities as a linked graph in SQLite, and serves it over a small REST API.
//!
//! ## Layout
//!
//! - [`store`]: entities, upsert policy, derived fields, associations and cascade delete
//! - [`jobs`]: named FIFO queues feeding external scanners
//! - [`notify`]: severity-routed webhook alerts for new vulns
//! - [`auth`]: API key lookup for the access gate
//! - [`server`]: the `/api` HTTP surface
//! - [`client`]: HTTP client used by the CLI
//! - [`export`]: Markdown export of the hierarchy
//! - [`config`]: `~/.hakstore/config.toml` plus `HAKSTORE_*` overrides

pub mod auth;
pub mod client;
pub mod config;
pub mod export;
pub mod jobs;
pub mod notify;
pub mod server;
pub mod store;
