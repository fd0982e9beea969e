//! CLI command implementations
//!
//! Everything except `serve` and `init` talks to a running server through
//! [`ApiClient`].

pub mod export;
pub mod init;
pub mod ip;
pub mod job;
pub mod platform;
pub mod program;
pub mod rootdomain;
pub mod serve;
pub mod subdomain;
pub mod user;
pub mod vuln;

use anyhow::Result;
use serde::Serialize;

use hakstore::client::ApiClient;

use crate::commands::Commands;

/// What every client command needs
pub struct Ctx {
    pub client: ApiClient,
    pub json: bool,
}

impl Ctx {
    /// Print a value as pretty JSON, or hand it to `plain`
    pub fn emit<T: Serialize>(&self, value: &T, plain: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            plain(value);
        }
        Ok(())
    }

    /// Print a list: JSON, or one id per line
    pub fn emit_ids<T: Serialize>(&self, items: &[T], id: impl Fn(&T) -> String) -> Result<()> {
        self.emit(&items, |items| {
            if items.is_empty() {
                eprintln!("(none)");
            }
            for item in items.iter() {
                println!("{}", id(item));
            }
        })
    }

    /// Print a cascade report from a DELETE
    pub fn emit_report(&self, report: &serde_json::Value) -> Result<()> {
        self.emit(report, |report| {
            let removed = report["removed"].as_array().map(Vec::len).unwrap_or(0);
            println!(
                "Deleted {} ({} nodes, {} edges cleared)",
                report["root"].as_str().unwrap_or("?"),
                removed,
                report["edges_cleared"]
            );
        })
    }
}

/// Split a comma separated flag value, dropping blanks
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn run_client_command(ctx: &Ctx, command: Commands) -> Result<()> {
    match command {
        Commands::Platforms { command } => platform::platform_command(ctx, command),
        Commands::Programs { command } => program::program_command(ctx, command),
        Commands::Rootdomains { command } => rootdomain::rootdomain_command(ctx, command),
        Commands::Subdomains { command } => subdomain::subdomain_command(ctx, command),
        Commands::Ips { command } => ip::ip_command(ctx, command),
        Commands::Vulns { command } => vuln::vuln_command(ctx, command),
        Commands::Jobs { command } => job::job_command(ctx, command),
        Commands::Users { command } => user::user_command(ctx, command),
        Commands::Export { dir } => export::export_command(ctx, &dir),
        Commands::Serve { .. } | Commands::Init { .. } => {
            anyhow::bail!("serve and init do not talk to a server")
        }
    }
}
