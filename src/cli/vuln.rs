//! `hakstore vulns ...`

use anyhow::{Result, anyhow};

use hakstore::store::{EntityKind, NewVuln, Severity, Vuln};

use super::{Ctx, split_list};
use crate::commands::VulnCommands;

pub fn vuln_line(v: &Vuln) -> String {
    format!(
        "#{} [{}] {} ({})",
        v.id,
        v.severity.as_str(),
        v.description,
        if v.program_id.is_empty() { "-" } else { v.program_id.as_str() }
    )
}

pub fn vuln_command(ctx: &Ctx, command: VulnCommands) -> Result<()> {
    let client = &ctx.client;
    match command {
        VulnCommands::List => ctx.emit_ids(&client.vulns()?, vuln_line),
        VulnCommands::Get { id } => {
            let vuln = client.vuln(id)?;
            ctx.emit(&vuln, |v| {
                println!("{}", vuln_line(v));
                if !v.subdomains.is_empty() {
                    println!("  subdomains: {}", v.subdomains.join(", "));
                }
                if !v.ips.is_empty() {
                    println!("  ips: {}", v.ips.join(", "));
                }
            })
        }
        VulnCommands::Create {
            severity,
            description,
            program,
            subdomains,
            ips,
        } => {
            let severity = Severity::parse(&severity)
                .ok_or_else(|| anyhow!("unknown severity {severity:?} (use 1-5 or a name)"))?;
            let mut new = NewVuln::new(description, severity);
            new.program_id = program;
            new.subdomains = subdomains.as_deref().map(split_list).unwrap_or_default();
            new.ips = ips.as_deref().map(split_list).unwrap_or_default();

            let created = client.create_vulns(&[new])?;
            ctx.emit_ids(&created, vuln_line)
        }
        VulnCommands::Delete { id } => {
            ctx.emit_report(&client.delete(EntityKind::Vuln, &id.to_string())?)
        }
    }
}
