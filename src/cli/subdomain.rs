//! `hakstore subdomains ...`

use anyhow::{Context, Result, bail};
use std::path::Path;

use hakstore::store::{EntityKind, NewSubdomain, Subdomain, SubdomainUpdate};

use super::{Ctx, split_list};
use crate::commands::SubdomainCommands;

fn print_subdomain(s: &Subdomain) {
    println!("{}", s.id);
    println!("  rootdomain: {}", s.root_domain_id);
    println!("  program: {}", s.program_id);
    if let Some(cname) = &s.cname {
        println!("  cname: {cname}");
    }
    if let Some(ns) = &s.nameservers {
        println!("  nameservers: {}", ns.join(", "));
    }
    if !s.ips.is_empty() {
        println!("  ips: {}", s.ips.join(", "));
    }
}

/// One subdomain per non-empty line, `#` lines skipped, duplicates dropped
fn read_import(path: &Path, rootdomain: &str) -> Result<Vec<NewSubdomain>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut seen = std::collections::HashSet::new();
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| seen.insert(line.to_string()))
        .map(|line| NewSubdomain::new(line, rootdomain))
        .collect())
}

pub fn subdomain_command(ctx: &Ctx, command: SubdomainCommands) -> Result<()> {
    let client = &ctx.client;
    match command {
        SubdomainCommands::List { recent } => {
            let subdomains = match recent {
                Some(minutes) => client.recent_subdomains(minutes)?,
                None => client.subdomains()?,
            };
            ctx.emit_ids(&subdomains, |s| s.id.clone())
        }
        SubdomainCommands::Get { id } => ctx.emit(&client.subdomain(&id)?, print_subdomain),
        SubdomainCommands::Create {
            id,
            rootdomain,
            cname,
        } => {
            let mut new = NewSubdomain::new(id, rootdomain);
            new.cname = cname;
            let created = client.create_subdomains(&[new])?;
            ctx.emit_ids(&created, |s| format!("subdomain {} (program: {})", s.id, s.program_id))
        }
        SubdomainCommands::Update {
            id,
            rootdomain,
            cname,
            nameservers,
        } => {
            let update = SubdomainUpdate {
                root_domain_id: rootdomain,
                cname,
                nameservers: nameservers.as_deref().map(split_list),
            };
            if update.is_empty() {
                bail!("nothing to update: pass --rootdomain, --cname or --nameservers");
            }
            ctx.emit(&client.update_subdomain(&id, &update)?, print_subdomain)
        }
        SubdomainCommands::Delete { id } => {
            ctx.emit_report(&client.delete(EntityKind::Subdomain, &id)?)
        }
        SubdomainCommands::AssociateIps { id, ips } => {
            let addresses = split_list(&ips);
            if addresses.is_empty() {
                bail!("--ips needs at least one address");
            }
            let linked = client.associate_ips(&id, &addresses)?;
            ctx.emit_ids(&linked, |ip| format!("{} -> {}", id, ip.id))
        }
        SubdomainCommands::Import { file, rootdomain } => {
            let batch = read_import(&file, &rootdomain)?;
            if batch.is_empty() {
                bail!("{} has no subdomains", file.display());
            }
            let created = client.create_subdomains(&batch)?;
            ctx.emit(&created, |created| {
                println!("Imported {} subdomains under {}", created.len(), rootdomain)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_import() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "www.tesla.com\n\n# comment\n  api.tesla.com \nwww.tesla.com").unwrap();

        let batch = read_import(file.path(), "tesla.com").unwrap();
        let ids: Vec<&str> = batch.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["www.tesla.com", "api.tesla.com"]);
        assert!(batch.iter().all(|s| s.root_domain_id == "tesla.com"));
    }
}
