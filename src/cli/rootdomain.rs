//! `hakstore rootdomains ...`

use anyhow::Result;

use hakstore::store::{EntityKind, NewRootDomain, RootDomainUpdate};

use super::Ctx;
use crate::commands::RootDomainCommands;

pub fn rootdomain_command(ctx: &Ctx, command: RootDomainCommands) -> Result<()> {
    let client = &ctx.client;
    match command {
        RootDomainCommands::List => ctx.emit_ids(&client.root_domains()?, |r| r.id.clone()),
        RootDomainCommands::Get { id } => {
            let root = client.root_domain(&id)?;
            ctx.emit(&root, |r| {
                println!("{}", r.id);
                println!("  program: {}", r.program_id);
            })
        }
        RootDomainCommands::Create { id, program } => {
            let created = client.create_root_domains(&[NewRootDomain::new(id, program)])?;
            ctx.emit_ids(&created, |r| format!("rootdomain {} (program: {})", r.id, r.program_id))
        }
        RootDomainCommands::Update { id, program } => {
            let update = RootDomainUpdate {
                program_id: program,
            };
            let updated = client.update_root_domain(&id, &update)?;
            ctx.emit(&updated, |r| {
                println!("updated rootdomain {} (program: {})", r.id, r.program_id)
            })
        }
        RootDomainCommands::Delete { id } => {
            ctx.emit_report(&client.delete(EntityKind::RootDomain, &id)?)
        }
        RootDomainCommands::Subdomains { id } => {
            ctx.emit_ids(&client.root_domain_subdomains(&id)?, |s| s.id.clone())
        }
    }
}
