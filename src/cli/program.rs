//! `hakstore programs ...`

use anyhow::Result;

use hakstore::store::{EntityKind, NewProgram, ProgramUpdate};

use super::Ctx;
use super::vuln::vuln_line;
use crate::commands::ProgramCommands;

pub fn program_command(ctx: &Ctx, command: ProgramCommands) -> Result<()> {
    let client = &ctx.client;
    match command {
        ProgramCommands::List => ctx.emit_ids(&client.programs()?, |p| p.id.clone()),
        ProgramCommands::Get { id } => {
            let program = client.program(&id)?;
            ctx.emit(&program, |p| {
                println!("{}", p.id);
                println!("  platform: {}", p.platform_id);
            })
        }
        ProgramCommands::Create { id, platform } => {
            let created = client.create_programs(&[NewProgram::new(id, platform)])?;
            ctx.emit_ids(&created, |p| format!("program {} (platform: {})", p.id, p.platform_id))
        }
        ProgramCommands::Update { id, platform } => {
            let update = ProgramUpdate {
                platform_id: platform,
            };
            let updated = client.update_program(&id, &update)?;
            ctx.emit(&updated, |p| {
                println!("updated program {} (platform: {})", p.id, p.platform_id)
            })
        }
        ProgramCommands::Delete { id } => ctx.emit_report(&client.delete(EntityKind::Program, &id)?),
        ProgramCommands::Rootdomains { id } => {
            ctx.emit_ids(&client.program_root_domains(&id)?, |r| r.id.clone())
        }
        ProgramCommands::Subdomains { id } => {
            ctx.emit_ids(&client.program_subdomains(&id)?, |s| s.id.clone())
        }
        ProgramCommands::Ips { id } => ctx.emit_ids(&client.program_ips(&id)?, |ip| ip.id.clone()),
        ProgramCommands::Vulns { id } => ctx.emit_ids(&client.program_vulns(&id)?, vuln_line),
    }
}
