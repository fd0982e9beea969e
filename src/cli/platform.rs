//! `hakstore platforms ...`

use anyhow::Result;

use hakstore::store::{EntityKind, NewPlatform, PlatformUpdate};

use super::Ctx;
use crate::commands::PlatformCommands;

pub fn platform_command(ctx: &Ctx, command: PlatformCommands) -> Result<()> {
    let client = &ctx.client;
    match command {
        PlatformCommands::List => ctx.emit_ids(&client.platforms()?, |p| p.id.clone()),
        PlatformCommands::Get { id } => {
            let platform = client.platform(&id)?;
            ctx.emit(&platform, |p| {
                println!("{}", p.id);
                if !p.url.is_empty() {
                    println!("  url: {}", p.url);
                }
            })
        }
        PlatformCommands::Create { id, url } => {
            let created = client.create_platforms(&[NewPlatform::new(id, url)])?;
            ctx.emit_ids(&created, |p| format!("created platform {}", p.id))
        }
        PlatformCommands::Update { id, url } => {
            let updated = client.update_platform(&id, &PlatformUpdate { url })?;
            ctx.emit(&updated, |p| println!("updated platform {} (url: {})", p.id, p.url))
        }
        PlatformCommands::Delete { id } => {
            ctx.emit_report(&client.delete(EntityKind::Platform, &id)?)
        }
        PlatformCommands::Programs { id } => {
            ctx.emit_ids(&client.platform_programs(&id)?, |p| p.id.clone())
        }
    }
}
