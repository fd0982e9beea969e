//! `hakstore ips ...`

use anyhow::Result;

use hakstore::store::{Ip, NewIp};

use super::Ctx;
use crate::commands::IpCommands;

fn ip_line(ip: &Ip) -> String {
    if ip.program_id.is_empty() {
        ip.id.clone()
    } else {
        format!("{} ({})", ip.id, ip.program_id)
    }
}

pub fn ip_command(ctx: &Ctx, command: IpCommands) -> Result<()> {
    let client = &ctx.client;
    match command {
        IpCommands::List => ctx.emit_ids(&client.ips()?, ip_line),
        IpCommands::Get { address, program } => {
            ctx.emit_ids(&client.ip(&address, program.as_deref())?, ip_line)
        }
        IpCommands::Create { address, program } => {
            let created = client.create_ips(&[NewIp::new(address, program)])?;
            ctx.emit_ids(&created, |ip| format!("created {}", ip_line(ip)))
        }
        IpCommands::Delete { address, program } => {
            ctx.emit_report(&client.delete_ip(&address, program.as_deref())?)
        }
    }
}
