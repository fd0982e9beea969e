//! `hakstore users ...`

use anyhow::Result;

use hakstore::store::NewUser;

use super::Ctx;
use crate::commands::UserCommands;

pub fn user_command(ctx: &Ctx, command: UserCommands) -> Result<()> {
    let client = &ctx.client;
    match command {
        UserCommands::List => ctx.emit_ids(&client.users()?, |u| format!("{}\t{}", u.id, u.key)),
        UserCommands::Create { id } => {
            let created = client.create_users(&[NewUser::new(id)])?;
            ctx.emit_ids(&created, |u| format!("{}\t{}", u.id, u.key))
        }
    }
}
