//! Export command implementation

use anyhow::Result;
use std::path::Path;

use hakstore::export::export_markdown;

use super::Ctx;

pub fn export_command(ctx: &Ctx, dir: &Path) -> Result<()> {
    let summary = export_markdown(&ctx.client, dir)?;
    println!(
        "Exported {} platforms, {} programs, {} root domains, {} subdomains to {}",
        summary.platforms,
        summary.programs,
        summary.root_domains,
        summary.subdomains,
        dir.display()
    );
    Ok(())
}
