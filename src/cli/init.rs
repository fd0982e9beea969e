//! Init command implementation

use anyhow::Result;
use std::path::Path;

use hakstore::config::Config;

pub fn init_command(config_path: &Path, force: bool) -> Result<()> {
    if Config::init_file(config_path, force)? {
        println!("Wrote {}", config_path.display());
        println!("Set [client].api_key to the admin key printed by `hakstore serve`.");
    } else {
        println!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }
    Ok(())
}
