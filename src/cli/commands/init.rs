//! Init command handler

use crate::config::Config;

pub fn cmd_init() -> anyhow::Result<()> {
    if Config::create_default_if_missing()? {
        println!("Created default config.toml");
        println!("Set server.secret_key (64+ characters) and the [mail] section before serving.");
    } else {
        println!("config.toml already exists; left untouched.");
    }
    Ok(())
}
