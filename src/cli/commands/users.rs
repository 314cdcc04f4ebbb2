//! Users command handler

use crate::config::Config;
use crate::db::Store;

pub async fn cmd_list_users(config: &Config) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let users = store.list_users().await?;

    if users.is_empty() {
        println!("No users registered.");
        println!();
        println!("The first account created through /register becomes an administrator.");
        return Ok(());
    }

    println!("Users ({} total)", users.len());
    println!("{:-<70}", "");

    for user in users {
        let role = match (user.is_superuser, user.is_verified) {
            (true, true) => "admin",
            (true, false) => "superuser (unverified)",
            _ => "user",
        };
        println!("{:>4}  {:<20} {:<30} {}", user.id, user.username, user.email, role);
    }

    Ok(())
}
