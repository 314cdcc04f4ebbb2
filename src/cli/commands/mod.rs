//! Command handlers for the CLI

mod init;
mod remind;
mod users;

pub use init::cmd_init;
pub use remind::cmd_remind;
pub use users::cmd_list_users;
