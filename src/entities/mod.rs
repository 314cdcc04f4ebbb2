pub mod prelude;

pub mod sponsors;
pub mod superuser_invites;
pub mod users;
