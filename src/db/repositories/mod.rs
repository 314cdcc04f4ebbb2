pub mod invite;
pub mod sponsor;
pub mod user;
