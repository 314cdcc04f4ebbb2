pub mod sponsor;
pub mod user;

pub use sponsor::{MonthCount, NewSponsor, Sponsor};
pub use user::{Invite, PendingOtp, User};
