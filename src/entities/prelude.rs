pub use super::sponsors::Entity as Sponsors;
pub use super::superuser_invites::Entity as SuperuserInvites;
pub use super::users::Entity as Users;
