pub mod mailer;
pub use mailer::{EmailMessage, LogMailer, MailError, Mailer, SmtpMailer};

pub mod templates;
pub use templates::TemplateEngine;

pub mod notification;
pub use notification::Notifier;

pub mod reminder;
pub use reminder::{ReminderReport, ReminderService};

pub mod scheduler;
pub use scheduler::Scheduler;

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, LoginOutcome};
pub use auth_service_impl::SeaOrmAuthService;
