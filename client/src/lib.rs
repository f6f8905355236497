//! On-device half of the task manager: credential store, REST client, and
//! the local reminder scheduler. Views are expected to own a [`Session`]
//! and pass it to the [`ApiClient`] explicitly — there is no ambient
//! logged-in state.

pub mod api;
pub mod error;
pub mod notify;
pub mod reminders;
pub mod session;

pub use api::ApiClient;
pub use error::ClientError;
pub use notify::{notifier_from_env, NoopNotifier, Notifier, NotifyError, TimerNotifier};
pub use reminders::{Reminder, ReminderKind, ReminderLedger, ReminderScheduler};
pub use session::{Session, SessionStore};
