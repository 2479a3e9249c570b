pub mod availability;
pub mod duration;
pub mod ledger;
pub mod notifier;
pub mod policy;
pub mod reminders;
