pub mod donations;
pub mod email;
pub mod notifications;
pub mod payment;
pub mod pdf;
pub mod receipts;
pub mod reminders;
pub mod reports;
pub mod scheduler;
pub mod storage;
