//! Repository implementations
//!
//! Repositories own the SQL and the row types; they return [`DatabaseError`]
//! and know nothing about ports. Writes that must land together share one
//! transaction.
//!
//! [`DatabaseError`]: crate::DatabaseError

pub mod invoices;
pub mod series;
pub mod reminders;
pub mod directory;

pub use invoices::InvoiceRepository;
pub use reminders::ReminderLogRepository;
pub use directory::DirectoryRepository;
