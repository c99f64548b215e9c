//! Request and response bodies

pub mod invoices;
