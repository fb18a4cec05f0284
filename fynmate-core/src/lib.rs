//! fynmate-core: transaction types, the shared category/payment catalog, time
//! policy and chat reply formatting

pub mod candidate;
pub mod catalog;
pub mod reply;
pub mod time;

pub use candidate::{TransactionCandidate, TransactionRecord, UserContext};
pub use catalog::{Category, PaymentMethod};
pub use time::TimePolicy;
