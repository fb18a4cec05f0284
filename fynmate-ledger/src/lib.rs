//! fynmate-ledger: persistence collaborators (SQLite store, remote API sink),
//! spending summary, and the HTTP query API

pub mod error;
pub mod remote;
pub mod server;
pub mod store;
pub mod summary;

pub use error::LedgerError;
pub use remote::ApiSink;
pub use server::{AppState, router, serve};
pub use store::{RecordSink, SqliteStore, StoredTransaction};
pub use summary::{Summary, summarize};
