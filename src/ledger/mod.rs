pub mod error;
pub mod persistence;
pub mod store;

pub use error::{LedgerError, LedgerErrorKind};
pub use persistence::JsonDocument;
pub use store::{BookStore, CreditBook, CreditStore, ScopedBook, ViolationBook, ViolationStore};
