pub mod transaction;

pub use transaction::{BundleKind, NewTransaction, Transaction, TransactionStatus, UnknownStatus};
