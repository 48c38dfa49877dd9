pub mod disbursement_lock;
pub mod orchestrator;

pub use disbursement_lock::DisbursementLocks;
pub use orchestrator::{DisbursementReceipt, PaymentReceipt, TransactionOrchestrator};
