pub mod layout;
pub mod store;
pub mod transaction;

pub use layout::StorageLayout;
pub use store::Store;
pub use transaction::{Transaction, TransactionState};
