mod document;
mod document_store;
mod query;
mod transaction;

pub use document::*;
pub use document_store::*;
pub use query::*;
pub use transaction::*;
