pub mod document;
pub mod extract;
pub mod renovation;
pub mod search;
pub mod transaction;
pub mod viewing;

pub use document::DocumentAgent;
pub use renovation::RenovationAgent;
pub use search::SearchAgent;
pub use transaction::TransactionAgent;
pub use viewing::ViewingAgent;
