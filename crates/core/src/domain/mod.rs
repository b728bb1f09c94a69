pub mod document;
pub mod property;
pub mod renovation;
pub mod transaction;
pub mod viewing;
