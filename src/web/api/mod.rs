pub mod catalog;
pub mod dates;
pub mod error;
