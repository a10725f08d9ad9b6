pub mod catalog;
pub mod serve;
pub mod token;
