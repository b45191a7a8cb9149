// Core modules implementing account storage, kernel staging, and error modeling.
pub mod accounts;
pub mod error;
pub mod fsutil;
pub mod layout;
pub mod metadata;
pub mod publisher;
pub mod runner;
pub mod script;
