pub mod builder;
pub mod cli;
pub mod collector;
pub mod config;
pub mod error;
pub mod job;
pub mod message;
pub mod sink;

pub use photo_office_common as common;
