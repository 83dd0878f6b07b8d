#![forbid(unsafe_code)]

pub mod application;
pub mod audit;
pub mod common;
pub mod date;
pub mod document;
pub mod placeholder;
pub mod steps;

pub use common::{ContractViolation, MonotonicTimeNs, ReasonCodeId, SchemaVersion, Validate};
