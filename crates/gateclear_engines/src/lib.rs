#![forbid(unsafe_code)]

pub mod fieldmap;
pub mod forms;
pub mod normalize;
pub mod quiz;
pub mod stepcheck;
