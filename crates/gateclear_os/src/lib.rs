#![forbid(unsafe_code)]

pub mod admin;
pub mod drafts;
pub mod pdf;
pub mod submit;
pub mod uploader;
