#![forbid(unsafe_code)]

pub mod submit;
