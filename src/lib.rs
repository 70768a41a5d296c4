//! threadline library crate.

pub mod block;
pub mod config;
pub mod domain;
pub mod editor;
pub mod fixtures;
pub mod history;
pub mod render;
pub mod report;
pub mod session;
pub mod source;
pub mod thread;
