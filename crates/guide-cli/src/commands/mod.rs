//! Command handlers

pub mod config;
pub mod export;
pub mod link;
pub mod reference;
pub mod status;
