//! Request security for feed-service

pub mod token_blacklist;

pub use token_blacklist::{bearer_token, TokenBlacklist};
