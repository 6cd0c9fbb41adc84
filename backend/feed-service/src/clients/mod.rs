/// Clients for collaborating services
pub mod identity;

pub use identity::{HttpIdentityClient, IdentityLookup, UserRef, UserSummary};
