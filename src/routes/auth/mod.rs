pub mod claims;
pub mod elevate;
pub mod identity;
pub mod session;

pub use elevate::{elevate_to_authority, verify_authority_code};
