//! Identity: bearer tokens minted by the external identity provider are
//! verified here. Issuance lives elsewhere.

pub(crate) mod claims;
pub(crate) mod extractors;
pub(crate) mod jwt;

pub use extractors::AuthUser;
