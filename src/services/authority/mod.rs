pub mod client;
pub mod factory;
pub mod hub;

pub use client::{AuthorityClient, AuthorityError, Credential, StateNonce, UserIdentity};
pub use factory::build_authority;
pub use hub::HubAuthority;
