pub mod authority;
pub mod proxy;
pub mod session;
