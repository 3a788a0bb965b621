pub mod callback;
pub mod proxy;
