/*
 * Responsibility
 * - Public entry of the HTTP surface (re-export routes())
 */
pub mod extractors;
pub mod handlers;
mod routes;

pub use routes::routes;
