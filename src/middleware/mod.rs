/*
 * Responsibility
 * - Public entry for middleware (auth gate, CORS, HTTP-level layers)
 */
pub mod auth;
pub mod cors;
pub mod http;
