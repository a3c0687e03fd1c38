// The binary entry point is main.rs; the module tree lives here so that
// integration tests and benchmarks can reach the quiz core directly.

rust_i18n::i18n!("locales", fallback = "en");

pub mod app;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod event;
pub mod session;
pub mod store;
pub mod ui;
