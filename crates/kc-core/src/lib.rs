//! Domain layer for the interview console: guide parsing, question
//! classification, analysis-version selection and answer reconciliation.
//!
//! Nothing in this crate performs IO. The backend is reached through the
//! [`core::ConsoleBackend`] port, implemented by `kc-client`.

pub mod core_domain;

pub use core_domain as core;
