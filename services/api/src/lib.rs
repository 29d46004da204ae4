//! Receptionist API Library Crate
//!
//! This library contains the HTTP surface of the receptionist service: the
//! configuration loader, the application state, the route handlers, and
//! routing. The binaries under `bin/` are thin wrappers around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod pages;
pub mod router;
pub mod state;
