//! Rocket Cart Core - Shared types library.
//!
//! This crate provides the domain types used across all Rocket Cart components:
//! - `rocket-cart` - Cart engine, persistence, and stock gateway
//! - `rocket-cart-cli` - Terminal front end for browsing products and editing the cart
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Product identifiers, prices, products, and the cart itself

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
