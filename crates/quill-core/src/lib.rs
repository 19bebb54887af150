//! Quill Core: shared domain abstractions.
//!
//! This crate defines the fundamental traits and types that the content
//! generation context and its infrastructure depend on. It contains no
//! infrastructure code.

pub mod bus;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod generation;
pub mod projection;
pub mod store;
