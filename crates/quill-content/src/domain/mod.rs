//! Domain types for the Content Generation context.

pub mod commands;
pub mod events;
pub mod queries;
pub mod read_model;
