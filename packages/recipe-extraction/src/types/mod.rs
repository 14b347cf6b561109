//! Core data types for the recipe extraction pipeline.

pub mod config;
pub mod content;
pub mod generation;
pub mod input;
pub mod outcome;
pub mod recipe;
