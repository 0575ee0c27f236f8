//! Utility functions for the application

pub mod compression;
pub mod json;
pub mod path;
pub mod string;
pub mod time;
