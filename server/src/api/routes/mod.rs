//! API route handlers

pub mod calls;
pub mod health;
pub mod pricing;
