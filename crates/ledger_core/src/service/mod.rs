//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Own unit-of-work boundaries: begin, commit, roll back.

pub mod blog_service;
pub mod transfer_service;
