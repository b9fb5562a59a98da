//! # lex-core
//!
//! Core types, ID prefixes, and error types for Lexora.
//!
//! This crate provides the foundational types shared across all Lexora crates:
//! - Entity structs for all domain objects (accounts, classrooms, tests, payments, ...)
//! - Role and status enums with state machine transitions
//! - ID prefix constants
//! - Cross-cutting error types
//! - Authenticated identity passed from the auth layer to services
//! - API response shapes

pub mod entities;
pub mod enums;
pub mod errors;
pub mod identity;
pub mod ids;
pub mod responses;
