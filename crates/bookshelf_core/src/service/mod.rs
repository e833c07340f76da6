//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store mutations and persistence into use-case level APIs.
//! - Keep the CLI decoupled from cell layout and storage details.

pub mod inventory_service;
