//! Waste Hotspot Detection Service
//!
//! This library provides the core functionality for sutham, which sends
//! photographs of public spaces to a hosted vision LLM and extracts
//! structured waste hotspot tickets via a single declared tool callback,
//! plus a prompt-only garbage composition report pipeline.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
