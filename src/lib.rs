//! OKR Coach - Conversation Phase State Machine
//!
//! This crate implements the phase progression engine for a conversational
//! OKR authoring coach: phase ordering, per-phase readiness evaluation,
//! transition validation, audit events, and snapshot-based rollback.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
