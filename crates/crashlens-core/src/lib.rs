//! CrashLens Core - Domain types and ports
//!
//! This crate contains the shared core of the reporting client:
//! - **Domain types** - `ValueNode`, `DynamicRecord`, `Person`, levels and telemetry types
//! - **Configuration** - YAML-backed `Config` with validation and a builder
//! - **Port definitions** - Traits for collaborators: `PayloadSender`, `RecordStore`, `LogSink`
//!
//! # Architecture
//!
//! The domain module is pure data and validation with no I/O. Ports define
//! the trait interfaces the telemetry and session crates depend on; hosts
//! supply the implementations.

pub mod config;
pub mod domain;
pub mod ports;
