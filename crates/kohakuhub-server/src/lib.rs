//! # kohakuhub-server
//!
//! The process entry point for a KohakuHub instance: configuration
//! loading, database/blob-store/versioned-store wiring, and the
//! ambient stack (health checks, metrics, resilience primitives,
//! request-size limiting) that sits around the `kohakuhub-api` router.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   kohakuhub-server                     │
//! ├──────────────────────────────────────────────────────┤
//! │  kohakuhub-api router (REST, Git Smart HTTP, LFS)      │
//! │  /health, /health/live, /health/ready, /health/startup  │
//! │  /metrics (Prometheus)                                 │
//! ├──────────────────────────────────────────────────────┤
//! │  kohakuhub-db (Postgres)                               │
//! │  kohakuhub-blobstore (S3-compatible)                   │
//! │  kohakuhub-vstore (versioned-store bridge)             │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cargo run --bin kohakuhub-server -- --api-addr 127.0.0.1:8080
//! ```
//!
//! ## Modules
//!
//! - [`config`] - configuration management
//! - [`health`] - liveness/readiness/startup probes
//! - [`observability`] - structured logging, request IDs, metrics
//! - [`performance`] - connection pooling, request coalescing, cache headers
//! - [`resilience`] - retry policy and circuit breaker
//! - [`validation`] - request body size limiting

pub mod config;
pub mod health;
pub mod observability;
pub mod performance;
pub mod resilience;
pub mod validation;
