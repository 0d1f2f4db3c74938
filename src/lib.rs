//! researchd - multi-phase research workflow service.
//!
//! Given a natural-language query, the service plans a set of targeted web
//! searches, executes them against one or two search providers, and
//! synthesizes a cited report. Supports dual-search mode (both engines run
//! in parallel, two candidate reports are generated, a judge model picks
//! the winner) and one-way model-provider fallback.

pub mod api;
pub mod config;
pub mod error;
pub mod memory;
pub mod providers;
pub mod templates;
pub mod workflow;
