//! Core library for the applicant review console.
//!
//! The `review` module owns the rubric data model, the override edit
//! lifecycle, and the reconciliation fan-out that keeps mounted presentation
//! regions consistent with the scoring backend. `config`, `error`, and
//! `telemetry` carry the service plumbing shared with `services/api`.

pub mod config;
pub mod error;
pub mod review;
pub mod telemetry;
