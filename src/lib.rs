//! Stagecue: staged execution engine for scripted operational consoles
//!
//! This library provides the building blocks for multi-phase execution
//! sequences: a weighted phase plan, a cancellation-aware engine that
//! advances through sub-steps on a timed schedule, a bounded log stream,
//! and a stable priority ranker for mitigation checklists.

pub mod cancel;
pub mod checklist;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod observability;
pub mod plan;
pub mod progress;
pub mod schedule;
pub mod source;
pub mod stream;
