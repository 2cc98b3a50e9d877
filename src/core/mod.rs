//! Core Module - Risk Scoring Pipeline
//!
//! Graph proximity, drain simulation, default substitution, aggregation and
//! the orchestrator that runs them per request.

pub mod defaults;
pub mod drain;
pub mod graph;
pub mod orchestrator;
pub mod patterns;
pub mod risk_score;

pub use defaults::*;
pub use drain::*;
pub use graph::*;
pub use orchestrator::*;
pub use patterns::*;
pub use risk_score::*;
