//! ledgerlens-parse: normalization, parsing strategies, reconciliation and
//! the end-to-end conversion pipeline.

pub mod classify;
pub mod engine;
pub mod normalizer;
pub mod pipeline;
pub mod reconcile;
pub mod strategy;

pub use engine::ParsingEngine;
pub use normalizer::{normalize, normalize_text};
pub use pipeline::{Conversion, Converter};
pub use reconcile::{Reconciliation, reconcile};
pub use strategy::{LineStrategy, ParseStrategy, StandardStrategy, TabularStrategy, default_chain};
