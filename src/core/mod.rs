//! Core types shared across the engine: the error enum and small value types
//! that do not belong to any one larger module (dimension, expr, problem).

mod error;

pub use error::{EngineError, EngineResult};
