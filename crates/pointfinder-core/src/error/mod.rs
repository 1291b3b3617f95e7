//! Error types for the Pointfinder client
//!
//! A single error enum is shared by every component. Variants carry the
//! context needed to decide how a failed action is treated (see
//! [`crate::recovery`]), so the sync engine never inspects message strings.

mod classifiers;
mod constructors;
mod conversions;
mod types;

pub use types::{PointfinderError, PointfinderResult};
