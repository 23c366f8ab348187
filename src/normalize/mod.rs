//! Response normalization
//!
//! Converts remote payload shapes into a uniform `PagedResult`.
//!
//! # Invariants
//!
//! - Every returned row has an id, unique within the page
//! - Malformed payloads are never fatal: empty page plus a WARN event

mod errors;
mod normalizer;

pub use errors::NormalizeError;
pub use normalizer::{Normalized, ResponseNormalizer, SCALAR_ITEM_FIELD};
