//! Scalar values, type tags and value domains.

mod domain;
mod value;

pub use domain::ValueDomain;
pub use value::{Scalar, TypeTag};
