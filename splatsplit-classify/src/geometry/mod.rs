//! Camera geometry

pub mod projection;

pub use projection::{Projection, Projector};
