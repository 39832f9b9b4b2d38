//! Knowledge distillation.
//!
//! Teacher-to-student transfer with temperature-softened KL divergence.

pub mod distiller;

pub use distiller::{DistillConfig, Distiller};
