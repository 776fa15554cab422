//! Code generator adapters. Implement CodeGenerator.

pub mod random;

pub use random::{RandomCodeGenerator, SequenceCodeGenerator};
