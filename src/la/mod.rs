//! Linear-algebra sinks: the generic tensor contract and its reference backends.

pub mod dense;
pub mod factory;
pub mod scalar;
pub mod tensor;
