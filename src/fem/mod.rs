//! Forms and the registries they are built from.
//!
//! - [`kernel`]: generated-code collaborator (descriptor, integral kernels)
//! - [`function_space`]: argument spaces bound to form slots
//! - [`coefficients`]: ordered coefficient registry
//! - [`integrals`]: integrals grouped by domain kind
//! - [`form`]: the [`VariationalForm`](form::VariationalForm) itself

pub mod coefficients;
pub mod form;
pub mod function_space;
pub mod integrals;
pub mod kernel;
