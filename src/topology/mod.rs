//! Mesh-side collaborators of a variational form: entity ids, subdomain
//! markers and the read-only mesh queries an assembler performs.

pub mod markers;
pub mod mesh;
pub mod point;
