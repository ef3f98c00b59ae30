//! Concrete collaborators.

pub mod backend;
