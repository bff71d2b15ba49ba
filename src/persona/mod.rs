//! Persona roster for the risk debate.
//!
//! Personas are static: loaded once at startup from the bundled TOML roster or
//! a user file, then bound to evaluator units by the pipeline.

pub mod registry;
pub mod types;

pub use registry::{PersonaListing, PersonaRegistry};
pub use types::{Persona, PersonaRole};
