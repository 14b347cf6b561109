//! Collaborator trait abstractions for the recipe pipeline.
//!
//! Applications implement these to plug in content acquisition, generation
//! providers, embeddings, and persistence.

pub mod acquisition;
pub mod embedder;
pub mod provider;
pub mod store;
