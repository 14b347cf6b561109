//! Pipeline stages and the orchestrating parser.

pub mod normalize;
pub mod parser;
pub mod prompts;
pub mod semantic;
pub mod single_flight;

pub use parser::{ParseRequest, PipelineDeps, RecipeParser};
