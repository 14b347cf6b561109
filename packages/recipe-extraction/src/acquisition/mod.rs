//! Reference content acquisition clients.

pub mod service;

pub use service::{CaptionServiceClient, ExtractServiceClient};
