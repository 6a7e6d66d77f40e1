//! Outbound HTTP clients for the classifier and the slug generator.

mod classifier;
mod sluggen;

pub use classifier::HttpClassifier;
pub use sluggen::HttpSlugGen;
