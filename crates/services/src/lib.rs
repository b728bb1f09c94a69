pub mod artifacts;
pub mod classifier;
pub mod document;
pub mod http;
pub mod llm;
pub mod pricing;
pub mod tour;

pub use artifacts::LocalArtifactGenerator;
pub use classifier::ModelClassifier;
pub use document::DocumentApi;
pub use http::{HttpCollaboratorClient, ServiceEndpoints};
pub use llm::{AnthropicClient, LlmClient};
pub use pricing::PricingApi;
pub use tour::TourApi;
