pub mod invoker;
pub mod tool;

pub use invoker::{build_recommendation_request, ArtworkAssistant, RecommendationError};
pub use tool::artwork_recommendation_tool;
