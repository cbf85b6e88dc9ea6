pub mod generation;
pub mod providers;

pub use generation::AiService;
pub use providers::{select_provider, GeminiClient, OpenAiClient, TextGenerationProvider};
