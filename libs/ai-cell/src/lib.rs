// libs/ai-cell/src/lib.rs
//! # AI Cell
//!
//! Symptom analysis, health articles and assistant chat backed by Gemini or
//! OpenAI, whichever `AI_PROVIDER` and the configured keys select.
//!
//! ## API Endpoints
//! - `POST /analysis/symptoms` - Structured diagnosis for reported symptoms
//! - `POST /analysis/articles` - Health education article for a topic
//! - `POST /chat` - Assistant reply to a chat message

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod state;

pub use models::{AiError, HealthArticle, SymptomDiagnosis, TreatmentPlan};
pub use router::{ai_routes, analysis_routes_with_state, chat_routes_with_state};
pub use services::{select_provider, AiService, TextGenerationProvider};
pub use state::AiState;
