// libs/consultation-cell/src/lib.rs
//! # Consultation Cell
//!
//! Real-time avatar consultations with AI doctor personas hosted by Tavus.
//!
//! ## Architecture
//!
//! ```text
//! +-----------------------------------------------------+
//! |                Consultation Cell                    |
//! +-----------------------------------------------------+
//! |  handlers.rs    |  HTTP endpoint handlers           |
//! |  router.rs      |  Route definitions                |
//! |  models.rs      |  Personas, sessions & errors      |
//! |  state.rs       |  Providers and registries         |
//! |  services/      |  Business logic layer             |
//! |    tavus.rs     |  Tavus conversation API client    |
//! |    session.rs   |  Per-user session state machine   |
//! |    registry.rs  |  Session controllers by user      |
//! |    catalogue.rs |  Persona lookup and tier filter   |
//! |    records.rs   |  Consultation history rows        |
//! |    reconcile.rs |  Retries for failed remote ends   |
//! +-----------------------------------------------------+
//! ```
//!
//! ## Session lifecycle
//!
//! `idle -> connecting -> active -> ended`, with `errored` reachable when the
//! provider refuses to open a conversation. Ending is always completed
//! locally; remote ends that fail are retried in the background.
//!
//! ## API Endpoints
//! - `GET /consultations/personas` - Personas the caller may start
//! - `POST /consultations/start` - Start a consultation
//! - `POST /consultations/end` - End the active consultation
//! - `GET /consultations/session` - Current session snapshot
//! - `POST /consultations/session/mute` - Toggle microphone
//! - `POST /consultations/session/video` - Toggle camera
//! - `GET /consultations/replicas/{replica_id}/status` - Replica status
//! - `GET /consultations/history` - Past consultations

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod state;

pub use models::{ConsultationError, Persona, SessionStatus};
pub use router::{consultation_routes, consultation_routes_with_state};
pub use services::{ConversationProvider, SessionController, TavusClient};
pub use state::ConsultationState;
