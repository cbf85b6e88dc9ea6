// libs/records-cell/src/lib.rs
//! # Records Cell
//!
//! Generated treatment plans and patient file uploads.
//!
//! ## API Endpoints
//! - `GET /reports/treatment-plans` - Caller's plans, newest first
//! - `POST /reports/treatment-plans` - Generate and store a plan
//! - `PUT /reports/treatment-plans/{id}/status` - active, paused or completed
//! - `POST /upload` - Store a base64 file in the uploads bucket

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod state;

pub use models::{PlanStatus, RecordsError, UploadedFile};
pub use router::{records_routes, report_routes_with_state, upload_routes_with_state};
pub use state::RecordsState;
