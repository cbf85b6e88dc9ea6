pub mod catalogue;
pub mod reconcile;
pub mod records;
pub mod registry;
pub mod session;
pub mod tavus;

pub use catalogue::PersonaCatalogue;
pub use reconcile::EndReconciler;
pub use records::ConsultationRecords;
pub use registry::SessionRegistry;
pub use session::SessionController;
pub use tavus::{ConversationProvider, TavusClient};
