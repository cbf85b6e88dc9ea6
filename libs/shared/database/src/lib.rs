pub mod store;
pub mod supabase;

pub use store::{PersistenceProvider, SupabaseStore, TableQuery, UserScope};
pub use supabase::SupabaseClient;
