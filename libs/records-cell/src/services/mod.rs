pub mod plans;
pub mod uploads;

pub use plans::TreatmentPlanService;
pub use uploads::{decode_file, file_extension, UploadService};
