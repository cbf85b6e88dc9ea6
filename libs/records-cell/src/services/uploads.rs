// libs/records-cell/src/services/uploads.rs
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::{SupabaseClient, UserScope};

use crate::models::{RecordsError, UploadRequest, UploadedFile};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Decoded upload body with the content type it was declared as.
#[derive(Debug, PartialEq)]
pub struct DecodedFile {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Accepts raw base64 or a `data:<mime>;base64,<payload>` URL. A mime type in
/// the data URL wins over the declared one.
pub fn decode_file(file: &str, declared_type: Option<&str>) -> Result<DecodedFile, RecordsError> {
    let (prefix_type, payload) = match file.split_once(";base64,") {
        Some((prefix, payload)) => (prefix.strip_prefix("data:").filter(|t| !t.is_empty()), payload),
        None => (None, file),
    };

    let payload = payload.trim();
    if payload.is_empty() {
        return Err(RecordsError::Validation("File is empty".to_string()));
    }

    let bytes = BASE64
        .decode(payload)
        .map_err(|e| RecordsError::Validation(format!("Failed to decode base64 data: {}", e)))?;

    let content_type = prefix_type
        .or(declared_type)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();

    Ok(DecodedFile { bytes, content_type })
}

/// Extension from the file name when it has one, else from the mime subtype.
pub fn file_extension(file_name: Option<&str>, content_type: &str) -> String {
    let from_name = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    let from_type = || {
        content_type
            .split_once('/')
            .map(|(_, subtype)| subtype.split(['+', ';']).next().unwrap_or(subtype))
            .filter(|subtype| !subtype.is_empty() && *subtype != "octet-stream")
    };

    from_name.or_else(from_type).unwrap_or("bin").to_lowercase()
}

pub struct UploadService {
    supabase: Arc<SupabaseClient>,
    bucket: String,
}

impl UploadService {
    pub fn new(supabase: Arc<SupabaseClient>, bucket: impl Into<String>) -> Self {
        Self {
            supabase,
            bucket: bucket.into(),
        }
    }

    /// Stores the file at `{user_id}/{uuid}.{ext}` inside the bucket.
    pub async fn upload(&self, scope: &UserScope, request: &UploadRequest) -> Result<UploadedFile, RecordsError> {
        let decoded = decode_file(&request.file, request.content_type.as_deref())?;
        let extension = file_extension(request.file_name.as_deref(), &decoded.content_type);
        let object_path = format!("{}/{}.{}", scope.user_id, Uuid::new_v4(), extension);
        let size = decoded.bytes.len();

        debug!("Uploading {} bytes as {}", size, object_path);
        self.supabase
            .upload_object(&self.bucket, &object_path, decoded.bytes, &decoded.content_type, &scope.auth_token)
            .await
            .map_err(|e| RecordsError::Storage(e.to_string()))?;

        info!("Stored upload {}/{}", self.bucket, object_path);
        Ok(UploadedFile {
            public_url: self.supabase.get_public_url(&self.bucket, &object_path),
            path: format!("{}/{}", self.bucket, object_path),
            content_type: decoded.content_type,
            size,
        })
    }
}
