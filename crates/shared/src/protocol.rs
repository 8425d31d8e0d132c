use serde::{Deserialize, Serialize};

use crate::domain::FileKey;

/// Response of the receipt upload (`POST /bills`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub file_url: String,
    pub key: FileKey,
}

/// Query parameters sent alongside the raw receipt body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptUploadQuery {
    pub file_name: String,
    pub email: String,
}
