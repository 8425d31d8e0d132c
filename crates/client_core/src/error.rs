use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

/// Failure of one of the three bill store operations.
///
/// The `Display` form is what the bills page shows in its error banner, so
/// HTTP failures render as `Erreur <status>`.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Erreur {status}")]
    Status {
        status: u16,
        detail: Option<ApiError>,
    },
    #[error("Erreur réseau: {0}")]
    Transport(String),
    #[error("réponse invalide du serveur: {0}")]
    Decode(String),
    #[error("note de frais sans identifiant")]
    MissingBillId,
    #[error("invalid bills API url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("bills store is unavailable")]
    Unavailable,
}

impl GatewayError {
    pub fn status(status: u16) -> Self {
        Self::Status {
            status,
            detail: None,
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            GatewayError::Status { status, .. } => Some(ErrorCode::from_status(*status)),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            GatewayError::status(status.as_u16())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

/// Reasons a new-bill submission is refused before reaching the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitBlocked {
    #[error("aucun justificatif n'a été téléversé")]
    MissingReceipt,
    #[error("le justificatif doit être remplacé par un fichier valide")]
    RejectedFile,
    #[error("le téléversement du justificatif a échoué")]
    UploadFailed,
    #[error("le montant doit être un nombre entier")]
    InvalidAmount,
    #[error("la note de frais est déjà en cours d'envoi")]
    AlreadySubmitted,
    #[error("le formulaire n'est plus affiché")]
    Detached,
}
