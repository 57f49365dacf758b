use async_trait::async_trait;
use thiserror::Error;

pub mod client;

/// Outcome of a successful identity search. The token is opaque: matching
/// thresholds and liveness policy live entirely in the external service.
#[derive(Debug, Clone)]
pub struct FaceMatch {
    pub face_token: String,
    pub similarity: f32,
}

#[derive(Debug, Error)]
pub enum FaceError {
    #[error("face service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("face service rejected the request: {0}")]
    Rejected(String),
}

/// Narrow seam to the managed face-recognition platform. The application
/// consumes identity tokens and never sees embeddings or match internals.
#[async_trait]
pub trait FaceIdentityProvider: Send + Sync {
    /// Search the organization's collection for a live face match.
    /// `Ok(None)` means no enrolled face matched.
    async fn identify(
        &self,
        organization_id: u64,
        image: &[u8],
    ) -> Result<Option<FaceMatch>, FaceError>;

    /// Index a new face into the organization's collection and return its
    /// opaque token.
    async fn enroll(
        &self,
        organization_id: u64,
        image: &[u8],
        external_id: &str,
    ) -> Result<String, FaceError>;

    /// Remove a face from the organization's collection.
    async fn forget(&self, organization_id: u64, face_token: &str) -> Result<(), FaceError>;
}
