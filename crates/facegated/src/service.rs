use crate::store::{GalleryStore, StoreError};
use facegate_core::types::ENCODING_DIM;
use facegate_core::{Encoding, KnnMatcher, MatchPolicy, Matcher};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::Mutex;

pub const REGISTERED_MESSAGE: &str = "User encodings have been registered.";
pub const APPROVED_MESSAGE: &str = "Scans match.";
pub const REJECTED_MESSAGE: &str = "Scans do not match.";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("User already has encodings registered.")]
    AlreadyRegistered(String),
    #[error("Unable to find user.")]
    IdentityNotFound(String),
    #[error("Token does not belong to this user.")]
    Unauthorized(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub is_available: bool,
    pub is_registered: bool,
}

/// Outcome of a registration or verification submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Approval {
    pub approved: bool,
    pub message: String,
    /// Opaque bearer token, present only when approved.
    pub token: Option<String>,
}

impl Approval {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            approved: false,
            message: message.into(),
            token: None,
        }
    }
}

/// Receives completed capture sessions and decides them against the gallery.
pub struct AuthService {
    store: GalleryStore,
    matcher: KnnMatcher,
    /// Serializes the check-then-append in `register`.
    registration: Mutex<()>,
}

impl AuthService {
    pub fn new(store: GalleryStore, policy: MatchPolicy) -> Self {
        Self {
            store,
            matcher: KnnMatcher::new(policy),
            registration: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &GalleryStore {
        &self.store
    }

    pub async fn available(&self, identity: &str) -> Result<Availability, ServiceError> {
        require_identity(identity)?;
        match self.store.user_by_name(identity).await? {
            Some(_) => Ok(Availability {
                is_available: false,
                is_registered: self.store.has_any(identity).await?,
            }),
            None => Ok(Availability {
                is_available: true,
                is_registered: false,
            }),
        }
    }

    /// Store a fresh set of encodings for an identity. No matching is performed.
    ///
    /// `quality_scores` is either empty or holds one capture score per encoding.
    pub async fn register(
        &self,
        identity: &str,
        encodings: &[Encoding],
        quality_scores: &[f32],
    ) -> Result<Approval, ServiceError> {
        require_identity(identity)?;
        if encodings.is_empty() {
            return Err(ServiceError::InvalidRequest(
                "Username and encodings are required.".into(),
            ));
        }
        for encoding in encodings {
            require_dimension(encoding)?;
        }
        if !quality_scores.is_empty() && quality_scores.len() != encodings.len() {
            return Err(ServiceError::InvalidRequest(format!(
                "got {} quality scores for {} encodings",
                quality_scores.len(),
                encodings.len()
            )));
        }

        let _guard = self.registration.lock().await;

        let user = match self.store.user_by_name(identity).await? {
            Some(user) => user,
            None => self.store.create_user(identity).await?,
        };
        if self.store.has_any(identity).await? {
            tracing::warn!(identity, "registration refused: encodings already present");
            return Err(ServiceError::AlreadyRegistered(identity.to_string()));
        }

        self.store
            .append_all(identity, encodings, quality_scores, true)
            .await?;
        let token = self.issue_token(&user.id).await?;

        tracing::info!(identity, count = encodings.len(), "identity registered");
        Ok(Approval {
            approved: true,
            message: REGISTERED_MESSAGE.into(),
            token: Some(token),
        })
    }

    /// Decide one claimed-identity encoding against a snapshot of the gallery.
    pub async fn verify(&self, identity: &str, encoding: &Encoding) -> Result<Approval, ServiceError> {
        require_identity(identity)?;
        require_dimension(encoding)?;

        let Some(user) = self.store.user_by_name(identity).await? else {
            return Err(ServiceError::IdentityNotFound(identity.to_string()));
        };

        let gallery = self.store.read_all(true).await?;
        let outcome = self.matcher.evaluate(encoding, identity, &gallery);

        tracing::info!(
            identity,
            accepted = outcome.accepted,
            votes = outcome.votes,
            considered = outcome.considered,
            nearest = ?outcome.nearest_distance,
            gallery = gallery.len(),
            "verification decided"
        );

        if !outcome.accepted {
            return Ok(Approval::rejected(REJECTED_MESSAGE));
        }
        let token = self.issue_token(&user.id).await?;
        Ok(Approval {
            approved: true,
            message: APPROVED_MESSAGE.into(),
            token: Some(token),
        })
    }

    /// Purge an identity with all its encodings and tokens. Returns false if unknown.
    ///
    /// `token` must be one issued to this identity by `register` or `verify`.
    pub async fn delete_user(&self, identity: &str, token: &str) -> Result<bool, ServiceError> {
        require_identity(identity)?;
        let Some(user) = self.store.user_by_name(identity).await? else {
            return Ok(false);
        };
        let owner = match token {
            "" => None,
            token => self.store.token_owner(&hash_token(token)).await?,
        };
        if owner.as_deref() != Some(user.id.as_str()) {
            tracing::warn!(identity, "delete refused: token not issued to this user");
            return Err(ServiceError::Unauthorized(identity.to_string()));
        }
        let tokens = self.store.revoke_tokens(&user.id).await?;
        let encodings = self.store.delete_all(identity).await?;
        let removed = self.store.delete_user(identity).await?;
        tracing::info!(identity, tokens, encodings, "user deleted");
        Ok(removed)
    }

    pub async fn status(&self) -> Result<serde_json::Value, ServiceError> {
        let policy = self.matcher.policy;
        Ok(serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "users": self.store.count_users().await?,
            "encodings": self.store.count_all().await?,
            "mean_quality": self.store.mean_quality().await?,
            "neighbors": policy.neighbors,
            "min_votes": policy.min_votes,
        }))
    }

    /// Issue a token and record only its hash.
    async fn issue_token(&self, user_id: &str) -> Result<String, ServiceError> {
        let jti = uuid::Uuid::new_v4().to_string();
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.store.add_token(&jti, &hash_token(&token), user_id).await?;
        tracing::debug!(user_id, jti = %jti, "token issued");
        Ok(token)
    }
}

fn require_identity(identity: &str) -> Result<(), ServiceError> {
    if identity.trim().is_empty() {
        return Err(ServiceError::InvalidRequest("Username is required.".into()));
    }
    Ok(())
}

fn require_dimension(encoding: &Encoding) -> Result<(), ServiceError> {
    if encoding.len() != ENCODING_DIM {
        return Err(ServiceError::InvalidRequest(format!(
            "encoding must have {ENCODING_DIM} values, got {}",
            encoding.len()
        )));
    }
    Ok(())
}

/// Lowercase hex SHA-256 of the token.
pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}
