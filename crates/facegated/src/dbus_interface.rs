use crate::service::{Approval, AuthService, ServiceError};
use facegate_core::Encoding;
use std::sync::Arc;
use zbus::interface;

/// D-Bus interface for the facegate daemon.
///
/// Bus name: org.freedesktop.Facegate1
/// Object path: /org/freedesktop/Facegate1
pub struct FacegateService {
    service: Arc<AuthService>,
}

impl FacegateService {
    pub fn new(service: Arc<AuthService>) -> Self {
        Self { service }
    }
}

/// Flatten an approval for the wire: (approved, message, token or "").
fn approval_reply(result: Result<Approval, ServiceError>) -> zbus::fdo::Result<(bool, String, String)> {
    match result {
        Ok(a) => Ok((a.approved, a.message, a.token.unwrap_or_default())),
        Err(ServiceError::Store(e)) => {
            tracing::error!(error = %e, "store failure");
            Err(zbus::fdo::Error::Failed(e.to_string()))
        }
        Err(e) => Ok((false, e.to_string(), String::new())),
    }
}

fn store_failure(e: ServiceError) -> zbus::fdo::Error {
    tracing::error!(error = %e, "request failed");
    zbus::fdo::Error::Failed(e.to_string())
}

#[interface(name = "org.freedesktop.Facegate1")]
impl FacegateService {
    /// Returns (is_available, is_registered) for an identity.
    async fn available(&self, identity: &str) -> zbus::fdo::Result<(bool, bool)> {
        tracing::debug!(identity, "available requested");
        match self.service.available(identity).await {
            Ok(a) => Ok((a.is_available, a.is_registered)),
            Err(ServiceError::InvalidRequest(msg)) => Err(zbus::fdo::Error::InvalidArgs(msg)),
            Err(e) => Err(store_failure(e)),
        }
    }

    /// Register a completed capture session's encodings with their capture
    /// quality scores (one per encoding, or none).
    async fn register(
        &self,
        identity: &str,
        encodings: Vec<Vec<f64>>,
        quality_scores: Vec<f64>,
    ) -> zbus::fdo::Result<(bool, String, String)> {
        tracing::info!(
            identity,
            count = encodings.len(),
            scored = quality_scores.len(),
            "register requested"
        );
        let encodings: Vec<Encoding> = encodings.into_iter().map(to_encoding).collect();
        let quality_scores: Vec<f32> = quality_scores.into_iter().map(|q| q as f32).collect();
        approval_reply(self.service.register(identity, &encodings, &quality_scores).await)
    }

    /// Verify one encoding against the claimed identity.
    async fn verify(
        &self,
        identity: &str,
        encoding: Vec<f64>,
    ) -> zbus::fdo::Result<(bool, String, String)> {
        tracing::info!(identity, "verify requested");
        approval_reply(self.service.verify(identity, &to_encoding(encoding)).await)
    }

    /// Delete an identity. `token` must have been issued to that identity.
    async fn delete_user(&self, identity: &str, token: &str) -> zbus::fdo::Result<bool> {
        tracing::info!(identity, "delete_user requested");
        match self.service.delete_user(identity, token).await {
            Ok(removed) => Ok(removed),
            Err(ServiceError::InvalidRequest(msg)) => Err(zbus::fdo::Error::InvalidArgs(msg)),
            Err(e @ ServiceError::Unauthorized(_)) => Err(zbus::fdo::Error::AccessDenied(e.to_string())),
            Err(e) => Err(store_failure(e)),
        }
    }

    /// Return daemon status information as JSON.
    async fn status(&self) -> zbus::fdo::Result<String> {
        let status = self.service.status().await.map_err(store_failure)?;
        Ok(status.to_string())
    }
}

/// D-Bus carries doubles; encodings are single precision.
fn to_encoding(values: Vec<f64>) -> Encoding {
    Encoding::new(values.into_iter().map(|v| v as f32).collect())
}
