//! bcrypt hashing, run off the async executor.

use crate::error::AppError;

/// Hashes `password` with the given bcrypt cost.
///
/// # Errors
///
/// Returns [`AppError::Internal`] if hashing fails or the blocking task
/// is cancelled.
pub async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
        .map_err(|e| AppError::Internal(format!("failed to hash password: {e}")))
}

/// Checks `password` against a stored bcrypt hash.
///
/// A malformed hash verifies as `false`.
///
/// # Errors
///
/// Returns [`AppError::Internal`] if the blocking task is cancelled.
pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .map_err(|e| AppError::Internal(format!("verification task failed: {e}")))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let Ok(hash) = hash_password("correct horse".to_string(), 4).await else {
            panic!("hashing failed");
        };
        assert_ne!(hash, "correct horse");
        assert_eq!(verify_password("correct horse".to_string(), hash.clone()).await.ok(), Some(true));
        assert_eq!(verify_password("wrong".to_string(), hash).await.ok(), Some(false));
    }

    #[tokio::test]
    async fn garbage_hash_does_not_verify() {
        let result = verify_password("x".to_string(), "not-a-hash".to_string()).await;
        assert_eq!(result.ok(), Some(false));
    }
}
