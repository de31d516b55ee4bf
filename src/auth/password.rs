//! Password hashing and strength policy.

use zxcvbn::zxcvbn;

use crate::error::AppError;

/// Hash a password with bcrypt. Runs on the blocking pool since a single
/// hash at production cost takes hundreds of milliseconds.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Check a password against a stored bcrypt hash.
///
/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let password = password.to_string();
    let hash = hash.to_string();
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("Password check task failed: {}", e)))?;

    match verified {
        Ok(matches) => Ok(matches),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash could not be parsed");
            Ok(false)
        }
    }
}

/// Reject weak passwords.
///
/// The username is passed to zxcvbn as a user input so passwords derived from
/// it score low. A password fails if it scores below `min_score` or if zxcvbn
/// has any warning or suggestion for it; the error message carries that
/// feedback.
pub fn check_strength(password: &str, username: &str, min_score: u8) -> Result<(), String> {
    let entropy = zxcvbn(password, &[username]);

    let warning = entropy
        .feedback()
        .and_then(|f| f.warning())
        .map(|w| w.to_string())
        .unwrap_or_default();
    let suggestions: Vec<String> = entropy
        .feedback()
        .map(|f| f.suggestions().iter().map(|s| s.to_string()).collect())
        .unwrap_or_default();

    let score = entropy.score() as u8;
    if score < min_score || !warning.is_empty() || !suggestions.is_empty() {
        return Err(format!("Weak password:{} {}", warning, suggestions.join(" ")));
    }

    Ok(())
}
