use crate::error::GameError;
use rand::{TryRngCore, rngs::OsRng};

pub const TOKEN_BYTES: usize = 8;

/// Fresh bearer token: random bytes from the OS generator, lowercase hex.
pub fn new_token() -> Result<String, GameError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut bytes).map_err(|e| {
        tracing::error!(error = %e, "os random source failed");
        GameError::Unavailable
    })?;
    Ok(hex::encode(bytes))
}
