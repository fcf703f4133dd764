//! Ephemeral credentials for the local Data Plane API socket.
//!
//! The password is 32 bytes from the operating system's CSPRNG, encoded as
//! padded URL-safe base64. It only ever lives in memory and in the rendered
//! `userlist` section of the workspace's main document.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE;
use rand::TryRngCore;
use rand::rngs::OsRng;
use serde::Serialize;

use crate::error::ProvisionError;

/// Fixed Data Plane API username.
pub const DATAPLANE_USER: &str = "haproxy";

/// Userlist the Data Plane API authenticates against.
pub const DATAPLANE_USERLIST: &str = "controller";

/// Raw password length in bytes.
pub const PASSWORD_BYTES: usize = 32;

/// Username and password authorizing access to the Data Plane API.
///
/// `Debug` never prints the password.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Generate a fresh password for [`DATAPLANE_USER`].
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Credentials`] if the OS random source fails.
    /// No shorter or predictable fallback is ever substituted.
    pub fn generate() -> Result<Self, ProvisionError> {
        let mut bytes = [0u8; PASSWORD_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| ProvisionError::Credentials {
                reason: e.to_string(),
            })?;

        Ok(Self {
            username: DATAPLANE_USER.to_string(),
            password: URL_SAFE.encode(bytes),
        })
    }

    /// The Data Plane API username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The generated password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}
