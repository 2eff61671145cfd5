use crate::error::{CertError, Result};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer};
use std::fmt;

/// Server-held secret mixed into every verification digest.
///
/// Never serialized and never printed; `Debug` shows a placeholder.
#[derive(Clone, PartialEq, Eq)]
pub struct Pepper(String);

impl Pepper {
    pub fn new(secret: impl Into<String>) -> Result<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(CertError::Config("pepper must not be empty".to_string()));
        }
        Ok(Self(secret))
    }

    /// Random 32-byte pepper, hex encoded. Meant for local runs and tests;
    /// identifiers minted under it stop verifying once the process exits.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Pepper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pepper(<redacted>)")
    }
}

impl<'de> Deserialize<'de> for Pepper {
    fn deserialize<D>(d: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secret = String::deserialize(d)?;
        Pepper::new(secret).map_err(serde::de::Error::custom)
    }
}
