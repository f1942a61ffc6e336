use crate::error::MigrateError;
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Transport settings for database connections.
///
/// Holds the trust anchor bundle the engine connectors verify server
/// certificates against. Verification is always strict; there is no
/// insecure or no-verify mode.
#[derive(Debug, Clone)]
pub struct TlsSettings {
    trust_anchor: PathBuf,
}

impl TlsSettings {
    /// Validate and adopt a PEM trust anchor bundle.
    ///
    /// The bundle is parsed eagerly so a missing or empty file fails the
    /// invocation before any connection is attempted.
    pub fn from_bundle(path: impl Into<PathBuf>) -> Result<Self, MigrateError> {
        let path = path.into();

        let file = fs::File::open(&path).map_err(|e| MigrateError::TrustAnchorUnavailable {
            path: path.clone(),
            source: e,
        })?;
        let mut reader = BufReader::new(file);
        let certs = rustls_pemfile::certs(&mut reader)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| MigrateError::TrustAnchorUnavailable {
                path: path.clone(),
                source: e,
            })?;

        if certs.is_empty() {
            return Err(MigrateError::TrustAnchorUnavailable {
                path: path.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "no certificates found in bundle",
                ),
            });
        }

        Ok(Self { trust_anchor: path })
    }

    pub fn trust_anchor(&self) -> &Path {
        &self.trust_anchor
    }
}
