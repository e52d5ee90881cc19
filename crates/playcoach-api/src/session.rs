//! Browser sessions and their Gemini API keys.
//!
//! The cookie carries only a random session id signed with HMAC-SHA256.
//! API keys are sealed with AES-256-GCM under `ENCRYPTION_KEY` and, when a
//! keys file is configured, persisted so they survive a restart.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "playcoach_session";

const NONCE_LEN: usize = 12;

type HmacSha256 = Hmac<Sha256>;

/// Session ids mapped to the sealed API key their owner configured.
pub struct SessionStore {
    secret: String,
    cipher: Aes256Gcm,
    path: Option<PathBuf>,
    keys: RwLock<HashMap<String, String>>,
}

impl SessionStore {
    /// Store that keeps sealed keys in memory only.
    pub fn new(secret: impl Into<String>, encryption_key: &str) -> ApiResult<Self> {
        Ok(Self {
            secret: secret.into(),
            cipher: cipher(encryption_key)?,
            path: None,
            keys: RwLock::new(HashMap::new()),
        })
    }

    /// Store backed by a keys file, loading any keys already saved there.
    pub async fn open(
        path: impl Into<PathBuf>,
        secret: impl Into<String>,
        encryption_key: &str,
    ) -> ApiResult<Self> {
        let path = path.into();
        let keys = read_keys(&path).await?;
        info!(path = %path.display(), sessions = keys.len(), "Loaded session keys");

        Ok(Self {
            secret: secret.into(),
            cipher: cipher(encryption_key)?,
            path: Some(path),
            keys: RwLock::new(keys),
        })
    }

    /// Generate an unguessable session id.
    pub fn new_session_id() -> String {
        Uuid::new_v4().simple().to_string()
    }

    fn mac(&self) -> ApiResult<HmacSha256> {
        <HmacSha256 as Mac>::new_from_slice(self.secret.as_bytes())
            .map_err(|e| ApiError::internal(format!("Invalid HMAC key: {}", e)))
    }

    /// Sign a session id as `{id}.{signature}`.
    pub fn sign(&self, session_id: &str) -> ApiResult<String> {
        let mut mac = self.mac()?;
        mac.update(session_id.as_bytes());
        let signature = mac.finalize().into_bytes();

        Ok(format!("{}.{}", session_id, URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Verify a signed cookie value.
    ///
    /// Returns `None` for malformed values or a bad signature.
    pub fn verify(&self, signed: &str) -> ApiResult<Option<String>> {
        let Some((session_id, sig_encoded)) = signed.split_once('.') else {
            return Ok(None);
        };
        if session_id.is_empty() {
            return Ok(None);
        }
        let sig_bytes = match URL_SAFE_NO_PAD.decode(sig_encoded) {
            Ok(bytes) => bytes,
            Err(_) => return Ok(None),
        };

        let mut mac = self.mac()?;
        mac.update(session_id.as_bytes());
        if mac.verify_slice(&sig_bytes).is_err() {
            return Ok(None);
        }

        Ok(Some(session_id.to_string()))
    }

    /// Session id from a request's cookies, if present and correctly signed.
    pub fn session_id(&self, jar: &CookieJar) -> ApiResult<Option<String>> {
        match jar.get(SESSION_COOKIE) {
            Some(cookie) => self.verify(cookie.value()),
            None => Ok(None),
        }
    }

    /// Signed session cookie for the browser.
    pub fn cookie(&self, session_id: &str) -> ApiResult<Cookie<'static>> {
        Ok(Cookie::build((SESSION_COOKIE, self.sign(session_id)?))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build())
    }

    /// Seal `nonce || ciphertext` as standard base64.
    fn seal(&self, api_key: &str) -> ApiResult<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, api_key.as_bytes())
            .map_err(|_| ApiError::internal("Failed to encrypt API key"))?;

        let mut sealed = nonce.to_vec();
        sealed.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(sealed))
    }

    fn unseal(&self, sealed: &str) -> Option<String> {
        let bytes = STANDARD.decode(sealed).ok()?;
        if bytes.len() <= NONCE_LEN {
            return None;
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .ok()?;
        String::from_utf8(plaintext).ok()
    }

    /// Store the key for a session, persisting it when a keys file is configured.
    pub async fn set_key(&self, session_id: &str, api_key: &str) -> ApiResult<()> {
        let sealed = self.seal(api_key)?;
        let mut keys = self.keys.write().await;
        keys.insert(session_id.to_string(), sealed);

        if let Some(path) = &self.path {
            write_keys(path, &keys).await?;
        }
        Ok(())
    }

    pub async fn api_key(&self, session_id: &str) -> Option<String> {
        let keys = self.keys.read().await;
        let sealed = keys.get(session_id)?;
        let key = self.unseal(sealed);
        if key.is_none() {
            warn!("Stored API key could not be decrypted; ENCRYPTION_KEY may have changed");
        }
        key
    }

    /// API key for the session behind a request's cookies.
    pub async fn key_for(&self, jar: &CookieJar) -> ApiResult<Option<String>> {
        match self.session_id(jar)? {
            Some(id) => Ok(self.api_key(&id).await),
            None => Ok(None),
        }
    }
}

/// AES-256 key derived from an arbitrary-length secret.
fn cipher(encryption_key: &str) -> ApiResult<Aes256Gcm> {
    let digest = Sha256::digest(encryption_key.as_bytes());
    Aes256Gcm::new_from_slice(&digest)
        .map_err(|e| ApiError::internal(format!("Invalid encryption key: {}", e)))
}

async fn read_keys(path: &Path) -> ApiResult<HashMap<String, String>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => {
            return Err(ApiError::internal(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };
    if content.trim().is_empty() {
        return Ok(HashMap::new());
    }
    serde_json::from_str(&content)
        .map_err(|e| ApiError::internal(format!("Corrupt keys file {}: {}", path.display(), e)))
}

/// Write through a temp file and rename so the file is never half-written.
async fn write_keys(path: &Path, keys: &HashMap<String, String>) -> ApiResult<()> {
    let io_err = |e: std::io::Error| {
        ApiError::internal(format!("Failed to write {}: {}", path.display(), e))
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "api_keys.json".to_string());
    let tmp = path.with_file_name(format!(".{}.tmp", name));

    let json = serde_json::to_vec_pretty(keys)
        .map_err(|e| ApiError::internal(format!("Failed to encode keys: {}", e)))?;
    tokio::fs::write(&tmp, json).await.map_err(io_err)?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(io_err(e));
    }
    Ok(())
}
