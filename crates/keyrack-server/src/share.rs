use constant_time_eq::constant_time_eq;
use sha2::{Digest, Sha256};

/// Default lifetime of a share link, in seconds.
pub const DEFAULT_SHARE_TTL: u64 = 300;

/// A freshly issued share grant. Nothing about it is persisted; the link
/// itself carries everything needed to verify it later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareGrant {
    pub digest: String,
    pub expires_at: i64,
    pub record_id: u64,
}

impl ShareGrant {
    /// Renders the link path. The shape is fixed for compatibility with
    /// links already in circulation: plain hex digest, plain decimal
    /// timestamp and id, trailing slash.
    pub fn path(&self) -> String {
        format!(
            "/entry/share/{}/{}/{}/",
            self.digest, self.expires_at, self.record_id
        )
    }
}

/// Issues and verifies time-bounded share links for single records.
///
/// The digest is SHA-256 over `salt ++ expires_at ++ record_id` with the
/// integers in decimal ASCII, exactly as they appear in the link. The salt
/// never leaves the process, and its secrecy is the entire forgery
/// defense; the timestamp and id travel in the clear.
#[derive(Clone)]
pub struct ShareSigner {
    salt: String,
}

impl ShareSigner {
    pub fn new(salt: impl Into<String>) -> Self {
        Self { salt: salt.into() }
    }

    pub fn issue(&self, record_id: u64, now: i64, ttl_seconds: u64) -> ShareGrant {
        let expires_at = now + ttl_seconds as i64;
        ShareGrant {
            digest: self.digest(expires_at, record_id),
            expires_at,
            record_id,
        }
    }

    /// True iff the presented digest matches and the link is still live.
    /// Expiry is strict: at `now == expires_at` the link is already dead.
    pub fn verify(&self, presented: &str, expires_at: i64, record_id: u64, now: i64) -> bool {
        let expected = self.digest(expires_at, record_id);
        constant_time_eq(expected.as_bytes(), presented.as_bytes()) && now < expires_at
    }

    fn digest(&self, expires_at: i64, record_id: u64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_bytes());
        hasher.update(expires_at.to_string().as_bytes());
        hasher.update(record_id.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }
}
