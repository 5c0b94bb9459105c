//! Tenant identifier type.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::TenantError;

/// Longest folded tenant id kept readable in a connection string.
/// Longer ids are replaced by their hash.
pub const MAX_SANITIZED_LENGTH: usize = 32;

static TENANT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_\-]*(/[A-Za-z0-9_\-]+)*$").expect("tenant pattern is valid")
});

/// An opaque tenant identifier.
///
/// Tenant ids may be hierarchical (`acme/research`). They are the ambient
/// runtime state that dynamic bind descriptors consult.
///
/// # Examples
///
/// ```
/// use bindery_binds::tenant::TenantId;
///
/// let tenant = TenantId::new("acme_corp");
/// assert_eq!(tenant.sanitized().unwrap(), "acme_corp");
///
/// let tenant = TenantId::new("Acme-Corp/research");
/// assert_eq!(tenant.sanitized().unwrap(), "acme_corp_research-89fc799b475d9783");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Creates a new tenant ID from the given string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the tenant ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the parent tenant ID, if this is a nested tenant.
    pub fn parent(&self) -> Option<TenantId> {
        self.0.rfind('/').map(|idx| TenantId::new(&self.0[..idx]))
    }

    /// Checks that the id can be embedded in a connection string.
    pub fn validate(&self) -> Result<(), TenantError> {
        if TENANT_PATTERN.is_match(&self.0) {
            Ok(())
        } else {
            Err(TenantError::InvalidTenant {
                tenant_id: self.0.clone(),
                reason: format!(
                    "tenant ID does not match required pattern {}",
                    TENANT_PATTERN.as_str()
                ),
            })
        }
    }

    /// Returns a form of the id that is safe inside file names and database names.
    ///
    /// Ids made only of lowercase letters, digits and underscores are used
    /// as is. Otherwise hierarchy separators and dashes become underscores,
    /// the result is lowercased and `-` plus [`TenantId::digest`] is
    /// appended, so distinct ids never share a form. Folded ids longer than
    /// [`MAX_SANITIZED_LENGTH`] are replaced by [`TenantId::hashed`].
    pub fn sanitized(&self) -> Result<String, TenantError> {
        self.validate()?;
        let folded = self.0.replace(['/', '-'], "_").to_lowercase();
        if folded.len() > MAX_SANITIZED_LENGTH {
            Ok(self.hashed())
        } else if folded == self.0 {
            Ok(folded)
        } else {
            Ok(format!("{}-{}", folded, self.digest()))
        }
    }

    /// Returns the id's hash in the form used for `{tenant_hash}`.
    pub fn hashed(&self) -> String {
        format!("t-{}", self.digest())
    }

    /// Returns the first 16 hex digits of the SHA-256 of the id.
    pub fn digest(&self) -> String {
        let hash = Sha256::digest(self.0.as_bytes());
        hex::encode(&hash[..8])
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TenantId({})", self.0)
    }
}

impl FromStr for TenantId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(TenantId::new(s))
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        TenantId::new(s)
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        TenantId::new(s)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
