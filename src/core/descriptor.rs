//! Target descriptors: what the external solver is asked to solve.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::ManagerError;

/// Challenge variant and its variant-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Variant {
    /// Checkbox-style challenge.
    V2 {
        /// Whether the target renders the challenge invisibly.
        #[serde(default)]
        invisible: bool,
    },
    /// Score-based challenge.
    V3 {
        /// Page action the token is requested for.
        action: String,
        /// Minimum acceptable score, strictly between 0 and 1.
        min_score: f64,
    },
}

impl Variant {
    /// Short variant name used in logs and batch keys.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::V2 { .. } => "v2",
            Self::V3 { .. } => "v3",
        }
    }
}

/// Endpoint identity plus the parameters a solver needs for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetDescriptor {
    /// Scheme-qualified URL of the target page.
    pub url: String,
    /// Site key published by the target page.
    pub site_key: String,
    /// Challenge variant.
    pub variant: Variant,
}

impl TargetDescriptor {
    /// Descriptor for a v2 challenge.
    pub fn v2(url: impl Into<String>, site_key: impl Into<String>, invisible: bool) -> Self {
        Self {
            url: url.into(),
            site_key: site_key.into(),
            variant: Variant::V2 { invisible },
        }
    }

    /// Descriptor for a v3 challenge.
    pub fn v3(
        url: impl Into<String>,
        site_key: impl Into<String>,
        action: impl Into<String>,
        min_score: f64,
    ) -> Self {
        Self {
            url: url.into(),
            site_key: site_key.into(),
            variant: Variant::V3 {
                action: action.into(),
                min_score,
            },
        }
    }

    /// Check the URL and the variant-specific fields.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::InvalidDescriptor`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ManagerError> {
        self.parsed_url()?;
        if let Variant::V3 { action, min_score } = &self.variant {
            if action.trim().is_empty() {
                return Err(ManagerError::InvalidDescriptor(
                    "action cannot be empty for a v3 target".into(),
                ));
            }
            if !(*min_score > 0.0 && *min_score < 1.0) {
                return Err(ManagerError::InvalidDescriptor(format!(
                    "min_score must be between 0 and 1, got {min_score}"
                )));
            }
        }
        Ok(())
    }

    /// Parse the URL, requiring an http(s) scheme and a host.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::InvalidDescriptor`] if the URL is empty,
    /// unparsable, not http(s), or has no host.
    pub fn parsed_url(&self) -> Result<Url, ManagerError> {
        if self.url.trim().is_empty() {
            return Err(ManagerError::InvalidDescriptor("url cannot be empty".into()));
        }
        let url = Url::parse(&self.url)
            .map_err(|e| ManagerError::InvalidDescriptor(format!("url `{}`: {e}", self.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ManagerError::InvalidDescriptor(format!(
                "url `{}` must use http or https",
                self.url
            )));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(ManagerError::InvalidDescriptor(format!(
                "url `{}` has no host",
                self.url
            )));
        }
        Ok(url)
    }
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.variant.name(), self.url, self.site_key)
    }
}
