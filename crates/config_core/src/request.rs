//! Configuration request types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Profile used when a request does not name one.
pub const DEFAULT_PROFILE: &str = "default";

/// Label used when a request does not name one.
pub const DEFAULT_LABEL: &str = "main";

/// Identifies one requested configuration bundle.
///
/// The profile string is split on commas into an ordered, de-duplicated list
/// where the leftmost profile has the highest precedence.
///
/// # Examples
///
/// ```rust
/// use config_core::ConfigRequest;
///
/// let request = ConfigRequest::new("orders", "dev, cloud", "release(_)2024");
/// assert_eq!(request.profiles(), ["dev", "cloud"]);
/// assert_eq!(request.label(), "release/2024");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigRequest {
    application: String,
    profiles: Vec<String>,
    label: String,
}

impl ConfigRequest {
    /// Creates a request using the built-in default profile and label for
    /// empty inputs.
    pub fn new(
        application: impl Into<String>,
        profile: impl AsRef<str>,
        label: impl AsRef<str>,
    ) -> Self {
        Self::with_defaults(application, profile, label, DEFAULT_PROFILE, DEFAULT_LABEL)
    }

    /// Creates a request, falling back to the given defaults when the profile
    /// list or the label is empty.
    pub fn with_defaults(
        application: impl Into<String>,
        profile: impl AsRef<str>,
        label: impl AsRef<str>,
        default_profile: &str,
        default_label: &str,
    ) -> Self {
        let mut profiles = parse_profiles(profile.as_ref());
        if profiles.is_empty() {
            profiles = parse_profiles(default_profile);
        }
        if profiles.is_empty() {
            profiles.push(DEFAULT_PROFILE.to_string());
        }

        let label = label.as_ref().trim();
        let label = if label.is_empty() {
            default_label.trim()
        } else {
            label
        };

        Self {
            application: application.into().trim().to_string(),
            profiles,
            label: normalize_label(label),
        }
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    /// Active profiles, highest precedence first.
    pub fn profiles(&self) -> &[String] {
        &self.profiles
    }

    /// Profiles joined back into their comma-separated form.
    pub fn profile_string(&self) -> String {
        self.profiles.join(",")
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Cache key identifying this request.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey {
            application: self.application.clone(),
            profile: self.profile_string(),
            label: self.label.clone(),
        }
    }
}

/// Key under which a resolved bundle is cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub application: String,
    pub profile: String,
    pub label: String,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.application, self.profile, self.label)
    }
}

fn parse_profiles(raw: &str) -> Vec<String> {
    let mut profiles: Vec<String> = Vec::new();
    for profile in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if !profiles.iter().any(|existing| existing == profile) {
            profiles.push(profile.to_string());
        }
    }
    profiles
}

/// Branch names containing `/` are sent as `(_)` inside a single path segment.
fn normalize_label(label: &str) -> String {
    label.replace("(_)", "/")
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
