use serde::{Deserialize, Serialize};
use std::fmt;

use crate::profile::Profile;

/// Prefix the AI service puts in front of local user ids
pub const EXTERNAL_USER_PREFIX: &str = "user_";

/// Prefix of synthetic users generated inside the AI service
pub const MOCK_USER_PREFIX: &str = "mock_";

/// Local user identifier
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Id of this user inside the AI service, e.g. `user_42`
    pub fn external_id(&self) -> String {
        format!("{}{}", EXTERNAL_USER_PREFIX, self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        UserId(s)
    }
}

/// How an AI-service id maps back to local users
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalId {
    /// A real user, with the local id recovered
    Local(UserId),
    /// A synthetic user that has no local counterpart
    Mock,
}

impl ExternalId {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.starts_with(MOCK_USER_PREFIX) {
            return Some(ExternalId::Mock);
        }
        let local = raw.strip_prefix(EXTERNAL_USER_PREFIX).unwrap_or(raw);
        if local.is_empty() {
            None
        } else {
            Some(ExternalId::Local(UserId::new(local)))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Provider,
    Admin,
}

/// Public fields shown next to a recommendation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayFields {
    pub id: UserId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

/// A user together with the profile they own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub is_mock: bool,
    #[serde(default)]
    pub profile: Option<Profile>,
}

impl UserRecord {
    pub fn new(id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: None,
            profile_picture: None,
            role: Role::User,
            is_mock: false,
            profile: None,
        }
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Profile that can be scored, if any
    pub fn usable_profile(&self) -> Option<&Profile> {
        self.profile.as_ref().filter(|p| p.is_usable())
    }

    /// Regular, non-synthetic users are the only match candidates
    pub fn is_candidate(&self) -> bool {
        self.role == Role::User && !self.is_mock
    }

    pub fn display_fields(&self) -> DisplayFields {
        DisplayFields {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            profile_picture: self.profile_picture.clone(),
        }
    }
}
