use crate::Id;

/// PlatformCookie is a per-user per-platform credential, encrypted at rest
/// by `clipfeed-security::cookie_vault` (C12). This type never carries
/// plaintext — `encrypted_value` is the base64-encoded nonce+ciphertext as
/// stored in the database.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlatformCookie {
    pub user_id: Id,
    pub platform: String,
    pub encrypted_value: String,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// The four platforms a cookie vault entry may target, per §6's
/// `/api/me/cookies/{platform}` route.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CookiePlatform {
    Youtube,
    Tiktok,
    Instagram,
    Twitter,
}

impl CookiePlatform {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Youtube => "youtube",
            Self::Tiktok => "tiktok",
            Self::Instagram => "instagram",
            Self::Twitter => "twitter",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        Some(match s {
            "youtube" => Self::Youtube,
            "tiktok" => Self::Tiktok,
            "instagram" => Self::Instagram,
            "twitter" => Self::Twitter,
            _ => return None,
        })
    }
}
