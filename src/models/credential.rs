//! Stored OAuth credentials for the upstream API.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// OAuth client credentials plus the current token pair.
///
/// Persisted as a single document so a failed refresh can never leave a
/// half-written token pair behind. Only the token lifecycle manager
/// writes this after startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Current bearer token, if one has been obtained
    pub access_token: Option<String>,
    /// Refresh token; rotated by the upstream on each refresh
    pub refresh_token: Option<String>,
    /// Access token expiry. `None` means unknown, which forces a refresh
    /// before the token is used.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// The stored access token, if it stays valid for at least `margin`
    /// from now.
    pub fn usable_access_token(&self, margin: Duration) -> Option<&str> {
        let token = self.access_token.as_deref()?;
        let expires_at = self.expires_at?;
        if Utc::now() + margin < expires_at {
            Some(token)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(expires_in_secs: i64) -> Credential {
        Credential {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            access_token: Some("token".to_string()),
            refresh_token: Some("refresh".to_string()),
            expires_at: Some(Utc::now() + Duration::seconds(expires_in_secs)),
        }
    }

    #[test]
    fn test_token_valid_outside_margin() {
        let cred = credential(3600);
        assert_eq!(
            cred.usable_access_token(Duration::seconds(300)),
            Some("token")
        );
    }

    #[test]
    fn test_token_expiring_inside_margin_is_unusable() {
        let cred = credential(60);
        assert_eq!(cred.usable_access_token(Duration::seconds(300)), None);
    }

    #[test]
    fn test_unknown_expiry_is_unusable() {
        let mut cred = credential(3600);
        cred.expires_at = None;
        assert_eq!(cred.usable_access_token(Duration::seconds(300)), None);
    }
}
