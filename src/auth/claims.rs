use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `kind` claim. Providers that omit it issue access tokens only.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    #[default]
    Access,
    Refresh,
}

/// Bearer token payload as minted by the identity provider. `sub` is the
/// foodgram user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
    #[serde(default)]
    pub kind: TokenKind,
}

impl Claims {
    pub fn is_access(&self) -> bool {
        self.kind == TokenKind::Access
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_kind_means_access() {
        let claims: Claims = serde_json::from_value(json!({
            "sub": Uuid::nil(),
            "iat": 0,
            "exp": 1,
            "iss": "foodgram",
            "aud": "foodgram-users"
        }))
        .unwrap();
        assert!(claims.is_access());
    }
}
