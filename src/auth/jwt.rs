use axum::extract::FromRef;
use jsonwebtoken::{decode, DecodingKey, Validation};
use tracing::debug;

use super::claims::Claims;
use crate::state::AppState;

/// Verification half of the identity provider's signing setup.
#[derive(Clone)]
pub struct JwtKeys {
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let cfg = &state.config.jwt;
        Self {
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
        }
    }
}

impl JwtKeys {
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    /// Only access tokens authenticate requests.
    pub fn verify_access(&self, token: &str) -> anyhow::Result<Claims> {
        let claims = self.verify(token)?;
        if !claims.is_access() {
            anyhow::bail!("access token required");
        }
        Ok(claims)
    }
}

/// Signs tokens the way the identity provider does, for tests.
#[cfg(test)]
pub fn sign_for_tests(
    state: &AppState,
    user_id: uuid::Uuid,
    kind: super::claims::TokenKind,
    ttl_secs: i64,
) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use time::{Duration as TimeDuration, OffsetDateTime};

    let cfg = &state.config.jwt;
    let now = OffsetDateTime::now_utc();
    let exp = now + TimeDuration::seconds(ttl_secs);
    let claims = Claims {
        sub: user_id,
        iat: now.unix_timestamp(),
        exp: exp.unix_timestamp(),
        iss: cfg.issuer.clone(),
        aud: cfg.audience.clone(),
        kind,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(cfg.secret.as_bytes()),
    )
    .expect("sign test token")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::TokenKind;
    use crate::config::AppConfig;
    use crate::store::MemoryStore;
    use std::sync::Arc;
    use uuid::Uuid;

    fn state_with(issuer: &str, audience: &str) -> AppState {
        let mut config = AppConfig::for_tests();
        config.jwt.issuer = issuer.into();
        config.jwt.audience = audience.into();
        AppState::from_parts(Arc::new(MemoryStore::new()), Arc::new(config))
    }

    #[test]
    fn verifies_access_token() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let user_id = Uuid::new_v4();
        let token = sign_for_tests(&state, user_id, TokenKind::Access, 300);
        let claims = keys.verify_access(&token).expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
    }

    #[test]
    fn rejects_refresh_token_for_requests() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let token = sign_for_tests(&state, Uuid::new_v4(), TokenKind::Refresh, 300);
        let err = keys.verify_access(&token).unwrap_err();
        assert!(err.to_string().contains("access token required"));
    }

    #[test]
    fn rejects_wrong_issuer_or_audience() {
        let good = state_with("good-iss", "good-aud");
        let bad = state_with("bad-iss", "bad-aud");
        let token = sign_for_tests(&good, Uuid::new_v4(), TokenKind::Access, 300);
        assert!(JwtKeys::from_ref(&bad).verify(&token).is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        // past the default 60s leeway
        let token = sign_for_tests(&state, Uuid::new_v4(), TokenKind::Access, -600);
        assert!(keys.verify(&token).is_err());
    }
}
