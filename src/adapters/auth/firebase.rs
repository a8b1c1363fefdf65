//! Firebase ID token adapter for the `SessionValidator` port.
//!
//! Partner app users sign in with Firebase Authentication and send the
//! resulting ID token as a bearer credential. Validation:
//!
//! 1. Fetch Google's securetoken JWKS (cached for a configurable TTL)
//! 2. Verify the RS256 signature with the key named by the `kid` header
//! 3. Check `iss` is `https://securetoken.google.com/<project>` and `aud` is the project
//! 4. Map `sub` to an `AccountId`, carrying the email and display name along
//!
//! # Example
//!
//! ```ignore
//! use partner_billing::adapters::auth::{FirebaseConfig, FirebaseSessionValidator};
//! use partner_billing::ports::SessionValidator;
//!
//! let validator = FirebaseSessionValidator::new(FirebaseConfig::new("partner-portal"));
//! let user = validator.validate("eyJ...").await?;
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{
    decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, TokenData, Validation,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::AuthConfig;
use crate::domain::foundation::{AccountId, AuthError, AuthenticatedUser};
use crate::ports::SessionValidator;

/// Google's published signing keys for Firebase ID tokens.
pub const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const DEFAULT_CACHE_DURATION: Duration = Duration::from_secs(3600);

/// Configuration for the Firebase token validator.
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    /// Firebase project ID. Tokens must name it as audience.
    pub project_id: String,

    /// How long fetched keys stay valid. Defaults to one hour.
    pub jwks_cache_duration: Option<Duration>,

    /// Key endpoint override.
    pub jwks_url: String,
}

impl FirebaseConfig {
    /// Create a configuration for the given project.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            jwks_cache_duration: None,
            jwks_url: FIREBASE_JWKS_URL.to_string(),
        }
    }

    /// Build from application auth settings.
    pub fn from_auth_config(config: &AuthConfig) -> Self {
        Self::new(config.firebase_project_id.trim()).with_cache_duration(config.jwks_cache_ttl())
    }

    /// Set custom JWKS cache duration.
    pub fn with_cache_duration(mut self, duration: Duration) -> Self {
        self.jwks_cache_duration = Some(duration);
        self
    }

    /// Point key discovery at a different endpoint.
    pub fn with_jwks_url(mut self, url: impl Into<String>) -> Self {
        self.jwks_url = url.into();
        self
    }

    /// Expected `iss` claim.
    pub fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }
}

/// Claims carried by a Firebase ID token.
#[derive(Debug, Serialize, Deserialize)]
struct FirebaseClaims {
    sub: String,
    iss: String,
    aud: String,
    exp: i64,

    #[serde(default)]
    iat: Option<i64>,

    #[serde(default)]
    email: Option<String>,

    #[serde(default)]
    email_verified: Option<bool>,

    #[serde(default)]
    name: Option<String>,
}

impl FirebaseClaims {
    fn into_user(self) -> Result<AuthenticatedUser, AuthError> {
        let id = AccountId::new(&self.sub).map_err(|_| {
            tracing::warn!("Token carries an empty subject");
            AuthError::InvalidToken
        })?;

        let email = self.email.filter(|e| !e.trim().is_empty());

        Ok(AuthenticatedUser::new(
            id,
            email,
            self.name,
            self.email_verified.unwrap_or(false),
        ))
    }
}

struct JwksCache {
    jwks: JwkSet,
    fetched_at: Instant,
    cache_duration: Duration,
}

impl JwksCache {
    fn new(jwks: JwkSet, cache_duration: Duration) -> Self {
        Self {
            jwks,
            fetched_at: Instant::now(),
            cache_duration,
        }
    }

    fn is_expired(&self) -> bool {
        self.fetched_at.elapsed() > self.cache_duration
    }
}

/// Validates Firebase ID tokens against Google's published keys.
pub struct FirebaseSessionValidator {
    config: FirebaseConfig,
    http_client: reqwest::Client,
    jwks_cache: Arc<RwLock<Option<JwksCache>>>,
}

impl FirebaseSessionValidator {
    /// Create a validator. Keys are fetched lazily on first use.
    pub fn new(config: FirebaseConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });

        Self {
            config,
            http_client,
            jwks_cache: Arc::new(RwLock::new(None)),
        }
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, AuthError> {
        tracing::debug!("Fetching JWKS from {}", self.config.jwks_url);

        let response = self
            .http_client
            .get(&self.config.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch JWKS: {}", e);
                AuthError::service_unavailable(format!("Failed to fetch JWKS: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!("JWKS endpoint returned {}", status);
            return Err(AuthError::service_unavailable(format!(
                "JWKS endpoint returned {}",
                status
            )));
        }

        let jwks: JwkSet = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse JWKS: {}", e);
            AuthError::service_unavailable(format!("Failed to parse JWKS: {}", e))
        })?;

        tracing::debug!("Fetched {} keys from JWKS", jwks.keys.len());
        Ok(jwks)
    }

    async fn get_jwks(&self) -> Result<JwkSet, AuthError> {
        {
            let cache = self.jwks_cache.read().await;
            if let Some(ref cached) = *cache {
                if !cached.is_expired() {
                    return Ok(cached.jwks.clone());
                }
            }
        }

        let jwks = self.fetch_jwks().await?;

        let mut cache = self.jwks_cache.write().await;
        let duration = self
            .config
            .jwks_cache_duration
            .unwrap_or(DEFAULT_CACHE_DURATION);
        *cache = Some(JwksCache::new(jwks.clone(), duration));

        Ok(jwks)
    }

    fn find_decoding_key(
        header: &jsonwebtoken::Header,
        jwks: &JwkSet,
    ) -> Result<DecodingKey, AuthError> {
        // Firebase only signs with RS256
        if header.alg != Algorithm::RS256 {
            tracing::warn!("Unexpected token algorithm: {:?}", header.alg);
            return Err(AuthError::InvalidToken);
        }

        let kid = header.kid.as_ref().ok_or_else(|| {
            tracing::warn!("JWT missing 'kid' header");
            AuthError::InvalidToken
        })?;

        let jwk = jwks.find(kid).ok_or_else(|| {
            tracing::warn!("No matching key found for kid: {}", kid);
            AuthError::InvalidToken
        })?;

        DecodingKey::from_jwk(jwk).map_err(|e| {
            tracing::warn!("Failed to create decoding key: {}", e);
            AuthError::InvalidToken
        })
    }

    fn validate_token(
        &self,
        token: &str,
        decoding_key: &DecodingKey,
    ) -> Result<TokenData<FirebaseClaims>, AuthError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[self.config.issuer()]);
        validation.set_audience(&[&self.config.project_id]);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        decode::<FirebaseClaims>(token, decoding_key, &validation).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("Token expired");
                    AuthError::TokenExpired
                }
                ErrorKind::InvalidIssuer => {
                    tracing::warn!("Invalid issuer in token");
                    AuthError::InvalidToken
                }
                ErrorKind::InvalidAudience => {
                    tracing::warn!("Invalid audience in token");
                    AuthError::InvalidToken
                }
                _ => {
                    tracing::warn!("Token validation failed: {}", e);
                    AuthError::InvalidToken
                }
            }
        })
    }
}

#[async_trait]
impl SessionValidator for FirebaseSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let header = decode_header(token).map_err(|e| {
            tracing::debug!("Failed to decode JWT header: {}", e);
            AuthError::InvalidToken
        })?;

        let jwks = self.get_jwks().await?;
        let decoding_key = Self::find_decoding_key(&header, &jwks)?;
        let claims = self.validate_token(token, &decoding_key)?.claims;

        claims.into_user()
    }
}

impl std::fmt::Debug for FirebaseSessionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseSessionValidator")
            .field("project_id", &self.config.project_id)
            .field("jwks_url", &self.config.jwks_url)
            .finish_non_exhaustive()
    }
}
