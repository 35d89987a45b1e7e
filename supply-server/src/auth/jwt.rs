//! JWT token service
//!
//! Issues and validates HS256 bearer tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use shared::models::{Capability, Role, User};
use thiserror::Error;

use crate::config::Config;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Signing secret
    pub secret: String,
    /// Token lifetime (minutes)
    pub expiration_minutes: i64,
    pub issuer: String,
    pub audience: String,
}

impl From<&Config> for JwtConfig {
    fn from(config: &Config) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            expiration_minutes: config.jwt_expiration_minutes,
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
        }
    }
}

/// Claims carried in a bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID (Subject)
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub institution_id: Option<i64>,
    /// Expiry (Unix seconds)
    pub exp: i64,
    /// Issued at (Unix seconds)
    pub iat: i64,
    pub iss: String,
    pub aud: String,
}

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    ExpiredToken,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Token generation failed: {0}")]
    GenerationFailed(String),
}

/// JWT token service
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("issuer", &self.config.issuer)
            .field("audience", &self.config.audience)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Issue a token for the user
    pub fn generate_token(&self, user: &User) -> Result<String, JwtError> {
        let now = Utc::now();
        let expiration = now + Duration::minutes(self.config.expiration_minutes);

        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            institution_id: user.institution_id,
            exp: expiration.timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::GenerationFailed(e.to_string()))
    }

    /// Validate signature, expiry, issuer and audience
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.config.audience]);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss", "aud"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                _ => JwtError::InvalidToken(e.to_string()),
            }
        })?;

        Ok(token_data.claims)
    }

    /// Extract the token from an `Authorization` header value
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header.strip_prefix("Bearer ")
    }
}

/// Authenticated caller, parsed from JWT claims
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub institution_id: Option<i64>,
}

impl TryFrom<Claims> for CurrentUser {
    type Error = JwtError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let id = claims
            .sub
            .parse()
            .map_err(|_| JwtError::InvalidToken(format!("non-numeric subject '{}'", claims.sub)))?;
        Ok(Self {
            id,
            email: claims.email,
            role: claims.role,
            institution_id: claims.institution_id,
        })
    }
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.role.allows(capability)
    }

    /// Whether the caller may see or act on data of `institution_id`
    pub fn can_access_institution(&self, institution_id: i64) -> bool {
        self.can(Capability::ViewAllOrders) || self.institution_id == Some(institution_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(expiration_minutes: i64) -> JwtConfig {
        JwtConfig {
            secret: "unit-test-secret-that-is-long-enough".into(),
            expiration_minutes,
            issuer: "supply-server".into(),
            audience: "supply-clients".into(),
        }
    }

    fn user() -> User {
        User {
            id: 42,
            institution_id: Some(7),
            full_name: "Noa Cohen".into(),
            email: "noa@school.org".into(),
            password_hash: String::new(),
            role: Role::Institution,
            created_at: 0,
        }
    }

    #[test]
    fn test_jwt_generation_and_validation() {
        let service = JwtService::new(config(60));
        let token = service.generate_token(&user()).unwrap();
        let claims = service.validate_token(&token).unwrap();

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.email, "noa@school.org");
        assert_eq!(claims.role, Role::Institution);
        assert_eq!(claims.institution_id, Some(7));
        assert_eq!(claims.iss, "supply-server");
        assert!(claims.exp > claims.iat);

        let current = CurrentUser::try_from(claims).unwrap();
        assert_eq!(current.id, 42);
        assert!(!current.is_admin());
        assert!(current.can_access_institution(7));
        assert!(!current.can_access_institution(8));
    }

    #[test]
    fn test_expired_token() {
        // well past the default 60s leeway
        let service = JwtService::new(config(-10));
        let token = service.generate_token(&user()).unwrap();
        assert!(matches!(
            service.validate_token(&token),
            Err(JwtError::ExpiredToken)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtService::new(config(60));
        let mut other = config(60);
        other.secret = "a-completely-different-secret-value".into();
        let verifier = JwtService::new(other);

        let token = issuer.generate_token(&user()).unwrap();
        assert!(matches!(
            verifier.validate_token(&token),
            Err(JwtError::InvalidSignature)
        ));
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let issuer = JwtService::new(config(60));
        let mut other = config(60);
        other.audience = "someone-else".into();
        let verifier = JwtService::new(other);

        let token = issuer.generate_token(&user()).unwrap();
        assert!(matches!(
            verifier.validate_token(&token),
            Err(JwtError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_garbage_token() {
        let service = JwtService::new(config(60));
        assert!(service.validate_token("not.a.jwt").is_err());
    }

    #[test]
    fn test_extract_from_header() {
        assert_eq!(JwtService::extract_from_header("Bearer abc"), Some("abc"));
        assert_eq!(JwtService::extract_from_header("Basic abc"), None);
    }

    #[test]
    fn test_admin_sees_every_institution() {
        let admin = CurrentUser {
            id: 1,
            email: "admin@supply.local".into(),
            role: Role::Admin,
            institution_id: None,
        };
        assert!(admin.can_access_institution(99));
        assert!(admin.can(Capability::ManageOrders));
    }
}
