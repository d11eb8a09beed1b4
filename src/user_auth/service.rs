use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::error::ShopError;
use crate::gateway::types::DisplayAmount;
use crate::pricing::display_amount;
use crate::store::{NewUser, Role, Store, User, UserPatch, UserStore};

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id as string
    pub sub: String,
    pub role: Role,
    pub exp: usize,
    pub iat: usize,
}

/// Authenticated caller, injected by the auth middleware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Letters, digits and underscore only
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Ok(())
    } else {
        Err(ValidationError::new("username_charset")
            .with_message("username may only contain letters, digits and underscores".into()))
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(
        length(min = 3, max = 30, message = "username must be 3-30 characters"),
        custom(function = "validate_username")
    )]
    #[schema(example = "user_1")]
    pub username: String,
    #[validate(email(message = "invalid email address"))]
    #[schema(example = "user1@example.com")]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    #[schema(example = "password123")]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "email is required"))]
    #[schema(example = "user1@example.com")]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    #[schema(example = "password123")]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 3, max = 30, message = "username must be 3-30 characters"))]
    pub username: Option<String>,
    #[validate(email(message = "invalid email address"))]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "current password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub new_password: String,
}

/// Public view of an account
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub balance: DisplayAmount,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            email: u.email.clone(),
            balance: display_amount(u.balance),
            role: u.role,
            is_active: u.is_active,
            created_at: u.created_at,
        }
    }
}

/// Auth Response (JWT)
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserView,
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

pub(crate) fn hash_password(password: &str) -> Result<String, ShopError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ShopError::Internal(format!("Hashing failed: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn invalid_credentials() -> ShopError {
    ShopError::Auth("Invalid email or password".to_string())
}

pub struct UserAuthService {
    store: Arc<dyn Store>,
    jwt_secret: String,
    token_ttl: Duration,
}

impl UserAuthService {
    pub fn new(store: Arc<dyn Store>, jwt_secret: String, token_ttl_hours: i64) -> Self {
        Self {
            store,
            jwt_secret,
            token_ttl: Duration::hours(token_ttl_hours),
        }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<User, ShopError> {
        validate_username(&req.username)
            .map_err(|_| ShopError::validation("username may only contain letters, digits and underscores"))?;
        let password_hash = hash_password(&req.password)?;
        let user = self
            .store
            .create_user(NewUser {
                username: req.username,
                email: normalize_email(&req.email),
                password_hash,
                role: Role::User,
            })
            .await?;
        info!(user_id = user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Verify credentials and issue a JWT
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, ShopError> {
        let user = self
            .store
            .find_user_by_email(&normalize_email(&req.email))
            .await?
            .ok_or_else(invalid_credentials)?;

        if !verify_password(&req.password, &user.password_hash) {
            warn!(user_id = user.id, "Login failed: bad password");
            return Err(invalid_credentials());
        }
        if !user.is_active {
            return Err(ShopError::Auth("Account is deactivated".to_string()));
        }

        let token = self.issue_token(&user)?;
        Ok(AuthResponse {
            token,
            user: UserView::from(&user),
        })
    }

    pub fn issue_token(&self, user: &User) -> Result<String, ShopError> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(self.token_ttl)
            .ok_or_else(|| ShopError::Internal("token expiry out of range".to_string()))?;

        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role,
            exp: expiration.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| ShopError::Internal(format!("Failed to generate token: {}", e)))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, ShopError> {
        let decoding_key = DecodingKey::from_secret(self.jwt_secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| ShopError::Auth("Invalid or expired token".to_string()))
    }

    /// Token → user id
    pub fn resolve_user_id(&self, token: &str) -> Result<i64, ShopError> {
        self.verify_token(token)?
            .sub
            .parse()
            .map_err(|_| ShopError::Auth("Invalid token subject".to_string()))
    }

    /// Token → active user, with the role read from the store
    pub async fn authenticate(&self, token: &str) -> Result<AuthUser, ShopError> {
        let user_id = self.resolve_user_id(token)?;
        let user = self.store.get_user(user_id).await.map_err(|e| match e {
            ShopError::NotFound(_) => ShopError::Auth("Account no longer exists".to_string()),
            other => other,
        })?;
        if !user.is_active {
            return Err(ShopError::Auth("Account is deactivated".to_string()));
        }
        Ok(AuthUser {
            id: user.id,
            role: user.role,
        })
    }

    pub async fn profile(&self, user_id: i64) -> Result<User, ShopError> {
        self.store.get_user(user_id).await
    }

    pub async fn update_profile(
        &self,
        user_id: i64,
        req: UpdateProfileRequest,
    ) -> Result<User, ShopError> {
        if let Some(username) = &req.username {
            validate_username(username)
                .map_err(|_| ShopError::validation("username may only contain letters, digits and underscores"))?;
        }
        let patch = UserPatch {
            username: req.username,
            email: req.email.as_deref().map(normalize_email),
            ..Default::default()
        };
        self.store.update_user(user_id, patch).await
    }

    pub async fn change_password(
        &self,
        user_id: i64,
        req: ChangePasswordRequest,
    ) -> Result<(), ShopError> {
        let user = self.store.get_user(user_id).await?;
        if !verify_password(&req.current_password, &user.password_hash) {
            return Err(ShopError::Auth("Current password is incorrect".to_string()));
        }
        let patch = UserPatch {
            password_hash: Some(hash_password(&req.new_password)?),
            ..Default::default()
        };
        self.store.update_user(user_id, patch).await?;
        info!(user_id, "Password changed");
        Ok(())
    }
}
