use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::role::Role;
use crate::models::{Claims, TokenType};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

/// The authenticated employee behind a request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub employee_id: u64,
    pub login_id: String,
    pub name: String,
    pub role: Role,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            employee_id: claims.employee_id,
            login_id: claims.sub,
            name: claims.name,
            role: claims.role,
        }
    }
}

pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Decodes an access token. Refresh tokens are not accepted here.
pub fn authenticate(token: &str, config: &Config) -> Result<AuthUser, ApiError> {
    let claims =
        verify_token(token, &config.jwt_secret).map_err(|_| ApiError::Unauthorized("Invalid token"))?;

    if claims.token_type != TokenType::Access {
        return Err(ApiError::Unauthorized("Invalid token type"));
    }

    Ok(claims.into())
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Set by auth_middleware on protected scopes.
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let Some(token) = bearer_token(req) else {
            return ready(Err(ApiError::Unauthorized("Missing token")));
        };

        let Some(config) = req.app_data::<Data<Config>>() else {
            tracing::error!("Config missing from app data");
            return ready(Err(ApiError::Internal));
        };

        ready(authenticate(token, config))
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Admin only"))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
