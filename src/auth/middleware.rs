// Principal extraction for protected routes

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use std::sync::Arc;
use tracing::debug;

use crate::auth::{error::AuthError, models::Principal, token::TokenService};

/// Authenticated caller extractor
///
/// Handlers take `Option<AuthenticatedUser>` so that a missing or invalid
/// session reaches the service layer as "no principal" and is answered with
/// the standard envelope.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<TokenService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingToken)?
            .to_str()
            .map_err(|_| AuthError::InvalidToken)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidToken)?;

        let token_service = Arc::<TokenService>::from_ref(state);
        let claims = token_service.validate_access_token(token)?;

        debug!("Authenticated request for {}", claims.sub);
        Ok(AuthenticatedUser(Principal {
            email: claims.sub,
            name: claims.name,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    const SECRET: &str = "test_secret_key_for_testing_purposes";

    #[derive(Clone)]
    struct TestState {
        tokens: Arc<TokenService>,
    }

    impl FromRef<TestState> for Arc<TokenService> {
        fn from_ref(state: &TestState) -> Self {
            state.tokens.clone()
        }
    }

    fn test_state() -> TestState {
        TestState {
            tokens: Arc::new(TokenService::new(SECRET.to_string())),
        }
    }

    fn parts_with_auth(auth_value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = auth_value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[tokio::test]
    async fn test_valid_token_yields_principal() {
        let state = test_state();
        let token = state
            .tokens
            .generate_access_token("noa@example.com", "Noa")
            .unwrap();

        let mut parts = parts_with_auth(Some(&format!("Bearer {}", token)));
        let user = AuthenticatedUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();

        assert_eq!(user.0.email, "noa@example.com");
        assert_eq!(user.0.name, "Noa");
    }

    #[tokio::test]
    async fn test_missing_authorization_header() {
        let mut parts = parts_with_auth(None);
        let result = AuthenticatedUser::from_request_parts(&mut parts, &test_state()).await;

        assert!(matches!(result, Err(AuthError::MissingToken)));
    }

    #[tokio::test]
    async fn test_invalid_bearer_format() {
        for auth_value in ["token_without_bearer", "Basic dXNlcjpwYXNz", "Bearer not.a.jwt"] {
            let mut parts = parts_with_auth(Some(auth_value));
            let result = AuthenticatedUser::from_request_parts(&mut parts, &test_state()).await;

            assert!(matches!(result, Err(AuthError::InvalidToken)));
        }
    }
}
