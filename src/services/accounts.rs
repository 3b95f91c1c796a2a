use serde::{Deserialize, Serialize};

use crate::{
    db::Repository,
    error::{AppError, AppResult},
    models::{NewUser, Session, User, UserSummary},
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserSummary,
}

const INVALID_CREDENTIALS: &str = "Invalid username or password";

async fn hash_password(password: String, cost: u32) -> AppResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
        .map_err(AppError::from)
}

async fn verify_password(password: String, hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("Password check task failed: {}", e)))?
        .map_err(AppError::from)
}

/// Registers a new account with an empty profile
pub async fn signup(
    repo: &dyn Repository,
    request: SignupRequest,
    bcrypt_cost: u32,
) -> AppResult<UserSummary> {
    let username = request.username.trim().to_string();
    let email = request.email.trim().to_string();

    if username.is_empty()
        || email.is_empty()
        || request.password1.trim().is_empty()
        || request.password2.trim().is_empty()
    {
        return Err(AppError::InvalidInput("All fields are required".to_string()));
    }
    if request.password1 != request.password2 {
        return Err(AppError::InvalidInput("Passwords do not match".to_string()));
    }
    if repo.get_user_by_username(&username).await?.is_some() {
        return Err(AppError::Conflict("Username already exists".to_string()));
    }
    if repo.email_exists(&email).await? {
        return Err(AppError::Conflict("Email already exists".to_string()));
    }

    let password_hash = hash_password(request.password1, bcrypt_cost).await?;
    let user = repo
        .create_user(&NewUser {
            username,
            email,
            password_hash,
        })
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, "User signed up");
    Ok(UserSummary::from(&user))
}

/// Checks credentials and opens a session
///
/// Unknown users and wrong passwords are reported identically.
pub async fn login(repo: &dyn Repository, request: LoginRequest) -> AppResult<LoginResponse> {
    let user = repo
        .get_user_by_username(request.username.trim())
        .await?
        .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if !verify_password(request.password, user.password_hash.clone()).await? {
        tracing::info!(user_id = user.id, "Rejected login");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let session = Session::new(user.id);
    repo.create_session(&session).await?;

    tracing::info!(user_id = user.id, "User logged in");
    Ok(LoginResponse {
        token: session.token,
        user: UserSummary::from(&user),
    })
}

pub async fn logout(repo: &dyn Repository, token: &str) -> AppResult<()> {
    repo.delete_session(token).await
}

/// Resolves a bearer token to its user
pub async fn authenticate(repo: &dyn Repository, token: &str) -> AppResult<User> {
    let unauthorized = || AppError::Unauthorized("Invalid or expired session".to_string());

    let session = repo
        .get_session(token)
        .await?
        .ok_or_else(unauthorized)?;
    repo.get_user(session.user_id)
        .await?
        .ok_or_else(unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryRepository, UserRepo};

    // Minimum bcrypt cost keeps the tests fast
    const COST: u32 = 4;

    fn signup_request(username: &str, email: &str) -> SignupRequest {
        SignupRequest {
            username: username.to_string(),
            email: email.to_string(),
            password1: "s3cret-pass".to_string(),
            password2: "s3cret-pass".to_string(),
        }
    }

    #[tokio::test]
    async fn test_signup_and_login() {
        let repo = MemoryRepository::default();
        let user = signup(&repo, signup_request(" mia ", "mia@example.com"), COST)
            .await
            .unwrap();
        assert_eq!(user.username, "mia");

        let stored = repo.get_user(user.id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "s3cret-pass");
        assert!(repo.get_profile(user.id).await.unwrap().is_some());

        let response = login(
            &repo,
            LoginRequest {
                username: "mia".to_string(),
                password: "s3cret-pass".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(response.user, user);
        assert_eq!(response.token.len(), 32);

        let authenticated = authenticate(&repo, &response.token).await.unwrap();
        assert_eq!(authenticated.id, user.id);

        logout(&repo, &response.token).await.unwrap();
        assert!(matches!(
            authenticate(&repo, &response.token).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_signup_validation() {
        let repo = MemoryRepository::default();

        let missing = SignupRequest {
            password2: String::new(),
            ..signup_request("mia", "mia@example.com")
        };
        let err = signup(&repo, missing, COST).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(ref m) if m == "All fields are required"));

        let mismatch = SignupRequest {
            password2: "other".to_string(),
            ..signup_request("mia", "mia@example.com")
        };
        let err = signup(&repo, mismatch, COST).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(ref m) if m == "Passwords do not match"));
    }

    #[tokio::test]
    async fn test_signup_conflicts() {
        let repo = MemoryRepository::default();
        signup(&repo, signup_request("mia", "mia@example.com"), COST)
            .await
            .unwrap();

        let err = signup(&repo, signup_request("mia", "other@example.com"), COST)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m.contains("Username")));

        let err = signup(&repo, signup_request("noah", "MIA@example.com"), COST)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m.contains("Email")));
    }

    #[tokio::test]
    async fn test_login_failures_look_the_same() {
        let repo = MemoryRepository::default();
        signup(&repo, signup_request("mia", "mia@example.com"), COST)
            .await
            .unwrap();

        let wrong_password = login(
            &repo,
            LoginRequest {
                username: "mia".to_string(),
                password: "nope".to_string(),
            },
        )
        .await
        .unwrap_err();
        let unknown_user = login(
            &repo,
            LoginRequest {
                username: "ghost".to_string(),
                password: "nope".to_string(),
            },
        )
        .await
        .unwrap_err();

        assert_eq!(wrong_password.status(), unknown_user.status());
        assert_eq!(wrong_password.message(), unknown_user.message());
    }

    #[tokio::test]
    async fn test_authenticate_unknown_token() {
        let repo = MemoryRepository::default();
        assert!(matches!(
            authenticate(&repo, "not-a-token").await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
