//! Account signup, login and admin approval.
//!
//! Regular users are approved on signup and receive a token straight away.
//! Admin accounts start pending and cannot log in until an approved admin
//! approves them.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::{AuthUser, TokenSigner};
use crate::config::BootstrapAdmin;
use crate::domain::participant::normalize_email;
use crate::domain::{PublicUser, Role, User, UserId, UserStatus};
use crate::error::AppError;
use crate::store::{Store, StoreError};

const MIN_PASSWORD_LEN: usize = 8;

/// Signup form.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Login e-mail.
    #[serde(default)]
    pub email: String,
    /// Password.
    #[serde(default)]
    pub password: String,
    /// Must equal `password`.
    #[serde(default)]
    pub confirm_password: String,
    /// Requested role; defaults to `user`.
    #[serde(default)]
    pub role: Option<Role>,
}

/// Login form.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Login e-mail.
    #[serde(default)]
    pub email: String,
    /// Password.
    #[serde(default)]
    pub password: String,
    /// Login tab the client used; must match the account role when set.
    #[serde(default)]
    pub mode: Option<Role>,
}

/// A token with the account it belongs to.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Session {
    /// Bearer token.
    pub token: String,
    /// The account.
    pub user: PublicUser,
}

/// What a signup produced.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum SignupOutcome {
    /// A user account, logged in.
    Active(Session),
    /// An admin account awaiting approval.
    Pending {
        /// Always `pending`.
        status: UserStatus,
        /// Explanation for the client.
        message: String,
    },
}

/// Account operations.
#[derive(Debug, Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    tokens: Arc<TokenSigner>,
    bcrypt_cost: u32,
}

impl AuthService {
    /// Creates a new `AuthService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, tokens: Arc<TokenSigner>, bcrypt_cost: u32) -> Self {
        Self {
            store,
            tokens,
            bcrypt_cost,
        }
    }

    fn issue(&self, user: &User) -> Result<Session, AppError> {
        let token = self
            .tokens
            .issue(user)
            .map_err(|e| AppError::Internal(format!("failed to issue token: {e}")))?;
        Ok(Session {
            token,
            user: PublicUser::from(user),
        })
    }

    /// Creates an account.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidRequest`] for missing fields, a malformed
    ///   e-mail, a short password or mismatched confirmation.
    /// - [`AppError::Conflict`] if the e-mail is taken.
    pub async fn signup(&self, request: SignupRequest) -> Result<SignupOutcome, AppError> {
        let name = request.name.trim();
        let email = normalize_email(&request.email);
        if name.is_empty()
            || email.is_empty()
            || request.password.is_empty()
            || request.confirm_password.is_empty()
        {
            return Err(AppError::InvalidRequest(
                "Name, email, password, and confirmPassword are required".to_string(),
            ));
        }
        if !looks_like_email(&email) {
            return Err(AppError::InvalidRequest(
                "Please enter a valid email address".to_string(),
            ));
        }
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::InvalidRequest(
                "Password must be at least 8 characters long".to_string(),
            ));
        }
        if request.password != request.confirm_password {
            return Err(AppError::InvalidRequest("Passwords do not match".to_string()));
        }
        if self.store.user_by_email(&email).await?.is_some() {
            return Err(duplicate_email());
        }

        let role = request.role.unwrap_or(Role::User);
        let status = match role {
            Role::Admin => UserStatus::Pending,
            Role::User => UserStatus::Approved,
        };
        let password_hash = hash_password(request.password, self.bcrypt_cost).await?;
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            name: name.to_string(),
            email,
            password_hash,
            role,
            status,
            created_at: now,
            updated_at: now,
            approved_at: (status == UserStatus::Approved).then_some(now),
            approved_by: None,
        };
        let user = self.store.insert_user(&user).await.map_err(|e| match e {
            StoreError::UniqueViolation(_) => duplicate_email(),
            other => other.into(),
        })?;
        tracing::info!(user_id = %user.id, role = role.as_str(), "account created");

        match user.status {
            UserStatus::Pending => Ok(SignupOutcome::Pending {
                status: UserStatus::Pending,
                message: "Admin account created and pending approval by an existing admin."
                    .to_string(),
            }),
            UserStatus::Approved => Ok(SignupOutcome::Active(self.issue(&user)?)),
        }
    }

    /// Verifies credentials and issues a token.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidRequest`] for missing fields.
    /// - [`AppError::Unauthorized`] for unknown e-mail or wrong password.
    /// - [`AppError::Forbidden`] for a role/mode mismatch or a pending
    ///   account.
    pub async fn login(&self, request: LoginRequest) -> Result<Session, AppError> {
        let email = normalize_email(&request.email);
        if email.is_empty() || request.password.is_empty() {
            return Err(AppError::InvalidRequest("Email and password are required".to_string()));
        }
        let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

        let user = self.store.user_by_email(&email).await?.ok_or_else(invalid)?;
        if !verify_password(request.password, user.password_hash.clone()).await? {
            tracing::info!(user_id = %user.id, "login rejected: bad password");
            return Err(invalid());
        }
        if let Some(mode) = request.mode {
            if mode != user.role {
                return Err(AppError::Forbidden(format!(
                    "Please use the {} login tab for this account",
                    user.role.as_str()
                )));
            }
        }
        if user.status != UserStatus::Approved {
            return Err(AppError::Forbidden("Account is pending approval".to_string()));
        }

        tracing::info!(user_id = %user.id, "login");
        self.issue(&user)
    }

    /// The caller's account as currently stored.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the account was removed.
    pub async fn me(&self, caller: &AuthUser) -> Result<PublicUser, AppError> {
        self.store
            .get_user(caller.id)
            .await?
            .map(|u| PublicUser::from(&u))
            .ok_or_else(|| AppError::not_found("User"))
    }

    /// Approves a pending admin. Approving an approved admin is a no-op.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] for an unknown user.
    /// - [`AppError::InvalidRequest`] if the target is not an admin.
    pub async fn approve(&self, approver: &AuthUser, user_id: UserId) -> Result<PublicUser, AppError> {
        let target = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;
        if target.role != Role::Admin {
            return Err(AppError::InvalidRequest(
                "Only admin accounts require approval".to_string(),
            ));
        }
        if target.status == UserStatus::Approved {
            return Ok(PublicUser::from(&target));
        }

        let approved = self
            .store
            .approve_user(user_id, approver.id, Utc::now())
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;
        tracing::info!(user_id = %user_id, approved_by = %approver.id, "admin approved");
        Ok(PublicUser::from(&approved))
    }

    /// Admin accounts awaiting approval, oldest first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn pending_admins(&self) -> Result<Vec<PublicUser>, AppError> {
        Ok(self
            .store
            .list_users(Role::Admin, UserStatus::Pending)
            .await?
            .iter()
            .map(PublicUser::from)
            .collect())
    }

    /// Creates an approved admin unless the e-mail is already registered.
    ///
    /// # Errors
    ///
    /// Propagates hashing and store failures.
    pub async fn bootstrap_admin(&self, admin: &BootstrapAdmin) -> Result<(), AppError> {
        let email = normalize_email(&admin.email);
        if self.store.user_by_email(&email).await?.is_some() {
            tracing::debug!("bootstrap admin already present");
            return Ok(());
        }
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            name: "Administrator".to_string(),
            email,
            password_hash: hash_password(admin.password.clone(), self.bcrypt_cost).await?,
            role: Role::Admin,
            status: UserStatus::Approved,
            created_at: now,
            updated_at: now,
            approved_at: Some(now),
            approved_by: None,
        };
        self.store.insert_user(&user).await?;
        tracing::info!(user_id = %user.id, "bootstrap admin created");
        Ok(())
    }
}

fn duplicate_email() -> AppError {
    AppError::Conflict("A user with this email already exists".to_string())
}

/// `local@domain.tld` with no whitespace and exactly one `@`.
fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(TokenSigner::new("test-secret", 12)),
            4,
        )
    }

    fn signup(email: &str, role: Option<Role>) -> SignupRequest {
        SignupRequest {
            name: "Ada".to_string(),
            email: email.to_string(),
            password: "password123".to_string(),
            confirm_password: "password123".to_string(),
            role,
        }
    }

    fn login(email: &str, mode: Option<Role>) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: "password123".to_string(),
            mode,
        }
    }

    fn caller(user: &PublicUser) -> AuthUser {
        AuthUser {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            status: user.status,
        }
    }

    #[test]
    fn email_syntax() {
        assert!(looks_like_email("a@b.co"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("a b@c.d"));
        assert!(!looks_like_email("@c.d"));
        assert!(!looks_like_email("a@@c.d"));
    }

    #[tokio::test]
    async fn user_signup_logs_in_immediately() {
        let svc = service();
        let Ok(SignupOutcome::Active(session)) = svc.signup(signup("Ada@X.com", None)).await else {
            panic!("expected an active session");
        };
        assert_eq!(session.user.email, "ada@x.com");
        assert_eq!(session.user.status, UserStatus::Approved);
        tokio_test::assert_ok!(svc.login(login("ada@x.com", Some(Role::User))).await);
    }

    #[tokio::test]
    async fn admin_signup_is_pending_until_approved() {
        let svc = service();
        let Ok(SignupOutcome::Pending { .. }) = svc.signup(signup("root@x.com", Some(Role::Admin))).await
        else {
            panic!("expected pending outcome");
        };
        let pending = svc.login(login("root@x.com", None)).await;
        assert!(matches!(pending, Err(AppError::Forbidden(_))));

        let Ok(()) = svc
            .bootstrap_admin(&BootstrapAdmin {
                email: "boss@x.com".to_string(),
                password: "password123".to_string(),
            })
            .await
        else {
            panic!("bootstrap failed");
        };
        let Ok(boss) = svc.login(login("boss@x.com", Some(Role::Admin))).await else {
            panic!("bootstrap admin login failed");
        };
        let Ok(queue) = svc.pending_admins().await else {
            panic!("list failed");
        };
        let Some(candidate) = queue.first() else {
            panic!("expected a pending admin");
        };

        let Ok(approved) = svc.approve(&caller(&boss.user), candidate.id).await else {
            panic!("approve failed");
        };
        assert_eq!(approved.status, UserStatus::Approved);
        assert_eq!(approved.approved_by, Some(boss.user.id));
        tokio_test::assert_ok!(svc.approve(&caller(&boss.user), candidate.id).await);
        tokio_test::assert_ok!(svc.login(login("root@x.com", Some(Role::Admin))).await);
    }

    #[tokio::test]
    async fn validation_messages() {
        let svc = service();
        let mut short = signup("a@x.com", None);
        short.password = "short".to_string();
        short.confirm_password = "short".to_string();
        let Err(err) = svc.signup(short).await else {
            panic!("expected error");
        };
        assert_eq!(err.to_string(), "Password must be at least 8 characters long");

        let mut mismatch = signup("a@x.com", None);
        mismatch.confirm_password = "password124".to_string();
        let Err(err) = svc.signup(mismatch).await else {
            panic!("expected error");
        };
        assert_eq!(err.to_string(), "Passwords do not match");
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let svc = service();
        tokio_test::assert_ok!(svc.signup(signup("a@x.com", None)).await);
        let again = svc.signup(signup(" A@x.com", None)).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn wrong_password_and_wrong_tab() {
        let svc = service();
        tokio_test::assert_ok!(svc.signup(signup("a@x.com", None)).await);

        let mut bad = login("a@x.com", None);
        bad.password = "nope-nope".to_string();
        assert!(matches!(svc.login(bad).await, Err(AppError::Unauthorized(_))));

        let Err(err) = svc.login(login("a@x.com", Some(Role::Admin))).await else {
            panic!("expected error");
        };
        assert_eq!(err.to_string(), "Please use the user login tab for this account");
    }

    #[tokio::test]
    async fn approving_a_user_account_is_rejected() {
        let svc = service();
        let Ok(SignupOutcome::Active(session)) = svc.signup(signup("a@x.com", None)).await else {
            panic!("signup failed");
        };
        let result = svc.approve(&caller(&session.user), session.user.id).await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }
}
