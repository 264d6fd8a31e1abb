//! Accounts, sessions and role checks
//!
//! Roles are an explicit field on the stored account and are copied into the
//! session at login. Every privileged service call takes a [`Principal`] and
//! checks it, so hiding a control in a UI is never the only guard.
use super::error::{Result, StorefrontError, ValidationError};
use super::store::{Store, get_record, insert_new_record, scan_records};
use super::types::TimeStamp;
use super::utils::{new_session_token, normalize_email};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

#[derive(
    minicbor::Encode,
    minicbor::Decode,
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[n(0)]
    User,
    #[n(1)]
    Admin,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone)]
struct User {
    #[n(0)]
    email: String,
    #[n(1)]
    name: String,
    #[n(2)]
    password_hash: String,
    #[n(3)]
    role: Role,
    #[n(4)]
    created_at: TimeStamp,
}

/// Account as shown to clients; never carries the password hash.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: TimeStamp,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            created_at: user.created_at.clone(),
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone)]
struct Session {
    #[n(0)]
    email: String,
    #[n(1)]
    role: Role,
    #[n(2)]
    expires_at: TimeStamp,
}

/// The authenticated caller of a service operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self, action: &str) -> Result<()> {
        if self.is_admin() {
            return Ok(());
        }
        warn!(email = %self.email, action, "non-admin attempted a privileged operation");
        Err(StorefrontError::Unauthorized(format!(
            "only administrators may {action}"
        )))
    }

    /// Buyers may act for themselves; admins for anyone.
    pub fn require_self_or_admin(&self, email: &str) -> Result<()> {
        if self.is_admin() || self.email == email {
            return Ok(());
        }
        Err(StorefrontError::Unauthorized(
            "cannot act on another customer's orders".into(),
        ))
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct LoginGrant {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Clone)]
pub struct AccountService {
    store: Store,
    session_ttl: Duration,
}

impl AccountService {
    pub fn new(store: Store, session_ttl: Duration) -> Self {
        Self { store, session_ttl }
    }

    #[instrument(name = "accounts::signup", skip(self, password))]
    pub fn signup(&self, name: &str, email: &str, password: &str) -> Result<UserSummary> {
        self.create_account(name, email, password, Role::User)
    }

    /// Creates the bootstrap administrator unless an account with that email exists.
    #[instrument(name = "accounts::ensure_admin", skip(self, password))]
    pub fn ensure_admin(&self, email: &str, password: &str) -> Result<()> {
        let email = normalize_email(email)?;
        match get_record::<User>(&self.store.users, email.as_bytes())? {
            Some(existing) if existing.role != Role::Admin => {
                warn!(%email, "bootstrap admin email belongs to a non-admin account; leaving it unchanged");
                Ok(())
            }
            Some(_) => {
                debug!(%email, "bootstrap admin already present");
                Ok(())
            }
            None => {
                self.create_account("Admin", &email, password, Role::Admin)?;
                info!(%email, "bootstrap admin created");
                Ok(())
            }
        }
    }

    fn create_account(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<UserSummary> {
        let email = normalize_email(email)?;
        if name.trim().is_empty() {
            return Err(ValidationError::MissingField("name").into());
        }
        if password.is_empty() {
            return Err(ValidationError::MissingField("password").into());
        }

        let user = User {
            email: email.clone(),
            name: name.trim().to_string(),
            password_hash: hash_password(password)?,
            role,
            created_at: TimeStamp::new(),
        };

        insert_new_record(&self.store.users, email.as_bytes(), &user).map_err(|e| match e {
            StorefrontError::Conflict(_) => {
                StorefrontError::Conflict(format!("an account for {email} already exists"))
            }
            other => other,
        })?;

        info!(%email, ?role, "account created");
        Ok(UserSummary::from(&user))
    }

    #[instrument(name = "accounts::login", skip(self, password))]
    pub fn login(&self, email: &str, password: &str) -> Result<LoginGrant> {
        let email = normalize_email(email).map_err(|_| StorefrontError::Unauthenticated)?;
        let user = get_record::<User>(&self.store.users, email.as_bytes())?
            .ok_or(StorefrontError::Unauthenticated)?;

        if !verify_password(&user.password_hash, password)? {
            warn!(%email, "login rejected: bad credentials");
            return Err(StorefrontError::Unauthenticated);
        }

        self.purge_expired_sessions()?;

        let token = new_session_token();
        let session = Session {
            email: user.email.clone(),
            role: user.role,
            expires_at: (Utc::now() + self.session_ttl).into(),
        };
        insert_new_record(&self.store.sessions, token.as_bytes(), &session)?;

        info!(%email, "session opened");
        Ok(LoginGrant {
            token,
            user: UserSummary::from(&user),
        })
    }

    pub fn logout(&self, token: &str) -> Result<()> {
        self.store.sessions.remove(token.as_bytes())?;
        Ok(())
    }

    /// Resolves a bearer token. Expired sessions are deleted on sight.
    pub fn authenticate(&self, token: &str) -> Result<Principal> {
        let session = get_record::<Session>(&self.store.sessions, token.as_bytes())?
            .ok_or(StorefrontError::Unauthenticated)?;

        if session.expires_at.to_datetime_utc() <= Utc::now() {
            self.store.sessions.remove(token.as_bytes())?;
            debug!(email = %session.email, "expired session removed");
            return Err(StorefrontError::Unauthenticated);
        }

        Ok(Principal {
            email: session.email,
            role: session.role,
        })
    }

    /// Drops every session past its expiry, including tokens nobody presents again.
    pub fn purge_expired_sessions(&self) -> Result<usize> {
        let now = Utc::now();
        let mut removed = 0;
        for entry in self.store.sessions.iter() {
            let (token, bytes) = entry?;
            let session: Session = minicbor::decode(&bytes)?;
            if session.expires_at.to_datetime_utc() <= now {
                self.store.sessions.remove(&token)?;
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, "expired sessions purged");
        }
        Ok(removed)
    }

    pub fn list_users(&self, actor: &Principal) -> Result<Vec<UserSummary>> {
        actor.require_admin("list users")?;
        let users: Vec<User> = scan_records(&self.store.users)?;
        Ok(users.iter().map(UserSummary::from).collect())
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StorefrontError::Credential(e.to_string()))
}

fn verify_password(stored_hash: &str, provided: &str) -> Result<bool> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|e| StorefrontError::Credential(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(provided.as_bytes(), &parsed)
        .is_ok())
}
