use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::auth::{
    hash_password, validate_user_password, verify_password, Principal, TokenService,
};
use crate::database::models::NewUser;
use crate::database::CredentialStore;
use crate::sanitize::escape_html;
use crate::services::ServiceError;
use crate::types::PrincipalKind;

/// Issued bearer token and the credential domain it belongs to
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    #[serde(rename = "authToken")]
    pub auth_token: String,
    #[serde(rename = "type")]
    pub kind: PrincipalKind,
}

/// Public view of a newly registered parent
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RegisteredUser {
    pub id: i32,
    pub name: String,
    pub username: String,
}

/// Registration, login and bearer token resolution for both credential domains
#[derive(Clone)]
pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    tokens: TokenService,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(credentials: Arc<dyn CredentialStore>, tokens: TokenService, bcrypt_cost: u32) -> Self {
        Self { credentials, tokens, bcrypt_cost }
    }

    pub async fn register_user(
        &self,
        name: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<RegisteredUser, ServiceError> {
        let name = name.filter(|v| !v.is_empty()).ok_or(ServiceError::MissingField("name"))?;
        let username = username
            .filter(|v| !v.is_empty())
            .ok_or(ServiceError::MissingField("username"))?;
        let password = password
            .filter(|v| !v.is_empty())
            .ok_or(ServiceError::MissingField("password"))?;

        if let Some(message) = validate_user_password(&password) {
            return Err(ServiceError::validation(message));
        }
        if self.credentials.user_exists(&username).await? {
            return Err(ServiceError::validation("Username already taken"));
        }

        let password = hash_password(&password, self.bcrypt_cost).await?;
        let user = self
            .credentials
            .insert_user(NewUser { username, password, name })
            .await?;
        info!(user_id = user.id, "Parent account registered");

        Ok(RegisteredUser {
            id: user.id,
            name: escape_html(&user.name),
            username: escape_html(&user.username),
        })
    }

    pub async fn login_user(
        &self,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<TokenResponse, ServiceError> {
        let (username, password) = login_fields(username, password)?;
        let user = self
            .credentials
            .find_user_by_username(&username)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        if !verify_password(&password, &user.password).await? {
            debug!(username = %username, "Parent login rejected");
            return Err(ServiceError::InvalidCredentials);
        }
        self.issue(&Principal::Parent(user))
    }

    pub async fn login_member(
        &self,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<TokenResponse, ServiceError> {
        let (username, password) = login_fields(username, password)?;
        let member = self
            .credentials
            .find_member_by_username(&username)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        if !verify_password(&password, &member.password).await? {
            debug!(username = %username, "Member login rejected");
            return Err(ServiceError::InvalidCredentials);
        }
        self.issue(&Principal::Member(member))
    }

    /// Issue a fresh token for an already authenticated principal
    pub fn issue(&self, principal: &Principal) -> Result<TokenResponse, ServiceError> {
        let claims = match principal {
            Principal::Parent(user) => {
                self.tokens.claims(PrincipalKind::User, &user.username, user.id, &user.name, None)
            }
            Principal::Member(member) => self.tokens.claims(
                PrincipalKind::Member,
                &member.username,
                member.id,
                &member.name,
                Some(member.household_id),
            ),
        };

        Ok(TokenResponse {
            auth_token: self.tokens.issue(&claims)?,
            kind: principal.kind(),
        })
    }

    /// Verify a bearer token and load the account it names
    pub async fn authenticate(&self, token: &str) -> Result<Principal, ServiceError> {
        let claims = self.tokens.verify(token).map_err(|e| {
            debug!("Bearer token rejected: {}", e);
            ServiceError::Unauthorized
        })?;

        let principal = match claims.kind {
            PrincipalKind::User => self
                .credentials
                .find_user_by_username(&claims.sub)
                .await?
                .map(Principal::Parent),
            PrincipalKind::Member => self
                .credentials
                .find_member_by_username(&claims.sub)
                .await?
                .map(Principal::Member),
        };

        principal.ok_or_else(|| {
            debug!(subject = %claims.sub, kind = ?claims.kind, "Token subject no longer exists");
            ServiceError::Unauthorized
        })
    }
}

fn login_fields(
    username: Option<String>,
    password: Option<String>,
) -> Result<(String, String), ServiceError> {
    let username = username
        .filter(|v| !v.is_empty())
        .ok_or(ServiceError::MissingField("username"))?;
    let password = password
        .filter(|v| !v.is_empty())
        .ok_or(ServiceError::MissingField("password"))?;
    Ok((username, password))
}
