//! # Auth Flow
//!
//! Login and registration forms. A successful submit persists the returned
//! identity through the injected [`SessionStore`] and hands it back to the
//! caller; a failed one keeps the form open with the server's message.
//! Avatar uploads replace the persisted identity the same way.

use log::{info, warn};

use crate::api::{ApiError, ChatApi, LoginRequest, MessageKind, RegisterRequest, Upload, User};
use crate::core::attachment::Attachment;
use crate::core::error::ClientError;
use crate::core::session::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Register,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthField {
    Identifier,
    Name,
    Username,
    Email,
    Password,
}

impl AuthField {
    pub fn label(self) -> &'static str {
        match self {
            AuthField::Identifier => "Username or email",
            AuthField::Name => "Name",
            AuthField::Username => "Username",
            AuthField::Email => "Email",
            AuthField::Password => "Password",
        }
    }

    pub fn is_secret(self) -> bool {
        matches!(self, AuthField::Password)
    }
}

const LOGIN_FIELDS: &[AuthField] = &[AuthField::Identifier, AuthField::Password];
const REGISTER_FIELDS: &[AuthField] = &[
    AuthField::Name,
    AuthField::Username,
    AuthField::Email,
    AuthField::Password,
];

/// A request built from a validated form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRequest {
    Login(LoginRequest),
    Register(RegisterRequest),
}

#[derive(Debug, Clone)]
pub struct AuthForm {
    pub mode: AuthMode,
    pub identifier: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub focus: usize,
    pub submitting: bool,
    pub error: Option<String>,
}

impl Default for AuthForm {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthForm {
    pub fn new() -> Self {
        Self {
            mode: AuthMode::Login,
            identifier: String::new(),
            name: String::new(),
            username: String::new(),
            email: String::new(),
            password: String::new(),
            focus: 0,
            submitting: false,
            error: None,
        }
    }

    pub fn fields(&self) -> &'static [AuthField] {
        match self.mode {
            AuthMode::Login => LOGIN_FIELDS,
            AuthMode::Register => REGISTER_FIELDS,
        }
    }

    pub fn focused(&self) -> AuthField {
        let fields = self.fields();
        fields[self.focus.min(fields.len() - 1)]
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % self.fields().len();
    }

    pub fn focus_prev(&mut self) {
        let len = self.fields().len();
        self.focus = (self.focus + len - 1) % len;
    }

    pub fn value(&self, field: AuthField) -> &str {
        match field {
            AuthField::Identifier => &self.identifier,
            AuthField::Name => &self.name,
            AuthField::Username => &self.username,
            AuthField::Email => &self.email,
            AuthField::Password => &self.password,
        }
    }

    pub fn value_mut(&mut self, field: AuthField) -> &mut String {
        match field {
            AuthField::Identifier => &mut self.identifier,
            AuthField::Name => &mut self.name,
            AuthField::Username => &mut self.username,
            AuthField::Email => &mut self.email,
            AuthField::Password => &mut self.password,
        }
    }

    /// Switch between login and registration. Typed values are kept.
    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::Login => AuthMode::Register,
            AuthMode::Register => AuthMode::Login,
        };
        self.focus = 0;
        self.error = None;
    }

    /// Every field of the active variant must be filled in.
    pub fn validate(&self) -> Result<AuthRequest, ClientError> {
        if let Some(missing) = self
            .fields()
            .iter()
            .find(|field| self.value(**field).trim().is_empty())
        {
            return Err(ClientError::skipped(format!("{} is required", missing.label())));
        }
        Ok(match self.mode {
            AuthMode::Login => AuthRequest::Login(LoginRequest {
                identifier: self.identifier.trim().to_string(),
                password: self.password.clone(),
            }),
            AuthMode::Register => AuthRequest::Register(RegisterRequest {
                name: self.name.trim().to_string(),
                username: self.username.trim().to_string(),
                email: self.email.trim().to_string(),
                password: self.password.clone(),
            }),
        })
    }

    /// Validate and mark the form busy. Rejected while a submit is in flight.
    pub fn begin_submit(&mut self) -> Result<AuthRequest, ClientError> {
        if self.submitting {
            return Err(ClientError::skipped("Already signing in"));
        }
        match self.validate() {
            Ok(request) => {
                self.submitting = true;
                self.error = None;
                Ok(request)
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Apply the server's answer. On success the identity is persisted.
    pub fn finish_submit(
        &mut self,
        result: Result<User, ApiError>,
        store: &dyn SessionStore,
    ) -> Result<User, ClientError> {
        self.submitting = false;
        match result {
            Ok(user) => {
                if let Err(e) = store.save(&user) {
                    warn!("Signed in but could not persist session: {}", e);
                }
                info!("Signed in as @{}", user.username);
                self.password.clear();
                self.error = None;
                Ok(user)
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Full submit round: validate, call `/login` or `/register`, persist.
    pub async fn submit(
        &mut self,
        api: &dyn ChatApi,
        store: &dyn SessionStore,
    ) -> Result<User, ClientError> {
        let request = self.begin_submit()?;
        let result = perform(api, &request).await;
        self.finish_submit(result, store)
    }
}

/// Issue the request behind a validated form.
pub async fn perform(api: &dyn ChatApi, request: &AuthRequest) -> Result<User, ApiError> {
    match request {
        AuthRequest::Login(login) => api.login(login).await,
        AuthRequest::Register(register) => api.register(register).await,
    }
}

/// Only images make an avatar.
pub fn avatar_upload(attachment: Attachment) -> Result<Upload, ClientError> {
    if attachment.kind != MessageKind::Image {
        return Err(ClientError::skipped("Avatar must be an image"));
    }
    Ok(attachment.upload)
}

/// Persist the identity returned by an avatar upload.
pub fn apply_avatar(
    result: Result<User, ApiError>,
    store: &dyn SessionStore,
) -> Result<User, ClientError> {
    let user = result?;
    if let Err(e) = store.save(&user) {
        warn!("Avatar updated but could not persist session: {}", e);
    }
    info!("Avatar updated for @{}", user.username);
    Ok(user)
}

pub async fn update_avatar(
    api: &dyn ChatApi,
    store: &dyn SessionStore,
    username: &str,
    attachment: Attachment,
) -> Result<User, ClientError> {
    let upload = avatar_upload(attachment)?;
    let result = api.update_avatar(username, upload).await;
    apply_avatar(result, store)
}
