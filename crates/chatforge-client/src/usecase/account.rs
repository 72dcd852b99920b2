use std::sync::Arc;

use anyhow::anyhow;
use tokio::time::{Duration, Instant};
use tracing::warn;

use crate::domain::repository::{AuthApi, LoginOutcome, MailPort, SessionStore};
use crate::domain::types::{MIN_PASSWORD_LEN, OTP_LEN, OtpPurpose, RESEND_COOLDOWN_SECS};
use crate::error::ClientError;
use crate::otp;
use crate::otp::issuer::OtpIssuer;
use crate::otp::store::OtpStore;
use crate::session::SessionHandle;

const INVALID_CODE: &str = "Invalid or expired code";

fn check_new_password(new_password: &str, confirm: &str) -> Result<(), ClientError> {
    if new_password != confirm {
        return Err(ClientError::Validation("Passwords don't match".to_owned()));
    }
    if new_password.len() < MIN_PASSWORD_LEN {
        return Err(ClientError::Validation(
            "Password must be at least 6 characters".to_owned(),
        ));
    }
    Ok(())
}

// ── Resend cooldown ──────────────────────────────────────────────────────────

/// Wall-clock guard on resend requests: 60 seconds from issuance, single-shot.
/// Dropped with the owning flow, so it never fires against a stale context.
#[derive(Debug)]
pub struct Cooldown {
    until: Instant,
}

impl Cooldown {
    pub fn start() -> Self {
        Self {
            until: Instant::now() + Duration::from_secs(RESEND_COOLDOWN_SECS),
        }
    }

    pub fn ready(&self) -> bool {
        Instant::now() >= self.until
    }

    pub fn remaining_secs(&self) -> u64 {
        self.until.saturating_duration_since(Instant::now()).as_secs()
    }
}

// ── Registration flow ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    CollectingCredentials,
    AwaitingOtp,
    Verified,
}

/// `CollectingCredentials -> AwaitingOtp -> Verified`.
pub struct RegistrationFlow<A, M, S>
where
    A: AuthApi,
    M: MailPort,
    S: SessionStore,
{
    backend: Arc<A>,
    issuer: OtpIssuer<M>,
    store: Arc<OtpStore>,
    session: Arc<SessionHandle<S>>,
    state: RegistrationState,
    email: Option<String>,
    cooldown: Option<Cooldown>,
}

impl<A, M, S> RegistrationFlow<A, M, S>
where
    A: AuthApi,
    M: MailPort,
    S: SessionStore,
{
    pub fn new(
        backend: Arc<A>,
        store: Arc<OtpStore>,
        mailer: M,
        session: Arc<SessionHandle<S>>,
    ) -> Self {
        Self {
            backend,
            issuer: OtpIssuer {
                store: Arc::clone(&store),
                mailer,
            },
            store,
            session,
            state: RegistrationState::CollectingCredentials,
            email: None,
            cooldown: None,
        }
    }

    pub fn state(&self) -> RegistrationState {
        self.state
    }

    pub fn resend_remaining_secs(&self) -> u64 {
        self.cooldown.as_ref().map_or(0, Cooldown::remaining_secs)
    }

    /// Create the pending account, then issue the verification code.
    ///
    /// The flow advances to `AwaitingOtp` even when delivery fails — the
    /// account exists and the user can request a resend.
    pub async fn submit_credentials(
        &mut self,
        email: &str,
        password: &str,
    ) -> Result<(), ClientError> {
        if self.state != RegistrationState::CollectingCredentials {
            return Err(anyhow!("registration: credentials already submitted").into());
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(ClientError::Validation(
                "Password must be at least 6 characters".to_owned(),
            ));
        }

        self.backend.register(email, password).await?;

        self.state = RegistrationState::AwaitingOtp;
        self.email = Some(email.to_owned());
        self.cooldown = Some(Cooldown::start());

        if let Err(e) = self.issuer.issue(email, OtpPurpose::Verify).await {
            warn!(kind = e.kind(), email, "verification email failed; user can resend");
        }
        Ok(())
    }

    /// Validate the code locally, then confirm with the backend.
    ///
    /// A backend failure after the local check leaves the flow in
    /// `AwaitingOtp` with the code already consumed; the user must resend.
    pub async fn submit_code(&mut self, code: &str) -> Result<(), ClientError> {
        if self.state != RegistrationState::AwaitingOtp {
            return Err(anyhow!("registration: not awaiting a code").into());
        }
        let email = self.email.clone().ok_or_else(|| anyhow!("no email on file"))?;

        if !otp::verify(&self.store, &email, OtpPurpose::Verify, code) {
            return Err(ClientError::Validation(INVALID_CODE.to_owned()));
        }

        let session = self.backend.verify_otp(&email, code).await?;
        self.session.establish(session)?;
        self.state = RegistrationState::Verified;
        Ok(())
    }

    /// Issue a fresh code, invalidating any prior un-submitted one.
    pub async fn resend(&mut self) -> Result<(), ClientError> {
        if self.state != RegistrationState::AwaitingOtp {
            return Err(anyhow!("registration: not awaiting a code").into());
        }
        if let Some(cd) = &self.cooldown {
            if !cd.ready() {
                return Err(ClientError::Validation(format!(
                    "Please wait {}s before resending",
                    cd.remaining_secs()
                )));
            }
        }
        let email = self.email.clone().ok_or_else(|| anyhow!("no email on file"))?;

        self.issuer.issue(&email, OtpPurpose::Verify).await?;
        self.cooldown = Some(Cooldown::start());
        Ok(())
    }
}

// ── Forgot-password flow ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetState {
    AwaitingEmail,
    AwaitingOtp,
    AwaitingNewPassword,
    Done,
}

/// `AwaitingEmail -> AwaitingOtp -> AwaitingNewPassword -> Done`.
///
/// The code is only consumed at the final step, so the user can back out of
/// the new-password screen without losing it.
pub struct PasswordResetFlow<A, M>
where
    A: AuthApi,
    M: MailPort,
{
    backend: Arc<A>,
    issuer: OtpIssuer<M>,
    store: Arc<OtpStore>,
    state: ResetState,
    email: Option<String>,
    code: Option<String>,
    cooldown: Option<Cooldown>,
}

impl<A, M> PasswordResetFlow<A, M>
where
    A: AuthApi,
    M: MailPort,
{
    pub fn new(backend: Arc<A>, store: Arc<OtpStore>, mailer: M) -> Self {
        Self {
            backend,
            issuer: OtpIssuer {
                store: Arc::clone(&store),
                mailer,
            },
            store,
            state: ResetState::AwaitingEmail,
            email: None,
            code: None,
            cooldown: None,
        }
    }

    pub fn state(&self) -> ResetState {
        self.state
    }

    pub fn resend_remaining_secs(&self) -> u64 {
        self.cooldown.as_ref().map_or(0, Cooldown::remaining_secs)
    }

    /// Issue a reset code. Advances only when the delivery call succeeded.
    pub async fn submit_email(&mut self, email: &str) -> Result<(), ClientError> {
        if self.state != ResetState::AwaitingEmail {
            return Err(anyhow!("reset: email already submitted").into());
        }

        self.issuer.issue(email, OtpPurpose::Reset).await?;

        self.state = ResetState::AwaitingOtp;
        self.email = Some(email.to_owned());
        self.cooldown = Some(Cooldown::start());
        Ok(())
    }

    /// Format check only — the code is not consumed here.
    pub fn submit_code(&mut self, code: &str) -> Result<(), ClientError> {
        if self.state != ResetState::AwaitingOtp {
            return Err(anyhow!("reset: not awaiting a code").into());
        }
        if code.len() != OTP_LEN || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(ClientError::Validation(
                "Please enter the 6-digit code".to_owned(),
            ));
        }
        self.code = Some(code.to_owned());
        self.state = ResetState::AwaitingNewPassword;
        Ok(())
    }

    /// Consume the code and apply the new password.
    ///
    /// Any failure past the local checks returns the flow to `AwaitingOtp`;
    /// once consumed, the code cannot be replayed and the user must resend.
    pub async fn submit_new_password(
        &mut self,
        new_password: &str,
        confirm: &str,
    ) -> Result<(), ClientError> {
        if self.state != ResetState::AwaitingNewPassword {
            return Err(anyhow!("reset: not awaiting a new password").into());
        }
        check_new_password(new_password, confirm)?;

        let email = self.email.clone().ok_or_else(|| anyhow!("no email on file"))?;
        let code = self.code.take().ok_or_else(|| anyhow!("no code on file"))?;

        if !otp::verify(&self.store, &email, OtpPurpose::Reset, &code) {
            self.state = ResetState::AwaitingOtp;
            return Err(ClientError::Validation(INVALID_CODE.to_owned()));
        }

        match self
            .backend
            .reset_password(&email, &code, new_password)
            .await
        {
            Ok(()) => {
                self.state = ResetState::Done;
                Ok(())
            }
            Err(e) => {
                self.state = ResetState::AwaitingOtp;
                Err(e)
            }
        }
    }

    pub async fn resend(&mut self) -> Result<(), ClientError> {
        if self.state != ResetState::AwaitingOtp {
            return Err(anyhow!("reset: not awaiting a code").into());
        }
        if let Some(cd) = &self.cooldown {
            if !cd.ready() {
                return Err(ClientError::Validation(format!(
                    "Please wait {}s before resending",
                    cd.remaining_secs()
                )));
            }
        }
        let email = self.email.clone().ok_or_else(|| anyhow!("no email on file"))?;

        self.issuer.issue(&email, OtpPurpose::Reset).await?;
        self.cooldown = Some(Cooldown::start());
        Ok(())
    }
}

// ── Session-scoped account operations ────────────────────────────────────────

/// Login, logout, and the single-transition change-password flow.
pub struct AccountService<A, S>
where
    A: AuthApi,
    S: SessionStore,
{
    pub backend: Arc<A>,
    pub session: Arc<SessionHandle<S>>,
}

impl<A, S> AccountService<A, S>
where
    A: AuthApi,
    S: SessionStore,
{
    /// Obtain a session. A denial carries the backend's message and the
    /// `needs_verification` flag so the caller can route to the OTP screen.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, ClientError> {
        let outcome = self.backend.login(email, password).await?;
        if let LoginOutcome::Success(session) = &outcome {
            self.session.establish(session.clone())?;
        }
        Ok(outcome)
    }

    pub fn logout(&self) -> Result<(), ClientError> {
        self.session.destroy()
    }

    /// Authenticated-only; no OTP involved. Local checks, then one backend
    /// call whose error message is surfaced verbatim.
    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
        confirm: &str,
    ) -> Result<(), ClientError> {
        check_new_password(new_password, confirm)?;
        let token = self.session.require_token()?;

        match self
            .backend
            .change_password(&token, current_password, new_password)
            .await
        {
            Err(ClientError::AuthExpired) => {
                self.session.destroy()?;
                Err(ClientError::AuthExpired)
            }
            other => other,
        }
    }
}
