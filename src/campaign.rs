//! Paced, sequential bulk sending and the launch flow around it

use crate::access::{EntitlementStore, TrialGrant};
use crate::config::{AppConfig, DelayRange};
use crate::error::{OutreachError, Result};
use crate::extract::{RecipientExtractor, RecipientSet};
use crate::input::RawInput;
use crate::session::{CredentialStore, Credentials, SessionId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sends a single message through the mail provider
pub trait Mailer: Send + Sync {
    /// Returns true when the provider accepted the message
    fn send(
        &self,
        credentials: &Credentials,
        to: &str,
        subject: &str,
        body: &str,
        attachment: Option<&Path>,
    ) -> bool;
}

/// Waits between two consecutive sends
pub trait Pacer {
    fn pause(&mut self);
}

/// Sleeps a uniformly random whole number of milliseconds within a range
#[derive(Debug, Clone)]
pub struct RandomPacer {
    range: DelayRange,
    rng: StdRng,
}

impl RandomPacer {
    #[must_use]
    pub fn new(range: DelayRange) -> Self {
        Self {
            range,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic delays, for tests
    #[must_use]
    pub fn with_seed(range: DelayRange, seed: u64) -> Self {
        Self {
            range,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw the next delay without sleeping
    pub fn next_delay(&mut self) -> Duration {
        let min = self.range.min_secs().saturating_mul(1000);
        let max = self.range.max_secs().saturating_mul(1000);
        Duration::from_millis(self.rng.gen_range(min..=max))
    }
}

impl Pacer for RandomPacer {
    fn pause(&mut self) {
        let delay = self.next_delay();
        debug!("Pausing {} ms before next send", delay.as_millis());
        std::thread::sleep(delay);
    }
}

/// Subject, body and optional attachment shared by every recipient
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Campaign {
    pub subject: String,
    pub body: String,
    pub attachment: Option<PathBuf>,
}

impl Campaign {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            attachment: None,
        }
    }

    #[must_use]
    pub fn with_attachment(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachment = Some(path.into());
        self
    }
}

/// Per-recipient outcome of one send loop
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CampaignReport {
    pub attempted: usize,
    pub sent: Vec<String>,
    pub failed: Vec<String>,
}

impl CampaignReport {
    #[must_use]
    pub const fn sent_count(&self) -> usize {
        self.sent.len()
    }

    /// User-facing flash text
    #[must_use]
    pub fn summary(&self) -> String {
        if self.failed.is_empty() {
            format!("Sent {} emails!", self.sent.len())
        } else {
            format!(
                "Sent {} emails! ({} failed)",
                self.sent.len(),
                self.failed.len()
            )
        }
    }
}

/// Send to every recipient in order, pausing between sends but not after
/// the last one. A failed send is recorded and the loop moves on.
pub fn run_campaign<M, P>(
    mailer: &M,
    credentials: &Credentials,
    recipients: &RecipientSet,
    campaign: &Campaign,
    pacer: &mut P,
) -> CampaignReport
where
    M: Mailer + ?Sized,
    P: Pacer + ?Sized,
{
    let mut report = CampaignReport::default();
    let total = recipients.len();

    for (index, to) in recipients.iter().enumerate() {
        report.attempted += 1;
        let accepted = mailer.send(
            credentials,
            to,
            &campaign.subject,
            &campaign.body,
            campaign.attachment.as_deref(),
        );

        if accepted {
            debug!("Sent {}/{total} to {to}", index + 1);
            report.sent.push(to.clone());
        } else {
            warn!("Send {}/{total} to {to} failed", index + 1);
            report.failed.push(to.clone());
        }

        if index + 1 < total {
            pacer.pause();
        }
    }

    info!(
        "Campaign finished: {} sent, {} failed",
        report.sent.len(),
        report.failed.len()
    );

    report
}

/// What a launch request produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// Extraction found nothing to send to
    NoRecipients,
    Completed(CampaignReport),
}

impl LaunchOutcome {
    /// User-facing flash text
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::NoRecipients => "No emails found.".to_string(),
            Self::Completed(report) => report.summary(),
        }
    }
}

/// Request-level entry points, wired to explicit collaborators
pub struct Outreach<'a> {
    config: &'a AppConfig,
    entitlements: &'a dyn EntitlementStore,
    credentials: &'a dyn CredentialStore,
    mailer: &'a dyn Mailer,
    extractor: RecipientExtractor,
}

impl<'a> Outreach<'a> {
    pub fn new(
        config: &'a AppConfig,
        entitlements: &'a dyn EntitlementStore,
        credentials: &'a dyn CredentialStore,
        mailer: &'a dyn Mailer,
    ) -> Self {
        Self {
            config,
            entitlements,
            credentials,
            mailer,
            extractor: RecipientExtractor::default(),
        }
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: RecipientExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        self.config
    }

    /// Pacer using the configured delay range
    #[must_use]
    pub fn pacer(&self) -> RandomPacer {
        RandomPacer::new(self.config.send_delay)
    }

    /// Consent URL for the sign-in redirect
    pub fn login_url(&self, state: &str) -> Result<String> {
        Ok(self.config.oauth.authorization_url(state)?.into())
    }

    /// Keep freshly exchanged credentials server-side
    pub fn sign_in(&self, credentials: Credentials) -> SessionId {
        self.credentials.put(credentials)
    }

    pub fn sign_out(&self, session: &SessionId) {
        self.credentials.remove(session);
    }

    #[must_use]
    pub fn is_signed_in(&self, session: &SessionId) -> bool {
        self.credentials.get(session).is_some()
    }

    /// Start the configured trial for a user
    pub fn start_trial(&self, user_id: &str) -> Result<TrialGrant> {
        self.entitlements
            .grant_trial(user_id, self.config.trial_duration)
    }

    /// Extract recipients without sending
    #[must_use]
    pub fn preview(&self, input: RawInput) -> RecipientSet {
        input.extract(&self.extractor)
    }

    /// Check access, extract recipients, then run the send loop
    pub fn launch(
        &self,
        session: &SessionId,
        user_id: &str,
        input: RawInput,
        campaign: &Campaign,
        pacer: &mut dyn Pacer,
    ) -> Result<LaunchOutcome> {
        let credentials = self
            .credentials
            .get(session)
            .ok_or(OutreachError::NotAuthenticated)?;

        if !self.entitlements.is_entitled(user_id) {
            return Err(OutreachError::NotEntitled(user_id.to_string()));
        }

        if campaign.subject.trim().is_empty() || campaign.body.trim().is_empty() {
            return Err(OutreachError::Message(
                "subject and body are required".into(),
            ));
        }

        let recipients = input.extract(&self.extractor);
        if recipients.is_empty() {
            info!("No recipients found for {user_id}");
            return Ok(LaunchOutcome::NoRecipients);
        }

        info!(
            "Launching campaign for {user_id} to {} recipient(s)",
            recipients.len()
        );
        let report = run_campaign(self.mailer, &credentials, &recipients, campaign, pacer);
        Ok(LaunchOutcome::Completed(report))
    }
}
