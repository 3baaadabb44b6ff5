use chrono::Duration as TrialLength;
use outreach_core::*;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Events = Arc<Mutex<Vec<String>>>;

/// Records each send; addresses in `reject` fail
struct FakeMailer {
    events: Events,
    reject: HashSet<String>,
}

impl FakeMailer {
    fn new(events: &Events) -> Self {
        Self {
            events: Arc::clone(events),
            reject: HashSet::new(),
        }
    }

    fn rejecting(mut self, address: &str) -> Self {
        self.reject.insert(address.to_string());
        self
    }
}

impl Mailer for FakeMailer {
    fn send(
        &self,
        credentials: &Credentials,
        to: &str,
        subject: &str,
        _body: &str,
        attachment: Option<&Path>,
    ) -> bool {
        let attached = attachment.map_or("none".to_string(), |p| p.display().to_string());
        self.events.lock().unwrap().push(format!(
            "send:{to}:{subject}:{attached}:{}",
            credentials.token
        ));
        !self.reject.contains(to)
    }
}

struct RecordingPacer {
    events: Events,
}

impl Pacer for RecordingPacer {
    fn pause(&mut self) {
        self.events.lock().unwrap().push("pause".to_string());
    }
}

fn credentials() -> Credentials {
    Credentials {
        token: "tok".into(),
        refresh_token: None,
        token_uri: GOOGLE_TOKEN_URI.into(),
        client_id: "client".into(),
        client_secret: "secret".into(),
        scopes: vec![GMAIL_SEND_SCOPE.into()],
    }
}

fn config() -> AppConfig {
    AppConfig::from_lookup(|key: &str| match key {
        "GOOGLE_CLIENT_ID" => Some("client".to_string()),
        "GOOGLE_CLIENT_SECRET" => Some("secret".to_string()),
        "REDIRECT_URI" => Some("https://example.com/callback".to_string()),
        _ => None,
    })
    .unwrap()
}

#[test]
fn test_pauses_between_sends_not_after_last() {
    let events = Events::default();
    let mailer = FakeMailer::new(&events);
    let mut pacer = RecordingPacer {
        events: Arc::clone(&events),
    };
    let recipients = extract_addresses("a@x.com b@x.com c@x.com");

    let report = run_campaign(
        &mailer,
        &credentials(),
        &recipients,
        &Campaign::new("Hello", "Body"),
        &mut pacer,
    );

    assert_eq!(report.attempted, 3);
    assert_eq!(report.sent, vec!["a@x.com", "b@x.com", "c@x.com"]);
    assert!(report.failed.is_empty());
    assert_eq!(
        *events.lock().unwrap(),
        vec![
            "send:a@x.com:Hello:none:tok",
            "pause",
            "send:b@x.com:Hello:none:tok",
            "pause",
            "send:c@x.com:Hello:none:tok",
        ]
    );
}

#[test]
fn test_single_recipient_never_pauses() {
    let events = Events::default();
    let mailer = FakeMailer::new(&events);
    let mut pacer = RecordingPacer {
        events: Arc::clone(&events),
    };

    let report = run_campaign(
        &mailer,
        &credentials(),
        &extract_addresses("only@x.org"),
        &Campaign::new("Hi", "Body"),
        &mut pacer,
    );

    assert_eq!(report.sent_count(), 1);
    assert!(!events.lock().unwrap().contains(&"pause".to_string()));
}

#[test]
fn test_empty_recipients_do_nothing() {
    let events = Events::default();
    let mailer = FakeMailer::new(&events);
    let mut pacer = RecordingPacer {
        events: Arc::clone(&events),
    };

    let report = run_campaign(
        &mailer,
        &credentials(),
        &RecipientSet::new(),
        &Campaign::new("Hi", "Body"),
        &mut pacer,
    );

    assert_eq!(report, CampaignReport::default());
    assert!(events.lock().unwrap().is_empty());
}

#[test]
fn test_failed_send_does_not_abort() {
    let events = Events::default();
    let mailer = FakeMailer::new(&events).rejecting("b@x.com");
    let mut pacer = RecordingPacer {
        events: Arc::clone(&events),
    };
    let campaign = Campaign::new("Hello", "Body").with_attachment("/tmp/deck.pdf");

    let report = run_campaign(
        &mailer,
        &credentials(),
        &extract_addresses("a@x.com b@x.com c@x.com"),
        &campaign,
        &mut pacer,
    );

    assert_eq!(report.attempted, 3);
    assert_eq!(report.sent, vec!["a@x.com", "c@x.com"]);
    assert_eq!(report.failed, vec!["b@x.com"]);
    assert_eq!(report.summary(), "Sent 2 emails! (1 failed)");
    assert!(events.lock().unwrap()[0].contains(":/tmp/deck.pdf:"));
}

#[test]
fn test_random_pacer_stays_in_range() {
    let range = DelayRange::new(5, 12).unwrap();
    let mut pacer = RandomPacer::with_seed(range, 42);

    for _ in 0..200 {
        let delay = pacer.next_delay();
        assert!(delay >= Duration::from_secs(5));
        assert!(delay <= Duration::from_secs(12));
    }
}

#[test]
fn test_zero_delay_pacer() {
    let mut pacer = RandomPacer::new(DelayRange::new(0, 0).unwrap());
    assert_eq!(pacer.next_delay(), Duration::ZERO);
    pacer.pause();
}

#[test]
fn test_launch_requires_session() {
    let config = config();
    let entitlements = MemoryEntitlements::new();
    let sessions = MemoryCredentialStore::new();
    let events = Events::default();
    let mailer = FakeMailer::new(&events);
    let outreach = Outreach::new(&config, &entitlements, &sessions, &mailer);
    let mut pacer = RecordingPacer {
        events: Arc::clone(&events),
    };

    let result = outreach.launch(
        &SessionId::new("missing"),
        "user@example.com",
        RawInput::new("a@b.com"),
        &Campaign::new("Hi", "Body"),
        &mut pacer,
    );
    assert!(matches!(result, Err(OutreachError::NotAuthenticated)));
}

#[test]
fn test_launch_requires_entitlement() {
    let config = config();
    let entitlements = MemoryEntitlements::new();
    let sessions = MemoryCredentialStore::new();
    let events = Events::default();
    let mailer = FakeMailer::new(&events);
    let outreach = Outreach::new(&config, &entitlements, &sessions, &mailer);
    let session = outreach.sign_in(credentials());
    let mut pacer = RecordingPacer {
        events: Arc::clone(&events),
    };

    let result = outreach.launch(
        &session,
        "user@example.com",
        RawInput::new("a@b.com"),
        &Campaign::new("Hi", "Body"),
        &mut pacer,
    );
    assert!(matches!(result, Err(OutreachError::NotEntitled(_))));
    assert!(events.lock().unwrap().is_empty());
}

#[test]
fn test_launch_with_no_recipients() {
    let config = config();
    let entitlements = MemoryEntitlements::new();
    let sessions = MemoryCredentialStore::new();
    let events = Events::default();
    let mailer = FakeMailer::new(&events);
    let outreach = Outreach::new(&config, &entitlements, &sessions, &mailer);
    let session = outreach.sign_in(credentials());
    outreach.start_trial("user@example.com").unwrap();
    let mut pacer = RecordingPacer {
        events: Arc::clone(&events),
    };

    let outcome = outreach
        .launch(
            &session,
            "user@example.com",
            RawInput::new("no addresses here").with_pdf(b"garbage"),
            &Campaign::new("Hi", "Body"),
            &mut pacer,
        )
        .unwrap();

    assert_eq!(outcome, LaunchOutcome::NoRecipients);
    assert_eq!(outcome.message(), "No emails found.");
}

#[test]
fn test_launch_sends_to_union_of_sources() {
    let config = config();
    let entitlements = MemoryEntitlements::new();
    entitlements.mark_paid("user@example.com").unwrap();
    let sessions = MemoryCredentialStore::new();
    let events = Events::default();
    let mailer = FakeMailer::new(&events);
    let outreach = Outreach::new(&config, &entitlements, &sessions, &mailer);
    let session = outreach.sign_in(credentials());
    assert!(outreach.is_signed_in(&session));
    let mut pacer = RecordingPacer {
        events: Arc::clone(&events),
    };

    let input = RawInput::new("x@y.com").with_page("Z@W.org x@y.com");
    let outcome = outreach
        .launch(
            &session,
            "user@example.com",
            input,
            &Campaign::new("Hi", "Body"),
            &mut pacer,
        )
        .unwrap();

    let LaunchOutcome::Completed(report) = outcome.clone() else {
        panic!("expected a completed campaign");
    };
    assert_eq!(report.sent, vec!["x@y.com", "z@w.org"]);
    assert_eq!(outcome.message(), "Sent 2 emails!");

    outreach.sign_out(&session);
    assert!(!outreach.is_signed_in(&session));
}

#[test]
fn test_launch_rejects_blank_subject() {
    let config = config();
    let entitlements = MemoryEntitlements::new();
    entitlements.mark_paid("user@example.com").unwrap();
    let sessions = MemoryCredentialStore::new();
    let events = Events::default();
    let mailer = FakeMailer::new(&events);
    let outreach = Outreach::new(&config, &entitlements, &sessions, &mailer);
    let session = outreach.sign_in(credentials());
    let mut pacer = RecordingPacer {
        events: Arc::clone(&events),
    };

    let result = outreach.launch(
        &session,
        "user@example.com",
        RawInput::new("a@b.com"),
        &Campaign::new("  ", "Body"),
        &mut pacer,
    );
    assert!(matches!(result, Err(OutreachError::Message(_))));
}

#[test]
fn test_trial_uses_configured_duration() {
    let config = config();
    let entitlements = MemoryEntitlements::new();
    let sessions = MemoryCredentialStore::new();
    let events = Events::default();
    let mailer = FakeMailer::new(&events);
    let outreach = Outreach::new(&config, &entitlements, &sessions, &mailer);

    let before = chrono::Utc::now();
    let TrialGrant::Granted { expires_at } = outreach.start_trial("t@example.com").unwrap() else {
        panic!("expected a fresh trial");
    };
    assert!(expires_at >= before + TrialLength::days(1));
    assert_eq!(
        outreach.start_trial("t@example.com").unwrap(),
        TrialGrant::AlreadyUsed
    );
    assert!(outreach.login_url("s").unwrap().contains("state=s"));
    assert!(outreach.pacer().next_delay() >= Duration::from_secs(5));
}
