//! `mp-cli session watch`: the admin idle-timeout controller in a terminal.
//!
//! Logs in, then drives an [`IdleTracker`] from one repeating one-second
//! timer. Every line typed on stdin counts as activity; `stay` is the explicit
//! "stay logged in" action; `quit` (or EOF, or Ctrl+C) logs out. When the
//! countdown reaches zero the controller logs out and stops for good.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use url::Url;

use minh_phat_core::AdminUserView;
use minh_phat_core::idle::{IdleEvent, IdlePolicy, IdleTracker, format_countdown};

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid server URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("login failed ({status}): {message}")]
    LoginRejected { status: u16, message: String },

    #[error("server did not confirm the new session")]
    NotAuthenticated,

    #[error("server sent an unusable idle policy: {0}")]
    Policy(#[from] minh_phat_core::idle::IdlePolicyError),
}

/// What the user did at the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Activity,
    StayLoggedIn,
    Quit,
}

impl Input {
    #[must_use]
    pub fn from_line(line: &str) -> Self {
        match line.trim().to_ascii_lowercase().as_str() {
            "stay" => Self::StayLoggedIn,
            "quit" | "exit" | "logout" => Self::Quit,
            _ => Self::Activity,
        }
    }
}

/// How a watch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEnd {
    /// Idle window ran out; the session was logged out.
    Expired,
    /// The user quit; the session was logged out.
    LoggedOut,
}

/// The server side of the controller. Split out so tests can count logouts.
pub trait SessionApi {
    fn logout(&self) -> impl std::future::Future<Output = Result<(), SessionError>> + Send;
}

/// Run the idle controller until expiry or quit.
///
/// The single interval is reset on every input and dropped on return, so no
/// tick outlives the controller.
///
/// # Errors
///
/// Returns an error if the final logout call fails.
pub async fn run_controller<A: SessionApi + Sync>(
    mut tracker: IdleTracker,
    api: &A,
    mut inputs: mpsc::Receiver<Input>,
    mut notify: impl FnMut(IdleEvent),
) -> Result<WatchEnd, SessionError> {
    let mut ticker = tokio::time::interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match tracker.poll(Instant::now().into_std()) {
                    Some(IdleEvent::Expired) => {
                        api.logout().await?;
                        notify(IdleEvent::Expired);
                        return Ok(WatchEnd::Expired);
                    }
                    Some(event) => notify(event),
                    None => {}
                }
            }
            input = inputs.recv() => {
                let now = Instant::now().into_std();
                let event = match input {
                    Some(Input::Activity) => tracker.record_activity(now),
                    Some(Input::StayLoggedIn) => tracker.stay_logged_in(now),
                    Some(Input::Quit) | None => {
                        api.logout().await?;
                        return Ok(WatchEnd::LoggedOut);
                    }
                };
                if let Some(event) = event {
                    notify(event);
                }
                ticker.reset();
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginBody {
    expires_at: DateTime<Utc>,
    user: AdminUserView,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyBody {
    authenticated: bool,
    expires_at: Option<DateTime<Utc>>,
    idle_timeout_seconds: Option<u64>,
    warning_seconds: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Cookie-carrying HTTP client for the auth endpoints.
pub struct HttpSession {
    client: reqwest::Client,
    base: Url,
}

impl HttpSession {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base: Url) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, base })
    }

    async fn login(&self, username: &str, password: &str) -> Result<LoginBody, SessionError> {
        let response = self
            .client
            .post(self.base.join("/api/auth/login")?)
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map_or_else(|_| status.to_string(), |b| b.error);
            return Err(SessionError::LoginRejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }

    async fn verify(&self) -> Result<VerifyBody, SessionError> {
        Ok(self
            .client
            .get(self.base.join("/api/auth/verify")?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }
}

impl SessionApi for HttpSession {
    async fn logout(&self) -> Result<(), SessionError> {
        self.client
            .post(self.base.join("/api/auth/logout")?)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Convert the server's `expiresAt` into a tokio-clock deadline.
fn hard_deadline(expires_at: DateTime<Utc>, now: Instant) -> Instant {
    let left = (expires_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
    now + left
}

#[allow(clippy::print_stdout)]
fn print_event(event: IdleEvent) {
    match event {
        IdleEvent::WarningShown { remaining } => println!(
            "Your session will expire in {}. Type 'stay' to stay logged in.",
            format_countdown(remaining)
        ),
        IdleEvent::Countdown { remaining } => println!("  {}", format_countdown(remaining)),
        IdleEvent::WarningHidden => println!("Session extended."),
        IdleEvent::Expired => {
            println!("Session expired due to inactivity. Please log in again.");
        }
    }
}

/// Log in at `base` and watch the session until expiry or quit.
///
/// # Errors
///
/// Returns an error if login, verification or logout fails.
pub async fn watch(base: Url, username: &str, password: &str) -> Result<(), SessionError> {
    let session = HttpSession::new(base)?;
    let login = session.login(username, password).await?;
    let verify = session.verify().await?;
    if !verify.authenticated {
        return Err(SessionError::NotAuthenticated);
    }

    let policy = match (verify.idle_timeout_seconds, verify.warning_seconds) {
        (Some(idle), Some(warning)) => {
            IdlePolicy::new(Duration::from_secs(idle), Duration::from_secs(warning))?
        }
        _ => IdlePolicy::default(),
    };
    let now = Instant::now();
    let expires_at = verify.expires_at.unwrap_or(login.expires_at);
    let tracker = IdleTracker::new(policy, now.into_std())
        .with_hard_deadline(hard_deadline(expires_at, now).into_std());

    tracing::info!(
        user = %login.user.username,
        idle_timeout_secs = policy.idle_timeout().as_secs(),
        %expires_at,
        "Logged in; watching for inactivity"
    );

    let (tx, rx) = mpsc::channel(16);
    let stdin_task = tokio::spawn(forward_stdin(tx.clone()));
    let ctrl_c_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(Input::Quit).await;
        }
    });

    let end = run_controller(tracker, &session, rx, print_event).await;
    stdin_task.abort();
    ctrl_c_task.abort();

    match end? {
        WatchEnd::Expired => tracing::info!("Logged out after inactivity"),
        WatchEnd::LoggedOut => tracing::info!("Logged out"),
    }
    Ok(())
}

async fn forward_stdin(tx: mpsc::Sender<Input>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(Input::from_line(&line)).await.is_err() {
            return;
        }
    }
    let _ = tx.send(Input::Quit).await;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeApi {
        logouts: AtomicUsize,
    }

    impl SessionApi for FakeApi {
        async fn logout(&self) -> Result<(), SessionError> {
            self.logouts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn policy() -> IdlePolicy {
        IdlePolicy::new(Duration::from_secs(10), Duration::from_secs(3)).unwrap()
    }

    fn recorder() -> (Arc<Mutex<Vec<IdleEvent>>>, impl FnMut(IdleEvent)) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        (events, move |e| sink.lock().unwrap().push(e))
    }

    #[test]
    fn test_input_from_line() {
        assert_eq!(Input::from_line(" STAY "), Input::StayLoggedIn);
        assert_eq!(Input::from_line("quit"), Input::Quit);
        assert_eq!(Input::from_line("anything"), Input::Activity);
        assert_eq!(Input::from_line(""), Input::Activity);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_warns_then_expires_and_logs_out() {
        let api = FakeApi::default();
        let (_tx, rx) = mpsc::channel(4);
        let (events, sink) = recorder();
        let tracker = IdleTracker::new(policy(), Instant::now().into_std());

        let end = run_controller(tracker, &api, rx, sink).await.unwrap();

        assert_eq!(end, WatchEnd::Expired);
        assert_eq!(api.logouts.load(Ordering::SeqCst), 1);
        let events = events.lock().unwrap();
        assert!(matches!(events.first(), Some(IdleEvent::WarningShown { .. })));
        assert!(
            events
                .iter()
                .any(|e| matches!(e, IdleEvent::Countdown { .. }))
        );
        assert_eq!(events.last(), Some(&IdleEvent::Expired));
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_hides_warning_and_postpones_expiry() {
        let api = Arc::new(FakeApi::default());
        let (tx, rx) = mpsc::channel(4);
        let (events, sink) = recorder();
        let start = Instant::now();
        let tracker = IdleTracker::new(policy(), start.into_std());

        let driver = {
            let api = Arc::clone(&api);
            tokio::spawn(async move { run_controller(tracker, api.as_ref(), rx, sink).await })
        };

        // Into the warning window, then interact.
        tokio::time::sleep(Duration::from_millis(8_500)).await;
        tx.send(Input::Activity).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(api.logouts.load(Ordering::SeqCst), 0);

        let end = driver.await.unwrap().unwrap();
        assert_eq!(end, WatchEnd::Expired);
        assert!(start.elapsed() >= Duration::from_millis(18_500));

        let events = events.lock().unwrap();
        assert!(events.contains(&IdleEvent::WarningHidden));
    }

    #[tokio::test(start_paused = true)]
    async fn test_quit_logs_out_immediately() {
        let api = FakeApi::default();
        let (tx, rx) = mpsc::channel(4);
        let (events, sink) = recorder();
        tx.send(Input::Quit).await.unwrap();

        let tracker = IdleTracker::new(policy(), Instant::now().into_std());
        let end = run_controller(tracker, &api, rx, sink).await.unwrap();

        assert_eq!(end, WatchEnd::LoggedOut);
        assert_eq!(api.logouts.load(Ordering::SeqCst), 1);
        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hard_deadline_caps_idle_window() {
        let api = FakeApi::default();
        let (_tx, rx) = mpsc::channel(4);
        let (_events, sink) = recorder();
        let start = Instant::now();
        let tracker = IdleTracker::new(policy(), start.into_std())
            .with_hard_deadline((start + Duration::from_secs(5)).into_std());

        let end = run_controller(tracker, &api, rx, sink).await.unwrap();
        assert_eq!(end, WatchEnd::Expired);
        assert!(start.elapsed() < Duration::from_secs(10));
    }
}
