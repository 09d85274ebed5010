use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{
    sync::oneshot,
    time::{self, MissedTickBehavior},
};

use super::{
    AuthError,
    backend::AuthApi,
    window::{MessageBus, MessageListener, PopupWindow, WindowOpener},
};
use crate::{
    config,
    types::{AuthOutcome, AuthResultMessage, AuthSuccess, PopupFeatures, WindowMessage},
};

/// Failure text reported when the user closes the popup before it answered.
pub const AUTHENTICATION_CANCELLED: &str = "Authentication cancelled";

/// Timing and identity parameters of the popup bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// This application's own origin; messages from anywhere else are dropped.
    pub origin: String,
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub features: PopupFeatures,
}

impl BridgeConfig {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(5 * 60),
            features: PopupFeatures::default(),
        }
    }

    pub fn from_env() -> Self {
        Self {
            origin: config::app_origin(),
            poll_interval: config::popup_poll_interval(),
            timeout: config::popup_timeout(),
            features: PopupFeatures::default(),
        }
    }
}

/// Lifecycle of the bridge's single active attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgePhase {
    Idle,
    AwaitingAuthUrl,
    PopupOpen,
    Settled,
}

impl BridgePhase {
    /// The transition table. Anything not listed here is rejected.
    pub fn can_transition_to(self, next: BridgePhase) -> bool {
        use BridgePhase::*;

        matches!(
            (self, next),
            (Idle, AwaitingAuthUrl)
                | (Settled, AwaitingAuthUrl)
                | (AwaitingAuthUrl, PopupOpen)
                | (AwaitingAuthUrl, Settled)
                | (PopupOpen, Settled)
        )
    }
}

type SupersedeSignal = oneshot::Sender<oneshot::Sender<()>>;
type SupersedeReceiver = oneshot::Receiver<oneshot::Sender<()>>;

struct PendingAttempt {
    id: u64,
    supersede: SupersedeSignal,
}

/// Drives one popup-based OAuth handshake at a time.
///
/// The bridge fetches an authorization URL from the backend, opens it in a
/// popup, and waits for exactly one of four things: a `success` message, an
/// `error` message, the user closing the popup, or the absolute timeout.
///
/// # Single Active Attempt
///
/// Starting a new attempt supersedes the pending one. The pending attempt is
/// signalled, tears down (popup closed, listener removed, poll interval
/// stopped), settles with [`AuthError::Superseded`], and only then does the
/// new attempt fetch its URL and open its own popup. Two listeners are never
/// registered by the same bridge at once.
///
/// # Teardown
///
/// The popup handle and the message listener live in one owned value that
/// closes the popup (if still open) and unregisters the listener when
/// dropped. It is dropped before the attempt returns on every path, and also
/// when the caller drops the future mid-flight.
///
/// # Origin Check
///
/// A message is considered only when its origin is byte-for-byte equal to
/// [`BridgeConfig::origin`]. Everything else, and anything that does not
/// parse as an [`AuthResultMessage`], is ignored without a trace.
///
/// # Example
///
/// ```ignore
/// let bridge = PopupAuthBridge::new(
///     Arc::new(HttpBackend::from_env()),
///     BrowserOpener::new(),
///     MessageBus::new(),
///     BridgeConfig::from_env(),
/// );
///
/// match bridge.login_with_popup().await {
///     Ok(AuthOutcome::Success(s)) => println!("signed in as {}", s.user_id),
///     Ok(AuthOutcome::Failure { error }) => println!("{}", error),
///     Err(e) => println!("{}", e),
/// }
/// ```
pub struct PopupAuthBridge<A, O> {
    api: Arc<A>,
    opener: O,
    bus: MessageBus,
    config: BridgeConfig,
    phase: Mutex<BridgePhase>,
    pending: Mutex<Option<PendingAttempt>>,
    next_id: AtomicU64,
}

impl<A, O> PopupAuthBridge<A, O> {
    pub fn new(api: Arc<A>, opener: O, bus: MessageBus, config: BridgeConfig) -> Self {
        Self {
            api,
            opener,
            bus,
            config,
            phase: Mutex::new(BridgePhase::Idle),
            pending: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn phase(&self) -> BridgePhase {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    fn transition(&self, next: BridgePhase) -> bool {
        let mut phase = self.phase.lock().unwrap_or_else(|e| e.into_inner());
        if phase.can_transition_to(next) {
            *phase = next;
            true
        } else {
            false
        }
    }

    fn release(&self, id: u64) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if pending.as_ref().is_some_and(|p| p.id == id) {
            *pending = None;
        }
    }

    /// Registers a new attempt, ending the previous one first.
    async fn supersede_pending(&self) -> (u64, SupersedeReceiver) {
        let (supersede, receiver) = oneshot::channel();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let previous = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(PendingAttempt { id, supersede });

        if let Some(previous) = previous {
            let (done, finished) = oneshot::channel();
            if previous.supersede.send(done).is_ok() {
                // Err means the previous attempt ended on its own meanwhile.
                let _ = finished.await;
            }
        }

        (id, receiver)
    }

    /// Accepts a message only if it is origin-valid and well formed.
    fn accept(&self, message: WindowMessage) -> Option<AuthOutcome> {
        if message.origin != self.config.origin {
            return None;
        }

        match serde_json::from_value::<AuthResultMessage>(message.data).ok()? {
            AuthResultMessage::Success {
                user_id,
                access_token,
                user_data,
                refresh_token,
                expires_in,
            } => Some(AuthOutcome::Success(AuthSuccess {
                user_id,
                access_token,
                user_data,
                refresh_token,
                expires_in,
            })),
            AuthResultMessage::Error { error } => Some(AuthOutcome::Failure { error }),
        }
    }
}

impl<A: AuthApi, O: WindowOpener> PopupAuthBridge<A, O> {
    /// Runs one popup handshake and reports a single result.
    ///
    /// # Returns
    ///
    /// - `Ok(AuthOutcome::Success(..))` - origin-valid `success` message
    /// - `Ok(AuthOutcome::Failure { .. })` - origin-valid `error` message, or
    ///   the popup was closed by the user ([`AUTHENTICATION_CANCELLED`])
    /// - `Err(AuthError::Network(..))` - the authorization URL could not be fetched
    /// - `Err(AuthError::PopupBlocked)` - no popup handle was returned
    /// - `Err(AuthError::Timeout)` - nothing happened within the timeout
    /// - `Err(AuthError::Superseded)` - a newer attempt replaced this one
    pub async fn login_with_popup(&self) -> Result<AuthOutcome, AuthError> {
        let (id, mut superseded) = self.supersede_pending().await;
        let guard = AttemptGuard { bridge: self, id };

        let (result, waiter) = self.run_attempt(&mut superseded).await;

        drop(guard);
        if let Some(waiter) = waiter {
            let _ = waiter.send(());
        }
        result
    }

    async fn run_attempt(
        &self,
        superseded: &mut SupersedeReceiver,
    ) -> (Result<AuthOutcome, AuthError>, Option<oneshot::Sender<()>>) {
        self.transition(BridgePhase::AwaitingAuthUrl);

        let request = tokio::select! {
            biased;
            waiter = &mut *superseded => return (Err(AuthError::Superseded), waiter.ok()),
            request = self.api.authorization_request() => match request {
                Ok(request) => request,
                Err(e) => return (Err(e), None),
            },
        };

        let Some(window) = self.opener.open(&request.auth_url, &self.config.features) else {
            return (Err(AuthError::PopupBlocked), None);
        };
        let mut popup = OpenPopup {
            window,
            listener: self.bus.subscribe(),
        };
        self.transition(BridgePhase::PopupOpen);

        let deadline = time::sleep(self.config.timeout);
        tokio::pin!(deadline);
        let mut poll = time::interval(self.config.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let settled = loop {
            tokio::select! {
                biased;
                waiter = &mut *superseded => break (Err(AuthError::Superseded), waiter.ok()),
                message = popup.listener.recv() => match message {
                    Some(message) => {
                        if let Some(outcome) = self.accept(message) {
                            break (Ok(outcome), None);
                        }
                    }
                    None => break (Err(AuthError::ChannelClosed), None),
                },
                _ = &mut deadline => break (Err(AuthError::Timeout), None),
                _ = poll.tick() => {
                    if popup.window.is_closed() {
                        let cancelled = AuthOutcome::Failure {
                            error: AUTHENTICATION_CANCELLED.to_string(),
                        };
                        break (Ok(cancelled), None);
                    }
                }
            }
        };

        drop(poll);
        drop(popup);
        settled
    }
}

/// The popup of an attempt together with its message listener.
struct OpenPopup {
    window: Box<dyn PopupWindow>,
    listener: MessageListener,
}

impl Drop for OpenPopup {
    fn drop(&mut self) {
        if !self.window.is_closed() {
            self.window.close();
        }
    }
}

/// Marks the bridge settled and releases the pending slot on every exit.
struct AttemptGuard<'a, A, O> {
    bridge: &'a PopupAuthBridge<A, O>,
    id: u64,
}

impl<A, O> Drop for AttemptGuard<'_, A, O> {
    fn drop(&mut self) {
        self.bridge.transition(BridgePhase::Settled);
        self.bridge.release(self.id);
    }
}
