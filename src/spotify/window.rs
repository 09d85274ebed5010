use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use tokio::sync::broadcast;

use crate::types::{PopupFeatures, WindowMessage};

const MESSAGE_CHANNEL_CAPACITY: usize = 16;

/// Handle to a child window opened for one authentication attempt.
pub trait PopupWindow: Send + Sync {
    fn is_closed(&self) -> bool;
    fn close(&self);
}

/// Opens child windows. `None` means the window could not be created, which
/// in a browser almost always means a popup blocker intervened.
pub trait WindowOpener: Send + Sync + 'static {
    fn open(&self, url: &str, features: &PopupFeatures) -> Option<Box<dyn PopupWindow>>;
}

/// Cross-window message transport.
///
/// Posting never fails; a message posted while nobody listens is dropped.
/// Origin is attached by whoever posts (the HTTP layer takes it from the
/// request's `Origin` header), never read from the payload.
#[derive(Clone)]
pub struct MessageBus {
    sender: broadcast::Sender<WindowMessage>,
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(MESSAGE_CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Returns how many listeners received the message.
    pub fn post(&self, origin: impl Into<String>, data: serde_json::Value) -> usize {
        let message = WindowMessage {
            origin: origin.into(),
            data,
        };
        self.sender.send(message).unwrap_or(0)
    }

    pub fn subscribe(&self) -> MessageListener {
        MessageListener {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A registered message listener. Dropping it removes the registration.
pub struct MessageListener {
    receiver: broadcast::Receiver<WindowMessage>,
}

impl MessageListener {
    pub async fn recv(&mut self) -> Option<WindowMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Opens the authorization page in the system browser.
///
/// A browser tab cannot be observed from outside, so the callback page
/// reports its own closing through the server's `/closed` route, which calls
/// [`BrowserOpener::mark_closed`].
#[derive(Clone, Default)]
pub struct BrowserOpener {
    current: Arc<Mutex<Option<Arc<AtomicBool>>>>,
}

impl BrowserOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_closed(&self) {
        let current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(flag) = current.as_ref() {
            flag.store(true, Ordering::SeqCst);
        }
    }
}

impl WindowOpener for BrowserOpener {
    fn open(&self, url: &str, _features: &PopupFeatures) -> Option<Box<dyn PopupWindow>> {
        if webbrowser::open(url).is_err() {
            return None;
        }

        let closed = Arc::new(AtomicBool::new(false));
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = Some(Arc::clone(&closed));
        Some(Box::new(BrowserWindow { closed }))
    }
}

struct BrowserWindow {
    closed: Arc<AtomicBool>,
}

impl PopupWindow for BrowserWindow {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    // The tab itself stays with the user; the callback page tells them it
    // can be closed.
    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
