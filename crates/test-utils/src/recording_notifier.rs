use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use stageline::announce::{Notification, NotificationKind, Notifier};

type PostHook = Box<dyn Fn(&Notification) + Send + Sync>;

/// A notifier that records every post and toast.
///
/// An optional hook runs after each post is recorded, e.g. to cancel a
/// countdown at a given tick.
pub struct RecordingNotifier {
    permitted: AtomicBool,
    posts: Mutex<Vec<Notification>>,
    toasts: Mutex<Vec<String>>,
    hook: Option<PostHook>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            permitted: AtomicBool::new(true),
            posts: Mutex::new(Vec::new()),
            toasts: Mutex::new(Vec::new()),
            hook: None,
        }
    }

    pub fn denied() -> Self {
        let n = Self::new();
        n.permitted.store(false, Ordering::SeqCst);
        n
    }

    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn set_permitted(&self, permitted: bool) {
        self.permitted.store(permitted, Ordering::SeqCst);
    }

    pub fn posts(&self) -> Vec<Notification> {
        self.posts.lock().unwrap().clone()
    }

    pub fn toasts(&self) -> Vec<String> {
        self.toasts.lock().unwrap().clone()
    }

    /// Kinds of every post, in order.
    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.posts().into_iter().map(|n| n.kind).collect()
    }

    /// Remaining-seconds values of every tick, in order.
    pub fn ticks(&self) -> Vec<u8> {
        self.kinds()
            .into_iter()
            .filter_map(|k| match k {
                NotificationKind::Tick { remaining } => Some(remaining),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, kind: &NotificationKind) -> usize {
        self.kinds().iter().filter(|k| *k == kind).count()
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RecordingNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingNotifier")
            .field("permitted", &self.permitted.load(Ordering::SeqCst))
            .field("posts", &self.posts.lock().map(|p| p.len()).unwrap_or(0))
            .finish_non_exhaustive()
    }
}

impl Notifier for RecordingNotifier {
    fn notifications_permitted(&self) -> bool {
        self.permitted.load(Ordering::SeqCst)
    }

    fn post(&self, notification: Notification) {
        self.posts.lock().unwrap().push(notification.clone());
        if let Some(hook) = &self.hook {
            hook(&notification);
        }
    }

    fn toast(&self, message: &str) {
        self.toasts.lock().unwrap().push(message.to_string());
    }
}
