//! Clipboard state — owned payload and the single in-flight read.
//!
//! No platform I/O happens here. A read can be completed by its reply or
//! by its expired timer, so the in-flight request lives in a
//! single-assignment slot: whichever completion source takes it first
//! runs the callback, every later attempt is a no-op.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Payload delivered to a completed read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardData {
    /// Decoded text, or `None` on timeout, refusal or no data.
    pub text: Option<String>,
    /// Length of `text` in characters.
    pub len: usize,
}

impl ClipboardData {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn text(text: String) -> Self {
        let len = text.chars().count();
        Self {
            text: Some(text),
            len,
        }
    }
}

/// Callback run exactly once when a read completes.
pub type ClipboardAction = Box<dyn FnOnce(ClipboardData) + Send + 'static>;

/// Identifies one armed read, so a late supervisor cannot complete a
/// request armed after its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl RequestId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Who is completing the in-flight read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// A conversion reply arrived, or the request finished without one.
    Event,
    /// The timer for this request expired.
    Timeout(RequestId),
}

struct InboundRequest {
    id: RequestId,
    action: ClipboardAction,
    supervisor: Option<JoinHandle<()>>,
}

/// Process-wide clipboard state, one per clipboard context.
pub struct ClipboardState {
    /// Text we serve while we own the selections.
    owned: Mutex<Option<Vec<u8>>>,
    /// The armed read, if any.
    inbound: Mutex<Option<InboundRequest>>,
    /// True from arming until the request is taken for completion.
    running: AtomicBool,
}

impl ClipboardState {
    pub fn new() -> Self {
        Self {
            owned: Mutex::new(None),
            inbound: Mutex::new(None),
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Arm a read. Returns `None` if one is already running; the action
    /// is dropped without being called.
    pub fn arm(&self, action: ClipboardAction) -> Option<RequestId> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        let id = RequestId::next();
        *self.inbound.lock() = Some(InboundRequest {
            id,
            action,
            supervisor: None,
        });
        Some(id)
    }

    /// Attach the supervisor task to request `id`. If that request already
    /// completed the task is aborted straight away.
    pub fn attach_supervisor(&self, id: RequestId, handle: JoinHandle<()>) {
        let mut inbound = self.inbound.lock();
        match inbound.as_mut() {
            Some(request) if request.id == id => request.supervisor = Some(handle),
            _ => handle.abort(),
        }
    }

    /// Complete the in-flight read with `data`.
    ///
    /// Returns `false` without side effects when there is nothing to
    /// complete: no request is armed, or a timeout names a request that
    /// has already been replaced.
    pub fn complete(&self, completion: Completion, data: ClipboardData) -> bool {
        let request = {
            let mut inbound = self.inbound.lock();
            match (completion, inbound.as_ref()) {
                (Completion::Timeout(id), Some(request)) if request.id != id => None,
                _ => inbound.take(),
            }
        };
        let Some(request) = request else {
            tracing::debug!(?completion, "no clipboard request to complete");
            return false;
        };

        // Slot is empty again; a new read may be armed from the callback.
        self.running.store(false, Ordering::Release);

        if let Some(supervisor) = request.supervisor
            && completion == Completion::Event
        {
            supervisor.abort();
        }

        tracing::debug!(
            ?completion,
            len = data.len,
            has_text = data.text.is_some(),
            "clipboard request completed"
        );
        (request.action)(data);
        true
    }

    /// Store a new owned payload, releasing the previous one.
    /// Returns whether a payload was already held.
    pub fn replace_owned(&self, text: Vec<u8>) -> bool {
        self.owned.lock().replace(text).is_some()
    }

    /// Drop the owned payload, returning it if one was held.
    pub fn release_owned(&self) -> Option<Vec<u8>> {
        self.owned.lock().take()
    }

    pub fn owns_text(&self) -> bool {
        self.owned.lock().is_some()
    }

    /// Run `f` against the owned payload without copying it.
    pub fn with_owned<R>(&self, f: impl FnOnce(Option<&[u8]>) -> R) -> R {
        let owned = self.owned.lock();
        f(owned.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn counting_action(count: &Arc<AtomicUsize>) -> ClipboardAction {
        let count = Arc::clone(count);
        Box::new(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    // -- Request lifecycle --

    #[test]
    fn arm_sets_running() {
        let s = ClipboardState::new();
        assert!(!s.is_running());
        assert!(s.arm(Box::new(|_| {})).is_some());
        assert!(s.is_running());
    }

    #[test]
    fn second_arm_rejected() {
        let s = ClipboardState::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        assert!(s.arm(counting_action(&first)).is_some());
        assert!(s.arm(counting_action(&second)).is_none());

        assert!(s.complete(Completion::Event, ClipboardData::empty()));
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn complete_runs_once() {
        let s = ClipboardState::new();
        let count = Arc::new(AtomicUsize::new(0));
        let id = s.arm(counting_action(&count)).unwrap();

        assert!(s.complete(Completion::Event, ClipboardData::empty()));
        assert!(!s.complete(Completion::Timeout(id), ClipboardData::empty()));
        assert!(!s.complete(Completion::Event, ClipboardData::empty()));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!s.is_running());
    }

    #[test]
    fn complete_without_request_is_noop() {
        let s = ClipboardState::new();
        assert!(!s.complete(Completion::Event, ClipboardData::empty()));
    }

    #[test]
    fn stale_timeout_ignored() {
        let s = ClipboardState::new();
        let first = s.arm(Box::new(|_| {})).unwrap();
        s.complete(Completion::Event, ClipboardData::empty());

        let count = Arc::new(AtomicUsize::new(0));
        s.arm(counting_action(&count)).unwrap();

        assert!(!s.complete(Completion::Timeout(first), ClipboardData::empty()));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(s.is_running());
    }

    #[test]
    fn callback_receives_payload() {
        let s = ClipboardState::new();
        let got = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&got);
        s.arm(Box::new(move |data| *slot.lock() = Some(data)))
            .unwrap();

        s.complete(Completion::Event, ClipboardData::text("héllo".into()));

        let data = got.lock().take().unwrap();
        assert_eq!(data.text.as_deref(), Some("héllo"));
        assert_eq!(data.len, 5);
    }

    #[test]
    fn callback_may_rearm() {
        let s = Arc::new(ClipboardState::new());
        let rearmed = Arc::new(AtomicBool::new(false));

        let state = Arc::clone(&s);
        let flag = Arc::clone(&rearmed);
        s.arm(Box::new(move |_| {
            flag.store(state.arm(Box::new(|_| {})).is_some(), Ordering::SeqCst);
        }))
        .unwrap();

        s.complete(Completion::Event, ClipboardData::empty());
        assert!(rearmed.load(Ordering::SeqCst));
        assert!(s.is_running());
    }

    // -- Owned payload --

    #[test]
    fn replace_owned_reports_previous() {
        let s = ClipboardState::new();
        assert!(!s.replace_owned(b"A".to_vec()));
        assert!(s.replace_owned(b"B".to_vec()));
        s.with_owned(|text| assert_eq!(text, Some(&b"B"[..])));
    }

    #[test]
    fn release_owned_empties() {
        let s = ClipboardState::new();
        s.replace_owned(b"A".to_vec());
        assert_eq!(s.release_owned(), Some(b"A".to_vec()));
        assert!(!s.owns_text());
        assert_eq!(s.release_owned(), None);
    }

    #[test]
    fn empty_data_has_no_text() {
        let data = ClipboardData::empty();
        assert_eq!(data.text, None);
        assert_eq!(data.len, 0);
    }
}
