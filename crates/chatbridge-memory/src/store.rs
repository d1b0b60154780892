use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use chatbridge_core::ChatMessage;

use crate::transcript::Transcript;

struct SessionEntry {
    transcript: Transcript,
    epoch: u64,
}

/// A transcript copied out of the store together with the reset epoch it was
/// read at.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub transcript: Transcript,
    pub epoch: u64,
}

/// Process-wide map from session id to transcript.
///
/// Every read and write goes through one mutex, so no caller ever sees a
/// transcript mid-mutation. The lock is synchronous and is never held across
/// an `.await`. Clones share the same map.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, SessionEntry>>>,
    system_prompt: Arc<str>,
}

impl SessionStore {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let prompt: String = system_prompt.into();
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            system_prompt: Arc::from(prompt),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn fresh_entry(&self) -> SessionEntry {
        SessionEntry {
            transcript: Transcript::new(self.system_prompt.as_ref()),
            epoch: 0,
        }
    }

    /// Returns a copy of the session's transcript, creating the session if it
    /// does not exist yet.
    pub fn get_or_create(&self, session_id: &str) -> Transcript {
        self.snapshot(session_id).transcript
    }

    /// Returns a copy of the session's transcript, or the initial transcript
    /// for an unknown id without registering it.
    pub fn view(&self, session_id: &str) -> Transcript {
        self.sessions
            .lock()
            .get(session_id)
            .map(|entry| entry.transcript.clone())
            .unwrap_or_else(|| Transcript::new(self.system_prompt.as_ref()))
    }

    pub fn snapshot(&self, session_id: &str) -> SessionSnapshot {
        self.with_entry(session_id, |entry| SessionSnapshot {
            transcript: entry.transcript.clone(),
            epoch: entry.epoch,
        })
    }

    pub fn append(&self, session_id: &str, message: ChatMessage) {
        self.update(session_id, |transcript| transcript.push(message));
    }

    pub fn replace(&self, session_id: &str, transcript: Transcript) {
        self.with_entry(session_id, |entry| entry.transcript = transcript);
    }

    /// Puts the session back to its initial single system turn and bumps its
    /// epoch so in-flight rewrites computed before the reset are dropped.
    pub fn reset(&self, session_id: &str) -> Transcript {
        let fresh = Transcript::new(self.system_prompt.as_ref());
        self.with_entry(session_id, |entry| {
            entry.transcript = fresh.clone();
            entry.epoch += 1;
        });
        fresh
    }

    /// Runs `f` against the session's transcript inside the critical section.
    pub fn update<R>(&self, session_id: &str, f: impl FnOnce(&mut Transcript) -> R) -> R {
        self.with_entry(session_id, |entry| f(&mut entry.transcript))
    }

    /// Like [`update`](Self::update), but only if the session has not been
    /// reset since `epoch` was observed.
    pub fn update_if_epoch<R>(
        &self,
        session_id: &str,
        epoch: u64,
        f: impl FnOnce(&mut Transcript) -> R,
    ) -> Option<R> {
        self.with_entry(session_id, |entry| {
            (entry.epoch == epoch).then(|| f(&mut entry.transcript))
        })
    }

    /// Runs `f` inside the critical section and returns a snapshot of the
    /// transcript as `f` left it.
    pub(crate) fn update_snapshot<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut Transcript) -> R,
    ) -> (SessionSnapshot, R) {
        self.with_entry(session_id, |entry| {
            let value = f(&mut entry.transcript);
            let snapshot = SessionSnapshot {
                transcript: entry.transcript.clone(),
                epoch: entry.epoch,
            };
            (snapshot, value)
        })
    }

    fn with_entry<R>(&self, session_id: &str, f: impl FnOnce(&mut SessionEntry) -> R) -> R {
        let mut sessions = self.sessions.lock();
        let entry = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| self.fresh_entry());
        f(entry)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.lock().contains_key(session_id)
    }

    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.len())
            .finish()
    }
}
