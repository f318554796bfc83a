use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::{Reconciler, SnapshotStore, StoreError};

/// One [`Reconciler`] per game session, each behind its own lock.
///
/// Updates to the same session are serialized, updates to different sessions
/// run independently.
pub struct SessionRegistry<S> {
    sessions: Mutex<HashMap<String, Arc<Mutex<Reconciler<S>>>>>,
    open_store: Box<dyn Fn(&str) -> Result<Reconciler<S>, StoreError> + Send + Sync>,
}

impl<S: SnapshotStore> SessionRegistry<S> {
    /// `open_store` is called the first time a session key is used.
    pub fn new(
        open_store: impl Fn(&str) -> Result<Reconciler<S>, StoreError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            open_store: Box::new(open_store),
        }
    }

    /// Runs `f` with exclusive access to the session's reconciler.
    pub fn with_session<T>(
        &self,
        key: &str,
        f: impl FnOnce(&mut Reconciler<S>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let session = {
            let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
            match sessions.get(key) {
                Some(session) => Arc::clone(session),
                None => {
                    let session = Arc::new(Mutex::new((self.open_store)(key)?));
                    sessions.insert(String::from(key), Arc::clone(&session));
                    session
                }
            }
        };
        let mut reconciler = session.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut reconciler)
    }

    pub fn num_sessions(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
