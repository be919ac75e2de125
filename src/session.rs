//! The signed-in session, owned by the root of the program.
//!
//! Lifecycle: [`SessionContext::init`] restores any persisted session,
//! listeners registered with [`SessionContext::subscribe`] observe every
//! [`AuthEvent`], and [`SessionContext::dispose`] drops them. Views receive
//! the context by reference; there is no global session.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::auth;
use crate::db::Database;
use crate::error::{HubError, HubResult};
use crate::models::{Account, Role};

#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    /// Emitted once a persisted session has been restored.
    Restored(String),
    SignedIn(String),
    SignedOut,
}

pub type SubscriptionId = u64;

type Listener = Box<dyn FnMut(&AuthEvent)>;

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    user_id: String,
    signed_in_at: String,
}

pub struct SessionContext {
    path: PathBuf,
    account: Option<Account>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: SubscriptionId,
}

impl SessionContext {
    /// A context with nobody signed in that persists to `path`.
    pub fn anonymous(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            account: None,
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    /// Restore the session stored at `path`, if its account still exists.
    pub fn init(path: impl Into<PathBuf>, db: &Database) -> HubResult<Self> {
        let mut ctx = Self::anonymous(path);
        let Some(stored) = read_stored(&ctx.path)? else {
            return Ok(ctx);
        };

        match db.get_account(&stored.user_id)? {
            Some(account) => {
                tracing::debug!(user_id = %account.user_id, "session restored");
                ctx.account = Some(account);
            }
            None => {
                tracing::warn!(user_id = %stored.user_id, "stale session discarded");
                remove_stored(&ctx.path)?;
            }
        }
        Ok(ctx)
    }

    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.account.as_ref().map(|a| a.role)
    }

    pub fn require_account(&self) -> HubResult<&Account> {
        self.account
            .as_ref()
            .ok_or_else(|| HubError::Forbidden("Please sign in first".to_string()))
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&AuthEvent) + 'static) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        if let Some(account) = &self.account {
            let event = AuthEvent::Restored(account.user_id.clone());
            if let Some((_, listener)) = self.listeners.last_mut() {
                listener(&event);
            }
        }
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    pub fn sign_in(&mut self, db: &Database, email: &str, password: &str) -> HubResult<&Account> {
        let account = auth::sign_in(db, email, password)?;
        self.establish(account)
    }

    /// Make `account` the signed-in account and persist it.
    pub fn establish(&mut self, account: Account) -> HubResult<&Account> {
        let stored = StoredSession {
            user_id: account.user_id.clone(),
            signed_in_at: chrono::Utc::now().to_rfc3339(),
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&stored)?)?;

        let event = AuthEvent::SignedIn(account.user_id.clone());
        let account = self.account.insert(account);
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
        Ok(account)
    }

    pub fn sign_out(&mut self) -> HubResult<()> {
        remove_stored(&self.path)?;
        if self.account.take().is_some() {
            tracing::info!("signed out");
            self.emit(&AuthEvent::SignedOut);
        }
        Ok(())
    }

    /// Drop all listeners and the in-memory account. The persisted session
    /// is left for the next process.
    pub fn dispose(&mut self) {
        self.listeners.clear();
        self.account = None;
    }

    fn emit(&mut self, event: &AuthEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }
}

fn read_stored(path: &Path) -> HubResult<Option<StoredSession>> {
    match std::fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(stored) => Ok(Some(stored)),
            Err(e) => {
                tracing::warn!(error = %e, "unreadable session file ignored");
                Ok(None)
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn remove_stored(path: &Path) -> HubResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::SignUpInput;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn student(db: &Database) -> Account {
        auth::sign_up(
            db,
            &SignUpInput {
                email: "ada@example.com".to_string(),
                password: "analytical".to_string(),
                role: Role::Student,
                display_name: "Ada".to_string(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_session_persists_across_init() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let db = Database::open_in_memory().unwrap();
        let account = student(&db);

        let mut ctx = SessionContext::init(&path, &db).unwrap();
        assert!(ctx.account().is_none());
        ctx.sign_in(&db, "ada@example.com", "analytical").unwrap();
        assert_eq!(ctx.role(), Some(Role::Student));

        let restored = SessionContext::init(&path, &db).unwrap();
        assert_eq!(restored.account().unwrap().user_id, account.user_id);

        ctx.sign_out().unwrap();
        assert!(!path.exists());
        assert!(SessionContext::init(&path, &db).unwrap().account().is_none());
    }

    #[test]
    fn test_listeners_receive_events_until_disposed() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().unwrap();
        let account = student(&db);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let mut ctx = SessionContext::anonymous(dir.path().join("session.json"));
        let sink = Rc::clone(&seen);
        ctx.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        ctx.establish(account.clone()).unwrap();
        ctx.sign_out().unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![AuthEvent::SignedIn(account.user_id.clone()), AuthEvent::SignedOut]
        );

        ctx.dispose();
        ctx.establish(account).unwrap();
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().unwrap();
        let account = student(&db);
        let count = Rc::new(RefCell::new(0));

        let mut ctx = SessionContext::anonymous(dir.path().join("session.json"));
        let sink = Rc::clone(&count);
        let id = ctx.subscribe(move |_| *sink.borrow_mut() += 1);
        assert!(ctx.unsubscribe(id));
        assert!(!ctx.unsubscribe(id));

        ctx.establish(account).unwrap();
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn test_subscribing_to_a_restored_session_reports_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let db = Database::open_in_memory().unwrap();
        let account = student(&db);
        SessionContext::anonymous(&path).establish(account.clone()).unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut ctx = SessionContext::init(&path, &db).unwrap();
        let sink = Rc::clone(&seen);
        ctx.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        assert_eq!(*seen.borrow(), vec![AuthEvent::Restored(account.user_id)]);
    }

    #[test]
    fn test_require_account() {
        let ctx = SessionContext::anonymous("unused.json");
        assert!(matches!(ctx.require_account(), Err(HubError::Forbidden(_))));
    }
}
