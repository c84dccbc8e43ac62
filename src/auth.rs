//! Password hashing, login sessions and flash messages.
//!
//! A session moves between three states: anonymous, signed in as an
//! ordinary user, or signed in as an admin. Sessions are held in memory and
//! keyed by the value of the session cookie.

use crate::config::AuthConfig;
use crate::store::{Store, StoreError};
use crate::types::User;
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Key-stretching rounds for new password hashes
pub const HASH_ROUNDS: u32 = 10_000;

const HASH_SCHEME: &str = "sha256";

fn stretch(salt: &[u8], password: &str, rounds: u32) -> Vec<u8> {
    let mut digest = Sha256::new()
        .chain_update(salt)
        .chain_update(password.as_bytes())
        .finalize();
    for _ in 1..rounds {
        digest = Sha256::new()
            .chain_update(salt)
            .chain_update(digest)
            .finalize();
    }
    digest.to_vec()
}

/// Hash a password as `sha256$<rounds>$<salt>$<digest>` with a random salt.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let digest = stretch(&salt, password, HASH_ROUNDS);
    format!(
        "{}${}${}${}",
        HASH_SCHEME,
        HASH_ROUNDS,
        hex::encode(salt),
        hex::encode(digest)
    )
}

/// Check a password against a stored hash. Malformed hashes never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let parts: Vec<&str> = stored.split('$').collect();
    let [scheme, rounds, salt, expected] = parts.as_slice() else {
        return false;
    };
    if *scheme != HASH_SCHEME {
        return false;
    }
    let (Ok(rounds), Ok(salt), Ok(expected)) =
        (rounds.parse::<u32>(), hex::decode(salt), hex::decode(expected))
    else {
        return false;
    };
    if rounds == 0 {
        return false;
    }

    let actual = stretch(&salt, password, rounds);
    actual.len() == expected.len()
        && actual
            .iter()
            .zip(&expected)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// Look up `username` and check its password.
pub fn authenticate(store: &Store, username: &str, password: &str) -> Result<Option<User>, StoreError> {
    let user = store.find_user_by_username(username)?;
    Ok(user.filter(|u| verify_password(password, &u.password_hash)))
}

/// Create the admin account on first run. Returns whether it was created.
pub fn ensure_admin(store: &Store, config: &AuthConfig) -> Result<bool, StoreError> {
    if store.find_user_by_username(&config.admin_username)?.is_some() {
        return Ok(false);
    }
    match store.create_user(
        &config.admin_username,
        &hash_password(&config.admin_password),
        true,
    ) {
        Ok(_) => {
            info!(username = %config.admin_username, "Default admin account created");
            Ok(true)
        }
        // Another process won the race; the record exists either way.
        Err(StoreError::DuplicateUsername(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

/// The signed-in identity carried by a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
    pub is_admin: bool,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_admin: user.is_admin,
        }
    }
}

/// Authentication state of a session
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Anonymous,
    User(SessionUser),
    Admin(SessionUser),
}

impl AuthState {
    pub fn from_user(user: Option<SessionUser>) -> Self {
        match user {
            None => AuthState::Anonymous,
            Some(u) if u.is_admin => AuthState::Admin(u),
            Some(u) => AuthState::User(u),
        }
    }

    pub fn user(&self) -> Option<&SessionUser> {
        match self {
            AuthState::Anonymous => None,
            AuthState::User(u) | AuthState::Admin(u) => Some(u),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, AuthState::Admin(_))
    }
}

/// Flash message category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Info,
    Error,
}

impl FlashKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashKind::Success => "success",
            FlashKind::Info => "info",
            FlashKind::Error => "error",
        }
    }
}

/// One-shot notification shown on the next rendered page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

#[derive(Debug)]
struct SessionData {
    user: Option<SessionUser>,
    flashes: Vec<Flash>,
    map_file: Option<String>,
    last_seen: Instant,
}

impl Default for SessionData {
    fn default() -> Self {
        Self {
            user: None,
            flashes: Vec::new(),
            map_file: None,
            last_seen: Instant::now(),
        }
    }
}

/// In-memory session table keyed by cookie value.
///
/// Lookups never insert. A session is stored the first time something is
/// written to it (a login, a flash or a map file), so cookieless readers
/// leave the table untouched.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionData>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh session identifier; nothing is stored until the first write
    pub fn new_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    pub fn exists(&self, id: &str) -> bool {
        self.sessions
            .read()
            .map(|s| s.contains_key(id))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Option<RwLockWriteGuard<'_, HashMap<String, SessionData>>> {
        match self.sessions.write() {
            Ok(sessions) => Some(sessions),
            Err(_) => {
                warn!("Session table lock poisoned");
                None
            }
        }
    }

    /// Apply `f` to a stored session, if there is one
    fn existing<R>(&self, id: &str, f: impl FnOnce(&mut SessionData) -> R) -> Option<R> {
        let mut sessions = self.lock()?;
        let data = sessions.get_mut(id)?;
        data.last_seen = Instant::now();
        Some(f(data))
    }

    /// Apply `f` to a session, storing it first if needed
    fn upsert<R>(&self, id: &str, f: impl FnOnce(&mut SessionData) -> R) -> Option<R> {
        let mut sessions = self.lock()?;
        let data = sessions.entry(id.to_string()).or_insert_with(|| {
            debug!(session = %id, "Session created");
            SessionData::default()
        });
        data.last_seen = Instant::now();
        Some(f(data))
    }

    pub fn auth_state(&self, id: &str) -> AuthState {
        AuthState::from_user(self.existing(id, |s| s.user.clone()).flatten())
    }

    pub fn login(&self, id: &str, user: &User) {
        self.upsert(id, |s| s.user = Some(SessionUser::from(user)));
        info!(username = %user.username, is_admin = user.is_admin, "User logged in");
    }

    pub fn logout(&self, id: &str) {
        if let Some(Some(user)) = self.existing(id, |s| s.user.take()) {
            info!(username = %user.username, "User logged out");
        }
    }

    /// Move the session stored under `old_id` to a new identifier and return it.
    ///
    /// The old identifier stops resolving.
    pub fn rotate(&self, old_id: &str) -> String {
        let new_id = Self::new_id();
        if let Some(mut sessions) = self.lock() {
            let mut data = sessions.remove(old_id).unwrap_or_default();
            data.last_seen = Instant::now();
            sessions.insert(new_id.clone(), data);
        }
        debug!(session = %new_id, "Session rotated");
        new_id
    }

    pub fn flash(&self, id: &str, kind: FlashKind, message: impl Into<String>) {
        let message = message.into();
        self.upsert(id, |s| s.flashes.push(Flash { kind, message }));
    }

    /// Remove and return pending flash messages
    pub fn take_flashes(&self, id: &str) -> Vec<Flash> {
        self.existing(id, |s| std::mem::take(&mut s.flashes))
            .unwrap_or_default()
    }

    /// Remember the session's latest map file; returns the file it replaces.
    pub fn set_map_file(&self, id: &str, file_name: String) -> Option<String> {
        self.upsert(id, |s| s.map_file.replace(file_name))
            .flatten()
    }

    pub fn map_file(&self, id: &str) -> Option<String> {
        self.existing(id, |s| s.map_file.clone()).flatten()
    }

    /// Drop sessions idle for at least `max_idle` and return the map files
    /// they referenced.
    pub fn purge_idle(&self, max_idle: Duration) -> Vec<String> {
        let Some(mut sessions) = self.lock() else {
            return Vec::new();
        };
        let before = sessions.len();
        let mut orphaned = Vec::new();
        sessions.retain(|_, data| {
            if data.last_seen.elapsed() < max_idle {
                return true;
            }
            orphaned.extend(data.map_file.take());
            false
        });
        let purged = before - sessions.len();
        if purged > 0 {
            info!(purged, remaining = sessions.len(), "Idle sessions purged");
        }
        orphaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("s3cret");
        assert!(hash.starts_with("sha256$10000$"));
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn test_malformed_hash_never_matches() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "plain-text"));
        assert!(!verify_password("x", "md5$1$00$00"));
        assert!(!verify_password("x", "sha256$0$00$00"));
        assert!(!verify_password("x", "sha256$1$zz$00"));
    }

    #[test]
    fn test_ensure_admin_once() {
        let store = Store::open_in_memory().unwrap();
        let config = crate::config::AppConfig::default().auth;

        assert!(ensure_admin(&store, &config).unwrap());
        assert!(!ensure_admin(&store, &config).unwrap());
        assert_eq!(store.user_count().unwrap(), 1);

        let admin = store.find_user_by_username("admin").unwrap().unwrap();
        assert!(admin.is_admin);
        assert!(authenticate(&store, "admin", &config.admin_password)
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_authenticate_rejects_bad_password() {
        let store = Store::open_in_memory().unwrap();
        store
            .create_user("ana", &hash_password("pw"), false)
            .unwrap();
        assert!(authenticate(&store, "ana", "nope").unwrap().is_none());
        assert!(authenticate(&store, "nobody", "pw").unwrap().is_none());
    }

    #[test]
    fn test_session_state_transitions() {
        let sessions = SessionStore::new();
        let id = SessionStore::new_id();
        assert_eq!(sessions.auth_state(&id), AuthState::Anonymous);

        let user = User {
            id: 7,
            username: "ana".into(),
            password_hash: String::new(),
            is_admin: false,
        };
        sessions.login(&id, &user);
        assert!(matches!(sessions.auth_state(&id), AuthState::User(u) if u.id == 7));

        let admin = User {
            is_admin: true,
            ..user
        };
        sessions.login(&id, &admin);
        assert!(sessions.auth_state(&id).is_admin());

        sessions.logout(&id);
        assert_eq!(sessions.auth_state(&id), AuthState::Anonymous);
    }

    #[test]
    fn test_flashes_are_one_shot() {
        let sessions = SessionStore::new();
        let id = SessionStore::new_id();
        sessions.flash(&id, FlashKind::Error, "Access denied");
        let flashes = sessions.take_flashes(&id);
        assert_eq!(flashes.len(), 1);
        assert_eq!(flashes[0].message, "Access denied");
        assert!(sessions.take_flashes(&id).is_empty());
    }

    #[test]
    fn test_unknown_session_is_anonymous() {
        let sessions = SessionStore::new();
        assert!(!sessions.exists("missing"));
        assert_eq!(sessions.auth_state("missing"), AuthState::Anonymous);
        assert!(sessions.take_flashes("missing").is_empty());
    }

    fn ana() -> User {
        User {
            id: 3,
            username: "ana".into(),
            password_hash: String::new(),
            is_admin: false,
        }
    }

    #[test]
    fn test_reads_do_not_store_sessions() {
        let sessions = SessionStore::new();
        let id = SessionStore::new_id();

        assert_eq!(sessions.auth_state(&id), AuthState::Anonymous);
        assert!(sessions.take_flashes(&id).is_empty());
        assert_eq!(sessions.map_file(&id), None);
        sessions.logout(&id);
        assert!(sessions.is_empty());

        sessions.flash(&id, FlashKind::Info, "hola");
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn test_rotate_moves_session() {
        let sessions = SessionStore::new();
        let old = SessionStore::new_id();
        sessions.flash(&old, FlashKind::Info, "kept");
        sessions.login(&old, &ana());

        let new = sessions.rotate(&old);
        assert_ne!(new, old);
        assert!(!sessions.exists(&old));
        assert_eq!(sessions.auth_state(&old), AuthState::Anonymous);
        assert_eq!(sessions.auth_state(&new).user().map(|u| u.id), Some(3));
        assert_eq!(sessions.take_flashes(&new).len(), 1);
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn test_set_map_file_returns_replaced() {
        let sessions = SessionStore::new();
        let id = SessionStore::new_id();
        assert_eq!(sessions.set_map_file(&id, "map_a.html".into()), None);
        assert_eq!(
            sessions.set_map_file(&id, "map_b.html".into()),
            Some("map_a.html".to_string())
        );
        assert_eq!(sessions.map_file(&id), Some("map_b.html".to_string()));
    }

    #[test]
    fn test_purge_idle() {
        let sessions = SessionStore::new();
        let with_map = SessionStore::new_id();
        sessions.set_map_file(&with_map, "map_a.html".into());
        sessions.flash(&SessionStore::new_id(), FlashKind::Info, "x");

        assert!(sessions.purge_idle(Duration::from_secs(3600)).is_empty());
        assert_eq!(sessions.len(), 2);

        let orphaned = sessions.purge_idle(Duration::ZERO);
        assert_eq!(orphaned, vec!["map_a.html".to_string()]);
        assert!(sessions.is_empty());
    }
}
