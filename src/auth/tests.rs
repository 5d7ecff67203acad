#![allow(clippy::unwrap_used)]

use super::*;
use crate::storage::MemoryStore;
use async_trait::async_trait;
use base64ct::{Base64UrlUnpadded, Encoding};
use secrecy::SecretString;
use std::sync::atomic::{AtomicUsize, Ordering};
use time::OffsetDateTime;
use tokio::sync::Notify;

const APP_ID: i32 = 42;
const TTL: Duration = Duration::from_secs(3600);

fn app() -> App {
    App {
        id: APP_ID,
        name: "test".to_string(),
        secret: SecretString::from("test-secret".to_string()),
    }
}

fn fast_hasher() -> Arc<dyn CredentialHasher> {
    Arc::new(Argon2Hasher::new(8, 1, 1).unwrap())
}

fn service(
    saver: Arc<dyn UserSaver>,
    users: Arc<dyn UserProvider>,
    apps: Arc<dyn AppProvider>,
    hasher: Arc<dyn CredentialHasher>,
) -> Auth {
    Auth::new(saver, users, apps, hasher, Arc::new(JwtIssuer), TTL)
}

async fn memory_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.insert_app(app()).await;
    store
}

async fn memory_auth() -> (Arc<MemoryStore>, Auth) {
    let store = memory_store().await;
    let auth = service(store.clone(), store.clone(), store.clone(), fast_hasher());
    (store, auth)
}

fn claims(token: &str) -> TokenClaims {
    let segment = token.split('.').nth(1).unwrap();
    let bytes = Base64UrlUnpadded::decode_vec(segment).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn register_then_login() {
    let (_, auth) = memory_auth().await;

    let user_id = auth.register("a@x.com", "password1").await.unwrap();
    assert_eq!(user_id, 1);

    let before = OffsetDateTime::now_utc().unix_timestamp();
    let token = auth.login("a@x.com", "password1", APP_ID).await.unwrap();
    assert!(!token.is_empty());

    let claims = claims(&token);
    assert_eq!(claims.uid, 1);
    assert_eq!(claims.email, "a@x.com");
    assert_eq!(claims.app_id, APP_ID);
    assert!(claims.exp >= before + 3600);
}

#[tokio::test]
async fn successive_logins_get_distinct_tokens() {
    let (_, auth) = memory_auth().await;
    auth.register("a@x.com", "password1").await.unwrap();

    let first = auth.login("a@x.com", "password1", APP_ID).await.unwrap();
    let second = auth.login("a@x.com", "password1", APP_ID).await.unwrap();
    assert_ne!(first, second);
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() {
    let (_, auth) = memory_auth().await;
    auth.register("a@x.com", "password1").await.unwrap();

    let wrong = auth.login("a@x.com", "password2", APP_ID).await.unwrap_err();
    assert_eq!(wrong.kind(), ErrorKind::InvalidCredentials);
    assert_eq!(wrong.op(), LOGIN);

    let unknown = auth.login("b@x.com", "password1", APP_ID).await.unwrap_err();
    assert_eq!(unknown.kind(), ErrorKind::InvalidCredentials);
    assert_eq!(wrong.to_string(), unknown.to_string());
}

#[tokio::test]
async fn unknown_app_is_rejected_before_user_lookup() {
    let (_, auth) = memory_auth().await;

    // no such user either; the app check wins
    let err = auth.login("a@x.com", "password1", 7).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidAppId);
}

#[tokio::test]
async fn duplicate_registration() {
    let (_, auth) = memory_auth().await;
    assert_eq!(auth.register("a@x.com", "password1").await.unwrap(), 1);

    let err = auth.register("a@x.com", "password2").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UserAlreadyExists);
    assert_eq!(err.op(), REGISTER);

    // the first password still works
    assert!(auth.login("a@x.com", "password1", APP_ID).await.is_ok());
    assert_eq!(auth.register("b@x.com", "password1").await.unwrap(), 2);
}

#[tokio::test]
async fn admin_flag() {
    let (store, auth) = memory_auth().await;
    let user_id = auth.register("a@x.com", "password1").await.unwrap();
    assert!(!auth.is_admin(user_id).await.unwrap());

    store.set_admin(user_id, true).await.unwrap();
    assert!(auth.is_admin(user_id).await.unwrap());

    let err = auth.is_admin(99).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCredentials);
    assert_eq!(err.op(), IS_ADMIN);
}

#[tokio::test]
async fn stored_hash_is_not_the_password() {
    let (store, auth) = memory_auth().await;
    auth.register("a@x.com", "password1").await.unwrap();

    let user = store.user("a@x.com").await.unwrap();
    assert_ne!(user.pass_hash, b"password1".to_vec());
    assert!(user.pass_hash.starts_with(b"$argon2id$"));
}

struct BrokenStore;

#[async_trait]
impl UserSaver for BrokenStore {
    async fn save_user(&self, _: &str, _: &[u8]) -> Result<i64, StorageError> {
        Err(anyhow::anyhow!("connection reset").into())
    }
}

#[async_trait]
impl UserProvider for BrokenStore {
    async fn user(&self, _: &str) -> Result<User, StorageError> {
        Err(anyhow::anyhow!("connection reset").into())
    }

    async fn is_admin(&self, _: i64) -> Result<bool, StorageError> {
        Err(anyhow::anyhow!("connection reset").into())
    }
}

#[async_trait]
impl AppProvider for BrokenStore {
    async fn app(&self, _: i32) -> Result<App, StorageError> {
        Err(anyhow::anyhow!("connection reset").into())
    }
}

#[tokio::test]
async fn backend_failures_are_internal() {
    let broken = Arc::new(BrokenStore);
    let auth = service(broken.clone(), broken.clone(), broken, fast_hasher());

    let err = auth.register("a@x.com", "password1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(err.to_string().contains("connection reset"));

    let err = auth.login("a@x.com", "password1", APP_ID).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);

    let err = auth.is_admin(1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
}

#[tokio::test]
async fn user_lookup_failure_is_internal() {
    let store = memory_store().await;
    let broken = Arc::new(BrokenStore);
    let auth = service(store.clone(), broken, store, fast_hasher());

    let err = auth.login("a@x.com", "password1", APP_ID).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
}

struct FailingIssuer;

impl TokenIssuer for FailingIssuer {
    fn issue(&self, _: &User, app: &App, _: Duration) -> Result<String, TokenError> {
        Err(TokenError::EmptySecret(app.id))
    }
}

#[tokio::test]
async fn token_failure_is_internal() {
    let store = memory_store().await;
    let auth = Auth::new(
        store.clone(),
        store.clone(),
        store,
        fast_hasher(),
        Arc::new(FailingIssuer),
        TTL,
    );
    auth.register("a@x.com", "password1").await.unwrap();

    let err = auth.login("a@x.com", "password1", APP_ID).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
}

struct FailingHasher;

impl CredentialHasher for FailingHasher {
    fn hash(&self, _: &str) -> Result<Vec<u8>, HashError> {
        Err(HashError::Hash("out of memory".to_string()))
    }

    fn verify(&self, _: &[u8], _: &str) -> Result<bool, HashError> {
        Err(HashError::Hash("out of memory".to_string()))
    }
}

#[tokio::test]
async fn hashing_failure_is_internal() {
    let store = memory_store().await;
    let auth = service(store.clone(), store.clone(), store, Arc::new(FailingHasher));

    let err = auth.register("a@x.com", "password1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(err.to_string().contains("out of memory"));
}

#[tokio::test]
async fn malformed_stored_hash_is_internal() {
    let (store, auth) = memory_auth().await;
    store.save_user("a@x.com", b"not-a-phc-string").await.unwrap();

    let err = auth.login("a@x.com", "password1", APP_ID).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
}

#[tokio::test]
async fn unknown_email_with_failing_hasher_is_still_invalid_credentials() {
    let store = memory_store().await;
    let auth = service(store.clone(), store.clone(), store, Arc::new(FailingHasher));

    let err = auth.login("b@x.com", "password1", APP_ID).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCredentials);
}

struct CountingHasher {
    inner: Argon2Hasher,
    hashes: AtomicUsize,
    verifies: AtomicUsize,
}

impl CountingHasher {
    fn new() -> Self {
        Self {
            inner: Argon2Hasher::new(8, 1, 1).unwrap(),
            hashes: AtomicUsize::new(0),
            verifies: AtomicUsize::new(0),
        }
    }

    fn counts(&self) -> (usize, usize) {
        (
            self.hashes.load(Ordering::SeqCst),
            self.verifies.load(Ordering::SeqCst),
        )
    }
}

impl CredentialHasher for CountingHasher {
    fn hash(&self, password: &str) -> Result<Vec<u8>, HashError> {
        self.hashes.fetch_add(1, Ordering::SeqCst);
        self.inner.hash(password)
    }

    fn verify(&self, pass_hash: &[u8], password: &str) -> Result<bool, HashError> {
        self.verifies.fetch_add(1, Ordering::SeqCst);
        self.inner.verify(pass_hash, password)
    }
}

#[tokio::test]
async fn unknown_email_costs_a_verify() {
    let store = memory_store().await;
    let hasher = Arc::new(CountingHasher::new());
    let auth = service(store.clone(), store.clone(), store, hasher.clone());

    auth.register("a@x.com", "password1").await.unwrap();
    assert_eq!(hasher.counts(), (1, 0));

    auth.login("a@x.com", "password2", APP_ID).await.unwrap_err();
    assert_eq!(hasher.counts(), (1, 1));

    // first miss prepares the dummy hash, later misses reuse it
    auth.login("b@x.com", "password1", APP_ID).await.unwrap_err();
    assert_eq!(hasher.counts(), (2, 2));
    auth.login("c@x.com", "password1", APP_ID).await.unwrap_err();
    assert_eq!(hasher.counts(), (2, 3));
}

/// Reaches the insert and never finishes it.
struct StalledSaver {
    reached: Notify,
}

#[async_trait]
impl UserSaver for StalledSaver {
    async fn save_user(&self, _: &str, _: &[u8]) -> Result<i64, StorageError> {
        self.reached.notify_one();
        std::future::pending().await
    }
}

#[tokio::test]
async fn register_cancelled_during_insert_leaves_no_user() {
    let store = memory_store().await;
    let saver = Arc::new(StalledSaver {
        reached: Notify::new(),
    });
    let auth = service(saver.clone(), store.clone(), store.clone(), fast_hasher());

    tokio::select! {
        result = auth.register("a@x.com", "password1") => panic!("register finished: {result:?}"),
        () = saver.reached.notified() => {}
    }

    assert!(matches!(
        store.user("a@x.com").await,
        Err(StorageError::UserNotFound)
    ));

    let auth = service(store.clone(), store.clone(), store, fast_hasher());
    assert_eq!(auth.register("a@x.com", "password1").await.unwrap(), 1);
}

struct SlowHasher {
    inner: Argon2Hasher,
    delay: Duration,
}

impl CredentialHasher for SlowHasher {
    fn hash(&self, password: &str) -> Result<Vec<u8>, HashError> {
        std::thread::sleep(self.delay);
        self.inner.hash(password)
    }

    fn verify(&self, pass_hash: &[u8], password: &str) -> Result<bool, HashError> {
        std::thread::sleep(self.delay);
        self.inner.verify(pass_hash, password)
    }
}

#[tokio::test]
async fn register_timed_out_while_hashing_stores_nothing() {
    let store = memory_store().await;
    let slow = Arc::new(SlowHasher {
        inner: Argon2Hasher::new(8, 1, 1).unwrap(),
        delay: Duration::from_millis(200),
    });
    let auth = service(store.clone(), store.clone(), store.clone(), slow);

    let result = tokio::time::timeout(
        Duration::from_millis(20),
        auth.register("a@x.com", "password1"),
    )
    .await;
    assert!(result.is_err());

    // the abandoned hash completes on the blocking pool and is discarded
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(matches!(
        store.user("a@x.com").await,
        Err(StorageError::UserNotFound)
    ));

    let auth = service(store.clone(), store.clone(), store, fast_hasher());
    assert_eq!(auth.register("a@x.com", "password1").await.unwrap(), 1);
}
