use std::ffi::OsString;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use tempfile::TempDir;
use vimeo_networking::test_support::{test_settings, MockTransport};
use vimeo_networking::{
    Authenticator, ClientSettings, Clock, Dispatcher, FileResponseCache, SessionHandle,
};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
pub struct EnvRestore {
    saved: Vec<(&'static str, Option<OsString>)>,
}

#[allow(dead_code)]
impl EnvRestore {
    fn save_once(&mut self, key: &'static str) {
        if self.saved.iter().any(|(k, _)| *k == key) {
            return;
        }
        self.saved.push((key, std::env::var_os(key)));
    }

    pub fn set_var(&mut self, key: &'static str, value: impl Into<OsString>) {
        self.save_once(key);
        std::env::set_var(key, value.into());
    }

    pub fn remove_var(&mut self, key: &'static str) {
        self.save_once(key);
        std::env::remove_var(key);
    }
}

impl Drop for EnvRestore {
    fn drop(&mut self) {
        for (key, value) in self.saved.drain(..).rev() {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}

/// Dispatcher + authenticator wired to a scripted transport and an on-disk cache in a temp dir.
pub struct TestClient {
    #[allow(dead_code)]
    cache_dir: TempDir,
    pub transport: Arc<MockTransport>,
    pub cache: Arc<FileResponseCache>,
    pub dispatcher: Dispatcher,
    pub auth: Authenticator,
}

#[allow(dead_code)]
impl TestClient {
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: ClientSettings) -> Self {
        let cache_dir = tempfile::tempdir().expect("tempdir");
        let cache = Arc::new(FileResponseCache::new(cache_dir.path()).expect("file cache"));
        let transport = Arc::new(MockTransport::new());
        let dispatcher = Dispatcher::new(
            settings,
            transport.clone(),
            cache.clone(),
            SessionHandle::new(),
        );
        let auth = Authenticator::new(dispatcher.clone());

        Self {
            cache_dir,
            transport,
            cache,
            dispatcher,
            auth,
        }
    }

    /// Authenticator whose unix clock advances with (paused) tokio time from `base_unix`.
    pub fn auth_with_tokio_clock(&self, base_unix: i64) -> Authenticator {
        let start = tokio::time::Instant::now();
        let clock: Clock = Arc::new(move || base_unix + start.elapsed().as_secs() as i64);
        self.auth.clone().with_clock(clock)
    }
}

impl Default for TestClient {
    fn default() -> Self {
        Self::new()
    }
}
