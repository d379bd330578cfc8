#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use keystone::{
    cache::link::{CacheConnection, CacheConnector, CacheLink, RetryPolicy, SetMode},
    crypto::password,
    error::{AppError, Result},
    models::user::{DEFAULT_ROLE, UserAccount},
    repositories::{profile::ProfileStore, session::SessionStore},
    services::{accounts::AccountService, auth::AuthCore, sessions::SessionManager},
};

/// An in-process stand-in for Redis with scriptable liveness.
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
    ping_plan: Mutex<VecDeque<bool>>,
    healthy: AtomicBool,
    refuse_writes: AtomicBool,
    failed_pings: AtomicU32,
    write_gate: Mutex<Option<Arc<Notify>>>,
    write_entered: Notify,
}

impl MemoryCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(HashMap::new()),
            ping_plan: Mutex::new(VecDeque::new()),
            healthy: AtomicBool::new(true),
            refuse_writes: AtomicBool::new(false),
            failed_pings: AtomicU32::new(0),
            write_gate: Mutex::new(None),
            write_entered: Notify::new(),
        })
    }

    /// Outcomes for the next pings; afterwards pings follow `set_healthy`.
    pub fn plan_pings(&self, plan: &[bool]) {
        self.ping_plan.lock().unwrap().extend(plan.iter().copied());
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Makes every write report "not applied".
    pub fn refuse_writes(&self, refuse: bool) {
        self.refuse_writes.store(refuse, Ordering::SeqCst);
    }

    /// Parks every `set` until `release_writes` is called.
    pub fn hold_writes(&self) {
        *self.write_gate.lock().unwrap() = Some(Arc::new(Notify::new()));
    }

    pub fn release_writes(&self) {
        if let Some(gate) = self.write_gate.lock().unwrap().take() {
            gate.notify_one();
        }
    }

    /// Resolves once a `set` is parked on the write gate.
    pub async fn write_parked(&self) {
        self.write_entered.notified().await;
    }

    pub fn failed_pings(&self) -> u32 {
        self.failed_pings.load(Ordering::SeqCst)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn evict(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }
}

#[async_trait]
impl CacheConnection for MemoryCache {
    async fn ping(&self) -> Result<()> {
        let planned = self.ping_plan.lock().unwrap().pop_front();
        if planned.unwrap_or_else(|| self.healthy.load(Ordering::SeqCst)) {
            return Ok(());
        }
        self.failed_pings.fetch_add(1, Ordering::SeqCst);
        Err(AppError::Internal("ping refused".to_string()))
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str, _ttl: Duration, mode: SetMode) -> Result<bool> {
        let gate = self.write_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            self.write_entered.notify_one();
            gate.notified().await;
        }

        if self.refuse_writes.load(Ordering::SeqCst) {
            return Ok(false);
        }
        let mut entries = self.entries.lock().unwrap();
        if mode == SetMode::IfAbsent && entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.lock().unwrap().remove(key).is_some())
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut entries = self.entries.lock().unwrap();
        let next = entries
            .get(key)
            .map(|v| v.parse::<i64>().unwrap())
            .unwrap_or(0)
            + 1;
        entries.insert(key.to_string(), next.to_string());
        Ok(next)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let prefix = pattern.trim_end_matches('*');
        Ok(self
            .entries
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Hands out the current target cache; connects can be scripted to fail.
pub struct MemoryConnector {
    target: Mutex<Arc<MemoryCache>>,
    connect_plan: Mutex<VecDeque<bool>>,
    accept: AtomicBool,
    stall: AtomicBool,
    connects: AtomicU32,
}

impl MemoryConnector {
    pub fn new(target: Arc<MemoryCache>) -> Arc<Self> {
        Arc::new(Self {
            target: Mutex::new(target),
            connect_plan: Mutex::new(VecDeque::new()),
            accept: AtomicBool::new(true),
            stall: AtomicBool::new(false),
            connects: AtomicU32::new(0),
        })
    }

    pub fn plan_connects(&self, plan: &[bool]) {
        self.connect_plan.lock().unwrap().extend(plan.iter().copied());
    }

    pub fn set_accept(&self, accept: bool) {
        self.accept.store(accept, Ordering::SeqCst);
    }

    /// Makes later connects hang forever, like a blackholed address.
    pub fn set_stall(&self, stall: bool) {
        self.stall.store(stall, Ordering::SeqCst);
    }

    /// Subsequent connects land on `cache`.
    pub fn retarget(&self, cache: Arc<MemoryCache>) {
        *self.target.lock().unwrap() = cache;
    }

    pub fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheConnector for MemoryConnector {
    async fn connect(&self) -> Result<Arc<dyn CacheConnection>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let planned = self.connect_plan.lock().unwrap().pop_front();
        if !planned.unwrap_or_else(|| self.accept.load(Ordering::SeqCst)) {
            return Err(AppError::Connection("connection refused".to_string()));
        }
        let target: Arc<MemoryCache> = self.target.lock().unwrap().clone();
        Ok(target)
    }
}

pub fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        interval: Duration::from_millis(10),
        ping_timeout: Duration::from_millis(200),
        max_retries,
    }
}

pub async fn memory_link() -> (CacheLink, Arc<MemoryCache>, Arc<MemoryConnector>) {
    let cache = MemoryCache::new();
    let connector = MemoryConnector::new(cache.clone());
    let link = CacheLink::connect(connector.clone(), fast_policy(3))
        .await
        .expect("memory link connects");
    (link, cache, connector)
}

struct Profile {
    id: i64,
    password_hash: String,
    role: String,
}

/// Accounts kept in a map; credentials are checked with the real hasher.
#[derive(Default)]
pub struct MemoryProfiles {
    profiles: Mutex<HashMap<String, Profile>>,
}

impl MemoryProfiles {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_role(&self, login: &str, role: &str) {
        if let Some(profile) = self.profiles.lock().unwrap().get_mut(login) {
            profile.role = role.to_string();
        }
    }

    pub fn remove(&self, login: &str) {
        self.profiles.lock().unwrap().remove(login);
    }
}

#[async_trait]
impl ProfileStore for MemoryProfiles {
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<()> {
        let mut profiles = self.profiles.lock().unwrap();
        if profiles.contains_key(login) {
            return Err(AppError::AccountExists(login.to_string()));
        }
        let id = profiles.len() as i64 + 1;
        profiles.insert(
            login.to_string(),
            Profile {
                id,
                password_hash: password_hash.to_string(),
                role: DEFAULT_ROLE.to_string(),
            },
        );
        Ok(())
    }

    async fn find_user(&self, login: &str) -> Result<bool> {
        Ok(self.profiles.lock().unwrap().contains_key(login))
    }

    async fn get_user(&self, login: &str, password: &str) -> Result<Option<UserAccount>> {
        let hash = match self.profiles.lock().unwrap().get(login) {
            Some(profile) => profile.password_hash.clone(),
            None => return Ok(None),
        };
        if !password::verify_password(password, &hash)? {
            return Ok(None);
        }
        Ok(Some(UserAccount {
            login: login.to_string(),
        }))
    }

    async fn get_user_profile_id(&self, login: &str) -> Result<i64> {
        self.profiles
            .lock()
            .unwrap()
            .get(login)
            .map(|p| p.id)
            .ok_or(AppError::NotFound("profile"))
    }

    async fn get_user_role(&self, id: i64) -> Result<String> {
        self.profiles
            .lock()
            .unwrap()
            .values()
            .find(|p| p.id == id)
            .map(|p| p.role.clone())
            .ok_or(AppError::NotFound("profile"))
    }
}

pub struct Harness {
    pub core: Arc<AuthCore>,
    pub profiles: Arc<MemoryProfiles>,
    pub cache: Arc<MemoryCache>,
    pub link: CacheLink,
}

pub async fn auth_harness() -> Harness {
    let (link, cache, _connector) = memory_link().await;
    let profiles = MemoryProfiles::new();
    let core = Arc::new(AuthCore::new(
        SessionManager::new(SessionStore::new(link.clone())),
        AccountService::new(profiles.clone()),
    ));
    Harness {
        core,
        profiles,
        cache,
        link,
    }
}
