//! Geolocation collaborator.
//!
//! The receiver resolves a caller's IP to a coarse [`Location`] through the
//! [`Locate`] trait. Lookups are best effort: the receiver treats an error
//! exactly like a miss.
//!
//! # Implementations
//!
//! - [`NoLocation`]: never finds anything (the default)
//! - [`StaticLocator`]: fixed in-memory table, loadable from a JSON file
//! - [`CachingLocator`]: wraps another locator and remembers answers,
//!   misses and failures included, for a TTL
//!
//! # Example
//!
//! ```
//! use vaultrpc_common::geo::{CachingLocator, Locate, StaticLocator};
//! use vaultrpc_common::protocol::Location;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let table = StaticLocator::new()
//!     .with_entry("1.2.3.4".parse().unwrap(), Location::new("Germany", "Berlin"));
//! let locator = CachingLocator::new(table);
//!
//! let location = locator.locate("1.2.3.4".parse().unwrap()).await.unwrap();
//! assert_eq!(location.unwrap().city.as_deref(), Some("Berlin"));
//! # }
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::protocol::Location;

/// Resolves an IP address to a location.
#[async_trait]
pub trait Locate: Send + Sync {
    /// `Ok(None)` when the address is unknown.
    async fn locate(&self, ip: IpAddr) -> anyhow::Result<Option<Location>>;
}

/// Locator that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

#[async_trait]
impl Locate for NoLocation {
    async fn locate(&self, _ip: IpAddr) -> anyhow::Result<Option<Location>> {
        Ok(None)
    }
}

/// Fixed IP → location table.
#[derive(Debug, Clone, Default)]
pub struct StaticLocator {
    entries: HashMap<IpAddr, Location>,
}

impl StaticLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, ip: IpAddr, location: Location) -> Self {
        self.entries.insert(ip, location);
        self
    }

    /// Loads a table from a JSON object mapping IP strings to locations.
    ///
    /// ```json
    /// { "1.2.3.4": { "country": "Germany", "city": "Berlin" } }
    /// ```
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path)
            .map_err(|e| anyhow::anyhow!("Failed to read geo table {}: {}", path.display(), e))?;
        let table: HashMap<String, Location> = serde_json::from_slice(&raw)?;

        let mut entries = HashMap::with_capacity(table.len());
        for (ip, location) in table {
            let ip: IpAddr = ip
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid IP address '{}' in geo table: {}", ip, e))?;
            entries.insert(ip, location);
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Locate for StaticLocator {
    async fn locate(&self, ip: IpAddr) -> anyhow::Result<Option<Location>> {
        Ok(self.entries.get(&ip).cloned())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    location: Option<Location>,
    stored_at: Instant,
}

/// Caches the answers of another locator.
///
/// Failures are cached as misses, so a failing backend is asked at most once
/// per address per TTL. When the cache reaches its capacity, expired entries
/// are dropped first and the whole cache is cleared if that is not enough.
pub struct CachingLocator<L> {
    inner: L,
    ttl: Duration,
    capacity: usize,
    entries: RwLock<HashMap<IpAddr, CacheEntry>>,
}

impl<L: Locate> CachingLocator<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            ttl: Duration::from_secs(300),
            capacity: 10_000,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Number of cached addresses, expired ones included.
    pub async fn cached(&self) -> usize {
        self.entries.read().await.len()
    }

    async fn store(&self, ip: IpAddr, location: Option<Location>) {
        let mut entries = self.entries.write().await;
        if entries.len() >= self.capacity && !entries.contains_key(&ip) {
            let ttl = self.ttl;
            entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
            if entries.len() >= self.capacity {
                entries.clear();
            }
        }
        entries.insert(
            ip,
            CacheEntry {
                location,
                stored_at: Instant::now(),
            },
        );
    }
}

#[async_trait]
impl<L: Locate> Locate for CachingLocator<L> {
    async fn locate(&self, ip: IpAddr) -> anyhow::Result<Option<Location>> {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(&ip) {
                if entry.stored_at.elapsed() < self.ttl {
                    return Ok(entry.location.clone());
                }
            }
        }

        let location = match self.inner.locate(ip).await {
            Ok(location) => location,
            Err(e) => {
                tracing::debug!("Geolocation lookup for {} failed: {}", ip, e);
                None
            }
        };
        self.store(ip, location.clone()).await;
        Ok(location)
    }
}
