//! Public address discovery through an IP echo service.
//!
//! Dual-stack hosts resolve the echo endpoint to both A and AAAA addresses, so
//! the answer depends on which one the connection happened to use. Each lookup
//! therefore runs inside a [`FamilyScope`] that restricts name resolution of
//! the shared client to one address family.

use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::Client;

pub const DEFAULT_ECHO_URL: &str = "https://icanhazip.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    fn matches(self, ip: IpAddr) -> bool {
        match self {
            Family::V4 => ip.is_ipv4(),
            Family::V6 => ip.is_ipv6(),
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::V4 => f.write_str("IPv4"),
            Family::V6 => f.write_str("IPv6"),
        }
    }
}

/// Addresses found for this machine. `None` means "leave that record type alone".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Addresses {
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
}

impl Addresses {
    /// Value to write into a record of the given DNS type, if any.
    pub fn for_record_type(&self, record_type: &str) -> Option<String> {
        match record_type {
            "A" => self.ipv4.map(|ip| ip.to_string()),
            "AAAA" => self.ipv6.map(|ip| ip.to_string()),
            _ => None,
        }
    }
}

#[async_trait]
pub trait AddressSource: Send + Sync {
    async fn addresses(&self) -> Addresses;
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The family filter shared between [`IpDiscovery`] and its resolver.
type FilterCell = Arc<Mutex<Option<Family>>>;

fn read_filter(cell: &Mutex<Option<Family>>) -> Option<Family> {
    *cell.lock().unwrap_or_else(PoisonError::into_inner)
}

fn write_filter(cell: &Mutex<Option<Family>>, family: Option<Family>) {
    *cell.lock().unwrap_or_else(PoisonError::into_inner) = family;
}

/// System resolver that drops results outside the installed family.
struct FamilyResolver {
    filter: FilterCell,
}

impl Resolve for FamilyResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let family = read_filter(&self.filter);

        Box::pin(async move {
            let host = name.as_str();
            let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, 0))
                .await?
                .filter(|addr| family.is_none_or(|f| f.matches(addr.ip())))
                .collect();

            if addrs.is_empty() {
                let family = family.map_or_else(|| "any".to_string(), |f| f.to_string());
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no {family} address for {host}"),
                )
                .into());
            }

            Ok::<Addrs, BoxError>(Box::new(addrs.into_iter()))
        })
    }
}

/// Installed family filter, held together with the lock serialising scopes.
///
/// Dropping the scope puts the previous filter back before the lock is
/// released, on every exit path including a cancelled request.
struct FamilyScope<'a> {
    filter: &'a Mutex<Option<Family>>,
    previous: Option<Family>,
    _lock: tokio::sync::MutexGuard<'a, ()>,
}

impl Drop for FamilyScope<'_> {
    fn drop(&mut self) {
        write_filter(self.filter, self.previous);
    }
}

pub struct IpDiscovery {
    client: Client,
    endpoint: String,
    filter: FilterCell,
    lock: tokio::sync::Mutex<()>,
}

impl IpDiscovery {
    pub fn new(endpoint: impl Into<String>) -> reqwest::Result<Self> {
        let filter = FilterCell::default();

        let client = Client::builder()
            .dns_resolver(Arc::new(FamilyResolver {
                filter: filter.clone(),
            }))
            // A pooled connection keeps the family it was opened with.
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            filter,
            lock: tokio::sync::Mutex::new(()),
        })
    }

    async fn scope(&self, family: Family) -> FamilyScope<'_> {
        let lock = self.lock.lock().await;
        let previous = read_filter(&self.filter);
        write_filter(&self.filter, Some(family));

        FamilyScope {
            filter: &self.filter,
            previous,
            _lock: lock,
        }
    }

    /// Ask the echo service for our address over `family` only.
    ///
    /// Any failure is logged and reported as `None`. There is no retry.
    pub async fn discover(&self, family: Family) -> Option<IpAddr> {
        let body = {
            let _scope = self.scope(family).await;
            self.fetch().await
        };

        let body = match body {
            Ok(body) => body,
            Err(e) => {
                warn!("No {} address available: {}", family, e);
                return None;
            }
        };

        let text = body.trim();
        match text.parse::<IpAddr>() {
            Ok(ip) if family.matches(ip) => {
                debug!("Echo service reported {} address {}", family, ip);
                Some(ip)
            }
            Ok(ip) => {
                warn!("Echo service answered {} lookup with {}, ignoring", family, ip);
                None
            }
            Err(_) => {
                warn!("Echo service returned something that is not an address: {:?}", text);
                None
            }
        }
    }

    async fn fetch(&self) -> Result<String, reqwest::Error> {
        self.client
            .get(&self.endpoint)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }

    pub async fn discover_all(&self) -> Addresses {
        let (ipv4, ipv6) = tokio::join!(self.discover(Family::V4), self.discover(Family::V6));

        let addresses = Addresses {
            ipv4: match ipv4 {
                Some(IpAddr::V4(ip)) => Some(ip),
                _ => None,
            },
            ipv6: match ipv6 {
                Some(IpAddr::V6(ip)) => Some(ip),
                _ => None,
            },
        };

        info!(
            "Discovered addresses: IPv4 {}, IPv6 {}",
            addresses.ipv4.map_or_else(|| "-".to_string(), |ip| ip.to_string()),
            addresses.ipv6.map_or_else(|| "-".to_string(), |ip| ip.to_string()),
        );

        addresses
    }
}

#[async_trait]
impl AddressSource for IpDiscovery {
    async fn addresses(&self) -> Addresses {
        self.discover_all().await
    }
}
