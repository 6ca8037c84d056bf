//! Turns user-supplied hostnames into the per-domain sets of subdomains to update.
//!
//! The domain is always the last two labels. There is no public suffix list,
//! so `home.example.co.uk` is subdomain `home.example` of domain `co.uk`.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};

/// Domain -> subdomains requested for it.
pub type DomainGrouping = BTreeMap<String, BTreeSet<String>>;

/// Split `host` into its domain and, if there is one, its subdomain.
pub fn split_host(host: &str) -> (String, Option<String>) {
    let labels: Vec<&str> = host.split('.').collect();
    let cut = labels.len().saturating_sub(2);

    let domain = labels[cut..].join(".");
    let subdomain = labels[..cut].join(".");

    (domain, (!subdomain.is_empty()).then_some(subdomain))
}

/// Group hostnames by domain.
///
/// A hostname without a subdomain still creates its domain entry, left empty,
/// so [`invalid_domains`] can report it.
pub fn group(hosts: &[String]) -> DomainGrouping {
    let mut domains = DomainGrouping::new();

    for host in hosts {
        let (domain, subdomain) = split_host(host);
        match subdomain {
            Some(subdomain) => {
                domains.entry(domain).or_default().insert(subdomain);
            }
            None => {
                domains.insert(domain, BTreeSet::new());
            }
        }
    }

    domains
}

/// Domains whose subdomain set is empty.
pub fn invalid_domains(domains: &DomainGrouping) -> Vec<String> {
    domains
        .iter()
        .filter(|(_, subdomains)| subdomains.is_empty())
        .map(|(domain, _)| domain.clone())
        .collect()
}

/// [`group`] followed by validation over the whole input.
pub fn classify(hosts: &[String]) -> Result<DomainGrouping> {
    let domains = group(hosts);

    let invalid = invalid_domains(&domains);
    if !invalid.is_empty() {
        return Err(Error::InvalidHostnames(invalid));
    }

    Ok(domains)
}
