//! Brings the provider's A/AAAA records in line with the discovered addresses.
//!
//! A run is two passes: everything requested is validated first, and only when
//! nothing is missing are records written. Writes are not transactional, so a
//! provider failure midway leaves earlier updates in place.

use std::collections::{BTreeMap, BTreeSet};

use futures::future::try_join_all;
use log::{debug, info};

use crate::error::{Error, Result};
use crate::hosts::{self, DomainGrouping};
use crate::ip::{AddressSource, Addresses};
use crate::provider::{DnsDirectory, Record};

/// Domain -> every record the provider holds for it.
pub type DomainRecords = BTreeMap<String, Vec<Record>>;

pub struct Reconciler<'a> {
    directory: &'a dyn DnsDirectory,
    addresses: &'a dyn AddressSource,
    dry_run: bool,
}

impl<'a> Reconciler<'a> {
    pub fn new(directory: &'a dyn DnsDirectory, addresses: &'a dyn AddressSource) -> Self {
        Self {
            directory,
            addresses,
            dry_run: false,
        }
    }

    /// Validate and fetch as usual but only log the updates.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Update every record behind `hosts`. Returns how many records were submitted.
    pub async fn run(&self, hosts: &[String]) -> Result<usize> {
        let domains = hosts::classify(hosts)?;
        let records = self.fetch_records(&domains).await?;

        let missing = missing_records(&domains, &records);
        if !missing.is_empty() {
            return Err(Error::MissingRecords(missing));
        }

        let addresses = self.addresses.addresses().await;

        let mut submitted = 0;
        for (domain, subdomains) in &domains {
            let existing = records.get(domain).map(Vec::as_slice).unwrap_or_default();

            for record in apply_addresses(existing, subdomains, &addresses) {
                if self.dry_run {
                    info!(
                        "[dry-run] Would update {}.{} {} -> {}",
                        record.host, domain, record.record_type, record.data
                    );
                } else {
                    info!(
                        "Updating {}.{} {} -> {}",
                        record.host, domain, record.record_type, record.data
                    );
                    self.directory.update_record(&record).await?;
                }
                submitted += 1;
            }
        }

        Ok(submitted)
    }

    async fn fetch_records(&self, domains: &DomainGrouping) -> Result<DomainRecords> {
        let fetches = domains.keys().map(|domain| async move {
            debug!("Listing records for {}", domain);
            let records = self.directory.list_records(domain).await?;
            Ok::<_, Error>((domain.clone(), records))
        });

        Ok(try_join_all(fetches).await?.into_iter().collect())
    }
}

/// `subdomain.domain` for every requested subdomain with no record of that host.
pub fn missing_records(domains: &DomainGrouping, records: &DomainRecords) -> Vec<String> {
    let mut missing = Vec::new();

    for (domain, subdomains) in domains {
        let existing: BTreeSet<&str> = records
            .get(domain)
            .into_iter()
            .flatten()
            .map(|record| record.host.as_str())
            .collect();

        missing.extend(
            subdomains
                .iter()
                .filter(|subdomain| !existing.contains(subdomain.as_str()))
                .map(|subdomain| format!("{}.{}", subdomain, domain)),
        );
    }

    missing.sort();
    missing
}

/// Records whose host was requested, with A/AAAA data set from `addresses`.
///
/// Matching records of other types, or without a discovered address, come
/// back unchanged and are still submitted.
pub fn apply_addresses(
    records: &[Record],
    subdomains: &BTreeSet<String>,
    addresses: &Addresses,
) -> Vec<Record> {
    records
        .iter()
        .filter(|record| subdomains.contains(&record.host))
        .map(|record| {
            let mut record = record.clone();
            if let Some(data) = addresses.for_record_type(&record.record_type) {
                record.data = data;
            }
            record
        })
        .collect()
}
