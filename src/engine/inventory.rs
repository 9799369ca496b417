//! Inventory host selection
//!
//! Filters arrive as `key=value` pairs. A handful of keys are native query
//! parameters of the hosts endpoint; everything else is a system profile
//! fact. Address selection happens client-side on the fetched hosts.

use super::{Engine, Result};
use edgeapi::models::InventoryHost;
use reconcile::{Ipv4Pattern, Phase};

/// Keys passed as plain query parameters; at most one may be used
const TOP_LEVEL_KEYS: [&str; 4] = ["display_name", "fqdn", "hostname_or_id", "insights_id"];

/// Always applied by the client
const FIXED_KEYS: [&str; 1] = ["host_type"];

/// Parsed host filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostFilter {
    params: Vec<(String, String)>,
    ipv4: Option<Ipv4Pattern>,
}

impl HostFilter {
    /// Parse `key=value` pairs and an optional IPv4 pattern
    pub fn parse<S: AsRef<str>>(pairs: &[S], ipv4: Option<&str>) -> reconcile::Result<Self> {
        let mut filter = Self::default();
        let mut top_level: Option<String> = None;
        let mut ipv4 = ipv4.map(str::to_string);

        for pair in pairs {
            let pair = pair.as_ref();
            let Some((key, value)) = pair.split_once('=') else {
                return Err(reconcile::Error::validation(pair, "expected key=value"));
            };
            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() {
                return Err(reconcile::Error::validation(pair, "empty filter key"));
            }

            if key == "ipv4" {
                ipv4 = Some(value.to_string());
            } else if FIXED_KEYS.contains(&key) {
                log::debug!("ignoring filter {key}: always edge hosts");
            } else if TOP_LEVEL_KEYS.contains(&key) {
                if let Some(previous) = &top_level {
                    return Err(reconcile::Error::validation(
                        pair,
                        format!("{key} cannot be combined with {previous}"),
                    ));
                }
                top_level = Some(key.to_string());
                filter.params.push((key.to_string(), value.to_string()));
            } else {
                filter
                    .params
                    .push((format!("filter[system_profile][{key}][]"), value.to_string()));
            }
        }

        filter.ipv4 = ipv4.as_deref().map(Ipv4Pattern::parse).transpose()?;
        Ok(filter)
    }

    /// Query parameters for the hosts endpoint
    pub fn params(&self) -> Vec<(&str, String)> {
        self.params
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect()
    }

    /// Whether a host passes the address pattern
    pub fn matches(&self, host: &InventoryHost) -> bool {
        self.ipv4
            .as_ref()
            .is_none_or(|pattern| pattern.matches_any(host.ip_addresses.iter().map(String::as_str)))
    }
}

impl Engine<'_> {
    /// Fresh edge hosts passing `filter`
    pub fn select_hosts(&self, filter: &HostFilter) -> Result<Vec<InventoryHost>> {
        self.phase(Phase::Fetch, "inventory hosts");
        let hosts = self.client().hosts(&filter.params())?;
        let total = hosts.len();
        let selected: Vec<InventoryHost> = hosts.into_iter().filter(|h| filter.matches(h)).collect();
        log::debug!("{} of {total} hosts selected", selected.len());
        Ok(selected)
    }
}
