//! IPv4 address patterns for host selection
//!
//! A pattern has four dot-separated sections. Each section is one of:
//! - `N` - exactly that octet
//! - `[a:b]` - any octet from `a` to `b`, inclusive
//! - `[]` - any octet
//!
//! `10.0.[1:4].[]` selects every address in `10.0.1.0` - `10.0.4.255`.

use crate::error::{Error, Result};
use std::net::Ipv4Addr;
use std::ops::RangeInclusive;

/// A parsed IPv4 pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Pattern {
    sections: [RangeInclusive<u8>; 4],
}

impl Ipv4Pattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        let parts: Vec<&str> = pattern.trim().split('.').collect();
        let [a, b, c, d] = parts.as_slice() else {
            return Err(Error::validation(
                pattern,
                format!("expected 4 sections, found {}", parts.len()),
            ));
        };

        Ok(Self {
            sections: [
                parse_section(pattern, a)?,
                parse_section(pattern, b)?,
                parse_section(pattern, c)?,
                parse_section(pattern, d)?,
            ],
        })
    }

    /// Check a single address; loopback and non-IPv4 addresses never match
    pub fn matches(&self, address: &str) -> bool {
        let Ok(ip) = address.trim().parse::<Ipv4Addr>() else {
            return false;
        };
        if ip.is_loopback() {
            return false;
        }
        ip.octets()
            .iter()
            .zip(&self.sections)
            .all(|(octet, range)| range.contains(octet))
    }

    /// Check whether any of a host's addresses match
    pub fn matches_any<'a, I>(&self, addresses: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        addresses.into_iter().any(|a| self.matches(a))
    }
}

fn parse_section(pattern: &str, section: &str) -> Result<RangeInclusive<u8>> {
    let octet = |text: &str| -> Result<u8> {
        text.trim().parse::<u8>().map_err(|_| {
            Error::validation(pattern, format!("'{text}' is not an octet (0-255)"))
        })
    };

    if section == "[]" {
        return Ok(0..=255);
    }

    match section
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
    {
        None => {
            let value = octet(section)?;
            Ok(value..=value)
        }
        Some(inner) => {
            let Some((low, high)) = inner.split_once(':') else {
                let value = octet(inner)?;
                return Ok(value..=value);
            };
            let (low, high) = (octet(low)?, octet(high)?);
            if low > high {
                return Err(Error::InvalidRange {
                    spec: pattern.to_string(),
                    start: u64::from(low),
                    end: u64::from(high),
                });
            }
            Ok(low..=high)
        }
    }
}
