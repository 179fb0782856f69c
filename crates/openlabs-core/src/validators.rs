//! Blueprint ingest validation, applied on the way in — the store
//! assumes a pre-validated graph.

use ipnet::Ipv4Net;
use std::collections::HashSet;

use crate::error::CoreError;
use crate::models::{BlueprintHost, BlueprintSubnet, BlueprintVpc};

/// RFC-1035: letters, digits, hyphens; label doesn't start/end with a
/// hyphen; 1-63 chars per label, 1-253 overall.
pub fn is_valid_hostname(hostname: &str) -> bool {
    if hostname.is_empty() || hostname.len() > 253 {
        return false;
    }
    hostname.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

/// Minimum disk size in GB per OS family. Unlisted OS values fall back
/// to a conservative default rather than rejecting the request outright.
pub fn min_disk_gb(os: &str) -> i32 {
    match os {
        s if s.starts_with("windows") => 32,
        s if s.starts_with("kali") => 20,
        _ => 8,
    }
}

pub fn validate_host(host: &BlueprintHost) -> Result<(), CoreError> {
    if !is_valid_hostname(&host.hostname) {
        return Err(CoreError::Validation(format!(
            "invalid hostname: {}",
            host.hostname
        )));
    }
    if host.disk_size_gb < min_disk_gb(&host.os) {
        return Err(CoreError::Validation(format!(
            "disk_size_gb {} is below the minimum of {} for os {}",
            host.disk_size_gb,
            min_disk_gb(&host.os),
            host.os
        )));
    }
    if host.tags.iter().any(|t| t.is_empty()) {
        return Err(CoreError::Validation(
            "tags must not contain empty strings".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_subnet(subnet: &BlueprintSubnet, vpc_cidr: Ipv4Net) -> Result<(), CoreError> {
    if !subnet_of(subnet.cidr, vpc_cidr) {
        return Err(CoreError::Validation(format!(
            "subnet cidr {} is not contained in vpc cidr {}",
            subnet.cidr, vpc_cidr
        )));
    }
    let mut seen = HashSet::new();
    for host in &subnet.hosts {
        if !seen.insert(host.hostname.as_str()) {
            return Err(CoreError::Validation(format!(
                "duplicate hostname within subnet: {}",
                host.hostname
            )));
        }
        validate_host(host)?;
    }
    Ok(())
}

pub fn validate_vpc(vpc: &BlueprintVpc) -> Result<(), CoreError> {
    let mut seen = HashSet::new();
    for subnet in &vpc.subnets {
        if !seen.insert(subnet.name.as_str()) {
            return Err(CoreError::Validation(format!(
                "duplicate subnet name within vpc: {}",
                subnet.name
            )));
        }
        validate_subnet(subnet, vpc.cidr)?;
    }
    Ok(())
}

pub fn validate_range_vpc_names(vpcs: &[BlueprintVpc]) -> Result<(), CoreError> {
    let mut seen = HashSet::new();
    for vpc in vpcs {
        if !seen.insert(vpc.name.as_str()) {
            return Err(CoreError::Validation(format!(
                "duplicate vpc name within range: {}",
                vpc.name
            )));
        }
    }
    Ok(())
}

/// `subnet.subnet_of(vpc)` in IPv4Network-containment terms: every
/// address in `subnet` also lies in `vpc`.
fn subnet_of(subnet: Ipv4Net, vpc: Ipv4Net) -> bool {
    vpc.contains(&subnet.network()) && vpc.contains(&subnet.broadcast())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_hostnames() {
        assert!(is_valid_hostname("h1"));
        assert!(is_valid_hostname("web-01.internal"));
    }

    #[test]
    fn rejects_malformed_hostnames() {
        assert!(!is_valid_hostname(""));
        assert!(!is_valid_hostname("-leading"));
        assert!(!is_valid_hostname("trailing-"));
        assert!(!is_valid_hostname("has_underscore_or_space "));
    }

    #[test]
    fn subnet_containment_follows_cidr_math() {
        let vpc: Ipv4Net = "10.0.0.0/16".parse().unwrap();
        let inside: Ipv4Net = "10.0.1.0/24".parse().unwrap();
        let outside: Ipv4Net = "10.1.0.0/24".parse().unwrap();
        assert!(subnet_of(inside, vpc));
        assert!(!subnet_of(outside, vpc));
    }

    #[test]
    fn windows_requires_larger_minimum_disk() {
        assert_eq!(min_disk_gb("windows_server_2019"), 32);
        assert_eq!(min_disk_gb("debian_11"), 8);
    }
}
