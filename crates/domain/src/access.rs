use std::net::IpAddr;

use crate::errors::ProxyError;

/// Source-address allow list parsed from CIDR notation.
///
/// An empty list allows every source. IPv4-mapped IPv6 addresses are
/// canonicalized to IPv4 before matching, so `127.0.0.0/8` also covers
/// `::ffff:127.0.0.1` as seen on dual-stack listeners.
#[derive(Debug, Clone)]
pub struct AccessList {
    networks: Vec<ipnetwork::IpNetwork>,
}

impl AccessList {
    pub fn parse(cidrs: &[String]) -> Result<Self, ProxyError> {
        let mut networks = Vec::with_capacity(cidrs.len());

        for cidr in cidrs {
            let network: ipnetwork::IpNetwork = cidr
                .parse()
                .map_err(|e| ProxyError::InvalidCidr(format!("{}: {}", cidr, e)))?;
            networks.push(network);
        }

        Ok(Self { networks })
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn allows(&self, ip: IpAddr) -> bool {
        if self.networks.is_empty() {
            return true;
        }

        let ip = canonical(ip);
        self.networks.iter().any(|network| network.contains(ip))
    }
}

fn canonical(ip: IpAddr) -> IpAddr {
    if let IpAddr::V6(v6) = ip {
        if let Some(v4) = v6.to_ipv4_mapped() {
            return IpAddr::V4(v4);
        }
    }
    ip
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(cidrs: &[&str]) -> AccessList {
        let cidrs: Vec<String> = cidrs.iter().map(|s| s.to_string()).collect();
        AccessList::parse(&cidrs).unwrap()
    }

    #[test]
    fn test_parse_rejects_invalid_cidr() {
        assert!(AccessList::parse(&["not-a-network".to_string()]).is_err());
        assert!(AccessList::parse(&["10.0.0.0/33".to_string()]).is_err());
    }

    #[test]
    fn test_allows_matching_network() {
        let access = list(&["127.0.0.0/8", "10.0.0.0/8"]);

        assert!(access.allows("127.0.0.1".parse().unwrap()));
        assert!(access.allows("10.20.30.40".parse().unwrap()));
        assert!(!access.allows("192.168.1.1".parse().unwrap()));
    }

    #[test]
    fn test_empty_list_allows_everything() {
        let access = list(&[]);
        assert!(access.allows("203.0.113.9".parse().unwrap()));
    }

    #[test]
    fn test_wildcard_network() {
        let access = list(&["0.0.0.0/0"]);
        assert!(access.allows("203.0.113.9".parse().unwrap()));
    }

    #[test]
    fn test_ipv4_mapped_ipv6_source() {
        let access = list(&["127.0.0.0/8"]);
        assert!(access.allows("::ffff:127.0.0.1".parse().unwrap()));
        assert!(!access.allows("::1".parse().unwrap()));
    }

    #[test]
    fn test_ipv6_network() {
        let access = list(&["fd00::/8"]);
        assert!(access.allows("fd12:3456::1".parse().unwrap()));
        assert!(!access.allows("2001:db8::1".parse().unwrap()));
    }
}
