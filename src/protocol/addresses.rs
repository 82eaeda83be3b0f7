use crate::protocol::SEPARATOR;
use doomstack::{here, Doom, ResultExt, Top};
use std::{
    collections::{BTreeMap, HashMap},
    net::{AddrParseError, IpAddr, SocketAddr},
};

pub const ADDRESSES_PREFIX: &str = "addresses";
pub const ADDRESSES_SUFFIX: &str = ";END";
pub const ENTRY_DELIMITER: char = ';';
pub const ALL_DONE: &str = "all done";

/// The broadcast list of every registered peer and the host it was
/// observed from, ordered by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addresses {
    hosts: BTreeMap<String, IpAddr>,
}

#[derive(Doom)]
pub enum AddressesError {
    #[doom(description("Missing `addresses` prefix"))]
    PrefixMissing,
    #[doom(description("Missing `;END` suffix"))]
    SuffixMissing,
    #[doom(description("Entry has no `:`-separated host"))]
    EntryMalformed,
    #[doom(description("Failed to parse host: {:?}", source))]
    #[doom(wrap(host_malformed))]
    HostMalformed { source: AddrParseError },
}

impl Addresses {
    pub fn from_registrations(registrations: &HashMap<String, SocketAddr>) -> Self {
        let hosts = registrations
            .iter()
            .map(|(name, address)| (name.clone(), address.ip()))
            .collect();

        Addresses { hosts }
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<IpAddr> {
        self.hosts.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, IpAddr)> {
        self.hosts.iter().map(|(name, host)| (name.as_str(), *host))
    }

    pub fn encode(&self) -> String {
        let mut message = ADDRESSES_PREFIX.to_string();

        for (name, host) in self.hosts.iter() {
            message.push(ENTRY_DELIMITER);
            message.push_str(name);
            message.push(SEPARATOR);
            message.push_str(&host.to_string());
        }

        message.push_str(ADDRESSES_SUFFIX);
        message
    }

    /// Parses a broadcast message, up to and including its `;END` suffix.
    pub fn decode(message: &str) -> Result<Self, Top<AddressesError>> {
        let body = message
            .strip_suffix(ADDRESSES_SUFFIX)
            .ok_or(AddressesError::SuffixMissing.into_top())
            .spot(here!())?;

        let mut entries = body.split(ENTRY_DELIMITER);

        if entries.next() != Some(ADDRESSES_PREFIX) {
            return AddressesError::PrefixMissing.fail().spot(here!());
        }

        let mut hosts = BTreeMap::new();

        for entry in entries {
            let (name, host) = entry
                .split_once(SEPARATOR)
                .ok_or(AddressesError::EntryMalformed.into_top())
                .spot(here!())?;

            let host = host
                .parse::<IpAddr>()
                .map_err(AddressesError::host_malformed)
                .map_err(AddressesError::into_top)
                .spot(here!())?;

            hosts.insert(name.to_string(), host);
        }

        Ok(Addresses { hosts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn registrations(entries: &[(&str, [u8; 4], u16)]) -> HashMap<String, SocketAddr> {
        entries
            .iter()
            .map(|(name, ip, port)| {
                (
                    name.to_string(),
                    SocketAddr::new(IpAddr::V4(Ipv4Addr::from(*ip)), *port),
                )
            })
            .collect()
    }

    #[test]
    fn encode_sorted() {
        let registrations = registrations(&[
            ("carol", [10, 0, 0, 3], 4000),
            ("alice", [10, 0, 0, 1], 4001),
            ("bob", [10, 0, 0, 2], 4002),
        ]);

        let addresses = Addresses::from_registrations(&registrations);

        assert_eq!(
            addresses.encode(),
            "addresses;alice:10.0.0.1;bob:10.0.0.2;carol:10.0.0.3;END"
        );
    }

    #[test]
    fn encode_byte_order() {
        // Uppercase sorts before lowercase, digits before both
        let registrations = registrations(&[
            ("b", [1, 1, 1, 1], 1),
            ("B", [2, 2, 2, 2], 1),
            ("10", [3, 3, 3, 3], 1),
            ("2", [4, 4, 4, 4], 1),
        ]);

        let addresses = Addresses::from_registrations(&registrations);

        assert_eq!(
            addresses.encode(),
            "addresses;10:3.3.3.3;2:4.4.4.4;B:2.2.2.2;b:1.1.1.1;END"
        );
    }

    #[test]
    fn decode() {
        let addresses = Addresses::decode("addresses;0:1.2.3.4;1:5.6.7.8;END").unwrap();

        assert_eq!(addresses.len(), 2);
        assert_eq!(addresses.get("0"), Some("1.2.3.4".parse().unwrap()));
        assert_eq!(addresses.get("1"), Some("5.6.7.8".parse().unwrap()));
        assert_eq!(addresses.get("2"), None);

        let names = addresses.iter().map(|(name, _)| name).collect::<Vec<_>>();
        assert_eq!(names, vec!["0", "1"]);
    }

    #[test]
    fn decode_empty() {
        let addresses = Addresses::decode("addresses;END").unwrap();
        assert!(addresses.is_empty());
    }

    #[test]
    fn decode_malformed() {
        assert!(Addresses::decode("addresses;alice:1.2.3.4").is_err());
        assert!(Addresses::decode("hosts;alice:1.2.3.4;END").is_err());
        assert!(Addresses::decode("addresses;alice;END").is_err());
        assert!(Addresses::decode("addresses;alice:localhost;END").is_err());
    }
}
