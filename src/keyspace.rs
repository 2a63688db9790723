//! Key-space sources: IPv4 host enumeration and shuffling.

use std::net::Ipv4Addr;

/// Errors for an invalid network description.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeySpaceError {
    /// Prefix length above 32.
    #[error("prefix length {0} is out of range (0..=32)")]
    PrefixLength(u8),
    /// Host bits set in the network address.
    #[error("{network}/{prefix_len} has host bits set")]
    HostBits {
        /// Address as given.
        network: Ipv4Addr,
        /// Prefix length as given.
        prefix_len: u8,
    },
}

/// Usable host addresses of an IPv4 network.
///
/// The network address is never a host. For prefixes shorter than /31 the
/// broadcast address is excluded too; /31 and /32 networks use every address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4KeySpace {
    network: Ipv4Addr,
    prefix_len: u8,
}

impl Ipv4KeySpace {
    /// Validate `network/prefix_len`.
    pub fn new(network: Ipv4Addr, prefix_len: u8) -> Result<Self, KeySpaceError> {
        if prefix_len > 32 {
            return Err(KeySpaceError::PrefixLength(prefix_len));
        }
        let space = Self {
            network,
            prefix_len,
        };
        if u32::from(network) & !space.mask() != 0 {
            return Err(KeySpaceError::HostBits {
                network,
                prefix_len,
            });
        }
        Ok(space)
    }

    /// Network address.
    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    /// Prefix length.
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    fn mask(&self) -> u32 {
        u32::MAX.checked_shl(32 - self.prefix_len as u32).unwrap_or(0)
    }

    fn first_host(&self) -> u32 {
        let base = u32::from(self.network);
        if self.prefix_len >= 31 {
            base
        } else {
            base + 1
        }
    }

    /// Number of usable hosts.
    pub fn host_count(&self) -> u64 {
        let size = 1u64 << (32 - self.prefix_len as u32);
        if self.prefix_len >= 31 {
            size
        } else {
            size - 2
        }
    }

    /// Hosts in ascending order, skipping the first `offset` and returning at
    /// most `count`. `None` returns every remaining host.
    pub fn enumerate(&self, offset: u64, count: Option<u64>) -> Vec<Ipv4Addr> {
        let available = self.host_count().saturating_sub(offset);
        let take = count.map_or(available, |count| count.min(available));
        let start = self.first_host() as u64 + offset;
        (start..start + take)
            .map(|addr| Ipv4Addr::from(addr as u32))
            .collect()
    }
}

/// Shuffle `keys` in place with the injected generator.
pub fn shuffle<K>(keys: &mut [K], rng: &mut fastrand::Rng) {
    rng.shuffle(keys);
}
