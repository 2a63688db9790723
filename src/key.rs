use std::{
    fmt::{Debug, Display},
    net::Ipv4Addr,
};

/// Identifier of one record in the key space.
///
/// Storage only ever sees the byte encoding. Implementations must keep the
/// encoding order-preserving and injective so distinct keys never collide in
/// a backend.
pub trait Key: Ord + Clone + Debug + Display + Send + Sync + 'static {
    /// Append the storage encoding of `self` to `buf`.
    fn encode_into(&self, buf: &mut Vec<u8>);

    /// Storage encoding of `self` as an owned buffer.
    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf);
        buf
    }
}

impl Key for Ipv4Addr {
    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.octets());
    }
}

impl Key for u64 {
    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.to_be_bytes());
    }
}

impl Key for String {
    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.as_bytes());
    }
}
