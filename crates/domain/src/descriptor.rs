use std::fmt;

/// EDNS0 option code for the query-side capability marker, allocated from
/// the local/experimental range (RFC 6891 §9). Presence with zero-length
/// data means "I will reassemble fragmented replies".
pub const CAPABILITY_OPTION_CODE: u16 = 65001;

/// EDNS0 option code carried by every reply fragment. The option data is
/// exactly two octets: total fragment count and zero-based sequence number.
pub const DESCRIPTOR_OPTION_CODE: u16 = CAPABILITY_OPTION_CODE + 1;

/// The `(total, seq)` pair identifying one fragment within a fragmented
/// reply. Sequence numbers are dense: `0 .. total - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentDescriptor {
    pub total: u8,
    pub seq: u8,
}

impl FragmentDescriptor {
    pub fn new(total: u8, seq: u8) -> Self {
        Self { total, seq }
    }

    /// Option data layout on the wire.
    pub fn to_bytes(self) -> [u8; 2] {
        [self.total, self.seq]
    }

    /// Parses the two-octet option data. Anything but exactly two octets is
    /// not a descriptor.
    pub fn parse(data: &[u8]) -> Option<Self> {
        match data {
            [total, seq] => Some(Self {
                total: *total,
                seq: *seq,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for FragmentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.seq, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_round_trip() {
        let descriptor = FragmentDescriptor::new(3, 1);
        assert_eq!(descriptor.to_bytes(), [3, 1]);
        assert_eq!(
            FragmentDescriptor::parse(&descriptor.to_bytes()),
            Some(descriptor)
        );
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert_eq!(FragmentDescriptor::parse(&[]), None);
        assert_eq!(FragmentDescriptor::parse(&[1]), None);
        assert_eq!(FragmentDescriptor::parse(&[1, 2, 3]), None);
    }

    #[test]
    fn test_option_codes_are_adjacent() {
        assert_eq!(DESCRIPTOR_OPTION_CODE, CAPABILITY_OPTION_CODE + 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", FragmentDescriptor::new(3, 0)), "0/3");
    }
}
