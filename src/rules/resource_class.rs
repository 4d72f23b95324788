use crate::error::Error;
use std::fmt;
use std::str::FromStr;
use trust_dns_server::client::rr::RecordType;

/// The DNS resource classes (record types) DevDNSd can answer for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceClass {
    A,
    AAAA,
    ANY,
    CNAME,
    HINFO,
    MINFO,
    MX,
    NS,
    PTR,
    SOA,
    TXT,
}

/// RFC 1035 type code for `MINFO`, which has no dedicated [`RecordType`] variant.
pub(crate) const MINFO_CODE: u16 = 14;

/// Every resource class, in the fixed order used when expanding `ANY` requests.
pub const ALL_CLASSES: [ResourceClass; 11] = [
    ResourceClass::A,
    ResourceClass::AAAA,
    ResourceClass::ANY,
    ResourceClass::CNAME,
    ResourceClass::HINFO,
    ResourceClass::MINFO,
    ResourceClass::MX,
    ResourceClass::NS,
    ResourceClass::PTR,
    ResourceClass::SOA,
    ResourceClass::TXT,
];

const TAGS: [(ResourceClass, &str); 11] = [
    (ResourceClass::A, "A"),
    (ResourceClass::AAAA, "AAAA"),
    (ResourceClass::ANY, "ANY"),
    (ResourceClass::CNAME, "CNAME"),
    (ResourceClass::HINFO, "HINFO"),
    (ResourceClass::MINFO, "MINFO"),
    (ResourceClass::MX, "MX"),
    (ResourceClass::NS, "NS"),
    (ResourceClass::PTR, "PTR"),
    (ResourceClass::SOA, "SOA"),
    (ResourceClass::TXT, "TXT"),
];

impl ResourceClass {
    /// The symbolic tag used in configuration and logging, e.g. `"MX"`.
    #[must_use]
    pub fn tag(self) -> &'static str {
        TAGS.iter()
            .find(|(class, _)| *class == self)
            .map_or("", |(_, tag)| tag)
    }

    /// Look up a class by tag. Tags are matched case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRule`] for a tag that is not a known DNS resource type.
    pub fn from_tag(tag: &str) -> Result<Self, Error> {
        TAGS.iter()
            .find(|(_, t)| t.eq_ignore_ascii_case(tag.trim()))
            .map(|(class, _)| *class)
            .ok_or_else(|| Error::InvalidRule(format!("unknown resource type \"{tag}\"")))
    }

    /// Map a wire level query type onto a class. Returns `None` for types DevDNSd never answers.
    #[must_use]
    pub fn from_record_type(record_type: RecordType) -> Option<Self> {
        match record_type {
            RecordType::A => Some(Self::A),
            RecordType::AAAA => Some(Self::AAAA),
            RecordType::ANY => Some(Self::ANY),
            RecordType::CNAME => Some(Self::CNAME),
            RecordType::HINFO => Some(Self::HINFO),
            RecordType::MX => Some(Self::MX),
            RecordType::NS => Some(Self::NS),
            RecordType::PTR => Some(Self::PTR),
            RecordType::SOA => Some(Self::SOA),
            RecordType::TXT => Some(Self::TXT),
            RecordType::Unknown(MINFO_CODE) => Some(Self::MINFO),
            _ => None,
        }
    }

    #[must_use]
    pub fn record_type(self) -> RecordType {
        match self {
            Self::A => RecordType::A,
            Self::AAAA => RecordType::AAAA,
            Self::ANY => RecordType::ANY,
            Self::CNAME => RecordType::CNAME,
            Self::HINFO => RecordType::HINFO,
            Self::MINFO => RecordType::Unknown(MINFO_CODE),
            Self::MX => RecordType::MX,
            Self::NS => RecordType::NS,
            Self::PTR => RecordType::PTR,
            Self::SOA => RecordType::SOA,
            Self::TXT => RecordType::TXT,
        }
    }

    /// Whether answers of this class carry a raw address literal rather than a domain name.
    #[must_use]
    pub fn is_address(self) -> bool {
        matches!(self, Self::A | Self::AAAA)
    }
}

impl FromStr for ResourceClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s)
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
