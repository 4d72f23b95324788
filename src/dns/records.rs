use crate::error::Error;
use crate::rules::resolver::DEFAULT_MX_PREFERENCE;
use crate::rules::{Answer, AnswerData, ResourceClass, MINFO_CODE};
use lazy_static::lazy_static;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use time::macros::format_description;
use time::OffsetDateTime;
use trust_dns_proto::rr::rdata::{HINFO, MX, NULL, SOA, TXT};
use trust_dns_proto::serialize::binary::BinEncoder;
use trust_dns_server::client::rr::{Name, RData, Record};

lazy_static! {
    static ref SERIAL_FORMATTER: &'static [time::format_description::FormatItem<'static>] =
        format_description!(version = 2, "[year][month][day]");
}

/// Build the answer record for `name`.
///
/// # Errors
///
/// Returns [`Error::InvalidReply`] when the answer value can't be encoded for its class, e.g.
/// an `A` answer that isn't an IPv4 address.
pub(crate) fn to_record(name: &Name, answer: &Answer) -> Result<Record, Error> {
    Ok(Record::from_rdata(name.clone(), answer.ttl, rdata(answer)?))
}

fn rdata(answer: &Answer) -> Result<RData, Error> {
    let invalid = || Error::InvalidReply {
        value: value_string(&answer.data),
        resource_class: answer.resource_class,
    };

    match (answer.resource_class, &answer.data) {
        (ResourceClass::A, AnswerData::Address(addr)) => {
            Ipv4Addr::from_str(addr).map(RData::A).map_err(|_| invalid())
        }
        (ResourceClass::AAAA, AnswerData::Address(addr)) => {
            Ipv6Addr::from_str(addr).map(RData::AAAA).map_err(|_| invalid())
        }
        (ResourceClass::CNAME, AnswerData::Name(name)) => Ok(RData::CNAME(name.clone())),
        (ResourceClass::NS, AnswerData::Name(name)) => Ok(RData::NS(name.clone())),
        (ResourceClass::PTR, AnswerData::Name(name)) => Ok(RData::PTR(name.clone())),
        (ResourceClass::MX, AnswerData::Name(exchange)) => Ok(RData::MX(MX::new(
            answer.preference.unwrap_or(DEFAULT_MX_PREFERENCE),
            exchange.clone(),
        ))),
        (ResourceClass::TXT, AnswerData::Text(text)) => {
            Ok(RData::TXT(TXT::new(vec![text.clone()])))
        }
        (ResourceClass::HINFO, AnswerData::Text(text)) => {
            let (cpu, os) = text.split_once(char::is_whitespace).unwrap_or((text.as_str(), ""));
            Ok(RData::HINFO(HINFO::new(
                cpu.to_string(),
                os.trim_start().to_string(),
            )))
        }
        (ResourceClass::SOA, AnswerData::Name(mname)) => soa_rdata(mname),
        (ResourceClass::MINFO, AnswerData::Name(mailbox)) => minfo_rdata(mailbox),
        (ResourceClass::ANY, AnswerData::Name(name)) => Ok(any_rdata(name)),
        _ => Err(invalid()),
    }
}

fn soa_rdata(mname: &Name) -> Result<RData, Error> {
    // NB: unwraps are safe: known date format producing values that will always parse as u32.
    let serial: u32 = OffsetDateTime::now_utc()
        .format(&SERIAL_FORMATTER)
        .unwrap()
        .parse()
        .unwrap();
    let rname = Name::from_str("hostmaster")?.append_domain(mname)?;
    // See RIPE 203[0] for recommended values.
    // [0]: https://www.ripe.net/publications/docs/ripe-203
    Ok(RData::SOA(SOA::new(
        mname.clone(),
        rname,
        serial,
        86_400,    // 24 hrs.
        7_200,     // 2 hours.
        3_600_000, // 1000 hours.
        172_800,   // 2 days.
    )))
}

/// `MINFO` has no typed RData: emit RMAILBX and EMAILBX uncompressed, both set to `mailbox`.
fn minfo_rdata(mailbox: &Name) -> Result<RData, Error> {
    let mut buf = Vec::new();
    {
        let mut encoder = BinEncoder::new(&mut buf);
        mailbox.emit_as_canonical(&mut encoder, true)?;
        mailbox.emit_as_canonical(&mut encoder, true)?;
    }
    Ok(RData::Unknown {
        code: MINFO_CODE,
        rdata: NULL::with(buf),
    })
}

/// An `ANY` answer is sent as an address record when the value is an address, else a `CNAME`.
fn any_rdata(name: &Name) -> RData {
    let value = name.to_string();
    match IpAddr::from_str(value.trim_end_matches('.')) {
        Ok(IpAddr::V4(v4)) => RData::A(v4),
        Ok(IpAddr::V6(v6)) => RData::AAAA(v6),
        Err(_) => RData::CNAME(name.clone()),
    }
}

fn value_string(data: &AnswerData) -> String {
    match data {
        AnswerData::Address(value) | AnswerData::Text(value) => value.clone(),
        AnswerData::Name(name) => name.to_string(),
    }
}
