//! DNS server answering from a [`RuleSet`][crate::rules::RuleSet].
//!
//! DevDNSd listens on UDP and TCP. For each query the [rule set][crate::rules] is evaluated
//! and every answer is returned, authoritatively, in a single response.
//!
//! E.g. with config:
//! ```json
//! {
//!   "dns_udp_bind_addr": "127.0.0.1:7771",
//!   "dns_tcp_bind_addr": "127.0.0.1:7771",
//!   "rules": [
//!     { "exact": "match1.dev", "reply": "10.0.1.1" },
//!     { "exact": "match2.dev", "reply": "mail.match2.dev", "type": "MX", "options": { "priority": 5 } },
//!     { "regex": "^match3_(\\d+)\\.dev$", "reply": "10.0.3.$1" }
//!   ]
//! }
//! ```
//!
//! Queries are answered like so:
//!
//! ```bash
//! ❯ dig @127.0.0.1 -p 7771 +short match1.dev A
//! 10.0.1.1
//! ❯ dig @127.0.0.1 -p 7771 +short match2.dev MX
//! 5 mail.match2.dev.
//! ❯ dig @127.0.0.1 -p 7771 +short match3_42.dev A
//! 10.0.3.42
//! ```
//!
//! # Record encoding
//!
//! `A` and `AAAA` replies must be address literals, answers that aren't are dropped with a
//! warning. `CNAME`, `NS`, `PTR`, `MX` and `SOA` replies are domain names. `SOA` answers use the
//! reply as primary name server and `hostmaster.<reply>` as admin mailbox. `TXT` replies are
//! sent as a single string and `HINFO` replies as `"<cpu> <os>"`. An answer for an `ANY` rule
//! is sent as `A`/`AAAA` when the reply is an address and as `CNAME` otherwise.
//!
//! # Unanswered queries
//!
//! When no rule answers, the query fails with `NXDOMAIN`. If
//! [`Config::passthrough`][`crate::config::Config::passthrough`] is set, the query is forwarded
//! to that resolver instead and its answers are relayed.
//!
//! A rule failing under [`FailurePolicy::Abort`][crate::rules::FailurePolicy::Abort] answers
//! the query with `SERVFAIL`.

mod handlers;
pub mod passthrough;
mod records;
pub mod server;

pub use handlers::Handler;
pub use server::new;
