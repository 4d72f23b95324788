//! DevDNSd
//!
//! A small DNS responder for local development. Hostnames of a custom top level domain
//! (e.g. `*.dev`) are matched against an ordered list of rules and answered with a configured
//! or computed value, without touching system wide DNS infrastructure.
//!
//! See [`rules`] for how queries are matched and answered and [`dns`] for the server.
//!
//! Rules are usually declared in the JSON [`Config`]. Library users can also build a
//! [`RuleSet`] directly, including rules whose reply is computed by a callback:
//!
//! ```
//! use devdnsd::rules::{Pattern, QueryContext, Reply, ReplySource, ResourceClass, RuleSet};
//! use serde_json::json;
//!
//! let mut rules = RuleSet::from_rules(Vec::new());
//! rules.add_rule(
//!     Pattern::regex(r"^(\w+)\.lan\.dev$")?,
//!     ReplySource::callback(|captures, _, _| {
//!         Ok(match captures.map(|c| c[1].to_string()).as_deref() {
//!             Some("printer") => Reply::from("192.168.1.20"),
//!             _ => Reply::Suppress,
//!         })
//!     }),
//!     ["A"],
//!     json!({ "ttl": 60 }),
//! )?;
//!
//! let answers = rules.process_query(&QueryContext::new("printer.lan.dev", ResourceClass::A))?;
//! assert_eq!(answers.len(), 1);
//! assert_eq!(answers[0].ttl, 60);
//!
//! // Declared rules replace the fallback: unknown names get no answer.
//! let answers = rules.process_query(&QueryContext::new("other.dev", ResourceClass::A))?;
//! assert!(answers.is_empty());
//! # Ok::<(), devdnsd::error::Error>(())
//! ```
#![warn(clippy::pedantic)]

pub mod config;
pub mod dns;
pub mod error;
pub mod rules;

pub use config::{Config, Shared};
pub use dns::new as new_dns;
pub use rules::{Rule, RuleSet};
