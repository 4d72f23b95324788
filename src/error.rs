//! Error types.

use crate::rules::ResourceClass;
use trust_dns_client::error::ClientError;
use trust_dns_server::proto::error::ProtoError;

/// Error enumerates the possible DevDNSd error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when a [`Rule`][crate::rules::Rule] can't be constructed: the reply is missing
    /// or empty, the options are not a mapping, a resource type tag is unknown, the pattern is
    /// not a valid regular expression, or both a static reply and a callback were supplied.
    ///
    /// Always returned synchronously while the rule set is being built. A configuration
    /// containing an invalid rule is rejected as a whole.
    #[error("invalid rule: {0}")]
    InvalidRule(String),

    /// Returned when a user supplied [`ReplyCallback`][crate::rules::ReplyCallback] fails.
    ///
    /// Whether this aborts the whole query or only skips the failing rule is decided by the
    /// [`FailurePolicy`][crate::rules::FailurePolicy] of the rule set.
    #[error("reply callback for rule {pattern} failed")]
    CallbackFailure {
        pattern: String,
        #[source]
        source: anyhow::Error,
    },

    /// Returned when a reply for a name-valued resource class (e.g. `CNAME` or `MX`) is not a
    /// valid domain name.
    #[error("reply \"{value}\" is not a valid {resource_class} value")]
    InvalidReply {
        value: String,
        resource_class: ResourceClass,
    },

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when [trying to load a `Config`][crate::config::Config::try_from_file] fails due
    /// to invalid JSON content.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),

    /// Returned when the DevDNSd DNS server encounters a generic DNS protocol error.
    #[error("DNS error")]
    DNSError(#[from] ProtoError),

    /// Returned when forwarding an unmatched query to the
    /// [passthrough upstream][crate::config::Config::passthrough] fails.
    #[error("passthrough query failed")]
    Passthrough(#[from] ClientError),
}
