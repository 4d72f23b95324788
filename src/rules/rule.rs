use crate::error::Error;
use crate::rules::ResourceClass;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

/// Extra per-rule reply options, e.g. `ttl` and `priority`.
pub type RuleOptions = Map<String, Value>;

/// A user supplied function computing the reply for a matched query.
///
/// It receives the pattern captures (only for [`Pattern::Regex`] rules), the resource class
/// being answered and the query context. This is the only extension point of the rule engine.
pub type ReplyCallback = Arc<
    dyn Fn(Option<&Captures<'_>>, ResourceClass, &QueryContext) -> anyhow::Result<Reply>
        + Send
        + Sync,
>;

/// What a [`ReplyCallback`] decided for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Answer with this value. Empty strings are treated as [`Reply::Absent`].
    Value(String),
    /// The rule matched but deliberately declines to answer.
    Suppress,
    /// The rule has nothing to say for this query.
    Absent,
}

impl From<&str> for Reply {
    fn from(value: &str) -> Self {
        Self::Value(value.to_string())
    }
}

impl From<String> for Reply {
    fn from(value: String) -> Self {
        Self::Value(value)
    }
}

impl From<Option<String>> for Reply {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Absent, Self::Value)
    }
}

/// Per-query handle handed to callbacks. Describes the question being answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryContext {
    /// Queried name, without the trailing root dot.
    pub name: String,
    /// Requested class. [`ResourceClass::ANY`] requests every class.
    pub requested: ResourceClass,
    /// Address of the client that sent the query, when known.
    pub source: Option<SocketAddr>,
}

impl QueryContext {
    #[must_use]
    pub fn new(name: impl Into<String>, requested: ResourceClass) -> Self {
        Self {
            name: name.into(),
            requested,
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: SocketAddr) -> Self {
        self.source = Some(source);
        self
    }
}

/// How a rule matches hostnames.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// The hostname must equal this string.
    Exact(String),
    /// The hostname must match this regular expression.
    Regex(Regex),
}

impl Pattern {
    pub fn exact(host: impl Into<String>) -> Self {
        Self::Exact(host.into())
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidRule`] if `re` is not a valid regular expression.
    pub fn regex(re: &str) -> Result<Self, Error> {
        Regex::new(re)
            .map(Self::Regex)
            .map_err(|err| Error::InvalidRule(format!("invalid pattern /{re}/: {err}")))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(host) => write!(f, "\"{host}\""),
            Self::Regex(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

/// Result of a successful [`Rule::match_host`].
#[derive(Debug)]
pub enum HostMatch<'h> {
    /// An exact rule matched. There are no captures.
    Exact,
    /// A pattern rule matched. Group 0 is the matched substring.
    Pattern(Captures<'h>),
}

impl<'h> HostMatch<'h> {
    #[must_use]
    pub fn captures(&self) -> Option<&Captures<'h>> {
        match self {
            Self::Exact => None,
            Self::Pattern(captures) => Some(captures),
        }
    }
}

/// Where a rule's reply comes from.
#[derive(Clone)]
pub enum ReplySource {
    Static(String),
    Callback(ReplyCallback),
}

impl ReplySource {
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(Option<&Captures<'_>>, ResourceClass, &QueryContext) -> anyhow::Result<Reply>
            + Send
            + Sync
            + 'static,
    {
        Self::Callback(Arc::new(f))
    }
}

impl fmt::Debug for ReplySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(reply) => f.debug_tuple("Static").field(reply).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// A single pattern to reply mapping. Immutable once built.
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Pattern,
    resource_classes: Vec<ResourceClass>,
    source: ReplySource,
    options: RuleOptions,
}

impl Rule {
    /// Build a rule. An empty `types` list means `A`. Duplicate types collapse.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRule`] if the static reply is empty, `options` is not a JSON
    /// object, or one of `types` is not a known resource type tag.
    pub fn new<I, S>(
        pattern: Pattern,
        source: ReplySource,
        types: I,
        options: Value,
    ) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if let ReplySource::Static(reply) = &source {
            if reply.is_empty() {
                return Err(Error::InvalidRule(format!(
                    "rule {pattern} needs a reply or a callback"
                )));
            }
        }

        let options = match options {
            Value::Object(options) => options,
            Value::Null => RuleOptions::new(),
            other => {
                return Err(Error::InvalidRule(format!(
                    "options of rule {pattern} must be a mapping, found {other}"
                )))
            }
        };

        let mut resource_classes = Vec::new();
        for tag in types {
            let class = ResourceClass::from_tag(tag.as_ref())?;
            if !resource_classes.contains(&class) {
                resource_classes.push(class);
            }
        }
        if resource_classes.is_empty() {
            resource_classes.push(ResourceClass::A);
        }

        Ok(Self {
            pattern,
            resource_classes,
            source,
            options,
        })
    }

    /// The fallback rule used when no rules are declared: everything resolves to `127.0.0.1`.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            pattern: Pattern::Regex(super::MATCH_EVERYTHING.clone()),
            resource_classes: vec![ResourceClass::A],
            source: ReplySource::Static("127.0.0.1".to_string()),
            options: RuleOptions::new(),
        }
    }

    #[must_use]
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    #[must_use]
    pub fn source(&self) -> &ReplySource {
        &self.source
    }

    #[must_use]
    pub fn options(&self) -> &RuleOptions {
        &self.options
    }

    #[must_use]
    pub fn is_pattern(&self) -> bool {
        matches!(self.pattern, Pattern::Regex(_))
    }

    #[must_use]
    pub fn has_callback(&self) -> bool {
        matches!(self.source, ReplySource::Callback(_))
    }

    /// Match `hostname` against the rule. Pattern rules return their captures.
    #[must_use]
    pub fn match_host<'h>(&self, hostname: &'h str) -> Option<HostMatch<'h>> {
        match &self.pattern {
            Pattern::Exact(host) => (host == hostname).then_some(HostMatch::Exact),
            Pattern::Regex(re) => re.captures(hostname).map(HostMatch::Pattern),
        }
    }

    /// The declared resource classes, deduplicated, in declaration order.
    #[must_use]
    pub fn resolved_resource_classes(&self) -> &[ResourceClass] {
        &self.resource_classes
    }
}
