use crate::error::Error;
use crate::rules::{FailurePolicy, Pattern, ReplySource, Rule, RuleSet};
use serde::Deserialize;
use serde_json::Value;
use serde_with::{formats::PreferOne, serde_as, DurationSeconds, OneOrMany};
use std::fs::File;
use std::io::BufReader;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub type Shared = Arc<Config>;

const DEFAULT_PORT: u16 = 7771;

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub dns_udp_bind_addr: SocketAddr,
    pub dns_tcp_bind_addr: SocketAddr,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub dns_tcp_timeout: Duration,
    /// Upstream resolver for queries no rule answers. Unset means NXDOMAIN.
    pub passthrough: Option<SocketAddr>,
    pub callback_failure: FailurePolicy,
    pub rules: Vec<RuleConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let any_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT);
        Self {
            dns_udp_bind_addr: any_addr,
            dns_tcp_bind_addr: any_addr,
            dns_tcp_timeout: Duration::from_secs(10),
            passthrough: None,
            callback_failure: FailurePolicy::default(),
            rules: Vec::new(),
        }
    }
}

/// A rule as declared in the configuration file.
///
/// ```json
/// { "regex": "^app_(\\d+)\\.dev$", "reply": "10.0.0.$1", "type": ["A", "MX"], "options": { "ttl": 60 } }
/// ```
#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct RuleConfig {
    #[serde(flatten)]
    pub pattern: PatternConfig,
    pub reply: Option<String>,
    #[serde_as(as = "OneOrMany<_, PreferOne>")]
    #[serde(default, rename = "type")]
    pub types: Vec<String>,
    #[serde(default)]
    pub options: Value,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PatternConfig {
    Exact(String),
    Regex(String),
}

impl RuleConfig {
    /// # Errors
    ///
    /// Returns [`Error::InvalidRule`] if the declared rule is invalid.
    pub fn to_rule(&self) -> Result<Rule, Error> {
        let pattern = match &self.pattern {
            PatternConfig::Exact(host) => Pattern::exact(host),
            PatternConfig::Regex(re) => Pattern::regex(re)?,
        };
        let reply = self.reply.clone().ok_or_else(|| {
            Error::InvalidRule(format!("rule {pattern} needs a reply"))
        })?;
        Rule::new(
            pattern,
            ReplySource::Static(reply),
            &self.types,
            self.options.clone(),
        )
    }
}

impl Config {
    /// # Errors
    ///
    /// Returns [`Error::IO`] if the file can't be read, [`Error::InvalidJSON`] if it is not a
    /// valid configuration and [`Error::InvalidRule`] if any declared rule is invalid.
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        Self::load(p).map(|(conf, _)| conf)
    }

    /// Like [`Config::try_from_file`], also returning the rule set built while validating.
    ///
    /// # Errors
    ///
    /// See [`Config::try_from_file`].
    pub fn load(p: impl AsRef<Path>) -> Result<(Self, RuleSet), Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let conf: Config = serde_json::from_reader(reader)?;
        // Fail fast: a config with a bad rule is never partially loaded.
        let rules = conf.rule_set()?;
        Ok((conf, rules))
    }

    /// Build the rule set described by the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRule`] for the first invalid rule.
    pub fn rule_set(&self) -> Result<RuleSet, Error> {
        let rules = self
            .rules
            .iter()
            .map(RuleConfig::to_rule)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RuleSet::from_rules(rules).with_failure_policy(self.callback_failure))
    }
}
