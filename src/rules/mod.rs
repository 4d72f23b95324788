//! The rule engine.
//!
//! A [`RuleSet`] is an ordered list of [`Rule`]s. Each rule pairs a hostname [`Pattern`] with
//! one or more [`ResourceClass`]es and a reply, either a static value or a [`ReplyCallback`].
//!
//! For each query every rule is tried in order:
//!
//! 1. The rule's classes are intersected with the requested class (an `ANY` request keeps all
//!    of them), see [`matcher::applicable_classes`].
//! 2. For every remaining class the hostname is matched against the pattern.
//! 3. The reply is computed, see [`resolver::resolve`]. Pattern rules expand `$1`-style group
//!    references of the reply against the matched name, e.g. the rule
//!    `/^app_(\d+)\.dev$/ -> "10.0.0.$1"` answers `app_7.dev` with `10.0.0.7`.
//! 4. Answers are finalized: `ttl` (default 300 seconds) and, for `MX` answers, `priority` or
//!    `preference` (default 10) are read from the rule's options.
//!
//! Every rule that answers contributes to the response, so one query can receive several
//! answers. When nothing answers, the query fails with NXDOMAIN.

use lazy_static::lazy_static;
use regex::Regex;

pub mod matcher;
mod resource_class;
pub mod resolver;
mod rule;
mod rule_set;

pub use resolver::{Answer, AnswerData, ReplyOutcome};
pub use resource_class::{ResourceClass, ALL_CLASSES};
pub(crate) use resource_class::MINFO_CODE;
pub use rule::{
    HostMatch, Pattern, QueryContext, Reply, ReplyCallback, ReplySource, Rule, RuleOptions,
};
pub use rule_set::{FailurePolicy, RuleSet};

lazy_static! {
    // NB: unwrap is safe: constant, valid expression.
    static ref MATCH_EVERYTHING: Regex = Regex::new(".+").unwrap();
}
