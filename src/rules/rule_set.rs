use crate::error::Error;
use crate::rules::matcher::match_rule;
use crate::rules::resolver::{resolve, Answer, ReplyOutcome};
use crate::rules::{Pattern, QueryContext, ReplySource, Rule};
use serde::Deserialize;
use serde_json::Value;

/// What to do when evaluating a rule fails, e.g. because its callback returned an error.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Fail the whole query.
    #[default]
    Abort,
    /// Log the failure and carry on with the remaining rules.
    Skip,
}

/// The ordered rules DevDNSd answers from. Never empty: until a rule is declared the
/// [fallback rule][Rule::fallback] stands in, and the first declared rule replaces it.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
    failure_policy: FailurePolicy,
    fallback_only: bool,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            rules: vec![Rule::fallback()],
            failure_policy: FailurePolicy::default(),
            fallback_only: true,
        }
    }
}

impl RuleSet {
    /// Build a rule set from `rules`, keeping their order. Without rules the
    /// [fallback rule][Rule::fallback] is used.
    #[must_use]
    pub fn from_rules(rules: Vec<Rule>) -> Self {
        if rules.is_empty() {
            return Self::default();
        }
        Self {
            rules,
            failure_policy: FailurePolicy::default(),
            fallback_only: false,
        }
    }

    #[must_use]
    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    /// Validate and append a rule. The first rule declared this way drops the fallback rule.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRule`] if the rule is invalid, see [`Rule::new`].
    pub fn add_rule<I, S>(
        &mut self,
        pattern: Pattern,
        source: ReplySource,
        types: I,
        options: Value,
    ) -> Result<&Rule, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rule = Rule::new(pattern, source, types, options)?;
        if self.fallback_only {
            self.rules.clear();
            self.fallback_only = false;
        }
        self.rules.push(rule);
        Ok(&self.rules[self.rules.len() - 1])
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[must_use]
    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate every rule, in order, against the query and collect the answers.
    ///
    /// All rules are tried: a query can receive several answers. An empty result means no rule
    /// answered, which the server turns into NXDOMAIN (or a passthrough lookup).
    ///
    /// # Errors
    ///
    /// With [`FailurePolicy::Abort`], returns the first [`Error::CallbackFailure`] or
    /// [`Error::InvalidReply`] raised by a rule. With [`FailurePolicy::Skip`] these are logged
    /// and the failing rule contributes nothing.
    pub fn process_query(&self, context: &QueryContext) -> Result<Vec<Answer>, Error> {
        let mut answers = Vec::new();
        for rule in &self.rules {
            for (class, matched) in match_rule(rule, &context.name, context.requested) {
                match resolve(rule, class, matched.captures(), context) {
                    Ok(ReplyOutcome::Answered(answer)) => answers.push(answer),
                    Ok(ReplyOutcome::Suppressed | ReplyOutcome::NoAnswer) => {}
                    Err(err) if self.failure_policy == FailurePolicy::Skip => {
                        tracing::warn!(
                            "skipping rule {} for \"{}\": {err:?}",
                            rule.pattern(),
                            context.name
                        );
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(answers)
    }
}
