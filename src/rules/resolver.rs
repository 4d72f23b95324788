//! Reply computation and finalization for matched rules.

use crate::error::Error;
use crate::rules::{Pattern, QueryContext, Reply, ReplySource, ResourceClass, Rule, RuleOptions};
use lazy_static::lazy_static;
use std::borrow::Cow;
use regex::{Captures, Regex};
use serde_json::Value;
use trust_dns_server::client::rr::Name;

lazy_static! {
    static ref GROUP_REFERENCE: Regex = Regex::new(r"\$(\$|\d+)").unwrap();
}

/// TTL used when a rule has no valid `ttl` option.
pub const DEFAULT_TTL: u32 = 300;

/// MX preference used when a rule has no valid `priority` option.
pub const DEFAULT_MX_PREFERENCE: u16 = 10;

/// The value carried by a finalized answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerData {
    /// A raw address literal, used for `A` and `AAAA` answers.
    Address(String),
    /// A domain name.
    Name(Name),
    /// A character string, used for `TXT` and `HINFO` answers.
    Text(String),
}

/// A protocol ready answer for one `(rule, resource class)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub resource_class: ResourceClass,
    /// Set for `MX` answers only.
    pub preference: Option<u16>,
    pub data: AnswerData,
    pub ttl: u32,
    /// The rule options left once `ttl`, and for `MX` answers `priority`/`preference`, are taken.
    pub metadata: RuleOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyOutcome {
    Answered(Answer),
    /// The rule matched and explicitly declined to answer.
    Suppressed,
    NoAnswer,
}

/// Compute and finalize the reply of `rule` for one matched resource class.
///
/// `captures` must be the captures of the rule's own pattern, when it is a pattern rule.
///
/// # Errors
///
/// Returns [`Error::CallbackFailure`] when the rule's callback fails, and
/// [`Error::InvalidReply`] when a name valued reply is not a valid domain name.
pub fn resolve(
    rule: &Rule,
    resource_class: ResourceClass,
    captures: Option<&Captures<'_>>,
    context: &QueryContext,
) -> Result<ReplyOutcome, Error> {
    tracing::debug!("found match on {} with type {resource_class}", rule.pattern());
    match compute_reply(rule, resource_class, captures, context)? {
        Reply::Value(value) if !value.is_empty() => {
            tracing::debug!("reply is {value} with type {resource_class}");
            Ok(ReplyOutcome::Answered(finalize(rule, resource_class, value)?))
        }
        Reply::Suppress => {
            tracing::debug!("reply suppressed");
            Ok(ReplyOutcome::Suppressed)
        }
        _ => {
            tracing::debug!("no reply found");
            Ok(ReplyOutcome::NoAnswer)
        }
    }
}

fn compute_reply(
    rule: &Rule,
    resource_class: ResourceClass,
    captures: Option<&Captures<'_>>,
    context: &QueryContext,
) -> Result<Reply, Error> {
    let reply = match rule.source() {
        ReplySource::Static(reply) => Reply::Value(reply.clone()),
        ReplySource::Callback(callback) => {
            callback(captures, resource_class, context).map_err(|source| {
                Error::CallbackFailure {
                    pattern: rule.pattern().to_string(),
                    source,
                }
            })?
        }
    };

    Ok(match (reply, rule.pattern(), captures) {
        (Reply::Value(template), Pattern::Regex(re), Some(captures)) if !template.is_empty() => {
            Reply::Value(expand(re, captures, &template))
        }
        (reply, _, _) => reply,
    })
}

/// Substitute `template` for the pattern within the matched substring. Group references use
/// `$1` or `${name}`, a literal `$` is written `$$`. A numbered reference ends at the last
/// digit, so `$1x` is group 1 followed by `x`.
fn expand(re: &Regex, captures: &Captures<'_>, template: &str) -> String {
    let matched = captures.get(0).map_or("", |m| m.as_str());
    let template = numbered_references(template);
    re.replace_all(matched, &*template).into_owned()
}

/// Rewrite bare `$N` references as `${N}`, leaving `$$` escapes alone.
fn numbered_references(template: &str) -> Cow<'_, str> {
    GROUP_REFERENCE.replace_all(template, |caps: &Captures<'_>| match &caps[1] {
        "$" => "$$".to_string(),
        group => format!("${{{group}}}"),
    })
}

fn finalize(rule: &Rule, resource_class: ResourceClass, value: String) -> Result<Answer, Error> {
    // Work on a copy so the rule stays reusable across queries.
    let mut options = rule.options().clone();

    let preference = if resource_class == ResourceClass::MX {
        // Both keys are consumed, the first valid one wins.
        let priority = options.remove("priority");
        let preference = options.remove("preference");
        Some(
            [priority, preference]
                .iter()
                .flatten()
                .find_map(|value| as_integer(value).and_then(|p| u16::try_from(p).ok()))
                .unwrap_or(DEFAULT_MX_PREFERENCE),
        )
    } else {
        None
    };

    let ttl = options
        .remove("ttl")
        .as_ref()
        .and_then(as_integer)
        .filter(|ttl| *ttl > 0)
        .and_then(|ttl| u32::try_from(ttl).ok())
        .unwrap_or(DEFAULT_TTL);

    let data = match resource_class {
        ResourceClass::A | ResourceClass::AAAA => AnswerData::Address(value),
        ResourceClass::TXT | ResourceClass::HINFO => AnswerData::Text(value),
        _ => match Name::from_ascii(&value) {
            Ok(name) => AnswerData::Name(name),
            Err(_) => {
                return Err(Error::InvalidReply {
                    value,
                    resource_class,
                })
            }
        },
    };

    Ok(Answer {
        resource_class,
        preference,
        data,
        ttl,
        metadata: options,
    })
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(name: &str, class: ResourceClass) -> QueryContext {
        QueryContext::new(name, class)
    }

    fn static_rule(pattern: Pattern, reply: &str, class: &str, options: Value) -> Rule {
        Rule::new(pattern, ReplySource::Static(reply.to_string()), [class], options).unwrap()
    }

    fn answered(outcome: ReplyOutcome) -> Answer {
        match outcome {
            ReplyOutcome::Answered(answer) => answer,
            other => panic!("expected an answer, got {other:?}"),
        }
    }

    fn resolve_host(rule: &Rule, host: &str, class: ResourceClass) -> Result<ReplyOutcome, Error> {
        let matched = rule.match_host(host).expect("rule should match");
        resolve(rule, class, matched.captures(), &context(host, class))
    }

    #[test]
    fn static_a_answer() {
        let rule = static_rule(Pattern::exact("match1.dev"), "10.0.1.1", "A", json!({}));
        let answer = answered(resolve_host(&rule, "match1.dev", ResourceClass::A).unwrap());
        assert_eq!(answer.data, AnswerData::Address("10.0.1.1".to_string()));
        assert_eq!(answer.resource_class, ResourceClass::A);
        assert_eq!(answer.ttl, DEFAULT_TTL);
        assert_eq!(answer.preference, None);
    }

    #[test]
    fn regex_template_expansion() {
        let rule = static_rule(
            Pattern::regex(r"^match3_(\d+)\.dev$").unwrap(),
            "10.0.3.$1",
            "A",
            json!({}),
        );
        let answer = answered(resolve_host(&rule, "match3_42.dev", ResourceClass::A).unwrap());
        assert_eq!(answer.data, AnswerData::Address("10.0.3.42".to_string()));
    }

    #[test]
    fn regex_template_escaped_dollar() {
        let rule = static_rule(
            Pattern::regex(r"^cost_(\d+)$").unwrap(),
            "$$${1}",
            "TXT",
            json!({}),
        );
        let answer = answered(resolve_host(&rule, "cost_5", ResourceClass::TXT).unwrap());
        assert_eq!(answer.data, AnswerData::Text("$5".to_string()));
    }

    #[test]
    fn numbered_reference_followed_by_text() {
        let rule = static_rule(
            Pattern::regex(r"^h(\d+)\.dev$").unwrap(),
            "$1x.internal",
            "CNAME",
            json!({}),
        );
        let answer = answered(resolve_host(&rule, "h7.dev", ResourceClass::CNAME).unwrap());
        assert_eq!(
            answer.data,
            AnswerData::Name(Name::from_ascii("7x.internal").unwrap())
        );
    }

    #[test]
    fn template_reference_forms() {
        let rule = static_rule(
            Pattern::regex(r"^(?P<app>[a-z]+)_(\d+)$").unwrap(),
            "$2-${app}-$$2-$12",
            "TXT",
            json!({}),
        );
        let answer = answered(resolve_host(&rule, "web_4", ResourceClass::TXT).unwrap());
        // $12 names a group that doesn't exist and expands to nothing.
        assert_eq!(answer.data, AnswerData::Text("4-web-$2-".to_string()));
    }

    #[test]
    fn mx_preference() {
        let cases = [
            (json!({"priority": 5}), 5),
            (json!({"preference": 7}), 7),
            (json!({"priority": "20"}), 20),
            (json!({}), DEFAULT_MX_PREFERENCE),
            (json!({"priority": "garbage"}), DEFAULT_MX_PREFERENCE),
            (json!({"priority": -1}), DEFAULT_MX_PREFERENCE),
            (json!({"priority": 3, "preference": 7}), 3),
            (json!({"priority": "garbage", "preference": 7}), 7),
            (json!({"priority": 70000, "preference": "8"}), 8),
        ];
        for (options, expected) in cases {
            let rule = static_rule(Pattern::exact("match2.dev"), "mx.dev", "MX", options);
            let answer = answered(resolve_host(&rule, "match2.dev", ResourceClass::MX).unwrap());
            assert_eq!(answer.preference, Some(expected));
            assert!(answer.metadata.get("priority").is_none());
            assert!(answer.metadata.get("preference").is_none());
        }
    }

    #[test]
    fn ttl_validation() {
        let cases = [
            (json!({"ttl": 120}), 120),
            (json!({"ttl": "60"}), 60),
            (json!({"ttl": -5}), DEFAULT_TTL),
            (json!({"ttl": 0}), DEFAULT_TTL),
            (json!({"ttl": true}), DEFAULT_TTL),
            (json!({}), DEFAULT_TTL),
        ];
        for (options, expected) in cases {
            let rule = static_rule(Pattern::exact("t.dev"), "10.0.0.1", "A", options);
            let answer = answered(resolve_host(&rule, "t.dev", ResourceClass::A).unwrap());
            assert_eq!(answer.ttl, expected);
            assert!(answer.metadata.get("ttl").is_none());
        }
    }

    #[test]
    fn remaining_options_become_metadata() {
        let rule = static_rule(
            Pattern::exact("t.dev"),
            "10.0.0.1",
            "A",
            json!({"ttl": 30, "priority": 3, "comment": "office"}),
        );
        let answer = answered(resolve_host(&rule, "t.dev", ResourceClass::A).unwrap());
        assert_eq!(answer.metadata.get("comment"), Some(&json!("office")));
        // priority only has a meaning for MX answers.
        assert_eq!(answer.metadata.get("priority"), Some(&json!(3)));
    }

    #[test]
    fn resolving_twice_is_idempotent() {
        let rule = static_rule(
            Pattern::exact("match2.dev"),
            "mx.dev",
            "MX",
            json!({"priority": 5, "ttl": 120}),
        );
        let first = resolve_host(&rule, "match2.dev", ResourceClass::MX).unwrap();
        let second = resolve_host(&rule, "match2.dev", ResourceClass::MX).unwrap();
        assert_eq!(first, second);
        assert_eq!(rule.options().get("priority"), Some(&json!(5)));
        assert_eq!(rule.options().get("ttl"), Some(&json!(120)));
    }

    #[test]
    fn names_for_other_classes() {
        let rule = static_rule(Pattern::exact("alias.dev"), "target.dev", "CNAME", json!({}));
        let answer = answered(resolve_host(&rule, "alias.dev", ResourceClass::CNAME).unwrap());
        assert_eq!(
            answer.data,
            AnswerData::Name(Name::from_ascii("target.dev").unwrap())
        );
    }

    #[test]
    fn invalid_name_reply() {
        let too_long = format!("{}.dev", "a".repeat(64));
        let rule = static_rule(Pattern::exact("alias.dev"), &too_long, "CNAME", json!({}));
        assert!(matches!(
            resolve_host(&rule, "alias.dev", ResourceClass::CNAME),
            Err(Error::InvalidReply { .. })
        ));
    }

    #[test]
    fn callback_outcomes() {
        let rule = Rule::new(
            Pattern::regex(r"^cb_(\w+)\.dev$").unwrap(),
            ReplySource::callback(|captures, class, ctx| {
                assert_eq!(class, ResourceClass::A);
                assert_eq!(ctx.requested, ResourceClass::A);
                Ok(match captures.map(|c| c[1].to_string()).as_deref() {
                    Some("yes") => Reply::from("10.0.9.$1"),
                    Some("no") => Reply::Suppress,
                    _ => Reply::Absent,
                })
            }),
            ["A"],
            json!({}),
        )
        .unwrap();

        let answer = answered(resolve_host(&rule, "cb_yes.dev", ResourceClass::A).unwrap());
        assert_eq!(answer.data, AnswerData::Address("10.0.9.yes".to_string()));
        assert_eq!(
            resolve_host(&rule, "cb_no.dev", ResourceClass::A).unwrap(),
            ReplyOutcome::Suppressed
        );
        assert_eq!(
            resolve_host(&rule, "cb_maybe.dev", ResourceClass::A).unwrap(),
            ReplyOutcome::NoAnswer
        );
    }

    #[test]
    fn empty_callback_value_is_no_answer() {
        let rule = Rule::new(
            Pattern::exact("e.dev"),
            ReplySource::callback(|_, _, _| Ok(Reply::Value(String::new()))),
            ["A"],
            json!({}),
        )
        .unwrap();
        assert_eq!(
            resolve_host(&rule, "e.dev", ResourceClass::A).unwrap(),
            ReplyOutcome::NoAnswer
        );
    }

    #[test]
    fn callback_failure_propagates() {
        let rule = Rule::new(
            Pattern::exact("boom.dev"),
            ReplySource::callback(|_, _, _| Err(anyhow::anyhow!("boom"))),
            ["A"],
            json!({}),
        )
        .unwrap();
        assert!(matches!(
            resolve_host(&rule, "boom.dev", ResourceClass::A),
            Err(Error::CallbackFailure { .. })
        ));
    }
}
