//! Rule to query resolution.

use crate::rules::{HostMatch, ResourceClass, Rule, ALL_CLASSES};

/// The classes a rule may answer for the requested class: every class the system understands,
/// intersected with the rule's classes and, unless `requested` is `ANY`, with `requested`.
///
/// The result follows the rule's declaration order.
#[must_use]
pub fn applicable_classes(rule: &Rule, requested: ResourceClass) -> Vec<ResourceClass> {
    rule.resolved_resource_classes()
        .iter()
        .copied()
        .filter(|class| ALL_CLASSES.contains(class))
        .filter(|class| requested == ResourceClass::ANY || *class == requested)
        .collect()
}

/// Every `(class, match)` pair for which `rule` applies to the query. A rule declaring several
/// classes matches each applicable class independently.
#[must_use]
pub fn match_rule<'h>(
    rule: &Rule,
    name: &'h str,
    requested: ResourceClass,
) -> Vec<(ResourceClass, HostMatch<'h>)> {
    applicable_classes(rule, requested)
        .into_iter()
        .filter_map(|class| rule.match_host(name).map(|matched| (class, matched)))
        .collect()
}
