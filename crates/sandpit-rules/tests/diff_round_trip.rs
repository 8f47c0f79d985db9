use std::collections::BTreeSet;

use sandpit_core::{CapabilityDefinition, CheckDefinition, Definitions, Level};
use sandpit_rules::{ConfigDiff, RuleSet};

fn definitions() -> Definitions {
    let capability = |name: &str, enabled_by_default| CapabilityDefinition {
        name: name.to_owned(),
        enabled_by_default,
    };
    let check = |name: &str, level| CheckDefinition {
        name: name.to_owned(),
        level,
    };

    vec![
        (
            capability("Analysis", true),
            vec![
                check("UndefinedFunction", Some(Level::Error)),
                check("UnusedVariable", Some(Level::Warning)),
            ],
        ),
        (
            capability("Naming", false),
            vec![
                check("ClassName", Some(Level::Help)),
                check("ConstantName", None),
            ],
        ),
        (capability("Comment", true), vec![check("NoHashComment", None)]),
    ]
}

fn set(slugs: &[&str]) -> BTreeSet<String> {
    slugs.iter().map(|slug| (*slug).to_owned()).collect()
}

#[test]
fn apply_then_compute_returns_the_same_diff() {
    let mut rules = RuleSet::initialize(&definitions()).expect("rule set");
    let diff = ConfigDiff {
        included_plugins: set(&["naming"]),
        excluded_plugins: set(&["comment"]),
        included_rules: set(&["naming/constant-name"]),
        excluded_rules: set(&["analysis/unused-variable", "naming/class-name"]),
    };

    rules.apply_diff(&diff);

    assert_eq!(rules.compute_diff(), diff);
}

#[test]
fn apply_diff_starts_from_defaults_not_current_state() {
    let mut rules = RuleSet::initialize(&definitions()).expect("rule set");
    rules.toggle_capability("analysis");
    rules.toggle_check("comment", "comment/no-hash-comment");

    let diff = ConfigDiff {
        excluded_rules: set(&["analysis/undefined-function"]),
        ..ConfigDiff::default()
    };
    rules.apply_diff(&diff);

    assert_eq!(rules.compute_diff(), diff);
}

#[test]
fn unknown_slugs_are_ignored() {
    let mut rules = RuleSet::initialize(&definitions()).expect("rule set");

    rules.apply_diff(&ConfigDiff {
        included_plugins: set(&["removed-plugin"]),
        excluded_rules: set(&["analysis/removed-rule", "analysis/unused-variable"]),
        ..ConfigDiff::default()
    });

    assert_eq!(
        rules.compute_diff(),
        ConfigDiff {
            excluded_rules: set(&["analysis/unused-variable"]),
            ..ConfigDiff::default()
        }
    );
}

#[test]
fn overlapping_sets_resolve_to_enabled() {
    let mut rules = RuleSet::initialize(&definitions()).expect("rule set");

    rules.apply_diff(&ConfigDiff {
        included_plugins: set(&["comment"]),
        excluded_plugins: set(&["comment"]),
        included_rules: set(&["analysis/unused-variable"]),
        excluded_rules: set(&["analysis/unused-variable"]),
    });

    assert!(rules.capability("comment").expect("capability").enabled);
    assert!(rules.check("analysis/unused-variable").expect("check").enabled);
    assert!(rules.compute_diff().is_empty());
}
