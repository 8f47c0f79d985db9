use std::collections::{BTreeMap, HashMap};

use heck::ToKebabCase;
use sandpit_core::{Definitions, Level, LinterSettings, PhpVersion, RuleSettings};
use serde::Serialize;
use thiserror::Error;

mod diff;

pub use diff::ConfigDiff;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capability {
    pub name: String,
    pub slug: String,
    pub enabled_by_default: bool,
    pub enabled: bool,
    /// Slugs of the checks this capability owns, in definition order.
    pub checks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Check {
    pub name: String,
    pub slug: String,
    pub capability: String,
    pub enabled_by_default: bool,
    pub enabled: bool,
    pub severity_override: Option<Level>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleSetError {
    #[error("engine returned no capability definitions")]
    NoDefinitions,
    #[error("capability name '{0}' does not produce a slug")]
    InvalidCapabilityName(String),
    #[error("check name '{name}' in capability '{capability}' does not produce a slug")]
    InvalidCheckName { capability: String, name: String },
    #[error("duplicate capability slug '{0}'")]
    DuplicateCapability(String),
    #[error("duplicate check slug '{0}'")]
    DuplicateCheck(String),
}

/// Enabled state captured once from the engine definitions.
#[derive(Debug, Clone, Default)]
struct Defaults {
    capabilities: HashMap<String, bool>,
    checks: HashMap<String, bool>,
}

/// The capability/check toggle tree.
///
/// Capabilities and checks live in two flat maps keyed by slug; the ordered
/// `order` list and each capability's `checks` list carry ownership.
#[derive(Debug, Clone)]
pub struct RuleSet {
    order: Vec<String>,
    capabilities: HashMap<String, Capability>,
    checks: HashMap<String, Check>,
    defaults: Defaults,
}

/// `"NoEmptyCatch"` and `"No Empty Catch"` both become `no-empty-catch`.
pub fn slugify(name: &str) -> String {
    name.trim().to_kebab_case()
}

pub fn check_slug(capability_slug: &str, check_name: &str) -> String {
    format!("{capability_slug}/{}", slugify(check_name))
}

impl RuleSet {
    pub fn initialize(definitions: &Definitions) -> Result<Self, RuleSetError> {
        if definitions.is_empty() {
            return Err(RuleSetError::NoDefinitions);
        }

        let mut order = Vec::with_capacity(definitions.len());
        let mut capabilities = HashMap::with_capacity(definitions.len());
        let mut checks = HashMap::new();

        for (capability_def, check_defs) in definitions {
            let slug = slugify(&capability_def.name);
            if slug.is_empty() {
                return Err(RuleSetError::InvalidCapabilityName(
                    capability_def.name.clone(),
                ));
            }
            if capabilities.contains_key(&slug) {
                return Err(RuleSetError::DuplicateCapability(slug));
            }

            let mut owned = Vec::with_capacity(check_defs.len());
            for check_def in check_defs {
                if slugify(&check_def.name).is_empty() {
                    return Err(RuleSetError::InvalidCheckName {
                        capability: capability_def.name.clone(),
                        name: check_def.name.clone(),
                    });
                }

                let check_slug = check_slug(&slug, &check_def.name);
                if checks.contains_key(&check_slug) {
                    return Err(RuleSetError::DuplicateCheck(check_slug));
                }

                let enabled_by_default = check_def.level.is_some();
                owned.push(check_slug.clone());
                checks.insert(
                    check_slug.clone(),
                    Check {
                        name: check_def.name.clone(),
                        slug: check_slug,
                        capability: slug.clone(),
                        enabled_by_default,
                        enabled: enabled_by_default,
                        severity_override: check_def.level,
                    },
                );
            }

            order.push(slug.clone());
            capabilities.insert(
                slug.clone(),
                Capability {
                    name: capability_def.name.clone(),
                    slug,
                    enabled_by_default: capability_def.enabled_by_default,
                    enabled: capability_def.enabled_by_default,
                    checks: owned,
                },
            );
        }

        let defaults = Defaults {
            capabilities: capabilities
                .values()
                .map(|capability| (capability.slug.clone(), capability.enabled_by_default))
                .collect(),
            checks: checks
                .values()
                .map(|check| (check.slug.clone(), check.enabled_by_default))
                .collect(),
        };

        tracing::debug!(
            capabilities = capabilities.len(),
            checks = checks.len(),
            "rule set initialized"
        );

        Ok(Self {
            order,
            capabilities,
            checks,
            defaults,
        })
    }

    /// Capabilities in definition order.
    pub fn capabilities(&self) -> impl Iterator<Item = &Capability> {
        self.order
            .iter()
            .filter_map(|slug| self.capabilities.get(slug))
    }

    pub fn capability(&self, slug: &str) -> Option<&Capability> {
        self.capabilities.get(slug)
    }

    pub fn check(&self, slug: &str) -> Option<&Check> {
        self.checks.get(slug)
    }

    pub fn checks_of<'a>(&'a self, capability: &'a Capability) -> impl Iterator<Item = &'a Check> {
        capability
            .checks
            .iter()
            .filter_map(|slug| self.checks.get(slug))
    }

    /// Resets every toggle to its default, then applies `diff` on top.
    ///
    /// Exclusions are applied before inclusions, so a slug listed in both sets
    /// ends up enabled. Unknown slugs are skipped.
    pub fn apply_diff(&mut self, diff: &ConfigDiff) {
        for capability in self.capabilities.values_mut() {
            capability.enabled = self.defaults.capabilities[&capability.slug];
        }
        for check in self.checks.values_mut() {
            check.enabled = self.defaults.checks[&check.slug];
        }

        for slug in &diff.excluded_plugins {
            self.set_capability(slug, false);
        }
        for slug in &diff.included_plugins {
            self.set_capability(slug, true);
        }
        for slug in &diff.excluded_rules {
            self.set_check(slug, false);
        }
        for slug in &diff.included_rules {
            self.set_check(slug, true);
        }
    }

    pub fn toggle_capability(&mut self, slug: &str) -> bool {
        match self.capabilities.get_mut(slug) {
            Some(capability) => {
                capability.enabled = !capability.enabled;
                true
            }
            None => false,
        }
    }

    /// `check_slug` is the full `capability/check` slug.
    pub fn toggle_check(&mut self, capability_slug: &str, check_slug: &str) -> bool {
        match self.checks.get_mut(check_slug) {
            Some(check) if check.capability == capability_slug => {
                check.enabled = !check.enabled;
                true
            }
            _ => false,
        }
    }

    pub fn set_check_level(&mut self, check_slug: &str, level: Option<Level>) -> bool {
        match self.checks.get_mut(check_slug) {
            Some(check) => {
                check.severity_override = level;
                true
            }
            None => false,
        }
    }

    pub fn compute_diff(&self) -> ConfigDiff {
        let mut diff = ConfigDiff::default();

        for capability in self.capabilities.values() {
            if capability.enabled == self.defaults.capabilities[&capability.slug] {
                continue;
            }
            if capability.enabled {
                diff.included_plugins.insert(capability.slug.clone());
            } else {
                diff.excluded_plugins.insert(capability.slug.clone());
            }
        }

        for check in self.checks.values() {
            if check.enabled == self.defaults.checks[&check.slug] {
                continue;
            }
            if check.enabled {
                diff.included_rules.insert(check.slug.clone());
            } else {
                diff.excluded_rules.insert(check.slug.clone());
            }
        }

        diff
    }

    /// Settings for one engine call. Checks under a disabled capability are
    /// left out entirely, whatever their own state.
    pub fn build_engine_request(&self, php_version: PhpVersion) -> LinterSettings {
        let mut plugins = Vec::new();
        let mut rules = BTreeMap::new();

        for capability in self.capabilities().filter(|capability| capability.enabled) {
            plugins.push(capability.slug.clone());
            for check in self.checks_of(capability) {
                rules.insert(
                    check.slug.clone(),
                    RuleSettings {
                        enabled: check.enabled,
                        level: check.severity_override,
                        options: Default::default(),
                    },
                );
            }
        }

        LinterSettings {
            php_version,
            default_plugins: false,
            plugins,
            rules,
        }
    }

    fn set_capability(&mut self, slug: &str, enabled: bool) {
        match self.capabilities.get_mut(slug) {
            Some(capability) => capability.enabled = enabled,
            None => tracing::debug!(slug, "ignoring unknown plugin slug"),
        }
    }

    fn set_check(&mut self, slug: &str, enabled: bool) {
        match self.checks.get_mut(slug) {
            Some(check) => check.enabled = enabled,
            None => tracing::debug!(slug, "ignoring unknown rule slug"),
        }
    }
}
