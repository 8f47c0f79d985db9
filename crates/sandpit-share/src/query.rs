//! Configuration diff and PHP version in the query string.

use std::collections::BTreeSet;

use sandpit_core::PhpVersion;
use sandpit_rules::ConfigDiff;
use url::Url;

pub const PHP_VERSION_PARAM: &str = "phpVersion";
pub const INCLUDED_PLUGINS_PARAM: &str = "includedPlugins";
pub const EXCLUDED_PLUGINS_PARAM: &str = "excludedPlugins";
pub const INCLUDED_RULES_PARAM: &str = "includedRules";
pub const EXCLUDED_RULES_PARAM: &str = "excludedRules";

/// Rewrites the session parameters of `url` in place.
///
/// Existing keys keep their position, new keys are appended, and a key whose
/// value would be empty is removed. Unrelated parameters are left alone. The
/// PHP version is only written when it differs from the default.
pub fn write_session_query(url: &mut Url, diff: &ConfigDiff, php_version: PhpVersion) {
    let php_version = (php_version != PhpVersion::default())
        .then(|| php_version.as_str().to_owned())
        .unwrap_or_default();

    let updates = [
        (PHP_VERSION_PARAM, php_version),
        (EXCLUDED_PLUGINS_PARAM, join_slugs(&diff.excluded_plugins)),
        (INCLUDED_PLUGINS_PARAM, join_slugs(&diff.included_plugins)),
        (EXCLUDED_RULES_PARAM, join_slugs(&diff.excluded_rules)),
        (INCLUDED_RULES_PARAM, join_slugs(&diff.included_rules)),
    ];

    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut written = [false; 5];

    for (key, value) in url.query_pairs() {
        match updates.iter().position(|(name, _)| *name == key) {
            Some(index) => {
                if written[index] {
                    continue;
                }
                written[index] = true;
                let (name, value) = &updates[index];
                if !value.is_empty() {
                    pairs.push(((*name).to_owned(), value.clone()));
                }
            }
            None => pairs.push((key.into_owned(), value.into_owned())),
        }
    }

    for (index, (name, value)) in updates.iter().enumerate() {
        if !written[index] && !value.is_empty() {
            pairs.push(((*name).to_owned(), value.clone()));
        }
    }

    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }
}

/// Missing parameters read as empty sets.
pub fn read_diff(url: &Url) -> ConfigDiff {
    ConfigDiff {
        included_plugins: read_slugs(url, INCLUDED_PLUGINS_PARAM),
        excluded_plugins: read_slugs(url, EXCLUDED_PLUGINS_PARAM),
        included_rules: read_slugs(url, INCLUDED_RULES_PARAM),
        excluded_rules: read_slugs(url, EXCLUDED_RULES_PARAM),
    }
}

/// Unknown or missing versions fall back to the default.
pub fn read_php_version(url: &Url) -> PhpVersion {
    let Some(raw) = query_value(url, PHP_VERSION_PARAM) else {
        return PhpVersion::default();
    };

    raw.parse().unwrap_or_else(|err: String| {
        tracing::warn!(error = %err, "ignoring phpVersion parameter");
        PhpVersion::default()
    })
}

fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.into_owned())
}

fn read_slugs(url: &Url, key: &str) -> BTreeSet<String> {
    query_value(url, key)
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|slug| !slug.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

fn join_slugs(slugs: &BTreeSet<String>) -> String {
    slugs
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> Url {
        Url::parse(raw).expect("valid url")
    }

    fn slugs(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    #[test]
    fn empty_diff_and_default_version_leave_no_query() {
        let mut target = url("https://play.example/?excludedRules=a%2Fb#code/xyz");

        write_session_query(&mut target, &ConfigDiff::default(), PhpVersion::default());

        assert_eq!(target.query(), None);
        assert_eq!(target.fragment(), Some("code/xyz"));
    }

    #[test]
    fn unrelated_parameters_keep_their_place() {
        let mut target = url("https://play.example/?theme=dark&includedPlugins=old&lang=en");
        let diff = ConfigDiff {
            included_plugins: slugs(&["naming", "analysis"]),
            excluded_rules: slugs(&["comment/no-hash"]),
            ..ConfigDiff::default()
        };

        write_session_query(&mut target, &diff, PhpVersion::Php80);

        let pairs: Vec<(String, String)> = target.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("theme".to_owned(), "dark".to_owned()),
                ("includedPlugins".to_owned(), "analysis,naming".to_owned()),
                ("lang".to_owned(), "en".to_owned()),
                ("phpVersion".to_owned(), "8.0".to_owned()),
                ("excludedRules".to_owned(), "comment/no-hash".to_owned()),
            ]
        );
    }

    #[test]
    fn diff_round_trips_through_query() {
        let mut target = url("https://play.example/");
        let diff = ConfigDiff {
            included_plugins: slugs(&["naming"]),
            excluded_plugins: slugs(&["comment", "analysis"]),
            included_rules: slugs(&["naming/class-name"]),
            excluded_rules: slugs(&["analysis/unused-variable", "strictness/require-strict-types"]),
        };

        write_session_query(&mut target, &diff, PhpVersion::Php74);

        assert_eq!(read_diff(&target), diff);
        assert_eq!(read_php_version(&target), PhpVersion::Php74);
    }

    #[test]
    fn missing_or_malformed_parameters_read_as_defaults() {
        let target = url("https://play.example/?includedRules=,,a/b,&phpVersion=5.6");

        let diff = read_diff(&target);

        assert_eq!(diff.included_rules, slugs(&["a/b"]));
        assert!(diff.excluded_rules.is_empty());
        assert_eq!(read_php_version(&target), PhpVersion::default());
    }
}
