use sandpit_core::PhpVersion;
use sandpit_engine::{AnalysisEngine, MockEngine};
use sandpit_rules::RuleSet;

const SOURCE: &str = "<?php\n\nfunction run() {\n    eval('1');  \n}\n";

#[tokio::test]
async fn mock_definitions_build_a_rule_set_with_expected_slugs() {
    let definitions = MockEngine.definitions().await.expect("definitions");
    let rules = RuleSet::initialize(&definitions).expect("rule set");

    for slug in [
        "consistency/no-trailing-whitespace",
        "consistency/no-tab-indentation",
        "strictness/require-strict-types",
        "safety/no-eval",
        "comment/no-hash-comment",
    ] {
        assert!(rules.check(slug).is_some(), "missing {slug}");
    }
    assert!(!rules.capability("safety").expect("safety").enabled_by_default);
}

#[tokio::test]
async fn default_request_reports_only_default_checks() {
    let rules = RuleSet::initialize(&MockEngine.definitions().await.expect("definitions"))
        .expect("rule set");

    let outcome = MockEngine
        .analyze(SOURCE, None, &rules.build_engine_request(PhpVersion::default()))
        .await
        .expect("analysis");

    assert!(outcome.parse_error.is_none());
    assert!(outcome.semantic_issues.is_empty());
    let codes: Vec<_> = outcome
        .linter_issues
        .iter()
        .filter_map(|issue| issue.code.as_deref())
        .collect();
    assert_eq!(
        codes,
        vec![
            "consistency/no-trailing-whitespace",
            "strictness/require-strict-types"
        ]
    );
    assert_eq!(
        outcome.formatted.as_deref(),
        Some("<?php\n\nfunction run() {\n    eval('1');\n}\n")
    );
}

#[tokio::test]
async fn empty_plugin_list_still_parses() {
    let rules = RuleSet::initialize(&MockEngine.definitions().await.expect("definitions"))
        .expect("rule set");
    let mut request = rules.build_engine_request(PhpVersion::Php80);
    request.plugins.clear();
    request.rules.clear();

    let outcome = MockEngine
        .analyze("<?php\nif (true) {\n", None, &request)
        .await
        .expect("analysis");

    assert!(outcome.parse_error.is_some());
    assert!(outcome.formatted.is_none());
    assert!(outcome.linter_issues.is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn process_engine_speaks_json_over_stdio() {
    use sandpit_engine::ProcessEngine;

    let script = r#"
if [ "$1" = "definitions" ]; then
  printf '%s\n' '[[{"name":"Analysis","enabled_by_default":true},[{"name":"UnusedVariable","level":"Warning"}]]]'
else
  cat > /dev/null
  printf '%s\n' '{"parse_error":null,"semantic_issues":[],"linter_issues":[{"level":"Warning","code":"analysis/unused-variable","message":"unused $x","annotations":[]}],"formatted":"<?php\n"}'
fi
"#;
    let engine = ProcessEngine::new(
        "sh".to_owned(),
        vec!["-c".to_owned(), script.to_owned(), "engine".to_owned()],
    );

    let definitions = engine.definitions().await.expect("definitions");
    let rules = RuleSet::initialize(&definitions).expect("rule set");
    assert!(rules.check("analysis/unused-variable").is_some());

    let outcome = engine
        .analyze("<?php $x = 1;", None, &rules.build_engine_request(PhpVersion::default()))
        .await
        .expect("analysis");
    assert_eq!(outcome.linter_issues.len(), 1);
    assert_eq!(outcome.formatted.as_deref(), Some("<?php\n"));
}

#[cfg(unix)]
#[tokio::test]
async fn failing_process_reports_exit_status() {
    use sandpit_engine::{EngineError, ProcessEngine};

    let engine = ProcessEngine::new(
        "sh".to_owned(),
        vec!["-c".to_owned(), "echo boom >&2; exit 3".to_owned(), "engine".to_owned()],
    );

    let err = engine.definitions().await.expect_err("engine failure");
    match err {
        EngineError::Exit { stderr, .. } => assert_eq!(stderr, "boom"),
        other => panic!("unexpected error: {other}"),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn large_request_is_written_while_the_engine_streams_output() {
    use std::time::Duration;

    use sandpit_engine::ProcessEngine;

    // Echoes the whole request to stderr before answering, which fills the
    // stderr pipe long before stdin is fully written.
    let script = r#"
cat >&2
printf '%s\n' '{"parse_error":null,"semantic_issues":[],"linter_issues":[],"formatted":"<?php\n"}'
"#;
    let engine = ProcessEngine::new(
        "sh".to_owned(),
        vec!["-c".to_owned(), script.to_owned(), "engine".to_owned()],
    );
    let code = format!("<?php\n{}", "echo 'padding';\n".repeat(40_000));
    let definitions = MockEngine.definitions().await.expect("definitions");
    let settings = RuleSet::initialize(&definitions)
        .expect("rule set")
        .build_engine_request(PhpVersion::default());

    let outcome = tokio::time::timeout(
        Duration::from_secs(30),
        engine.analyze(&code, None, &settings),
    )
    .await
    .expect("engine call should not stall")
    .expect("analysis");
    assert_eq!(outcome.formatted.as_deref(), Some("<?php\n"));
}
