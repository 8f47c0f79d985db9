use std::time::{Duration, Instant};

use sandpit_core::{
    AnalysisOutcome, Decoration, DiagnosticBuckets, Level, LinterSettings, PhpVersion,
    decorations_for,
};
use sandpit_engine::EngineError;
use sandpit_rules::RuleSet;
use sandpit_share::{AddressBar, ExampleSet, RestoredSession, SessionState, SourceOrigin, restore};
use serde::Serialize;
use url::Url;

pub const FORMAT_ERROR_MESSAGE: &str =
    "There was an error formatting the code. Check for syntax errors.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// An edit armed the debounce timer; analysis starts at `due`.
    Pending { due: Instant },
    Analyzing { seq: u64 },
}

/// One engine call to make. Results must be handed back with the same `seq`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisTicket {
    pub seq: u64,
    pub source: String,
    pub settings: LinterSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "text", rename_all = "snake_case")]
pub enum FormattedPane {
    Text(String),
    /// Parse failure or engine error; shown as [`FORMAT_ERROR_MESSAGE`].
    Unavailable,
}

/// What the user sees after an applied analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisView {
    pub seq: u64,
    pub source: String,
    pub php_version: PhpVersion,
    pub diagnostics: DiagnosticBuckets,
    pub decorations: Vec<Decoration>,
    pub formatted: FormattedPane,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_error: Option<String>,
    pub share_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Stale { seq: u64, latest: u64 },
}

/// Playground session: source text, rule toggles, PHP version and the
/// address bar, plus the debounce and sequencing state that decides which
/// engine results are shown.
#[derive(Debug)]
pub struct Session {
    rules: RuleSet,
    examples: ExampleSet,
    address: AddressBar,
    debounce: Duration,
    source: String,
    php_version: PhpVersion,
    phase: Phase,
    latest_seq: u64,
    latest_request: Option<AnalysisTicket>,
    view: Option<AnalysisView>,
}

impl Session {
    pub fn new(rules: RuleSet, examples: ExampleSet, address: AddressBar, debounce: Duration) -> Self {
        Self {
            rules,
            examples,
            address,
            debounce,
            source: String::new(),
            php_version: PhpVersion::default(),
            phase: Phase::Idle,
            latest_seq: 0,
            latest_request: None,
            view: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn php_version(&self) -> PhpVersion {
        self.php_version
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn examples(&self) -> &ExampleSet {
        &self.examples
    }

    pub fn address(&self) -> &AddressBar {
        &self.address
    }

    pub fn share_url(&self) -> &Url {
        self.address.current()
    }

    pub fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    pub fn view(&self) -> Option<&AnalysisView> {
        self.view.as_ref()
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            source: self.source.clone(),
            diff: self.rules.compute_diff(),
            php_version: self.php_version,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match self.phase {
            Phase::Pending { due } => Some(due),
            Phase::Idle | Phase::Analyzing { .. } => None,
        }
    }

    /// Stores the text and (re)arms the debounce timer.
    pub fn edit(&mut self, text: impl Into<String>, now: Instant) {
        self.source = text.into();
        self.phase = Phase::Pending {
            due: now + self.debounce,
        };
    }

    pub fn poll_due(&mut self, now: Instant) -> Option<AnalysisTicket> {
        match self.phase {
            Phase::Pending { due } if now >= due => Some(self.start_request()),
            _ => None,
        }
    }

    pub fn analyze_now(&mut self) -> AnalysisTicket {
        self.start_request()
    }

    /// Replaces the whole session with one read from a URL and analyses it.
    pub fn load(&mut self, restored: RestoredSession) -> AnalysisTicket {
        let RestoredSession {
            state,
            origin,
            example,
        } = restored;

        match origin {
            SourceOrigin::Example(key) => tracing::info!(example = key, "loaded example"),
            SourceOrigin::Inline => {
                tracing::info!(bytes = state.source.len(), "loaded shared code")
            }
            SourceOrigin::Fallback => {
                tracing::info!(example = example.unwrap_or(""), "loaded default example")
            }
        }

        self.source = state.source;
        self.php_version = state.php_version;
        self.rules.apply_diff(&state.diff);
        self.start_request()
    }

    /// Unknown keys leave the session untouched.
    pub fn select_example(&mut self, key: &str) -> Option<AnalysisTicket> {
        let Some(example) = self.examples.get(key) else {
            tracing::debug!(key, "ignoring unknown example");
            return None;
        };

        self.source = example.content.to_owned();
        sandpit_share::navigate_to_example(&mut self.address, example.key);
        Some(self.start_request())
    }

    pub fn toggle_capability(&mut self, slug: &str) -> Option<AnalysisTicket> {
        if !self.rules.toggle_capability(slug) {
            tracing::debug!(slug, "ignoring toggle of unknown plugin");
            return None;
        }
        Some(self.start_request())
    }

    pub fn toggle_check(&mut self, capability_slug: &str, check_slug: &str) -> Option<AnalysisTicket> {
        if !self.rules.toggle_check(capability_slug, check_slug) {
            tracing::debug!(
                capability = capability_slug,
                check = check_slug,
                "ignoring toggle of unknown rule"
            );
            return None;
        }
        Some(self.start_request())
    }

    pub fn set_check_level(&mut self, check_slug: &str, level: Option<Level>) -> Option<AnalysisTicket> {
        if !self.rules.set_check_level(check_slug, level) {
            tracing::debug!(check = check_slug, "ignoring level of unknown rule");
            return None;
        }
        Some(self.start_request())
    }

    pub fn set_php_version(&mut self, php_version: PhpVersion) -> AnalysisTicket {
        self.php_version = php_version;
        self.start_request()
    }

    /// Hands an engine result back. Only the highest issued `seq` is applied.
    pub fn complete(
        &mut self,
        seq: u64,
        result: Result<AnalysisOutcome, EngineError>,
    ) -> Completion {
        let latest = self.latest_seq;
        let request = match self.latest_request.take() {
            Some(request) if request.seq == seq => request,
            other => {
                self.latest_request = other;
                tracing::debug!(seq, latest, "dropping stale analysis result");
                return Completion::Stale { seq, latest };
            }
        };

        let (diagnostics, formatted, engine_error) = match result {
            Ok(outcome) => {
                let diagnostics = DiagnosticBuckets::from_outcome(&outcome);
                let formatted = if diagnostics.has_parse_error() {
                    FormattedPane::Unavailable
                } else {
                    FormattedPane::Text(outcome.formatted.unwrap_or_default())
                };
                (diagnostics, formatted, None)
            }
            Err(err) => {
                tracing::warn!(seq, error = %err, "analysis failed");
                (
                    DiagnosticBuckets::default(),
                    FormattedPane::Unavailable,
                    Some(err.to_string()),
                )
            }
        };

        if self.phase == (Phase::Analyzing { seq }) {
            self.phase = Phase::Idle;
        }

        let state = self.state();
        if let Err(err) = sandpit_share::publish(&mut self.address, &state, &self.examples) {
            tracing::warn!(error = %err, "could not update share link, keeping the previous one");
        }

        self.view = Some(AnalysisView {
            seq,
            decorations: decorations_for(&request.source, diagnostics.iter()),
            php_version: request.settings.php_version,
            source: request.source,
            diagnostics,
            formatted,
            engine_error,
            share_url: self.address.current().to_string(),
        });

        Completion::Applied
    }

    fn start_request(&mut self) -> AnalysisTicket {
        self.latest_seq += 1;
        let seq = self.latest_seq;

        let ticket = AnalysisTicket {
            seq,
            source: self.source.clone(),
            settings: self.rules.build_engine_request(self.php_version),
        };
        self.phase = Phase::Analyzing { seq };
        self.latest_request = Some(ticket.clone());

        tracing::debug!(seq, bytes = ticket.source.len(), "analysis requested");
        ticket
    }
}

/// Picks the starting session for the host.
///
/// A share link is restored exactly as written, so a link without
/// `phpVersion` means the default version. Without a link the session starts
/// from `base` with the configured version and, when given, the file's text.
pub fn restore_startup(
    link: Option<&Url>,
    base: &Url,
    examples: &ExampleSet,
    configured_php: PhpVersion,
    file_source: Option<&str>,
) -> (Url, RestoredSession) {
    if let Some(link) = link {
        return (link.clone(), restore(link, examples));
    }

    let mut restored = restore(base, examples);
    restored.state.php_version = configured_php;
    if let Some(text) = file_source {
        restored.state.source = text.to_owned();
        restored.origin = SourceOrigin::Inline;
        restored.example = examples.find_by_content(text).map(|example| example.key);
    }
    (base.clone(), restored)
}
