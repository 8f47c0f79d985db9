use std::sync::Arc;
use std::time::Duration;

use sandpit_core::{AnalysisOutcome, Level, PhpVersion};
use sandpit_engine::{AnalysisEngine, EngineError};
use sandpit_share::RestoredSession;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::session::{AnalysisTicket, AnalysisView, Completion, Session};

/// User actions fed into a running session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Load(RestoredSession),
    Edit(String),
    AnalyzeNow,
    ToggleCapability(String),
    ToggleCheck { capability: String, check: String },
    SetCheckLevel { check: String, level: Option<Level> },
    SetPhpVersion(PhpVersion),
    SelectExample(String),
}

type EngineResult = (u64, Result<AnalysisOutcome, EngineError>);

// Far enough out that the timer branch never fires while it is disabled.
const IDLE_WAKE: Duration = Duration::from_secs(3600);

pub fn apply_event(
    session: &mut Session,
    event: SessionEvent,
    now: std::time::Instant,
) -> Option<AnalysisTicket> {
    match event {
        SessionEvent::Load(restored) => Some(session.load(restored)),
        SessionEvent::Edit(text) => {
            session.edit(text, now);
            None
        }
        SessionEvent::AnalyzeNow => Some(session.analyze_now()),
        SessionEvent::ToggleCapability(slug) => session.toggle_capability(&slug),
        SessionEvent::ToggleCheck { capability, check } => session.toggle_check(&capability, &check),
        SessionEvent::SetCheckLevel { check, level } => session.set_check_level(&check, level),
        SessionEvent::SetPhpVersion(php_version) => Some(session.set_php_version(php_version)),
        SessionEvent::SelectExample(key) => session.select_example(&key),
    }
}

/// Drives `session` until `events` is closed and nothing is left to do.
///
/// The session is owned by this task alone. Engine calls run on spawned
/// tasks and may overlap; their results come back tagged with the sequence
/// number they were issued under. Every applied view is sent to `sink`.
pub async fn run_session(
    mut session: Session,
    engine: Arc<dyn AnalysisEngine>,
    mut events: mpsc::Receiver<SessionEvent>,
    sink: mpsc::Sender<AnalysisView>,
) -> Session {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<EngineResult>();
    let mut in_flight = 0usize;
    let mut events_open = true;

    tracing::info!("session started");

    loop {
        let deadline = session.next_deadline();
        if !events_open && in_flight == 0 && deadline.is_none() {
            break;
        }

        let wake = deadline
            .map(Instant::from_std)
            .unwrap_or_else(|| Instant::now() + IDLE_WAKE);

        let ticket = tokio::select! {
            event = events.recv(), if events_open => match event {
                Some(event) => apply_event(&mut session, event, Instant::now().into_std()),
                None => {
                    events_open = false;
                    None
                }
            },
            Some((seq, result)) = done_rx.recv(), if in_flight > 0 => {
                in_flight -= 1;
                if session.complete(seq, result) == Completion::Applied
                    && let Some(view) = session.view()
                    && sink.send(view.clone()).await.is_err()
                {
                    tracing::debug!(seq, "view sink closed");
                }
                None
            }
            _ = tokio::time::sleep_until(wake), if deadline.is_some() => {
                session.poll_due(Instant::now().into_std())
            }
        };

        if let Some(ticket) = ticket {
            in_flight += 1;
            spawn_analysis(Arc::clone(&engine), ticket, done_tx.clone());
        }
    }

    tracing::info!(requests = session.latest_seq(), "session finished");
    session
}

fn spawn_analysis(
    engine: Arc<dyn AnalysisEngine>,
    ticket: AnalysisTicket,
    done: mpsc::UnboundedSender<EngineResult>,
) {
    tokio::spawn(async move {
        let result = engine
            .analyze(&ticket.source, None, &ticket.settings)
            .await;
        let _ = done.send((ticket.seq, result));
    });
}
