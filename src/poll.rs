//! The poll loop.
//!
//! Runs on the main thread: every cycle fetches each source in turn, relays
//! candidates that have not been seen before, then sleeps. Nothing here runs
//! concurrently; the interval between cycles is minutes while a fetch takes
//! seconds.
//!
//! ## Failure boundaries
//!
//! * A source that fails is logged and recorded in the [`CycleReport`] as a
//!   [`SourceFailure`]; it contributes zero items and the next source runs.
//! * A delivery that fails is logged and dropped. The item stays recorded
//!   as seen, so it is not retried.
//! * Anything that still escapes a cycle (a panic) is caught by [`Poller::run`],
//!   followed by a shorter recovery sleep before the next attempt.

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::dedup::DedupStore;
use crate::error::RelayError;
use crate::filter::KeywordFilter;
use crate::format::format_alert;
use crate::notify::{deliver, Notifier};
use crate::signal::StopSignal;
use crate::source::{DataSource, SourceKind};

/// Sleep between cycles when several source families are polled.
pub const MULTI_SOURCE_INTERVAL: Duration = Duration::from_secs(600);

/// Sleep between cycles when only the forum boards are polled.
pub const SINGLE_SOURCE_INTERVAL: Duration = Duration::from_secs(300);

/// Sleep after a cycle died unexpectedly.
pub const RECOVERY_INTERVAL: Duration = Duration::from_secs(60);

/// Pause between two deliveries, to stay under the bot API's rate limits.
pub const SEND_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy)]
pub struct Timing {
    pub interval: Duration,
    pub recovery: Duration,
    pub send_delay: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            interval: MULTI_SOURCE_INTERVAL,
            recovery: RECOVERY_INTERVAL,
            send_delay: SEND_DELAY,
        }
    }
}

/// A source that yielded nothing this cycle because its fetch failed.
#[derive(Debug)]
pub struct SourceFailure {
    pub source: String,
    pub kind: SourceKind,
    pub error: RelayError,
}

/// What one cycle did.
#[derive(Debug, Default)]
pub struct CycleReport {
    /// New (previously unseen) candidates, per kind: feed, forum, external.
    pub new_items: [usize; 3],
    pub delivered: usize,
    pub undelivered: usize,
    pub failures: Vec<SourceFailure>,
    /// The cycle was cut short by a stop request.
    pub stopped: bool,
}

impl CycleReport {
    pub fn new_of(&self, kind: SourceKind) -> usize {
        self.new_items[slot(kind)]
    }
}

fn slot(kind: SourceKind) -> usize {
    match kind {
        SourceKind::Feed => 0,
        SourceKind::Forum => 1,
        SourceKind::External => 2,
    }
}

/// Whether [`Poller::run`] keeps cycling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Forever,
    Once,
}

/// Owns all loop state: the sources, the keyword filter, the dedup store
/// and the notifier.
pub struct Poller {
    sources: Vec<Box<dyn DataSource>>,
    keywords: KeywordFilter,
    seen: DedupStore,
    notifier: Box<dyn Notifier>,
    timing: Timing,
}

impl Poller {
    pub fn new(
        sources: Vec<Box<dyn DataSource>>,
        keywords: KeywordFilter,
        notifier: Box<dyn Notifier>,
        timing: Timing,
    ) -> Self {
        Self {
            sources,
            keywords,
            seen: DedupStore::new(),
            notifier,
            timing,
        }
    }

    pub fn seen(&self) -> &DedupStore {
        &self.seen
    }

    /// One pass of fetch → dedup → format → notify over every source.
    pub fn run_cycle(&mut self, stop: &StopSignal) -> CycleReport {
        let mut report = CycleReport::default();

        for source in &self.sources {
            let kind = source.kind();
            info!("checking {kind} source {}", source.name());

            let items = match source.fetch(&self.keywords) {
                Ok(items) => items,
                Err(error) => {
                    warn!("{kind} source {} failed: {error}", source.name());
                    report.failures.push(SourceFailure {
                        source: source.name().to_string(),
                        kind,
                        error,
                    });
                    continue;
                }
            };

            for item in items {
                if !self.seen.record(kind, &item.id) {
                    continue;
                }
                report.new_items[slot(kind)] += 1;

                let message = format_alert(&item);
                if deliver(self.notifier.as_ref(), &message) {
                    info!("sent {kind} alert: {}", item.title);
                    report.delivered += 1;
                } else {
                    warn!("dropped {kind} alert: {}", item.title);
                    report.undelivered += 1;
                }

                if stop.wait(self.timing.send_delay) {
                    report.stopped = true;
                    return report;
                }
            }

            if stop.requested() {
                report.stopped = true;
                return report;
            }
        }

        report
    }

    /// Cycle until stopped (or once, for [`RunMode::Once`]).
    ///
    /// Returns `false` if the last cycle died instead of completing.
    pub fn run(&mut self, stop: &StopSignal, mode: RunMode) -> bool {
        info!(
            "starting monitoring of {} sources for {} keywords",
            self.sources.len(),
            self.keywords.terms().len()
        );

        let mut completed;
        loop {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_cycle(stop)));

            let pause = match outcome {
                Ok(report) => {
                    info!(
                        "cycle complete: {} news items, {} forum posts, {} external posts; \
                         {} delivered, {} undelivered, {} sources failed",
                        report.new_of(SourceKind::Feed),
                        report.new_of(SourceKind::Forum),
                        report.new_of(SourceKind::External),
                        report.delivered,
                        report.undelivered,
                        report.failures.len(),
                    );
                    for failure in &report.failures {
                        debug!("  {} {}: {}", failure.kind, failure.source, failure.error);
                    }
                    debug!(
                        "remembered ids: {} news, {} forum, {} external",
                        self.seen.len(SourceKind::Feed),
                        self.seen.len(SourceKind::Forum),
                        self.seen.len(SourceKind::External),
                    );
                    completed = true;
                    if report.stopped {
                        break;
                    }
                    self.timing.interval
                }
                Err(cause) => {
                    error!("error in poll cycle: {}", panic_message(&*cause));
                    completed = false;
                    self.timing.recovery
                }
            };

            if mode == RunMode::Once {
                break;
            }
            info!("waiting {}s before next check", pause.as_secs());
            if stop.wait(pause) {
                break;
            }
        }

        info!("monitoring stopped");
        completed
    }
}

fn panic_message(cause: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = cause.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = cause.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::source::{Candidate, ItemMeta};
    use std::sync::{Arc, Mutex};

    enum Behaviour {
        Items(Vec<Candidate>),
        Fail,
        Panic,
    }

    struct FakeSource {
        name: String,
        kind: SourceKind,
        behaviour: Behaviour,
    }

    impl FakeSource {
        fn boxed(name: &str, kind: SourceKind, behaviour: Behaviour) -> Box<dyn DataSource> {
            Box::new(Self {
                name: name.to_string(),
                kind,
                behaviour,
            })
        }
    }

    impl DataSource for FakeSource {
        fn name(&self) -> &str {
            &self.name
        }

        fn kind(&self) -> SourceKind {
            self.kind
        }

        fn fetch(&self, _keywords: &KeywordFilter) -> Result<Vec<Candidate>> {
            match &self.behaviour {
                Behaviour::Items(items) => Ok(items.clone()),
                Behaviour::Fail => Err(RelayError::Status {
                    status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                    body: String::new(),
                }),
                Behaviour::Panic => panic!("source blew up"),
            }
        }
    }

    /// Records every attempted message; optionally reports failure.
    #[derive(Clone, Default)]
    struct RecordingNotifier {
        sent: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl RecordingNotifier {
        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn send(&self, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push(text.to_string());
            if self.fail {
                Err(RelayError::Status {
                    status: reqwest::StatusCode::TOO_MANY_REQUESTS,
                    body: "slow down".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn no_wait() -> Timing {
        Timing {
            interval: Duration::ZERO,
            recovery: Duration::ZERO,
            send_delay: Duration::ZERO,
        }
    }

    fn news(id: &str, title: &str) -> Candidate {
        Candidate {
            id: id.to_string(),
            title: title.to_string(),
            body: "details".to_string(),
            link: format!("https://example.com/{id}"),
            meta: ItemMeta::Feed {
                feed_title: "News".into(),
                published: None,
            },
        }
    }

    fn poller(sources: Vec<Box<dyn DataSource>>, notifier: &RecordingNotifier) -> Poller {
        Poller::new(
            sources,
            KeywordFilter::new(&["mobile mining"]),
            Box::new(notifier.clone()),
            no_wait(),
        )
    }

    #[test]
    fn new_item_is_sent_once_across_cycles() {
        let notifier = RecordingNotifier::default();
        let item = news("https://example.com/depin", "New DePIN mobile mining app launches");
        let mut poller = poller(
            vec![FakeSource::boxed("feed", SourceKind::Feed, Behaviour::Items(vec![item]))],
            &notifier,
        );
        let (_tx, stop) = StopSignal::channel();

        let first = poller.run_cycle(&stop);
        let second = poller.run_cycle(&stop);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Crypto News Alert"));
        assert!(sent[0].contains("New DePIN mobile mining app launches"));
        assert_eq!(first.delivered, 1);
        assert_eq!(first.new_of(SourceKind::Feed), 1);
        assert_eq!(second.delivered, 0);
        assert!(poller.seen().has(SourceKind::Feed, "https://example.com/depin"));
    }

    #[test]
    fn each_unseen_item_gets_one_attempt() {
        let notifier = RecordingNotifier::default();
        let items = vec![news("a", "A"), news("b", "B"), news("a", "A again")];
        let mut poller = poller(
            vec![FakeSource::boxed("feed", SourceKind::Feed, Behaviour::Items(items))],
            &notifier,
        );
        let (_tx, stop) = StopSignal::channel();

        let report = poller.run_cycle(&stop);

        assert_eq!(report.new_of(SourceKind::Feed), 2);
        assert_eq!(notifier.sent().len(), 2);
    }

    #[test]
    fn repeated_id_within_one_source_counts_once() {
        let notifier = RecordingNotifier::default();
        let mut poller = poller(
            vec![FakeSource::boxed(
                "feed",
                SourceKind::Feed,
                Behaviour::Items(vec![news("dup", "first"), news("dup", "second")]),
            )],
            &notifier,
        );
        let (_tx, stop) = StopSignal::channel();

        let report = poller.run_cycle(&stop);

        assert_eq!(report.new_of(SourceKind::Feed), 1);
        assert_eq!(poller.seen().len(SourceKind::Feed), 1);
        assert_eq!(notifier.sent().len(), 1);
        assert!(notifier.sent()[0].contains("first"));
    }

    #[test]
    fn failing_source_does_not_block_siblings() {
        let notifier = RecordingNotifier::default();
        let mut poller = poller(
            vec![
                FakeSource::boxed("defi", SourceKind::Forum, Behaviour::Fail),
                FakeSource::boxed(
                    "feed",
                    SourceKind::Feed,
                    Behaviour::Items(vec![news("x", "mobile mining")]),
                ),
            ],
            &notifier,
        );
        let (_tx, stop) = StopSignal::channel();

        let report = poller.run_cycle(&stop);

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].source, "defi");
        assert_eq!(report.failures[0].kind, SourceKind::Forum);
        assert!(matches!(report.failures[0].error, RelayError::Status { .. }));
        assert_eq!(report.new_of(SourceKind::Forum), 0);
        assert_eq!(report.delivered, 1);
    }

    #[test]
    fn failed_delivery_is_not_retried() {
        let notifier = RecordingNotifier {
            fail: true,
            ..Default::default()
        };
        let mut poller = poller(
            vec![FakeSource::boxed(
                "feed",
                SourceKind::Feed,
                Behaviour::Items(vec![news("x", "t")]),
            )],
            &notifier,
        );
        let (_tx, stop) = StopSignal::channel();

        let first = poller.run_cycle(&stop);
        poller.run_cycle(&stop);

        assert_eq!(first.undelivered, 1);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[test]
    fn dedup_is_per_kind() {
        let notifier = RecordingNotifier::default();
        let forum_item = Candidate {
            meta: ItemMeta::Forum {
                forum: "defi".into(),
                score: 9,
                created: None,
            },
            ..news("same", "t")
        };
        let mut poller = poller(
            vec![
                FakeSource::boxed("feed", SourceKind::Feed, Behaviour::Items(vec![news("same", "t")])),
                FakeSource::boxed("defi", SourceKind::Forum, Behaviour::Items(vec![forum_item])),
            ],
            &notifier,
        );
        let (_tx, stop) = StopSignal::channel();

        poller.run_cycle(&stop);
        assert_eq!(notifier.sent().len(), 2);
    }

    #[test]
    fn stop_request_interrupts_deliveries() {
        let notifier = RecordingNotifier::default();
        let mut poller = poller(
            vec![FakeSource::boxed(
                "feed",
                SourceKind::Feed,
                Behaviour::Items(vec![news("1", "a"), news("2", "b")]),
            )],
            &notifier,
        );
        let (tx, stop) = StopSignal::channel();
        tx.send(()).unwrap();

        let report = poller.run_cycle(&stop);

        assert!(report.stopped);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[test]
    fn run_once_survives_a_panicking_source() {
        let notifier = RecordingNotifier::default();
        let mut poller = poller(
            vec![FakeSource::boxed("boom", SourceKind::External, Behaviour::Panic)],
            &notifier,
        );
        let (_tx, stop) = StopSignal::channel();

        assert!(!poller.run(&stop, RunMode::Once));
        assert!(notifier.sent().is_empty());
    }

    #[test]
    fn run_forever_exits_on_stop() {
        let notifier = RecordingNotifier::default();
        let mut poller = poller(
            vec![FakeSource::boxed(
                "feed",
                SourceKind::Feed,
                Behaviour::Items(vec![news("1", "a")]),
            )],
            &notifier,
        );
        let (tx, stop) = StopSignal::channel();
        tx.send(()).unwrap();

        assert!(poller.run(&stop, RunMode::Forever));
        assert_eq!(notifier.sent().len(), 1);
    }
}
