use chrono::NaiveDate;
use futures::future::{Abortable, Aborted};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::events::{EventBus, EventKind, FormEvent};
use super::state::{FetchTicket, RateState};
use super::view::FormView;
use crate::core::rate::{format_amount, parse_amount};
use crate::core::{FetchError, Rate, RateProvider, RateQuery, RateSource};

struct Inner<V: FormView> {
    provider: Arc<dyn RateProvider>,
    view: Arc<V>,
    bus: EventBus,
    state: Mutex<RateState>,
}

/// Keeps a form's two amount fields in sync through the latest fetched rate.
pub struct RateSync<V: FormView> {
    inner: Arc<Inner<V>>,
}

impl<V: FormView> Clone for RateSync<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

// Re-enables the form when the fetch that owns it ends, however it ends.
// The view is toggled under the state lock so enable/disable calls follow
// the order in which tickets are issued and settled.
struct SettleGuard<'a, V: FormView> {
    inner: &'a Inner<V>,
    generation: u64,
}

impl<V: FormView> Drop for SettleGuard<'_, V> {
    fn drop(&mut self) {
        let mut state = self.inner.state();
        if state.settle(self.generation) {
            self.inner.view.set_controls_enabled(true);
        }
    }
}

impl<V: FormView> Inner<V> {
    fn state(&self) -> MutexGuard<'_, RateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn rate(&self) -> Rate {
        self.state().rate()
    }

    async fn run_fetch(&self, ticket: FetchTicket, query: RateQuery) {
        let generation = ticket.generation;
        let _guard = SettleGuard {
            inner: self,
            generation,
        };

        let outcome = match Abortable::new(self.provider.fetch_rate(&query), ticket.registration)
            .await
        {
            Ok(result) => result,
            Err(Aborted) => Err(FetchError::Cancelled),
        };

        match outcome {
            Ok(rate) => {
                if self.state().apply(generation, rate) {
                    info!(source = %query.source, date = ?query.date, %rate, "Rate updated");
                    self.bus.emit(&FormEvent::RateUpdated(rate));
                } else {
                    debug!(generation, "Discarding rate from superseded fetch");
                }
            }
            Err(FetchError::Cancelled) => {
                debug!(generation, "Rate fetch superseded");
            }
            Err(e) => {
                warn!(error = %e, source = %query.source, "Rate fetch failed");
            }
        }
    }

    fn on_usd_changed(&self, usd: Decimal) {
        if let Some(ved) = self.rate().usd_to_ved(usd) {
            self.view.set_ved_text(&format_amount(ved));
        }
    }

    fn on_bolivar_changed(&self, ved: Decimal) {
        let rate = self.rate();
        match rate.ved_to_usd(ved) {
            Some(usd) => self.view.set_usd_text(&format_amount(usd)),
            None if rate.is_zero() => debug!("No rate yet, leaving USD field unchanged"),
            None => debug!(%ved, "Bolívar amount out of range, leaving USD field unchanged"),
        }
    }

    fn on_rate_updated(&self) {
        let rate = self.rate();
        self.view.set_rate_text(&rate.display_text());
        if let Some(usd) = self.view.usd_value() {
            self.on_usd_changed(usd);
        }
    }
}

impl<V: FormView + 'static> RateSync<V> {
    pub fn new(provider: Arc<dyn RateProvider>, view: Arc<V>, bus: EventBus) -> Self {
        Self {
            inner: Arc::new(Inner {
                provider,
                view,
                bus,
                state: Mutex::new(RateState::new()),
            }),
        }
    }

    pub fn rate(&self) -> Rate {
        self.inner.rate()
    }

    pub fn is_fetching(&self) -> bool {
        self.inner.state().is_fetching()
    }

    pub fn view(&self) -> &Arc<V> {
        &self.inner.view
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    /// Fetches the rate for `source` and `date`, superseding any fetch still
    /// in flight. The returned handle resolves once this fetch has settled.
    pub fn trigger_fetch(&self, source: RateSource, date: Option<NaiveDate>) -> JoinHandle<()> {
        let query = RateQuery::new(source, date);
        let ticket = {
            let mut state = self.inner.state();
            let ticket = state.begin_fetch();
            self.inner.view.set_controls_enabled(false);
            ticket
        };
        debug!(generation = ticket.generation, ?query, "Starting rate fetch");

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.run_fetch(ticket, query).await })
    }

    /// Initial load with whatever the form currently shows.
    pub fn start(&self) -> JoinHandle<()> {
        let view = &self.inner.view;
        self.trigger_fetch(view.source(), view.date())
    }

    pub fn on_rate_updated(&self) {
        self.inner.on_rate_updated();
    }

    pub fn on_usd_changed(&self, usd: Decimal) {
        self.inner.on_usd_changed(usd);
    }

    pub fn on_bolivar_changed(&self, ved: Decimal) {
        self.inner.on_bolivar_changed(ved);
    }

    /// Subscribes the sync handlers to the bus this instance was built with.
    pub fn wire(&self) {
        self.subscribe(EventKind::UsdInput, |sync, event| {
            if let FormEvent::UsdInput(text) = event {
                match parse_amount(text) {
                    Some(usd) => sync.on_usd_changed(usd),
                    None => debug!(%text, "Ignoring non-numeric USD input"),
                }
            }
        });
        self.subscribe(EventKind::VedInput, |sync, event| {
            if let FormEvent::VedInput(text) = event {
                match parse_amount(text) {
                    Some(ved) => sync.on_bolivar_changed(ved),
                    None => debug!(%text, "Ignoring non-numeric bolívar input"),
                }
            }
        });
        self.subscribe(EventKind::DateChanged, |sync, event| {
            if let FormEvent::DateChanged(date) = event {
                sync.trigger_fetch(sync.view().source(), *date);
            }
        });
        self.subscribe(EventKind::SourceChanged, |sync, event| {
            if let FormEvent::SourceChanged(source) = event {
                sync.trigger_fetch(*source, sync.view().date());
            }
        });
        self.subscribe(EventKind::RateUpdated, |sync, _| sync.on_rate_updated());

        debug!("Rate sync handlers registered");
    }

    // Handlers hold a weak reference so the bus does not keep the sync alive.
    fn subscribe<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&RateSync<V>, &FormEvent) + Send + Sync + 'static,
    {
        let weak: Weak<Inner<V>> = Arc::downgrade(&self.inner);
        self.inner.bus.subscribe(kind, move |event| {
            if let Some(inner) = weak.upgrade() {
                handler(&RateSync { inner }, event);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::view::MemoryView;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    struct FixedProvider {
        body: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RateProvider for FixedProvider {
        async fn fetch_rate(&self, _query: &RateQuery) -> Result<Rate, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.body.parse()
        }
    }

    /// Answers with queued results, one per call.
    struct ScriptedProvider {
        responses: Mutex<VecDeque<Result<Rate, FetchError>>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<Result<Rate, FetchError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl RateProvider for ScriptedProvider {
        async fn fetch_rate(&self, _query: &RateQuery) -> Result<Rate, FetchError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(FetchError::NoRate))
        }
    }

    /// Undated queries block until released; dated ones answer at once.
    struct GatedProvider {
        gate: Notify,
    }

    #[async_trait]
    impl RateProvider for GatedProvider {
        async fn fetch_rate(&self, query: &RateQuery) -> Result<Rate, FetchError> {
            match query.date {
                None => {
                    self.gate.notified().await;
                    Ok(Rate::new(Decimal::from(1_000_000)))
                }
                Some(_) => Ok(Rate::new(Decimal::from(2_000_000))),
            }
        }
    }

    /// Stalls the first disable so another trigger can race it.
    struct StallingView {
        form: MemoryView,
        stalled: AtomicBool,
    }

    impl FormView for StallingView {
        fn set_controls_enabled(&self, enabled: bool) {
            if !enabled && !self.stalled.swap(true, Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(300));
            }
            self.form.set_controls_enabled(enabled);
        }

        fn set_rate_text(&self, text: &str) {
            self.form.set_rate_text(text);
        }

        fn usd_value(&self) -> Option<Decimal> {
            self.form.usd_value()
        }

        fn set_usd_text(&self, text: &str) {
            self.form.set_usd_text(text);
        }

        fn set_ved_text(&self, text: &str) {
            self.form.set_ved_text(text);
        }

        fn source(&self) -> RateSource {
            self.form.source()
        }

        fn date(&self) -> Option<NaiveDate> {
            self.form.date()
        }
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn sync_with(provider: Arc<dyn RateProvider>) -> RateSync<MemoryView> {
        let view = Arc::new(MemoryView::new(RateSource::Bcv, None));
        let sync = RateSync::new(provider, view, EventBus::new());
        sync.wire();
        sync
    }

    #[tokio::test]
    async fn test_fetch_updates_rate_and_display() {
        let provider = Arc::new(FixedProvider {
            body: "3050000",
            calls: AtomicUsize::new(0),
        });
        let sync = sync_with(provider.clone());

        sync.start().await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(sync.rate(), Rate::new(dec("3050000")));
        assert_eq!(sync.view().rate_text(), "Bs. 305.0000");
        assert!(sync.view().controls_enabled());
        assert!(!sync.is_fetching());

        sync.bus().emit(&FormEvent::UsdInput("100".into()));
        assert_eq!(sync.view().ved_text(), "30500.0000");

        sync.bus().emit(&FormEvent::VedInput("61000".into()));
        assert_eq!(sync.view().usd_text(), "200.0000");
    }

    #[tokio::test]
    async fn test_rate_update_recomputes_bolivar_field() {
        let provider = Arc::new(FixedProvider {
            body: "365000",
            calls: AtomicUsize::new(0),
        });
        let sync = sync_with(provider);
        sync.view().set_usd_text("10");

        sync.start().await.unwrap();

        // 10 * 365000 / 10000
        assert_eq!(sync.view().ved_text(), "365.0000");
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_rate_and_reenables_controls() {
        let sync = sync_with(Arc::new(ScriptedProvider::new(vec![
            Ok(Rate::new(dec("250000"))),
            Err(FetchError::Http { status: 503 }),
        ])));
        sync.start().await.unwrap();
        assert_eq!(sync.view().rate_text(), "Bs. 25.0000");

        sync.bus().emit(&FormEvent::SourceChanged(RateSource::Paralelo));
        assert!(!sync.view().controls_enabled());
        // Wait for the spawned fetch to settle
        while sync.is_fetching() {
            tokio::task::yield_now().await;
        }

        assert_eq!(sync.rate(), Rate::new(dec("250000")));
        assert_eq!(sync.view().rate_text(), "Bs. 25.0000");
        assert!(sync.view().controls_enabled());
    }

    #[tokio::test]
    async fn test_controls_disabled_while_fetching() {
        let provider = Arc::new(GatedProvider {
            gate: Notify::new(),
        });
        let sync = sync_with(provider.clone());

        let handle = sync.start();
        assert!(sync.is_fetching());
        assert!(!sync.view().controls_enabled());

        provider.gate.notify_one();
        handle.await.unwrap();
        assert!(sync.view().controls_enabled());
        assert_eq!(sync.rate(), Rate::new(dec("1000000")));
    }

    #[tokio::test]
    async fn test_second_fetch_supersedes_first() {
        let provider = Arc::new(GatedProvider {
            gate: Notify::new(),
        });
        let sync = sync_with(provider.clone());

        let first = sync.start();
        tokio::task::yield_now().await;
        let date = NaiveDate::from_ymd_opt(2024, 2, 1);
        sync.view().set_date(date);
        let second = sync.trigger_fetch(RateSource::Bcv, date);

        second.await.unwrap();
        provider.gate.notify_one();
        first.await.unwrap();

        assert_eq!(sync.rate(), Rate::new(dec("2000000")));
        assert_eq!(sync.view().rate_text(), "Bs. 200.0000");
        assert!(sync.view().controls_enabled());
        assert!(!sync.is_fetching());
    }

    #[tokio::test]
    async fn test_bolivar_input_before_any_rate_is_ignored() {
        let sync = sync_with(Arc::new(ScriptedProvider::new(vec![])));
        sync.view().set_usd_text("7");

        sync.bus().emit(&FormEvent::VedInput("100".into()));
        assert_eq!(sync.view().usd_text(), "7");

        sync.bus().emit(&FormEvent::UsdInput("abc".into()));
        assert_eq!(sync.view().ved_text(), "");
    }

    #[tokio::test]
    async fn test_bolivar_overflow_leaves_usd_field_unchanged() {
        let sync = sync_with(Arc::new(ScriptedProvider::new(vec![Ok(Rate::new(
            Decimal::ONE,
        ))])));
        sync.start().await.unwrap();
        sync.view().set_usd_text("7");

        sync.bus().emit(&FormEvent::VedInput(Decimal::MAX.to_string()));
        assert_eq!(sync.view().usd_text(), "7");

        sync.bus().emit(&FormEvent::VedInput("1".into()));
        assert_eq!(sync.view().usd_text(), "10000.0000");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_overlapping_triggers_leave_form_enabled() {
        let provider = Arc::new(FixedProvider {
            body: "3050000",
            calls: AtomicUsize::new(0),
        });
        let view = Arc::new(StallingView {
            form: MemoryView::new(RateSource::Bcv, None),
            stalled: AtomicBool::new(false),
        });
        let sync = RateSync::new(provider, Arc::clone(&view), EventBus::new());

        let racer = sync.clone();
        let first = tokio::spawn(async move { racer.trigger_fetch(RateSource::Bcv, None).await });
        // Give the first trigger time to reach its stalled disable
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = sync.trigger_fetch(RateSource::Paralelo, None);

        second.await.unwrap();
        first.await.unwrap().unwrap();

        assert!(!sync.is_fetching());
        assert!(view.form.controls_enabled());
        assert_eq!(sync.rate(), Rate::new(dec("3050000")));
    }
}
