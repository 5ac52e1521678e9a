//! Single-owner event loop around [`AppState`].
//!
//! All state changes happen on the task that owns the `Session`. Fetches run
//! as spawned tasks and report back through a channel; their results are fed
//! through the reducer one at a time, in arrival order.

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::{
    error::FetchError,
    location::{LocationProvider, LocationRequest, Resolution, resolve_location},
    model::Coordinate,
    provider::WeatherProvider,
    state::{AppState, Command, Event},
};

pub struct Session {
    state: AppState,
    provider: Arc<dyn WeatherProvider>,
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
    in_flight: usize,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("provider", &self.provider)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

impl Session {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state: AppState::new(),
            provider,
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Resolve the position (falling back if needed) and kick off the first
    /// refresh.
    pub async fn start(
        &mut self,
        locator: &dyn LocationProvider,
        request: &LocationRequest,
        fallback: Coordinate,
    ) -> Resolution {
        let resolution = resolve_location(locator, request, fallback).await;
        self.dispatch(Event::LocationResolved {
            coordinate: resolution.coordinate,
            notice: resolution.notice.clone(),
        });
        resolution
    }

    pub fn dispatch(&mut self, event: Event) {
        let (state, command) = std::mem::take(&mut self.state).reduce(event);
        self.state = state;
        if let Some(command) = command {
            self.execute(command);
        }
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::Fetch {
                coordinate,
                generation,
            } => {
                tracing::info!(%coordinate, generation, "refreshing weather");

                let provider = Arc::clone(&self.provider);
                self.spawn_fetch(
                    "weather",
                    async move { provider.current(&coordinate).await },
                    move |result| Event::WeatherFetched { generation, result },
                );

                let provider = Arc::clone(&self.provider);
                self.spawn_fetch(
                    "forecast",
                    async move { provider.forecast(&coordinate).await },
                    move |result| Event::ForecastFetched { generation, result },
                );
            }
        }
    }

    /// Run `fetch` on its own task and post its result. A panic inside the
    /// fetch still posts a [`FetchError::Aborted`] result, so every spawned
    /// fetch reports back exactly once.
    fn spawn_fetch<T, F, E>(&mut self, endpoint: &'static str, fetch: F, into_event: E)
    where
        T: Send + 'static,
        F: Future<Output = Result<T, FetchError>> + Send + 'static,
        E: FnOnce(Result<T, FetchError>) -> Event + Send + 'static,
    {
        let tx = self.tx.clone();
        let task = tokio::spawn(fetch);
        tokio::spawn(async move {
            let result = match task.await {
                Ok(result) => result,
                Err(err) => {
                    tracing::error!(endpoint, error = %err, "fetch task died");
                    Err(FetchError::Aborted {
                        endpoint,
                        reason: err.to_string(),
                    })
                }
            };
            let _ = tx.send(into_event(result));
        });
        self.in_flight += 1;
    }

    /// Wait for one fetch result and apply it. Returns `false` when nothing
    /// is outstanding.
    pub async fn next_event(&mut self) -> bool {
        if self.in_flight == 0 {
            return false;
        }
        match self.rx.recv().await {
            Some(event) => {
                self.in_flight -= 1;
                self.dispatch(event);
                true
            }
            None => false,
        }
    }

    /// Drive the loop until every issued fetch has reported back.
    pub async fn settle(&mut self) -> &AppState {
        while self.next_event().await {}
        &self.state
    }

    /// User tapped the forecast tile at `index` of the list shown for
    /// `generation`.
    pub fn select(&mut self, generation: u64, index: usize) {
        self.dispatch(Event::EntrySelected { generation, index });
    }

    pub fn retry(&mut self) {
        self.dispatch(Event::RetryRequested);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        location::{FixedLocation, Unavailable},
        model::{Condition, CurrentWeather, Forecast, WeatherObservation},
        state::{FetchFailureKind, Phase},
        theme::PresentationTheme,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn obs(timestamp: i64, main: &str) -> WeatherObservation {
        WeatherObservation {
            timestamp,
            condition: Some(Condition {
                main: main.to_string(),
                description: main.to_lowercase(),
                icon: "01d".to_string(),
            }),
            temp: 68.0,
            temp_min: 66.0,
            temp_max: 70.0,
            feels_like: 67.0,
            humidity: 55,
            pressure: 1011,
            wind_speed: 6.0,
            sunset: Some(1_000),
        }
    }

    /// Fails the forecast until `fail_forecasts` calls have been made.
    #[derive(Debug, Default)]
    struct StubProvider {
        fail_forecasts: usize,
        forecast_calls: AtomicUsize,
        current_delay: Duration,
    }

    #[async_trait]
    impl WeatherProvider for StubProvider {
        async fn current(&self, _coordinate: &Coordinate) -> Result<CurrentWeather, FetchError> {
            tokio::time::sleep(self.current_delay).await;
            Ok(CurrentWeather {
                location_name: "Stubville".to_string(),
                observation: obs(10, "Clear"),
            })
        }

        async fn forecast(&self, coordinate: &Coordinate) -> Result<Forecast, FetchError> {
            let call = self.forecast_calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_forecasts {
                return Err(FetchError::Api {
                    endpoint: "forecast",
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            Ok(Forecast {
                location_name: format!("Stubville @ {coordinate}"),
                entries: vec![obs(100, "Drizzle"), obs(2_000, "Clear")],
            })
        }
    }

    #[tokio::test]
    async fn start_settles_into_ready_with_soonest_selected() {
        let mut session = Session::new(Arc::new(StubProvider::default()));
        let resolution = session
            .start(
                &FixedLocation(Coordinate::new(10.0, 20.0)),
                &LocationRequest::default(),
                Coordinate::FALLBACK,
            )
            .await;
        assert!(resolution.notice.is_none());

        let state = session.settle().await;
        assert_eq!(state.phase(), &Phase::Ready);
        assert_eq!(
            state.current().map(|c| c.location_name.as_str()),
            Some("Stubville")
        );
        assert_eq!(state.selected_forecast().map(|o| o.timestamp), Some(100));
        assert_eq!(state.theme(), Ok(Some(PresentationTheme::RAINY)));
    }

    #[tokio::test(start_paused = true)]
    async fn forecast_alone_is_enough_for_ready() {
        let provider = StubProvider {
            current_delay: Duration::from_secs(30),
            ..StubProvider::default()
        };
        let mut session = Session::new(Arc::new(provider));
        session
            .start(
                &FixedLocation(Coordinate::FALLBACK),
                &LocationRequest::default(),
                Coordinate::FALLBACK,
            )
            .await;

        assert!(session.next_event().await);
        assert_eq!(session.state().phase(), &Phase::Ready);
        assert!(session.state().current().is_none());

        session.settle().await;
        assert!(session.state().current().is_some());
    }

    #[tokio::test]
    async fn selecting_an_entry_changes_theme() {
        let mut session = Session::new(Arc::new(StubProvider::default()));
        session
            .start(
                &FixedLocation(Coordinate::FALLBACK),
                &LocationRequest::default(),
                Coordinate::FALLBACK,
            )
            .await;
        session.settle().await;

        let generation = session.state().generation();
        session.select(generation, 1);

        assert_eq!(
            session.state().selected_forecast().map(|o| o.timestamp),
            Some(2_000)
        );
        assert_eq!(session.state().theme(), Ok(Some(PresentationTheme::NIGHT)));
    }

    #[tokio::test]
    async fn unavailable_location_uses_fallback_coordinate() {
        let mut session = Session::new(Arc::new(StubProvider::default()));
        let resolution = session
            .start(&Unavailable, &LocationRequest::default(), Coordinate::FALLBACK)
            .await;

        assert!(resolution.notice.is_some());
        assert_eq!(session.state().coordinate(), Some(Coordinate::FALLBACK));
        assert!(session.state().notice().is_some());

        let state = session.settle().await;
        assert_eq!(
            state.forecast().map(|f| f.location_name.as_str()),
            Some("Stubville @ 40.7128, -74.0060")
        );
    }

    #[tokio::test]
    async fn failure_then_retry_recovers() {
        let provider = StubProvider {
            fail_forecasts: 1,
            ..StubProvider::default()
        };
        let mut session = Session::new(Arc::new(provider));
        session
            .start(
                &FixedLocation(Coordinate::FALLBACK),
                &LocationRequest::default(),
                Coordinate::FALLBACK,
            )
            .await;

        let state = session.settle().await;
        assert!(state.failure().is_some());

        session.retry();
        assert!(session.state().is_fetching());

        let state = session.settle().await;
        assert_eq!(state.phase(), &Phase::Ready);
        assert_eq!(state.forecast_entries().len(), 2);
    }

    /// Panics inside whichever fetch is named.
    #[derive(Debug)]
    struct PanickingProvider {
        endpoint: &'static str,
    }

    #[async_trait]
    impl WeatherProvider for PanickingProvider {
        async fn current(&self, coordinate: &Coordinate) -> Result<CurrentWeather, FetchError> {
            if self.endpoint == "weather" {
                panic!("current conditions exploded");
            }
            StubProvider::default().current(coordinate).await
        }

        async fn forecast(&self, coordinate: &Coordinate) -> Result<Forecast, FetchError> {
            if self.endpoint == "forecast" {
                panic!("forecast exploded");
            }
            StubProvider::default().forecast(coordinate).await
        }
    }

    async fn settled_with_panic(endpoint: &'static str) -> Session {
        let mut session = Session::new(Arc::new(PanickingProvider { endpoint }));
        session
            .start(
                &FixedLocation(Coordinate::FALLBACK),
                &LocationRequest::default(),
                Coordinate::FALLBACK,
            )
            .await;
        let settled = tokio::time::timeout(Duration::from_secs(5), session.settle()).await;
        assert!(settled.is_ok(), "settle hung after a panicking fetch");
        session
    }

    #[tokio::test]
    async fn panicking_forecast_fetch_still_settles_into_failed() {
        let session = settled_with_panic("forecast").await;
        let state = session.state();

        let failure = state.failure().expect("failed phase");
        assert_eq!(failure.kind, FetchFailureKind::Aborted);
        assert!(state.current().is_some());
        assert!(state.can_retry());
    }

    #[tokio::test]
    async fn panicking_current_fetch_leaves_forecast_usable() {
        let session = settled_with_panic("weather").await;
        let state = session.state();

        assert_eq!(state.phase(), &Phase::Ready);
        assert_eq!(state.forecast_entries().len(), 2);
        assert_eq!(
            state.current_failure().map(|f| f.kind),
            Some(FetchFailureKind::Aborted)
        );
    }

    #[tokio::test]
    async fn settle_without_fetches_returns_immediately() {
        let mut session = Session::new(Arc::new(StubProvider::default()));
        assert!(!session.next_event().await);
        assert_eq!(session.settle().await.phase(), &Phase::AwaitingLocation);
    }
}
