//! Trip session: route selection, waypoint forecasts and periodic refresh
//!
//! A [`TripSession`] is a cheap handle; clones share the same trip. State is
//! kept behind a mutex that is never held across an `.await`. Every
//! transition that starts or invalidates a forecast fan-out bumps a
//! generation counter, and a fan-out only writes its results back when the
//! generation it started under is still current.

use crate::aggregator::aggregate;
use crate::config::TripConfig;
use crate::error::ErrorKind;
use crate::forecast::PointForecast;
use crate::geocoding::{LocationInput, PlaceSearch};
use crate::location_resolver::PlaceResolver;
use crate::models::{
    Coordinate, Place, RouteOption, TripSummary, Waypoint, WaypointForecast, WeatherSnapshot,
};
use crate::routing::RouteClient;
use crate::sampler::WaypointSampler;
use crate::weather::WeatherProvider;
use crate::{Result, RoadcastError};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

/// External collaborators used by a session
#[derive(Clone)]
pub struct Services {
    pub routes: Arc<dyn RouteClient>,
    pub weather: Arc<dyn WeatherProvider>,
    pub places: Arc<dyn PlaceResolver>,
    pub search: Arc<dyn PlaceSearch>,
}

/// Tunables for a session
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub sampler: WaypointSampler,
    /// Period of the auto-refresh timer
    pub refresh_interval: Duration,
    /// Delay between consecutive place lookups in one batch
    pub geocode_stagger: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            sampler: WaypointSampler::default(),
            refresh_interval: Duration::from_secs(300),
            geocode_stagger: Duration::from_millis(1100),
        }
    }
}

impl SessionSettings {
    pub fn from_config(trip: &TripConfig) -> Result<Self> {
        Ok(Self {
            sampler: WaypointSampler::new(trip.interval_miles, trip.speed_correction_factor)?,
            refresh_interval: trip.refresh_interval(),
            geocode_stagger: trip.geocode_stagger(),
        })
    }
}

/// Where the trip is in its lifecycle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TripState {
    Idle,
    RouteLoading,
    RouteReady,
    WeatherLoading,
    WeatherReady,
    Error { kind: ErrorKind, message: String },
}

impl TripState {
    fn error(err: &RoadcastError) -> Self {
        Self::Error {
            kind: err.kind(),
            message: err.user_message(),
        }
    }
}

/// Owned copy of the session state for presentation
#[derive(Debug, Clone, Serialize)]
pub struct TripSnapshot {
    pub state: TripState,
    pub origin: Option<Coordinate>,
    pub destination: Option<Place>,
    pub departure: DateTime<Utc>,
    pub routes: Vec<RouteOption>,
    pub selected_route: Option<usize>,
    pub forecasts: Vec<WaypointForecast>,
    pub summary: Option<TripSummary>,
    pub auto_refresh: bool,
    pub last_updated: Option<DateTime<Utc>>,
}

struct TripData {
    state: TripState,
    origin: Option<Coordinate>,
    destination: Option<Place>,
    departure: DateTime<Utc>,
    routes: Vec<RouteOption>,
    selected: Option<usize>,
    forecasts: Vec<WaypointForecast>,
    summary: Option<TripSummary>,
    auto_refresh: bool,
    last_updated: Option<DateTime<Utc>>,
    generation: u64,
}

impl TripData {
    fn new(departure: DateTime<Utc>) -> Self {
        Self {
            state: TripState::Idle,
            origin: None,
            destination: None,
            departure,
            routes: Vec::new(),
            selected: None,
            forecasts: Vec::new(),
            summary: None,
            auto_refresh: false,
            last_updated: None,
            generation: 0,
        }
    }

    /// Drop route, waypoints and summary, invalidating any fan-out in flight
    fn reset_route(&mut self) {
        self.generation += 1;
        self.routes.clear();
        self.selected = None;
        self.forecasts.clear();
        self.summary = None;
        self.last_updated = None;
    }

    /// Enter `WeatherLoading` for the selected route.
    ///
    /// With `reuse_names` the current weather stays visible and known place
    /// names are carried over; otherwise the forecasts are reset to pending.
    fn begin_fetch(&mut self, reuse_names: bool) -> Option<FetchPlan> {
        let waypoints = self.routes.get(self.selected?)?.waypoints.clone();
        self.generation += 1;

        let names = if reuse_names {
            Some(
                self.forecasts
                    .iter()
                    .map(|forecast| forecast.location_name.clone())
                    .collect(),
            )
        } else {
            self.forecasts = waypoints.iter().cloned().map(WaypointForecast::pending).collect();
            self.summary = None;
            None
        };

        self.state = TripState::WeatherLoading;
        Some(FetchPlan {
            generation: self.generation,
            waypoints,
            names,
        })
    }
}

struct FetchPlan {
    generation: u64,
    waypoints: Vec<Waypoint>,
    /// Place names to reuse, by waypoint index
    names: Option<Vec<String>>,
}

struct Shared {
    services: Services,
    settings: SessionSettings,
    data: Mutex<TripData>,
    refresh_timer: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(handle) = self.refresh_timer.get_mut().take() {
            handle.abort();
        }
    }
}

/// Stateful trip workflow shared between its clones
#[derive(Clone)]
pub struct TripSession {
    shared: Arc<Shared>,
}

impl TripSession {
    #[must_use]
    pub fn new(services: Services, settings: SessionSettings) -> Self {
        Self {
            shared: Arc::new(Shared {
                services,
                settings,
                data: Mutex::new(TripData::new(Utc::now())),
                refresh_timer: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> TripState {
        self.shared.data.lock().state.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> TripSnapshot {
        let data = self.shared.data.lock();
        TripSnapshot {
            state: data.state.clone(),
            origin: data.origin,
            destination: data.destination.clone(),
            departure: data.departure,
            routes: data.routes.clone(),
            selected_route: data.selected,
            forecasts: data.forecasts.clone(),
            summary: data.summary.clone(),
            auto_refresh: data.auto_refresh,
            last_updated: data.last_updated,
        }
    }

    pub fn set_origin(&self, origin: Coordinate) {
        self.shared.data.lock().origin = Some(origin);
    }

    /// Choose a destination. Any route for a previous destination is dropped
    /// and the session returns to `Idle`.
    pub fn set_destination(&self, destination: Place) {
        {
            let mut data = self.shared.data.lock();
            info!("Destination set to {}", destination.display_name());
            data.reset_route();
            data.destination = Some(destination);
            data.state = TripState::Idle;
        }
        self.sync_refresh_timer();
    }

    /// Departure used for the next route request. Does not refetch.
    pub fn set_departure(&self, departure: DateTime<Utc>) {
        self.shared.data.lock().departure = departure;
    }

    /// Find candidate destinations for free text or a `"lat,lon"` pair
    #[instrument(skip(self))]
    pub async fn search_destination(&self, query: &str) -> Result<Vec<Place>> {
        match LocationInput::parse(query)? {
            LocationInput::Coordinates(coordinate) => {
                let name = self.shared.services.places.resolve(coordinate).await;
                Ok(vec![Place::new(name, coordinate)])
            }
            LocationInput::Name(name) => self.shared.services.search.search(&name).await,
        }
    }

    /// Compute routes from origin to destination, select the primary one and
    /// load its waypoint forecasts.
    ///
    /// A routing failure moves the session to `Error` and is returned.
    #[instrument(skip(self))]
    pub async fn request_route(&self) -> Result<()> {
        let (generation, origin, destination, departure) = {
            let mut data = self.shared.data.lock();
            let origin = data
                .origin
                .ok_or_else(|| RoadcastError::validation("No origin set"))?;
            let destination = data
                .destination
                .as_ref()
                .map(|place| place.coordinate)
                .ok_or_else(|| RoadcastError::validation("No destination set"))?;
            data.reset_route();
            data.state = TripState::RouteLoading;
            (data.generation, origin, destination, data.departure)
        };
        self.sync_refresh_timer();

        let result = self
            .shared
            .services
            .routes
            .compute_routes(origin, destination)
            .await;

        let geometries = match result {
            Ok(geometries) => geometries,
            Err(e) => {
                warn!("Route request failed: {}", e);
                let mut data = self.shared.data.lock();
                if data.generation == generation {
                    data.state = TripState::error(&e);
                }
                return Err(e);
            }
        };

        let sampler = self.shared.settings.sampler;
        let mut routes: Vec<RouteOption> = geometries
            .into_iter()
            .enumerate()
            .filter_map(|(index, geometry)| match sampler.sample(&geometry, departure) {
                Ok(waypoints) => Some(RouteOption {
                    geometry,
                    waypoints,
                }),
                Err(e) => {
                    warn!("Dropping route alternative {}: {}", index, e);
                    None
                }
            })
            .collect();

        let plan = {
            let mut data = self.shared.data.lock();
            if data.generation != generation {
                debug!("Discarding routes from a superseded request");
                return Ok(());
            }
            // The departure may have moved while the route was loading
            if data.departure != departure {
                debug!("Departure changed during routing, shifting arrival times");
                for option in &mut routes {
                    sampler.recompute_etas(&mut option.waypoints, &option.geometry, data.departure);
                }
            }
            if routes.is_empty() {
                let e = RoadcastError::invalid_geometry("No route alternative could be sampled");
                data.state = TripState::error(&e);
                return Err(e);
            }

            info!(
                "Route ready: {} alternative(s), {} waypoints on the primary",
                routes.len(),
                routes[0].waypoints.len()
            );
            data.routes = routes;
            data.selected = Some(0);
            data.state = TripState::RouteReady;
            data.begin_fetch(false)
        };
        self.sync_refresh_timer();

        if let Some(plan) = plan {
            self.run_fetch(plan).await;
        }
        Ok(())
    }

    /// Switch to another route alternative and reload its forecasts
    #[instrument(skip(self))]
    pub async fn select_alternative(&self, index: usize) -> Result<()> {
        let plan = {
            let mut data = self.shared.data.lock();
            if data.selected.is_none() {
                return Err(RoadcastError::validation("No route to choose an alternative from"));
            }
            let geometry = &data
                .routes
                .get(index)
                .ok_or_else(|| RoadcastError::validation(format!("No route alternative {index}")))?
                .geometry;
            let sampled = self.shared.settings.sampler.sample(geometry, data.departure);

            match sampled {
                Ok(waypoints) => data.routes[index].waypoints = waypoints,
                Err(e) => {
                    data.generation += 1;
                    data.forecasts.clear();
                    data.summary = None;
                    data.last_updated = None;
                    data.state = TripState::error(&e);
                    return Err(e);
                }
            }

            info!("Selected route alternative {}", index);
            data.selected = Some(index);
            data.state = TripState::RouteReady;
            data.begin_fetch(false)
        };

        if let Some(plan) = plan {
            self.run_fetch(plan).await;
        }
        Ok(())
    }

    /// Shift every arrival time to a new departure and refetch weather and
    /// place names for the selected route.
    #[instrument(skip(self))]
    pub async fn change_departure_time(&self, departure: DateTime<Utc>) {
        let plan = {
            let mut data = self.shared.data.lock();
            data.departure = departure;
            if !matches!(
                data.state,
                TripState::RouteReady | TripState::WeatherLoading | TripState::WeatherReady
            ) {
                return;
            }

            let sampler = self.shared.settings.sampler;
            for option in &mut data.routes {
                sampler.recompute_etas(&mut option.waypoints, &option.geometry, departure);
            }
            info!("Departure changed to {}", departure.format("%Y-%m-%d %H:%M UTC"));
            data.begin_fetch(false)
        };

        if let Some(plan) = plan {
            self.run_fetch(plan).await;
        }
    }

    /// Reload weather for the selected route, keeping known place names.
    ///
    /// Only runs from `WeatherReady`; returns whether fresh results were applied.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> bool {
        let plan = {
            let mut data = self.shared.data.lock();
            if data.state != TripState::WeatherReady {
                debug!("Skipping refresh in state {:?}", data.state);
                return false;
            }
            data.begin_fetch(true)
        };

        match plan {
            Some(plan) => self.run_fetch(plan).await,
            None => false,
        }
    }

    /// Arm or disarm the periodic refresh timer
    pub fn set_auto_refresh(&self, enabled: bool) {
        self.shared.data.lock().auto_refresh = enabled;
        self.sync_refresh_timer();
    }

    /// Whether the periodic refresh timer is currently running
    #[must_use]
    pub fn is_refresh_armed(&self) -> bool {
        self.shared
            .refresh_timer
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Back to `Idle`, forgetting destination and route. The origin is kept.
    pub fn clear_trip(&self) {
        {
            let mut data = self.shared.data.lock();
            data.reset_route();
            data.destination = None;
            data.state = TripState::Idle;
        }
        info!("Trip cleared");
        self.sync_refresh_timer();
    }

    /// Fetch weather (and missing place names) for every waypoint of a plan
    /// concurrently, then apply the results if the plan is still current.
    async fn run_fetch(&self, plan: FetchPlan) -> bool {
        let services = &self.shared.services;
        let stagger = self.shared.settings.geocode_stagger;
        let names = plan.names.as_deref().unwrap_or_default();

        let lookups = plan.waypoints.iter().enumerate().map(|(index, waypoint)| {
            let known_name = names
                .get(index)
                .filter(|name| !name.is_empty())
                .cloned();

            async move {
                let weather = async {
                    match services.weather.point_forecast(waypoint.coordinate).await {
                        Ok(forecast) => arrival_weather(&forecast, waypoint),
                        Err(e) => {
                            warn!("{}: {}", waypoint.label, e);
                            None
                        }
                    }
                };
                let place = async {
                    if let Some(name) = known_name {
                        return name;
                    }
                    let delay = stagger.saturating_mul(u32::try_from(index).unwrap_or(u32::MAX));
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    services.places.resolve(waypoint.coordinate).await
                };

                let (weather, location_name) = tokio::join!(weather, place);
                WaypointForecast {
                    waypoint: waypoint.clone(),
                    weather,
                    location_name,
                }
            }
        });
        let forecasts = join_all(lookups).await;

        let mut data = self.shared.data.lock();
        if data.generation != plan.generation {
            debug!("Discarding stale forecasts from generation {}", plan.generation);
            return false;
        }

        data.summary = aggregate(&forecasts);
        let with_weather = forecasts.iter().filter(|f| f.weather.is_some()).count();
        info!(
            "Weather ready for {}/{} waypoints",
            with_weather,
            forecasts.len()
        );
        data.forecasts = forecasts;
        data.state = TripState::WeatherReady;
        data.last_updated = Some(Utc::now());
        true
    }

    /// The timer runs exactly while auto-refresh is on and a route is selected
    fn sync_refresh_timer(&self) {
        let wanted = {
            let data = self.shared.data.lock();
            data.auto_refresh && data.selected.is_some()
        };

        let mut timer = self.shared.refresh_timer.lock();
        if !wanted {
            if let Some(handle) = timer.take() {
                debug!("Disarming refresh timer");
                handle.abort();
            }
            return;
        }
        if timer.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime available, auto-refresh not armed");
            return;
        };
        let period = self.shared.settings.refresh_interval;
        debug!("Arming refresh timer every {:?}", period);
        *timer = Some(runtime.spawn(refresh_loop(Arc::downgrade(&self.shared), period)));
    }
}

fn arrival_weather(forecast: &PointForecast, waypoint: &Waypoint) -> Option<WeatherSnapshot> {
    let snapshot = forecast.snapshot_at(waypoint.eta_time);
    if snapshot.is_none() {
        debug!("No forecast or current conditions for {}", waypoint.label);
    }
    snapshot
}

/// Holds only a weak reference so the timer never keeps a session alive
async fn refresh_loop(shared: Weak<Shared>, period: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(shared) = shared.upgrade() else {
            break;
        };
        let session = TripSession { shared };
        debug!("Periodic refresh");
        session.refresh().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RouteGeometry;
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct StraightRoute;

    #[async_trait]
    impl RouteClient for StraightRoute {
        async fn compute_routes(
            &self,
            origin: Coordinate,
            destination: Coordinate,
        ) -> Result<Vec<RouteGeometry>> {
            Ok(vec![RouteGeometry {
                coordinates: vec![origin, destination],
                distance_meters: 16_093.4,
                duration_seconds: 900.0,
            }])
        }
    }

    struct NoWeather;

    #[async_trait]
    impl WeatherProvider for NoWeather {
        async fn point_forecast(&self, _coordinate: Coordinate) -> Result<PointForecast> {
            Err(RoadcastError::weather_unavailable("offline"))
        }
    }

    struct Fallback;

    #[async_trait]
    impl PlaceResolver for Fallback {
        async fn resolve(&self, coordinate: Coordinate) -> String {
            crate::location_resolver::fallback_name(coordinate)
        }
    }

    #[async_trait]
    impl PlaceSearch for Fallback {
        async fn search(&self, query: &str) -> Result<Vec<Place>> {
            Ok(vec![Place::new(
                query.to_string(),
                Coordinate { lat: 1.0, lon: 2.0 },
            )])
        }
    }

    struct Mild;

    #[async_trait]
    impl WeatherProvider for Mild {
        async fn point_forecast(&self, _coordinate: Coordinate) -> Result<PointForecast> {
            Ok(PointForecast {
                hourly: Vec::new(),
                current: Some(WeatherSnapshot {
                    temperature_f: 55.0,
                    apparent_temperature_f: 53.0,
                    wind_speed_mph: 8.0,
                    wind_gust_mph: 12.0,
                    wind_direction_deg: 180,
                    humidity_pct: 50,
                    precipitation_in: 0.0,
                    precipitation_probability_pct: None,
                    pressure_hpa: 1018.0,
                    weather_code: 0,
                    is_forecast: false,
                    forecast_hour: None,
                }),
            })
        }
    }

    fn session() -> TripSession {
        session_with(Arc::new(NoWeather))
    }

    fn session_with(weather: Arc<dyn WeatherProvider>) -> TripSession {
        let services = Services {
            routes: Arc::new(StraightRoute),
            weather,
            places: Arc::new(Fallback),
            search: Arc::new(Fallback),
        };
        let settings = SessionSettings {
            geocode_stagger: Duration::ZERO,
            ..SessionSettings::default()
        };
        TripSession::new(services, settings)
    }

    fn plan_trip(session: &TripSession) {
        session.set_origin(Coordinate { lat: 38.0, lon: -84.5 });
        session.set_destination(Place::new(
            "Georgetown".to_string(),
            Coordinate { lat: 38.2, lon: -84.55 },
        ));
        session.set_departure(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_new_session_is_idle() {
        let snapshot = session().snapshot();
        assert_eq!(snapshot.state, TripState::Idle);
        assert!(snapshot.routes.is_empty());
        assert!(snapshot.summary.is_none());
    }

    #[tokio::test]
    async fn test_request_route_requires_endpoints() {
        let session = session();
        let err = session.request_route().await.unwrap_err();
        assert!(matches!(err, RoadcastError::Validation { .. }));
        assert_eq!(session.state(), TripState::Idle);
    }

    #[tokio::test]
    async fn test_weather_failures_degrade_without_error() {
        let session = session();
        plan_trip(&session);
        session.request_route().await.unwrap();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, TripState::WeatherReady);
        assert_eq!(snapshot.forecasts.len(), 2);
        assert!(snapshot.forecasts.iter().all(|f| f.weather.is_none()));
        assert_eq!(snapshot.forecasts[0].location_name, "Near 38.00, -84.50");
        assert!(snapshot.summary.is_none());
    }

    #[tokio::test]
    async fn test_search_destination_by_coordinates_resolves_name() {
        let places = session().search_destination("38.2, -84.55").await.unwrap();
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].name, "Near 38.20, -84.55");
    }

    #[tokio::test]
    async fn test_search_destination_by_name_uses_search() {
        let places = session().search_destination("Georgetown").await.unwrap();
        assert_eq!(places[0].name, "Georgetown");
    }

    #[tokio::test]
    async fn test_select_alternative_out_of_range() {
        let session = session();
        plan_trip(&session);
        session.request_route().await.unwrap();

        let err = session.select_alternative(3).await.unwrap_err();
        assert!(matches!(err, RoadcastError::Validation { .. }));
        assert_eq!(session.state(), TripState::WeatherReady);
    }

    #[tokio::test]
    async fn test_unsampleable_alternative_clears_previous_forecasts() {
        let session = session_with(Arc::new(Mild));
        plan_trip(&session);
        session.request_route().await.unwrap();
        assert!(session.snapshot().summary.is_some());

        session.shared.data.lock().routes.push(RouteOption {
            geometry: RouteGeometry {
                coordinates: vec![Coordinate { lat: 38.0, lon: -84.5 }],
                distance_meters: 0.0,
                duration_seconds: 0.0,
            },
            waypoints: Vec::new(),
        });
        let err = session.select_alternative(1).await.unwrap_err();
        assert!(matches!(err, RoadcastError::InvalidGeometry { .. }));

        let snapshot = session.snapshot();
        assert!(matches!(snapshot.state, TripState::Error { .. }));
        assert!(snapshot.forecasts.is_empty());
        assert!(snapshot.summary.is_none());
        assert!(snapshot.last_updated.is_none());
    }

    #[tokio::test]
    async fn test_refresh_only_from_weather_ready() {
        let session = session();
        assert!(!session.refresh().await);

        plan_trip(&session);
        session.request_route().await.unwrap();
        assert!(session.refresh().await);
    }

    #[tokio::test]
    async fn test_change_departure_before_route_only_stores_it() {
        let session = session();
        let departure = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        session.change_departure_time(departure).await;

        let snapshot = session.snapshot();
        assert_eq!(snapshot.departure, departure);
        assert_eq!(snapshot.state, TripState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_timer_follows_route_and_toggle() {
        let session = session();
        session.set_auto_refresh(true);
        // no route selected yet
        assert!(!session.is_refresh_armed());

        plan_trip(&session);
        session.request_route().await.unwrap();
        assert!(session.is_refresh_armed());

        session.set_auto_refresh(false);
        assert!(!session.is_refresh_armed());

        session.set_auto_refresh(true);
        assert!(session.is_refresh_armed());

        session.clear_trip();
        assert!(!session.is_refresh_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_does_not_keep_session_alive() {
        let session = session();
        plan_trip(&session);
        session.request_route().await.unwrap();
        session.set_auto_refresh(true);

        let weak = Arc::downgrade(&session.shared);
        drop(session);
        assert!(weak.upgrade().is_none());
    }
}
