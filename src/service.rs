use crate::config::Config;
use crate::render::{GlobeSurface, Primitives, SphereRenderer};
use crate::sources::UnavailableSource;
use crate::zones::{self, Clock, FeatureCollection, FeatureStore, SystemClock, TimezoneInfo};
use crate::Error;
use chrono::{DateTime, Utc};
use log::*;
use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

static SERVICE: OnceLock<TimezoneService> = OnceLock::new();

/// Lookup and rendering entry points. Every call makes sure the dataset is loaded first.
pub struct TimezoneService {
    store: Arc<FeatureStore>,
    clock: Arc<dyn Clock>,
}

impl TimezoneService {
    pub fn new(store: Arc<FeatureStore>) -> Self {
        TimezoneService {
            store,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let store = FeatureStore::new(config.remote_source()?, config.durable_store());
        Ok(Self::new(Arc::new(store)))
    }

    pub fn store(&self) -> &Arc<FeatureStore> {
        &self.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn ensure_loaded(&self) -> Arc<FeatureCollection> {
        self.store.ensure_loaded().await
    }

    pub async fn find_timezone_at(&self, lat: f64, lon: f64) -> String {
        let collection = self.ensure_loaded().await;
        zones::find_timezone_at(&collection, lat, lon).to_string()
    }

    pub async fn find_timezone_info_at(&self, lat: f64, lon: f64) -> TimezoneInfo {
        let collection = self.ensure_loaded().await;
        zones::find_timezone_info_at(&collection, lat, lon, self.now())
    }

    pub async fn find_timezones_for_offset(&self, offset_hours: f64) -> BTreeSet<String> {
        let collection = self.ensure_loaded().await;
        zones::find_timezones_for_offset_at(&collection, offset_hours, self.now())
    }

    pub async fn render_feature<P, G>(&self, renderer: &mut SphereRenderer<P>, globe: &mut G, tzid: &str) -> usize
    where
        P: Primitives,
        G: GlobeSurface<Handle = P::Handle>,
    {
        let collection = self.ensure_loaded().await;
        renderer.render_feature(&collection, globe, tzid)
    }

    pub async fn render_offset<P, G>(&self, renderer: &mut SphereRenderer<P>, globe: &mut G, offset_hours: f64) -> usize
    where
        P: Primitives,
        G: GlobeSurface<Handle = P::Handle>,
    {
        let collection = self.ensure_loaded().await;
        renderer.render_offset_at(&collection, globe, offset_hours, self.now())
    }

    pub fn clear_all<P, G>(&self, renderer: &mut SphereRenderer<P>, globe: &mut G) -> usize
    where
        P: Primitives,
        G: GlobeSurface<Handle = P::Handle>,
    {
        renderer.clear_all(globe)
    }
}

/// Installs the process-wide service. Fails (handing the service back) if one already exists.
pub fn install(service: TimezoneService) -> Result<(), TimezoneService> {
    SERVICE.set(service)
}

/// The process-wide service, configured from the environment on first use.
pub fn global() -> &'static TimezoneService {
    SERVICE.get_or_init(|| {
        let config = Config::from_env().unwrap_or_else(|e| {
            warn!("{}, using default configuration", e);
            Config::default()
        });

        TimezoneService::from_config(&config).unwrap_or_else(|e| {
            warn!("{}, timezone data will only come from the cache", e);
            let store = FeatureStore::new(Arc::new(UnavailableSource), config.durable_store());
            TimezoneService::new(Arc::new(store))
        })
    })
}

pub fn init() {
    global(); // force creation of the global service if it doesn't exist yet
}
