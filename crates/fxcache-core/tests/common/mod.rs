//! Shared fixtures for fxcache-core integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use fxcache_core::{
    Currency, CurrencyContext, FxConfig, FxError, KeyValueStore, ManualClock, RateProvider,
    RateSourceClient, Result,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const T0: u64 = 1_700_000_000_000;
pub const MINUTE: u64 = 60_000;

/// Provider with programmable rates and availability
pub struct FakeProvider {
    rates: Mutex<HashMap<String, f64>>,
    up: AtomicBool,
    calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new(pairs: &[(&str, f64)]) -> Arc<Self> {
        Arc::new(Self {
            rates: Mutex::new(pairs.iter().map(|(c, r)| (c.to_string(), *r)).collect()),
            up: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn down() -> Arc<Self> {
        let provider = Self::new(&[]);
        provider.set_up(false);
        provider
    }

    pub fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }

    pub fn set_rate(&self, code: &str, rate: f64) {
        self.rates.lock().unwrap().insert(code.to_string(), rate);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn fetch_raw(&self, _base: Currency) -> Result<HashMap<String, f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.up.load(Ordering::SeqCst) {
            return Err(FxError::Provider("fake: down".to_string()));
        }
        Ok(self.rates.lock().unwrap().clone())
    }
}

/// Context over a fake primary/fallback pair, a manual clock and `store`
pub fn context(
    primary: Arc<FakeProvider>,
    fallback: Arc<FakeProvider>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<ManualClock>,
) -> CurrencyContext {
    let source = RateSourceClient::new(primary, fallback, Duration::from_secs(1), clock.clone());
    CurrencyContext::with_parts(source, store, clock, &FxConfig::default())
}
