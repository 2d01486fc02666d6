pub mod error;
pub mod source;

use crate::metrics;
use error::ServiceError;
use powerocean_rs::{Engine, Extraction};

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Structure containing state for API handlers.
pub struct StateData {
    pub engine: Engine,
    pub document: PathBuf,
    pub reference: Option<PathBuf>,
    interval: u64,
    /// Timestamp of last successful extraction via `refresh()`
    timestamp: Mutex<Option<Instant>>,
    last: Mutex<Option<Arc<Extraction>>>,
}

impl StateData {
    pub fn new(
        engine: Engine,
        document: PathBuf,
        reference: Option<PathBuf>,
        interval: u64,
    ) -> Self {
        StateData {
            engine,
            document,
            reference,
            interval,
            timestamp: Mutex::new(None),
            last: Mutex::new(None),
        }
    }

    /// Updates `timestamp` to `now()`.
    fn touch(&self) {
        if let Ok(mut ts) = self.timestamp.lock() {
            *ts = Some(Instant::now());
        } else {
            log::trace!("Unable to lock timestamp mutex, will refresh again")
        }
    }

    /// Checks whether `interval` seconds elapsed since last `touch()`
    fn interval_elapsed(&self) -> bool {
        let elapsed_opt = self
            .timestamp
            .lock()
            .ok()
            .and_then(|a| a.map(|b| b.elapsed().as_secs()));

        match elapsed_opt {
            Some(elapsed) => elapsed > self.interval,
            /* no extraction yet, always trigger one */
            None => true,
        }
    }

    fn cached(&self) -> Option<Arc<Extraction>> {
        self.last.lock().ok().and_then(|last| last.clone())
    }

    fn store(&self, extraction: Arc<Extraction>) {
        if let Ok(mut last) = self.last.lock() {
            *last = Some(extraction);
        } else {
            log::trace!("Unable to lock extraction mutex, will refresh again")
        }
    }

    /// Extract the current document, at most once per interval.
    pub async fn refresh(&self) -> Result<Arc<Extraction>, ServiceError> {
        if !self.interval_elapsed() {
            if let Some(cached) = self.cached() {
                log::info!("interval time not yet elapsed since last run; returning cached result");
                return Ok(cached);
            }
        }

        let document = source::read_document(&self.document).await?;
        let extraction = Arc::new(self.engine.extract(&document)?);

        metrics::update(&extraction);
        self.store(Arc::clone(&extraction));
        self.touch();

        Ok(extraction)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use powerocean_rs::VariantRegistry;

    fn state(document: &str, interval: u64) -> StateData {
        let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        path.push(format!("resources/test/{}", document));
        let schema = VariantRegistry::builtin().get("83").unwrap();
        StateData::new(Engine::new("HJ31ZDH4ZF730042", schema), path, None, interval)
    }

    #[test]
    fn interval() {
        let state = state("response_single.json", 3600);
        assert!(state.interval_elapsed());
        state.touch();
        assert!(!state.interval_elapsed());
    }

    #[tokio::test]
    async fn cached_within_interval() {
        let state = state("response_single.json", 3600);
        let first = state.refresh().await.unwrap();
        let second = state.refresh().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!first.endpoints.is_empty());
    }

    #[tokio::test]
    async fn failed_refresh_is_not_cached() {
        let state = state("no_such_response.json", 3600);
        assert!(state.refresh().await.is_err());
        assert!(state.cached().is_none());
        assert!(state.interval_elapsed());
    }
}
