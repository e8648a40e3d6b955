use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

use crate::atlas::{build_atlas_until, Atlas, AtlasError, ImageSource};

/// A finished build tagged with the request that produced it.
#[derive(Debug)]
pub struct AtlasBuild {
    pub generation: u64,
    pub atlas: Atlas,
}

/// Runs atlas builds off the frame thread.
///
/// Every [`request`](Self::request) bumps a generation counter. Results come
/// back over one channel and [`poll`](Self::poll) hands out only the result
/// of the newest request; anything older is dropped on arrival. Build
/// threads watch the shared counter and stop decoding once a newer request
/// supersedes them.
pub struct AtlasWorker {
    source: Arc<dyn ImageSource>,
    sender: Sender<AtlasBuild>,
    receiver: Receiver<AtlasBuild>,
    latest: Arc<AtomicU64>,
    delivered: u64,
}

impl AtlasWorker {
    pub fn new(source: Arc<dyn ImageSource>) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            source,
            sender,
            receiver,
            latest: Arc::new(AtomicU64::new(0)),
            delivered: 0,
        }
    }

    /// Starts a build for `images` and returns its generation.
    pub fn request(&mut self, images: Vec<String>) -> Result<u64, AtlasError> {
        let previous = self.latest_generation();
        let generation = previous + 1;
        let source = Arc::clone(&self.source);
        let sender = self.sender.clone();
        let latest = Arc::clone(&self.latest);

        // publish first; the new thread compares against it from its first check
        self.latest.store(generation, Ordering::Release);
        let spawned = thread::Builder::new()
            .name(format!("atlas-build-{generation}"))
            .spawn(move || {
                let current = || latest.load(Ordering::Acquire) == generation;
                let Some(atlas) = build_atlas_until(&images, source.as_ref(), &current) else {
                    tracing::debug!(generation, "atlas build superseded; stopped early");
                    return;
                };
                // the worker may have been dropped while we were decoding
                let _ = sender.send(AtlasBuild { generation, atlas });
            });
        if let Err(err) = spawned {
            self.latest.store(previous, Ordering::Release);
            return Err(AtlasError::Spawn(err));
        }

        tracing::debug!(generation, "queued atlas build");
        Ok(generation)
    }

    pub fn latest_generation(&self) -> u64 {
        self.latest.load(Ordering::Acquire)
    }

    /// True while the newest request has not been delivered yet.
    pub fn is_building(&self) -> bool {
        self.delivered < self.latest_generation()
    }

    /// Non-blocking; returns the newest build once it lands.
    pub fn poll(&mut self) -> Option<AtlasBuild> {
        let latest = self.latest_generation();
        let mut newest = None;
        loop {
            match self.receiver.try_recv() {
                Ok(build) if build.generation == latest => newest = Some(build),
                Ok(build) => {
                    tracing::debug!(
                        generation = build.generation,
                        latest,
                        "discarding superseded atlas build"
                    );
                }
                // we hold a sender, so the channel cannot disconnect
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        if let Some(build) = &newest {
            self.delivered = build.generation;
        }
        newest
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use image::{Rgba, RgbaImage};

    use super::*;
    use crate::atlas::MemoryImageSource;

    fn source() -> Arc<dyn ImageSource> {
        let mut source = MemoryImageSource::new();
        source.insert("a", RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255])));
        source.insert("b", RgbaImage::from_pixel(2, 2, Rgba([0, 255, 0, 255])));
        source.insert("c", RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 255])));
        Arc::new(source)
    }

    fn wait_for(worker: &mut AtlasWorker) -> AtlasBuild {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(build) = worker.poll() {
                return build;
            }
            assert!(Instant::now() < deadline, "atlas build timed out");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn delivers_requested_build() {
        let mut worker = AtlasWorker::new(source());
        let generation = worker.request(vec!["a".into(), "b".into()]).unwrap();
        assert!(worker.is_building());

        let build = wait_for(&mut worker);
        assert_eq!(build.generation, generation);
        assert_eq!(build.atlas.layout.unique_count, 2);
        assert!(!worker.is_building());
    }

    /// Stalls every load of "slow" until released and records each load.
    struct Gate {
        inner: MemoryImageSource,
        release: Mutex<bool>,
        loaded: Mutex<Vec<String>>,
    }

    impl Gate {
        fn new(ids: &[&str]) -> Arc<Self> {
            let mut inner = MemoryImageSource::new();
            for (shade, id) in ids.iter().enumerate() {
                let shade = shade as u8 + 1;
                inner.insert(*id, RgbaImage::from_pixel(2, 2, Rgba([shade, shade, shade, 255])));
            }
            Arc::new(Self {
                inner,
                release: Mutex::new(false),
                loaded: Mutex::new(Vec::new()),
            })
        }

        fn open(&self) {
            *self.release.lock().unwrap() = true;
        }
    }

    impl ImageSource for Gate {
        fn load(&self, id: &str) -> Result<RgbaImage, AtlasError> {
            if id == "slow" {
                let deadline = Instant::now() + Duration::from_secs(5);
                while !*self.release.lock().unwrap() && Instant::now() < deadline {
                    thread::sleep(Duration::from_millis(2));
                }
            }
            self.loaded.lock().unwrap().push(id.to_string());
            self.inner.load(id)
        }
    }

    #[test]
    fn newer_request_supersedes_in_flight_build() {
        let gate = Gate::new(&["slow", "fast"]);
        let mut worker = AtlasWorker::new(gate.clone());
        let first = worker.request(vec!["slow".into()]).unwrap();
        let second = worker.request(vec!["fast".into(), "fast".into()]).unwrap();
        assert!(second > first);

        let build = wait_for(&mut worker);
        assert_eq!(build.generation, second);
        assert_eq!(build.atlas.unique_ids, vec!["fast".to_string()]);

        gate.open();
        thread::sleep(Duration::from_millis(50));
        assert!(worker.poll().is_none());
    }

    #[test]
    fn superseded_build_stops_decoding() {
        let gate = Gate::new(&["slow", "stale-1", "stale-2", "fresh"]);
        let mut worker = AtlasWorker::new(gate.clone());
        worker
            .request(vec!["slow".into(), "stale-1".into(), "stale-2".into()])
            .unwrap();
        let second = worker.request(vec!["fresh".into()]).unwrap();

        let build = wait_for(&mut worker);
        assert_eq!(build.generation, second);

        // let the stale thread finish its current decode, then give it time to
        // reach the next one if it were going to
        gate.open();
        thread::sleep(Duration::from_millis(100));
        let loaded = gate.loaded.lock().unwrap().clone();
        assert!(loaded.contains(&"fresh".to_string()));
        assert!(!loaded.iter().any(|id| id.starts_with("stale")), "{loaded:?}");
        assert!(worker.poll().is_none());
        assert!(!worker.is_building());
    }

    #[test]
    fn poll_without_request_is_empty() {
        let mut worker = AtlasWorker::new(source());
        assert!(worker.poll().is_none());
        assert!(!worker.is_building());
        assert_eq!(worker.latest_generation(), 0);
        let _ = worker.request(vec!["c".into()]).unwrap();
        assert_eq!(worker.latest_generation(), 1);
    }
}
