//! A controllable asset loader.
//!
//! [`MockAssetLoader`] resolves every batch successfully unless one of its
//! assets was marked as failing. Per-asset delays let tests make widgets
//! settle in a different order than they were created.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use stepform_assets::{Asset, AssetError, AssetLoader};

#[derive(Default)]
struct State {
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    loaded: Vec<String>,
    requests: usize,
}

/// An [`AssetLoader`] with scripted failures and delays.
#[derive(Default)]
pub struct MockAssetLoader {
    state: Mutex<State>,
}

impl MockAssetLoader {
    /// Creates a loader where every asset loads immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `location` fail to load.
    pub fn fail(&self, location: &str) {
        self.lock().failing.insert(location.to_string());
    }

    /// Delays `location` by `millis` milliseconds.
    pub fn delay(&self, location: &str, millis: u64) {
        self.lock()
            .delays
            .insert(location.to_string(), Duration::from_millis(millis));
    }

    /// Returns the assets loaded so far, in completion order.
    pub fn loaded(&self) -> Vec<String> {
        self.lock().loaded.clone()
    }

    /// Returns how many batches were requested.
    pub fn requests(&self) -> usize {
        self.lock().requests
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("mock asset loader lock poisoned")
    }
}

#[async_trait]
impl AssetLoader for MockAssetLoader {
    async fn load_assets(&self, assets: &[Asset]) -> Result<(), AssetError> {
        self.lock().requests += 1;

        for asset in assets {
            let delay = self.lock().delays.get(asset.location()).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let mut state = self.lock();
            if state.failing.contains(asset.location()) {
                return Err(AssetError {
                    kind: asset.kind(),
                    url: asset.location().to_string(),
                    reason: "scripted failure".to_string(),
                });
            }
            state.loaded.push(asset.location().to_string());
        }
        Ok(())
    }
}
