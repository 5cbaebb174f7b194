//! # stepform-assets
//!
//! Client assets (scripts and stylesheets) that widgets declare in their
//! server-side definitions. A widget is not ready until all of its assets are
//! present in the document.
//!
//! - [`Asset`] parses a `package@path` reference and infers its kind.
//! - [`AssetResolver`] maps references to URLs.
//! - [`AssetLoader`] is the seam the form engine consumes.
//! - [`DocumentAssetLoader`] is an idempotent loader over a host-provided
//!   [`AssetInjector`]: each URL is injected at most once, and concurrent
//!   requests for the same URL share one injection.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use stepform_core::Settings;

/// The kind of a client asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// A JavaScript file.
    Js,
    /// A stylesheet.
    Css,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Js => "js",
            Self::Css => "css",
        })
    }
}

/// A reference to one client asset, as declared by a widget definition.
///
/// Deserializes from a plain string such as `"geo@js/map.js"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Asset {
    location: String,
    kind: AssetKind,
}

impl Asset {
    /// Creates an asset reference, inferring the kind from the extension.
    pub fn new(location: impl Into<String>) -> Self {
        let location = location.into();
        let path = location.split(['?', '#']).next().unwrap_or_default();
        let kind = if path.ends_with(".css") {
            AssetKind::Css
        } else {
            AssetKind::Js
        };
        Self { location, kind }
    }

    /// Returns the reference as declared.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Returns the asset kind.
    pub const fn kind(&self) -> AssetKind {
        self.kind
    }
}

impl From<String> for Asset {
    fn from(location: String) -> Self {
        Self::new(location)
    }
}

impl From<&str> for Asset {
    fn from(location: &str) -> Self {
        Self::new(location)
    }
}

impl From<Asset> for String {
    fn from(asset: Asset) -> Self {
        asset.location
    }
}

/// Resolves asset references to URLs.
///
/// Absolute paths and `http(s)` URLs pass through unchanged. Otherwise the
/// reference is `package@path` or just `path` (resolved against the theme
/// package) and becomes `<base>/<package>/<path>`.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    base_url: String,
    theme: String,
}

impl AssetResolver {
    /// Creates a resolver from the ambient settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.asset_base_url, &settings.theme)
    }

    /// Creates a resolver with an explicit base URL and default package.
    pub fn new(base_url: &str, theme: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            theme: theme.to_string(),
        }
    }

    /// Returns the URL for `asset`.
    ///
    /// # Examples
    ///
    /// ```
    /// use stepform_assets::{Asset, AssetResolver};
    ///
    /// let r = AssetResolver::new("/assets", "app");
    /// assert_eq!(r.url(&Asset::new("geo@js/map.js")), "/assets/geo/js/map.js");
    /// assert_eq!(r.url(&Asset::new("css/main.css")), "/assets/app/css/main.css");
    /// assert_eq!(r.url(&Asset::new("/static/x.js")), "/static/x.js");
    /// ```
    pub fn url(&self, asset: &Asset) -> String {
        let location = asset.location();
        if location.starts_with('/') || location.starts_with("http") {
            return location.to_string();
        }

        let (package, path) = match location.split_once('@') {
            Some((package, path)) => (package, path),
            None => (self.theme.as_str(), location),
        };
        format!("{}/{package}/{path}", self.base_url)
    }
}

/// A failed asset load.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed to load {kind} asset '{url}': {reason}")]
pub struct AssetError {
    /// The asset kind.
    pub kind: AssetKind,
    /// The resolved URL.
    pub url: String,
    /// Why it failed.
    pub reason: String,
}

/// Loads widget assets into the document.
///
/// Implementations must be idempotent: requesting an asset that is already
/// present resolves immediately without injecting it again.
#[async_trait]
pub trait AssetLoader: Send + Sync {
    /// Resolves once every asset in `assets` is present.
    async fn load_assets(&self, assets: &[Asset]) -> Result<(), AssetError>;
}

/// Injects one asset into the document (host side).
#[async_trait]
pub trait AssetInjector: Send + Sync {
    /// Adds the asset at `url` to the document and waits until it is usable.
    async fn inject(&self, kind: AssetKind, url: &str) -> Result<(), String>;
}

type LoadCell = Arc<OnceCell<Result<(), AssetError>>>;

/// An [`AssetLoader`] that injects each URL at most once.
///
/// The outcome of the first injection is cached, failures included: a
/// failed asset is not retried.
pub struct DocumentAssetLoader<I> {
    resolver: AssetResolver,
    injector: I,
    entries: Mutex<HashMap<String, LoadCell>>,
}

impl<I: AssetInjector> DocumentAssetLoader<I> {
    /// Creates a loader over `injector`.
    pub fn new(resolver: AssetResolver, injector: I) -> Self {
        Self {
            resolver,
            injector,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if `asset` has been injected successfully.
    pub fn is_loaded(&self, asset: &Asset) -> bool {
        let url = self.resolver.url(asset);
        self.entries
            .lock()
            .expect("asset registry lock poisoned")
            .get(&url)
            .and_then(|cell| cell.get().cloned())
            .is_some_and(|r| r.is_ok())
    }

    fn cell_for(&self, url: &str) -> LoadCell {
        let mut entries = self.entries.lock().expect("asset registry lock poisoned");
        Arc::clone(entries.entry(url.to_string()).or_default())
    }

    async fn load_one(&self, asset: &Asset) -> Result<(), AssetError> {
        let url = self.resolver.url(asset);
        let cell = self.cell_for(&url);
        let kind = asset.kind();

        cell.get_or_init(|| async {
            tracing::debug!(%kind, %url, "injecting asset");
            self.injector
                .inject(kind, &url)
                .await
                .map_err(|reason| AssetError {
                    kind,
                    url: url.clone(),
                    reason,
                })
        })
        .await
        .clone()
    }
}

#[async_trait]
impl<I: AssetInjector> AssetLoader for DocumentAssetLoader<I> {
    async fn load_assets(&self, assets: &[Asset]) -> Result<(), AssetError> {
        for asset in assets {
            self.load_one(asset).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<T: AssetLoader + ?Sized> AssetLoader for Arc<T> {
    async fn load_assets(&self, assets: &[Asset]) -> Result<(), AssetError> {
        (**self).load_assets(assets).await
    }
}
