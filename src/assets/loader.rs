use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
};

use anyhow::Context;

use crate::{
    assets::decode::{RasterImage, decode_image},
    foundation::error::{SmilError, SmilResult},
    render::paint::ImageResolver,
};

/// Fetches the raw bytes behind an image URI.
pub trait ImageFetcher: Send + Sync {
    fn fetch(&self, uri: &str) -> SmilResult<Vec<u8>>;
}

/// Normalizes a document-relative image path. Absolute paths and parent
/// traversals are rejected.
pub(crate) fn normalize_rel_path(source: &str) -> SmilResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(SmilError::validation("image paths must be relative"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(SmilError::validation("image paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(SmilError::validation("image path must contain a file name"));
    }
    Ok(out.join("/"))
}

/// Reads images from files below a root directory.
#[derive(Clone, Debug)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl ImageFetcher for FsFetcher {
    fn fetch(&self, uri: &str) -> SmilResult<Vec<u8>> {
        let rel = normalize_rel_path(uri.strip_prefix("file:").unwrap_or(uri))?;
        let path = self.root.join(rel);
        let bytes = std::fs::read(&path).with_context(|| format!("read image {}", path.display()))?;
        Ok(bytes)
    }
}

/// In-memory image bytes keyed by URI.
#[derive(Clone, Debug, Default)]
pub struct MemoryFetcher {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uri: impl Into<String>, bytes: Vec<u8>) {
        self.entries.insert(uri.into(), bytes);
    }
}

impl ImageFetcher for MemoryFetcher {
    fn fetch(&self, uri: &str) -> SmilResult<Vec<u8>> {
        self.entries
            .get(uri)
            .cloned()
            .ok_or_else(|| SmilError::Other(anyhow::anyhow!("no image registered for '{uri}'")))
    }
}

/// Completion callback for [`ImageLoader::image_later`].
pub type ImageCallback = Box<dyn FnOnce(&str, RasterImage) + Send + 'static>;

enum Slot {
    Loading(Vec<ImageCallback>),
    Ready(RasterImage),
}

struct LoaderShared {
    fetcher: Arc<dyn ImageFetcher>,
    slots: Mutex<HashMap<String, Slot>>,
    cond: Condvar,
}

impl LoaderShared {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetches and decodes `uri`, substituting the broken-image placeholder
    /// on any failure, then wakes waiters and runs callbacks.
    fn load(&self, uri: &str) -> RasterImage {
        let image = match self.fetcher.fetch(uri).and_then(|bytes| decode_image(&bytes)) {
            Ok(img) => img,
            Err(err) => {
                tracing::warn!(uri, error = %err, "image failed to load, using placeholder");
                RasterImage::broken()
            }
        };
        self.complete(uri, image.clone());
        image
    }

    fn complete(&self, uri: &str, image: RasterImage) {
        let callbacks = {
            let mut slots = self.lock();
            let prev = slots.insert(uri.to_owned(), Slot::Ready(image.clone()));
            self.cond.notify_all();
            match prev {
                Some(Slot::Loading(cbs)) => cbs,
                _ => Vec::new(),
            }
        };
        for cb in callbacks {
            cb(uri, image.clone());
        }
    }
}

/// URI-keyed image cache. Concurrent requests for the same URI share one
/// fetch; everyone waiting on it is notified when it completes.
#[derive(Clone)]
pub struct ImageLoader {
    shared: Arc<LoaderShared>,
}

impl std::fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoader")
            .field("entries", &self.shared.lock().len())
            .finish()
    }
}

impl ImageLoader {
    pub fn new(fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            shared: Arc::new(LoaderShared {
                fetcher,
                slots: Mutex::new(HashMap::new()),
                cond: Condvar::new(),
            }),
        }
    }

    /// `true` when `uri` is neither cached nor being fetched.
    pub fn need_loading(&self, uri: &str) -> bool {
        !self.shared.lock().contains_key(uri)
    }

    /// Cached image for `uri`, if it finished loading.
    pub fn cached(&self, uri: &str) -> Option<RasterImage> {
        match self.shared.lock().get(uri) {
            Some(Slot::Ready(img)) => Some(img.clone()),
            _ => None,
        }
    }

    /// Loads `uri` on the calling thread, or waits for the fetch already in
    /// flight. Failures yield the broken-image placeholder.
    #[tracing::instrument(skip(self))]
    pub fn image_and_wait(&self, uri: &str) -> RasterImage {
        let mut slots = self.shared.lock();
        loop {
            match slots.get(uri) {
                Some(Slot::Ready(img)) => return img.clone(),
                Some(Slot::Loading(_)) => {
                    slots = self
                        .shared
                        .cond
                        .wait(slots)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                None => {
                    slots.insert(uri.to_owned(), Slot::Loading(Vec::new()));
                    drop(slots);
                    return self.shared.load(uri);
                }
            }
        }
    }

    /// Starts loading `uri` in the background and calls `callback` when it
    /// is available. Called right away when the image is cached. If the
    /// background fetch cannot be started, the placeholder is delivered.
    #[tracing::instrument(skip(self, callback))]
    pub fn image_later(&self, uri: &str, callback: ImageCallback) {
        let mut slots = self.shared.lock();
        match slots.get_mut(uri) {
            Some(Slot::Ready(img)) => {
                let img = img.clone();
                drop(slots);
                callback(uri, img);
                return;
            }
            Some(Slot::Loading(cbs)) => {
                cbs.push(callback);
                return;
            }
            None => {
                slots.insert(uri.to_owned(), Slot::Loading(vec![callback]));
            }
        }
        drop(slots);

        let shared = Arc::clone(&self.shared);
        let owned = uri.to_owned();
        let spawned = std::thread::Builder::new()
            .name("image-loader".into())
            .spawn(move || {
                shared.load(&owned);
            });
        if let Err(err) = spawned {
            tracing::warn!(uri, error = %err, "image fetch thread failed to start");
            self.shared.complete(uri, RasterImage::broken());
        }
    }

    /// Drops every cached image. Fetches in flight still complete.
    pub fn reset(&self) {
        self.shared
            .lock()
            .retain(|_, slot| matches!(slot, Slot::Loading(_)));
    }

    pub fn len(&self) -> usize {
        self.shared.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ImageResolver for ImageLoader {
    fn resolve(&self, href: &str) -> Option<RasterImage> {
        self.cached(href)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/loader.rs"]
mod tests;
