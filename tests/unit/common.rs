// Shared fixtures for crate-level tests

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, Rgba, RgbaImage};
use std::sync::{Arc, Mutex};

use kasasagi::cache::CacheStore;
use kasasagi::markers::MarkerCompositor;
use kasasagi::pipeline::Pipeline;
use kasasagi::storage::{StorageBackend, StorageError};
use kasasagi::transform::{encode, OutputFormat};

/// Gradient image encoded as PNG
pub fn png_fixture(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    });
    encode(&DynamicImage::ImageRgba8(image), OutputFormat::Png).unwrap()
}

/// In-memory backend that serves one image for every path and records what
/// was fetched. Behaves like an object store: originals never short-circuit.
#[derive(Default)]
pub struct RecordingBackend {
    pub image: Vec<u8>,
    pub fetched: Mutex<Vec<String>>,
}

impl RecordingBackend {
    pub fn new(image: Vec<u8>) -> Self {
        Self {
            image,
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl StorageBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn fetch(&self, path: &str) -> Result<Bytes, StorageError> {
        self.fetched.lock().unwrap().push(path.to_string());
        if path.contains("missing") {
            return Err(StorageError::NotFound(path.to_string()));
        }
        if path.contains("offline") {
            return Err(StorageError::Transport {
                path: path.to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(Bytes::from(self.image.clone()))
    }

    fn stores_original(&self) -> bool {
        true
    }
}

pub fn pipeline_with(backend: Arc<RecordingBackend>, cache_dir: &std::path::Path) -> Pipeline {
    Pipeline::new(
        backend,
        CacheStore::new(cache_dir),
        Arc::new(MarkerCompositor::default()),
    )
}
