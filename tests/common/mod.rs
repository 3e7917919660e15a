#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use mobile_optimizer::models::{ObjectRecord, PutReceipt};
use mobile_optimizer::services::storage::{PutOptions, StorageService};
use mobile_optimizer::{PipelineConfig, TranscodeSettings};
use std::collections::{BTreeMap, HashSet};
use std::io::Cursor;
use std::path::Path;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWriteExt, DuplexStream};

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_encoding: Option<String>,
    pub content_type: Option<String>,
}

/// Bucket kept in memory, with switches for injecting failures.
#[derive(Default)]
pub struct MemoryStorage {
    pub(crate) objects: Mutex<BTreeMap<String, StoredObject>>,
    pub fail_listing: bool,
    pub fail_gets: HashSet<String>,
    /// How long a failing get takes before it errors.
    pub get_failure_delay: Duration,
    /// Keys whose stream hands out a few bytes and then never finishes.
    pub stall_gets: HashSet<String>,
    pub(crate) stalled_writers: Mutex<Vec<DuplexStream>>,
    pub fail_puts: HashSet<String>,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
}

impl MemoryStorage {
    pub fn with_objects(objects: &[(&str, Vec<u8>)]) -> Self {
        let storage = Self::default();
        for (key, data) in objects {
            storage.insert(key, data.clone());
        }
        storage
    }

    pub fn insert(&self, key: &str, data: Vec<u8>) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                data,
                content_encoding: None,
                content_type: None,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageService for MemoryStorage {
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectRecord>> {
        if self.fail_listing {
            return Err(anyhow!("AccessDenied"));
        }
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, obj)| ObjectRecord::new(key.clone(), obj.data.len() as i64))
            .collect())
    }

    async fn get_object_stream(&self, key: &str) -> Result<Pin<Box<dyn AsyncRead + Send>>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_gets.contains(key) {
            tokio::time::sleep(self.get_failure_delay).await;
            return Err(anyhow!("connection reset while reading {}", key));
        }
        let data = self
            .get(key)
            .ok_or_else(|| anyhow!("NoSuchKey: {}", key))?
            .data;
        if self.stall_gets.contains(key) {
            let (reader, mut writer) = tokio::io::duplex(64);
            writer.write_all(&data[..data.len().min(17)]).await?;
            // Keeping the writer open leaves the reader pending forever.
            self.stalled_writers.lock().unwrap().push(writer);
            let reader: Pin<Box<dyn AsyncRead + Send>> = Box::pin(reader);
            return Ok(reader);
        }
        let reader: Pin<Box<dyn AsyncRead + Send>> = Box::pin(Cursor::new(data));
        Ok(reader)
    }

    async fn put_object(
        &self,
        key: &str,
        data: Vec<u8>,
        options: PutOptions,
    ) -> Result<PutReceipt> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.contains(key) {
            return Err(anyhow!("SlowDown"));
        }
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                data,
                content_encoding: options.content_encoding,
                content_type: options.content_type,
            },
        );
        Ok(PutReceipt {
            key: key.to_string(),
            location: format!("memory://bucket/{}", key),
            e_tag: None,
        })
    }
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 251) as u8, (y % 251) as u8, 90])
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Jpeg)
        .unwrap();
    out.into_inner()
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([200, 10, 10]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

pub fn test_config(root: &Path) -> PipelineConfig {
    let _ = tracing_subscriber::fmt::try_init();
    PipelineConfig {
        raw_dir: root.join("raw"),
        out_dir: root.join("out"),
        concurrency: 4,
        transcode: TranscodeSettings::default(),
        ..PipelineConfig::default()
    }
}
