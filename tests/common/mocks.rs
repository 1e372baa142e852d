use async_trait::async_trait;
use chat_store::{
    Error, Result,
    history::{ImagePicker, ImageRef, KeyValueStore, MemoryKeyValueStore, PickedImage},
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Key-value store whose reads and writes can be switched to fail.
#[derive(Debug, Clone, Default)]
pub struct FlakyKeyValueStore {
    pub inner: MemoryKeyValueStore,
    pub fail_reads: Arc<AtomicBool>,
    pub fail_writes: Arc<AtomicBool>,
    pub writes: Arc<AtomicUsize>,
}

impl FlakyKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for FlakyKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::internal("disk unreadable"));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::internal("disk full"));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value).await
    }
}

/// Picker that replays queued results in order.
#[derive(Debug, Default)]
pub struct MockImagePicker {
    pub results: Mutex<Vec<Result<PickedImage>>>,
}

impl MockImagePicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn picking(uri: &str) -> Self {
        Self::new().then(Ok(PickedImage::Picked(ImageRef::new(uri))))
    }

    pub fn cancelling() -> Self {
        Self::new().then(Ok(PickedImage::Cancelled))
    }

    pub fn failing(error: &str) -> Self {
        Self::new().then(Err(Error::picker(error)))
    }

    pub fn then(self, result: Result<PickedImage>) -> Self {
        self.results.lock().unwrap().push(result);
        self
    }
}

#[async_trait]
impl ImagePicker for MockImagePicker {
    async fn pick_image(&self) -> Result<PickedImage> {
        let mut results = self.results.lock().unwrap();
        if results.is_empty() {
            return Ok(PickedImage::Cancelled);
        }
        results.remove(0)
    }
}
