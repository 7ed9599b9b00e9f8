//! Buffer Pool - the page caching layer between tables and disk.
//!
//! The [`BufferPool`] provides:
//! - Page caching keyed by `(table_oid, page_id)`
//! - A bounded regular partition with a pluggable eviction policy
//! - An unbounded system partition for catalog tables, never evicted
//! - Write-ahead logging on every write-back: the log is made durable up
//!   to a page's LSN before the page's bytes reach disk

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::buffer::replacer::{EvictionPolicy, Replacer};
use crate::buffer::{BufferPoolStats, Frame, PageGuard, StatsSnapshot};
use crate::common::config::{StorageConfig, SYSTEM_DATABASE_OID};
use crate::common::{Error, FrameId, Oid, PageId, Result};
use crate::recovery::LogManager;
use crate::storage::page::{Page, TablePageHeader};
use crate::storage::DiskManager;

/// One independently locked set of frames.
struct Partition {
    /// Resident pages; a frame's index is its `FrameId`.
    frames: Vec<Frame>,

    /// Maps `(table_oid, page_id)` to the frame holding the page.
    page_table: HashMap<(Oid, PageId), FrameId>,

    /// Eviction policy; `None` for the unbounded system partition.
    replacer: Option<Replacer>,

    /// Maximum number of frames; `None` for unbounded.
    capacity: Option<usize>,

    is_system: bool,
}

impl Partition {
    fn regular(config: &StorageConfig) -> Self {
        Self {
            frames: Vec::with_capacity(config.buffer_pool_size),
            page_table: HashMap::new(),
            replacer: Some(Replacer::new(config.replacer, config.buffer_pool_size)),
            capacity: Some(config.buffer_pool_size),
            is_system: false,
        }
    }

    fn system() -> Self {
        Self {
            frames: Vec::new(),
            page_table: HashMap::new(),
            replacer: None,
            capacity: None,
            is_system: true,
        }
    }

    fn is_full(&self) -> bool {
        self.capacity
            .is_some_and(|capacity| self.frames.len() >= capacity)
    }

    fn touch(&mut self, frame_id: FrameId) {
        if let Some(replacer) = self.replacer.as_mut() {
            replacer.access(frame_id);
        }
    }

    /// Forget every resident page without writing anything.
    fn reset(&mut self) {
        self.frames.clear();
        self.page_table.clear();
        if let Some(replacer) = self.replacer.as_mut() {
            replacer.reset();
        }
    }
}

/// Caches table pages for every table of every database.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                        BufferPool                           │
/// │  ┌───────────────────────────┐ ┌─────────────────────────┐  │
/// │  │ regular: Mutex<Partition> │ │ system: Mutex<Partition>│  │
/// │  │  page_table ─▶ frames     │ │  page_table ─▶ frames   │  │
/// │  │  replacer (LRU | FIFO)    │ │  (unbounded)            │  │
/// │  └───────────────────────────┘ └─────────────────────────┘  │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐   │
/// │  │  ownership   │  │ log_manager  │  │  disk_manager    │   │
/// │  │ table → db   │  │ flush_page() │  │     Mutex        │   │
/// │  └──────────────┘  └──────────────┘  └──────────────────┘   │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// - `regular` / `system`: one `Mutex` per partition. A [`PageGuard`] holds
///   its partition's lock, so eviction, flush and misses are serialized and
///   a page can never be written back while someone is mutating it.
/// - `ownership`: `RwLock`, written once per table
/// - `disk_manager`: `Mutex`, single-threaded I/O
/// - `stats`: No lock, all atomic counters
///
/// Lock order is partition → ownership → disk → log manager. A caller may
/// hold at most one guard per partition. When it needs both, it takes the
/// regular guard first and the system guard second, never the reverse.
/// [`is_resident`](Self::is_resident) and
/// [`resident_page_count`](Self::resident_page_count) lock both partitions
/// and must not be called while holding any guard.
///
/// # Usage
/// ```ignore
/// let pool = BufferPool::new(disk_manager, log_manager, StorageConfig::default())?;
///
/// let mut guard = pool.new_page(table_oid, db_oid, PageId::new(0))?;
/// guard.table_page().init();
/// drop(guard);
///
/// let mut guard = pool.get_page(table_oid, db_oid, PageId::new(0))?;
/// let count = guard.table_page().record_count();
/// ```
pub struct BufferPool {
    regular: Mutex<Partition>,
    system: Mutex<Partition>,

    /// Database of every table seen so far; locates its file on write-back.
    ownership: RwLock<HashMap<Oid, Oid>>,

    disk_manager: Mutex<DiskManager>,
    log_manager: Arc<dyn LogManager>,

    stats: BufferPoolStats,
    config: StorageConfig,
}

impl BufferPool {
    /// Create a buffer pool.
    ///
    /// # Errors
    /// `Error::InvalidConfig` if `config` fails validation or its page size
    /// differs from the disk manager's.
    pub fn new(
        disk_manager: DiskManager,
        log_manager: Arc<dyn LogManager>,
        config: StorageConfig,
    ) -> Result<Self> {
        config.validate()?;
        if disk_manager.page_size() != config.page_size {
            return Err(Error::InvalidConfig(format!(
                "disk manager page size {} does not match configured page size {}",
                disk_manager.page_size(),
                config.page_size
            )));
        }

        Ok(Self {
            regular: Mutex::new(Partition::regular(&config)),
            system: Mutex::new(Partition::system()),
            ownership: RwLock::new(HashMap::new()),
            disk_manager: Mutex::new(disk_manager),
            log_manager,
            stats: BufferPoolStats::new(),
            config,
        })
    }

    // ========================================================================
    // Public API: Fetch and create pages
    // ========================================================================

    /// Fetch page `page_id` of `table_oid`, reading it from disk on a miss.
    ///
    /// A miss on a full regular partition evicts a victim first.
    ///
    /// # Errors
    /// - `Error::PageNotFound` if the page doesn't exist on disk
    /// - I/O errors from reading the page or writing back the victim
    pub fn get_page(&self, table_oid: Oid, db_oid: Oid, page_id: PageId) -> Result<PageGuard<'_>> {
        self.register_owner(table_oid, db_oid);
        let mut partition = self.partition(db_oid);
        let key = (table_oid, page_id);

        let frame_id = match partition.page_table.get(&key).copied() {
            Some(frame_id) => {
                BufferPoolStats::bump(&self.stats.cache_hits);
                partition.touch(frame_id);
                frame_id
            }
            None => {
                BufferPoolStats::bump(&self.stats.cache_misses);
                let mut page = Page::new(self.config.page_size);
                {
                    let dm = self.disk_manager.lock();
                    let path = dm.file_path(db_oid, table_oid);
                    dm.read_page(&path, page_id, page.load_slice())?;
                }
                BufferPoolStats::bump(&self.stats.pages_read);
                self.add_to_buffer(&mut partition, table_oid, page_id, page)?
            }
        };

        Ok(Self::guard(partition, table_oid, page_id, frame_id))
    }

    /// Create page `page_id` of `table_oid`.
    ///
    /// An empty table page (no records, no successor) is written to disk
    /// first so the file covers the page. The returned page holds the same
    /// bytes and is clean.
    ///
    /// # Errors
    /// - `Error::PageAlreadyResident` if the page is cached; nothing is written
    /// - I/O errors from writing the placeholder or writing back a victim
    pub fn new_page(&self, table_oid: Oid, db_oid: Oid, page_id: PageId) -> Result<PageGuard<'_>> {
        self.register_owner(table_oid, db_oid);
        let mut partition = self.partition(db_oid);
        let key = (table_oid, page_id);
        if partition.page_table.contains_key(&key) {
            return Err(Error::PageAlreadyResident { table_oid, page_id });
        }

        let mut page = Page::new(self.config.page_size);
        TablePageHeader::empty(self.config.page_size).write_to(page.load_slice());
        {
            let dm = self.disk_manager.lock();
            let path = dm.file_path(db_oid, table_oid);
            dm.write_page(&path, page_id, page.as_slice())?;
        }

        let frame_id = self.add_to_buffer(&mut partition, table_oid, page_id, page)?;
        debug!("new {} of table {} in {}", page_id, table_oid, frame_id);

        Ok(Self::guard(partition, table_oid, page_id, frame_id))
    }

    // ========================================================================
    // Public API: Flush and clear
    // ========================================================================

    /// Write back every dirty page of the regular partition and, unless
    /// `regular_only`, of the system partition. Flushed partitions are
    /// emptied afterwards.
    ///
    /// Clean pages are not written.
    pub fn flush(&self, regular_only: bool) -> Result<()> {
        self.flush_partition(&mut self.regular.lock())?;
        if !regular_only {
            self.flush_partition(&mut self.system.lock())?;
        }
        Ok(())
    }

    /// Drop every resident page without writing it back.
    ///
    /// Unflushed changes are lost, as after a crash.
    pub fn clear(&self) {
        self.regular.lock().reset();
        self.system.lock().reset();
        debug!("buffer pool cleared");
    }

    // ========================================================================
    // Public API: Introspection
    // ========================================================================

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    #[inline]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn log_manager(&self) -> &Arc<dyn LogManager> {
        &self.log_manager
    }

    /// Number of resident pages across both partitions.
    ///
    /// Deadlocks if the calling thread holds a [`PageGuard`].
    pub fn resident_page_count(&self) -> usize {
        self.regular.lock().frames.len() + self.system.lock().frames.len()
    }

    /// Whether page `page_id` of `table_oid` is cached in either partition.
    ///
    /// Deadlocks if the calling thread holds a [`PageGuard`].
    pub fn is_resident(&self, table_oid: Oid, page_id: PageId) -> bool {
        let key = (table_oid, page_id);
        self.regular.lock().page_table.contains_key(&key)
            || self.system.lock().page_table.contains_key(&key)
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn partition(&self, db_oid: Oid) -> MutexGuard<'_, Partition> {
        if db_oid == SYSTEM_DATABASE_OID {
            self.system.lock()
        } else {
            self.regular.lock()
        }
    }

    fn guard<'a>(
        partition: MutexGuard<'a, Partition>,
        table_oid: Oid,
        page_id: PageId,
        frame_id: FrameId,
    ) -> PageGuard<'a> {
        let page = MutexGuard::map(partition, |p| &mut p.frames[frame_id.index()].page);
        PageGuard::new(table_oid, page_id, frame_id, page)
    }

    fn register_owner(&self, table_oid: Oid, db_oid: Oid) {
        if self.ownership.read().get(&table_oid) == Some(&db_oid) {
            return;
        }
        self.ownership.write().insert(table_oid, db_oid);
    }

    fn owner(&self, table_oid: Oid) -> Result<Oid> {
        self.ownership
            .read()
            .get(&table_oid)
            .copied()
            .ok_or(Error::TableNotFound(table_oid))
    }

    /// Place `page` in the partition, evicting a victim if it is full.
    fn add_to_buffer(
        &self,
        partition: &mut Partition,
        table_oid: Oid,
        page_id: PageId,
        page: Page,
    ) -> Result<FrameId> {
        let frame_id = if partition.is_full() {
            let victim = partition
                .replacer
                .as_mut()
                .and_then(|replacer| replacer.evict())
                .ok_or(Error::NoFreeFrames)?;

            if let Err(e) = self.write_back(partition.is_system, &mut partition.frames[victim.index()]) {
                // Keep the victim resident and tracked
                partition.touch(victim);
                return Err(e);
            }

            let old_key = partition.frames[victim.index()].key();
            partition.page_table.remove(&old_key);
            partition.frames[victim.index()] = Frame::new(table_oid, page_id, page);
            BufferPoolStats::bump(&self.stats.evictions);
            debug!(
                "evicted {} of table {} from {}",
                old_key.1, old_key.0, victim
            );
            victim
        } else {
            partition.frames.push(Frame::new(table_oid, page_id, page));
            FrameId::new(partition.frames.len() - 1)
        };

        partition.page_table.insert((table_oid, page_id), frame_id);
        partition.touch(frame_id);
        Ok(frame_id)
    }

    fn flush_partition(&self, partition: &mut Partition) -> Result<()> {
        let is_system = partition.is_system;
        for frame in partition.frames.iter_mut() {
            self.write_back(is_system, frame)?;
        }
        debug!(
            "flushed {} {} pages",
            partition.frames.len(),
            if is_system { "system" } else { "regular" }
        );
        partition.reset();
        Ok(())
    }

    /// Write a dirty frame to disk, making the log durable first.
    ///
    /// # Panics
    /// Panics if the frame's table belongs to the other partition.
    fn write_back(&self, is_system: bool, frame: &mut Frame) -> Result<()> {
        let table_oid = frame.table_oid();
        let db_oid = self.owner(table_oid)?;
        assert_eq!(
            db_oid == SYSTEM_DATABASE_OID,
            is_system,
            "table {} of database {} flushed through the wrong partition",
            table_oid,
            db_oid
        );

        if !frame.is_dirty() {
            return Ok(());
        }

        let page_id = frame.page_id();
        let page_lsn = TablePageHeader::from_bytes(frame.page.as_slice()).page_lsn;
        self.log_manager.flush_page(table_oid, page_id, page_lsn)?;
        BufferPoolStats::bump(&self.stats.log_flushes);
        let durable = self.log_manager.durable_lsn();
        if durable < page_lsn {
            warn!(
                "writing {} of table {} with {} ahead of durable log {}",
                page_id, table_oid, page_lsn, durable
            );
        }

        {
            let dm = self.disk_manager.lock();
            let path = dm.file_path(db_oid, table_oid);
            dm.write_page(&path, page_id, frame.page.as_slice())?;
        }
        frame.page.clear_dirty();
        BufferPoolStats::bump(&self.stats.pages_written);
        debug!("wrote {} of table {} at {}", page_id, table_oid, page_lsn);
        Ok(())
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("config", &self.config)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}
