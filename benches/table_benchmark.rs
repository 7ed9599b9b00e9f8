use std::collections::HashSet;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use heapstore::common::config::StorageConfig;
use heapstore::recovery::MemoryLogManager;
use heapstore::table::{Column, ColumnList, ColumnType, IsolationLevel, Record, Table, Value};
use heapstore::{BufferPool, DiskManager, PageId};

criterion_group!(benches, insert_benchmark, scan_benchmark);
criterion_main!(benches);

fn open_table(dir: &tempfile::TempDir, frames: usize) -> Table {
    let config = StorageConfig::new(4096, frames);
    let dm = DiskManager::new(dir.path(), config.page_size).unwrap();
    let log = Arc::new(MemoryLogManager::new());
    let pool = Arc::new(BufferPool::new(dm, log.clone(), config).unwrap());
    let columns = ColumnList::new(vec![
        Column::new("key", ColumnType::Varchar),
        Column::new("val", ColumnType::Varchar),
    ]);
    Table::new(pool, log, 1, 1, columns, PageId::INVALID)
}

fn row(i: usize) -> Record {
    Record::new(vec![
        Value::from(format!("key{i:05}")),
        Value::from(format!("val{i:05}")),
    ])
}

pub fn insert_benchmark(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let table = open_table(&dir, 64);

    let mut i = 0;
    c.bench_function("insert", |b| {
        b.iter(|| {
            table.insert_record(row(i), 1, 0, true).unwrap();
            i += 1;
        })
    });
}

pub fn scan_benchmark(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let table = open_table(&dir, 16);
    for i in 0..20_000 {
        table.insert_record(row(i), 1, 0, false).unwrap();
    }

    let active = HashSet::new();
    c.bench_function("scan", |b| {
        b.iter(|| {
            let mut scan = table.scan();
            let mut count = 0;
            while scan
                .next_record(2, IsolationLevel::ReadCommitted, 0, &active)
                .unwrap()
                .is_some()
            {
                count += 1;
            }
            assert_eq!(count, 20_000);
        })
    });
}
