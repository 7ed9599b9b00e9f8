//! Property tests for the slotted table page.

use heapstore::common::PageId;
use heapstore::storage::page::{Page, TablePage, PAGE_HEADER_SIZE, SLOT_SIZE};
use heapstore::table::{Column, ColumnList, ColumnType, Record, Value};
use heapstore::{Error, Rid};
use proptest::prelude::*;

const PAGE_SIZE: usize = 1024;

fn schema() -> ColumnList {
    ColumnList::new(vec![
        Column::new("id", ColumnType::BigInt),
        Column::new("name", ColumnType::Varchar),
        Column::new("flag", ColumnType::Bool),
    ])
}

fn value_row() -> impl Strategy<Value = Record> {
    (
        any::<i64>(),
        prop_oneof![Just(None), "[a-z]{0,80}".prop_map(Some)],
        any::<Option<bool>>(),
    )
        .prop_map(|(id, name, flag)| {
            Record::new(vec![
                Value::BigInt(id),
                name.map_or(Value::Null, Value::from),
                flag.map_or(Value::Null, Value::Bool),
            ])
        })
}

proptest! {
    #[test]
    fn free_space_accounts_for_every_insert(rows in proptest::collection::vec(value_row(), 1..40)) {
        let mut page = Page::new(PAGE_SIZE);
        let mut table_page = TablePage::new(&mut page);
        table_page.init();

        let mut used = 0;
        let mut inserted = 0;
        for mut row in rows {
            let size = row.size();
            match table_page.insert_record(&mut row, 1, 0) {
                Ok(_) => {
                    used += size;
                    inserted += 1;
                }
                Err(Error::RecordTooLarge { .. }) => {
                    prop_assert!(table_page.free_space() < size);
                    break;
                }
                Err(e) => return Err(TestCaseError::fail(e.to_string())),
            }
            let expected = PAGE_SIZE
                .saturating_sub(PAGE_HEADER_SIZE + inserted * SLOT_SIZE + used + SLOT_SIZE);
            prop_assert_eq!(table_page.free_space(), expected);
        }
        prop_assert_eq!(table_page.record_count() as usize, inserted);
    }

    #[test]
    fn records_read_back_unchanged(rows in proptest::collection::vec(value_row(), 1..10)) {
        let columns = schema();
        let mut page = Page::new(PAGE_SIZE);
        let mut table_page = TablePage::new(&mut page);
        table_page.init();

        for (i, row) in rows.iter().enumerate() {
            let mut stored = row.clone();
            let Ok(slot_id) = table_page.insert_record(&mut stored, 7, i as u32) else {
                break;
            };
            let rid = Rid::new(PageId::new(0), slot_id);
            let read = table_page.get_record(rid, &columns).unwrap();
            prop_assert_eq!(read.values(), row.values());
            prop_assert_eq!(read.xmin(), 7);
            prop_assert_eq!(read.cid(), i as u32);
            prop_assert!(!read.is_deleted());
        }
    }
}
