//! The store handle and its write path
//!
//! A [`Store`] owns at most one connection to the backing file. The connection
//! is opened by the first operation that needs it and released by
//! [`Store::close`]. Separate stores are fully independent, which is what tests
//! rely on for isolation.

use std::cell::{OnceCell, RefCell};
use std::collections::HashSet;

use anyhow::{anyhow, Result};
use rusqlite::params_from_iter;
use tracing::debug;

use crate::config::{ScraperwikiConfig, DEFAULT_TABLE};
use crate::database::core::{
    ensure_unique_index, quote_ident, to_storage, unique_index_name, ConnectionSettings,
    DatabaseConn, Record, Records, SchemaManager, TableChange,
};

/// Handle to one store file
pub struct Store {
    path: Option<String>,
    default_table: String,
    settings: ConnectionSettings,
    db: OnceCell<DatabaseConn>,
    /// (table, index name) pairs ensured through this handle
    known_indexes: RefCell<HashSet<(String, String)>>,
}

impl Store {
    /// Create a store handle from configuration; nothing is opened yet
    pub fn new(config: &ScraperwikiConfig) -> Self {
        Self {
            path: Some(config.database_path.clone()),
            default_table: config.default_table.clone(),
            settings: config.connection_settings(),
            db: OnceCell::new(),
            known_indexes: RefCell::new(HashSet::new()),
        }
    }

    /// Create a store handle for the file at `path` with default settings
    pub fn open_path(path: &str) -> Self {
        Self {
            path: Some(path.to_string()),
            default_table: DEFAULT_TABLE.to_string(),
            settings: ConnectionSettings::default(),
            db: OnceCell::new(),
            known_indexes: RefCell::new(HashSet::new()),
        }
    }

    /// Create a store handle backed by a private in-memory database
    pub fn in_memory() -> Self {
        Self {
            path: None,
            default_table: DEFAULT_TABLE.to_string(),
            settings: ConnectionSettings::default(),
            db: OnceCell::new(),
            known_indexes: RefCell::new(HashSet::new()),
        }
    }

    /// Path of the backing file, `None` for in-memory stores
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Table used by saves that do not name one
    pub fn default_table(&self) -> &str {
        &self.default_table
    }

    pub fn is_open(&self) -> bool {
        self.db.get().is_some()
    }

    /// The shared connection, opened on first use
    pub(crate) fn db(&self) -> Result<&DatabaseConn> {
        if let Some(db) = self.db.get() {
            return Ok(db);
        }
        let db = DatabaseConn::open(self.path.as_deref(), &self.settings)?;
        Ok(self.db.get_or_init(|| db))
    }

    /// The connection if it is currently open, without opening it
    pub(crate) fn open_db(&self) -> Option<&DatabaseConn> {
        self.db.get()
    }

    /// Release the connection
    ///
    /// Any open transaction is rolled back and remembered index state is
    /// dropped. The next operation reopens the file.
    pub fn close(&mut self) -> Result<()> {
        self.forget_all_indexes();
        match self.db.take() {
            Some(db) => {
                debug!("closing store");
                db.close()
            }
            None => Ok(()),
        }
    }

    /// Persist one record or a batch of records
    ///
    /// With an empty `unique_keys` every record is appended. Otherwise a unique
    /// index over the keys is ensured and a record whose keys match an existing
    /// row updates that row's other columns. Tables and columns are created as
    /// needed. The whole call is one transaction, nested into the caller's when
    /// one is already open.
    pub fn save(
        &self,
        unique_keys: &[&str],
        data: impl Into<Records>,
        table_name: Option<&str>,
    ) -> Result<()> {
        let Records(records) = data.into();
        let table = table_name.unwrap_or(&self.default_table);

        let tx = self.transaction()?;
        for record in &records {
            if record.is_empty() {
                debug!("skipping empty record for table {}", table);
                continue;
            }
            self.save_record(unique_keys, record, table)?;
        }
        tx.commit()
    }

    fn save_record(&self, unique_keys: &[&str], record: &Record, table: &str) -> Result<()> {
        if let Some(missing) = unique_keys.iter().find(|k| !record.contains(k)) {
            return Err(anyhow!(
                "Unique key '{}' is not a field of the record being saved to '{}'",
                missing,
                table
            ));
        }

        let db = self.db()?;
        let schema = SchemaManager::new(&db.conn);
        match schema.ensure_table(table, record)? {
            TableChange::Created => self.forget_indexes(table),
            TableChange::Altered(columns) => {
                debug!("added columns {:?} to {}", columns, table)
            }
            TableChange::Unchanged => {}
        }

        self.ensure_index(table, unique_keys)?;

        let sql = insert_statement(table, record, unique_keys);
        let values = record.iter().map(|(_, value)| to_storage(value).0);
        let mut stmt = db.conn.prepare_cached(&sql)?;
        stmt.execute(params_from_iter(values))?;
        Ok(())
    }

    /// Ensure the unique index for `keys`, skipping the lookup for indexes this
    /// handle has already ensured
    pub(crate) fn ensure_index(&self, table: &str, keys: &[&str]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let entry = (table.to_string(), unique_index_name(table, keys));
        if self.known_indexes.borrow().contains(&entry) {
            return Ok(());
        }
        if ensure_unique_index(&self.db()?.conn, table, keys)? {
            debug!("created unique index {}", entry.1);
        }
        self.known_indexes.borrow_mut().insert(entry);
        Ok(())
    }

    pub(crate) fn forget_all_indexes(&self) {
        self.known_indexes.borrow_mut().clear();
    }

    /// A freshly created table has no indexes, whatever was remembered before
    pub(crate) fn forget_indexes(&self, table: &str) {
        self.known_indexes
            .borrow_mut()
            .retain(|(known_table, _)| known_table != table);
    }
}

/// INSERT for a record, turned into an upsert on the key columns when given
fn insert_statement(table: &str, record: &Record, unique_keys: &[&str]) -> String {
    let columns: Vec<String> = record.columns().map(quote_ident).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        columns.join(", "),
        placeholders.join(", ")
    );

    if !unique_keys.is_empty() {
        let keys: Vec<String> = unique_keys.iter().map(|k| quote_ident(k)).collect();
        let updates: Vec<String> = record
            .columns()
            .filter(|c| !unique_keys.contains(c))
            .map(|c| format!("{0} = excluded.{0}", quote_ident(c)))
            .collect();
        if updates.is_empty() {
            sql.push_str(&format!(" ON CONFLICT ({}) DO NOTHING", keys.join(", ")));
        } else {
            sql.push_str(&format!(
                " ON CONFLICT ({}) DO UPDATE SET {}",
                keys.join(", "),
                updates.join(", ")
            ));
        }
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::core::Value;
    use chrono::NaiveDate;
    use rusqlite::Connection;

    fn file_store() -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir
            .path()
            .join("scraperwiki.sqlite")
            .to_str()
            .unwrap()
            .to_string();
        (dir, path)
    }

    fn count(store: &Store, table: &str) -> i64 {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        store.execute(&sql, ()).unwrap().data[0][0].as_i64().unwrap()
    }

    #[test]
    fn test_lazy_open_and_close() {
        let (_dir, path) = file_store();
        let mut store = Store::open_path(&path);
        assert!(!store.is_open());
        assert!(!std::path::Path::new(&path).exists());

        store.save(&[], Record::new().with("a", 1), None).unwrap();
        assert!(store.is_open());

        store.close().unwrap();
        assert!(!store.is_open());

        // reopened on demand
        assert_eq!(count(&store, "swdata"), 1);
    }

    #[test]
    fn test_insert_statement() {
        let record = Record::new().with("id", 1).with("v", 2);
        assert_eq!(
            insert_statement("t", &record, &[]),
            "INSERT INTO \"t\" (\"id\", \"v\") VALUES (?1, ?2)"
        );
        assert_eq!(
            insert_statement("t", &record, &["id"]),
            "INSERT INTO \"t\" (\"id\", \"v\") VALUES (?1, ?2) ON CONFLICT (\"id\") DO UPDATE SET \"v\" = excluded.\"v\""
        );
        assert_eq!(
            insert_statement("t", &Record::new().with("id", 1), &["id"]),
            "INSERT INTO \"t\" (\"id\") VALUES (?1) ON CONFLICT (\"id\") DO NOTHING"
        );
    }

    #[test]
    fn test_upsert_updates_existing_row() {
        let store = Store::in_memory();
        store
            .save(&["id"], Record::new().with("id", 1).with("v", 1), None)
            .unwrap();
        store
            .save(&["id"], Record::new().with("id", 1).with("v", 2), None)
            .unwrap();

        let rows = store.select("* FROM swdata").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("v"), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_upsert_keeps_columns_not_in_record() {
        let store = Store::in_memory();
        store
            .save(
                &["id"],
                Record::new().with("id", 1).with("a", "x").with("b", "y"),
                None,
            )
            .unwrap();
        store
            .save(&["id"], Record::new().with("id", 1).with("a", "z"), None)
            .unwrap();

        let rows = store.select("* FROM swdata").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("a"), Some(&Value::Text("z".to_string())));
        assert_eq!(rows[0].get("b"), Some(&Value::Text("y".to_string())));
    }

    #[test]
    fn test_append_without_keys() {
        let store = Store::in_memory();
        store.save(&[], Record::new().with("a", 1), None).unwrap();
        store.save(&[], Record::new().with("a", 1), None).unwrap();
        assert_eq!(count(&store, "swdata"), 2);
    }

    #[test]
    fn test_save_batch() {
        let store = Store::in_memory();
        let rows: Vec<Record> = (0..10)
            .map(|i| Record::new().with("id", i).with("test", i * 2).with("s", "abc"))
            .collect();
        store.save(&["id"], rows.clone(), None).unwrap();
        store.save(&["id"], rows, None).unwrap();
        assert_eq!(count(&store, "swdata"), 10);

        store.save(&["id"], Vec::<Record>::new(), None).unwrap();
        assert_eq!(count(&store, "swdata"), 10);
    }

    #[test]
    fn test_save_twice_never_duplicates_columns() {
        let store = Store::in_memory();
        for i in 0..3 {
            store
                .save(
                    &["i"],
                    Record::new().with("i", i).with("a\u{a0}b", i),
                    None,
                )
                .unwrap();
        }
        let db = store.db().unwrap();
        let columns = SchemaManager::new(&db.conn).table_columns("swdata").unwrap();
        assert_eq!(columns.len(), 2);
    }

    #[test]
    fn test_default_table_not_sticky() {
        let store = Store::in_memory();
        store
            .save(
                &["id"],
                Record::new().with("id", 1).with("stuff", 1),
                Some("sticky\u{1234}"),
            )
            .unwrap();
        store
            .save(&["id"], Record::new().with("id", 2).with("stuff", 2), None)
            .unwrap();

        let rows = store.select("* FROM \"sticky\u{1234}\"").unwrap();
        assert_eq!(rows, vec![Record::new().with("id", 1).with("stuff", 1)]);
        assert_eq!(count(&store, "swdata"), 1);
    }

    #[test]
    fn test_unique_index_created_once() {
        let store = Store::in_memory();
        for i in 0..3 {
            store
                .save(
                    &["foo\u{dc}", "bar\u{cd}"],
                    Record::new().with("foo\u{dc}", i).with("bar\u{cd}", 9),
                    Some("Harpo\u{bb}"),
                )
                .unwrap();
        }

        let indexes = store.execute("PRAGMA index_list(\"Harpo\u{bb}\")", ()).unwrap();
        assert_eq!(indexes.data.len(), 1);
        let name_col = indexes.keys.iter().position(|k| k == "name").unwrap();
        let unique_col = indexes.keys.iter().position(|k| k == "unique").unwrap();
        assert_eq!(
            indexes.data[0][name_col],
            Value::Text("Harpo_foo_bar_unique".to_string())
        );
        assert_eq!(indexes.data[0][unique_col], Value::Integer(1));

        let info = store
            .execute("PRAGMA index_info(Harpo_foo_bar_unique)", ())
            .unwrap();
        assert_eq!(info.keys, vec!["seqno", "cid", "name"]);
        assert_eq!(info.data[0][2], Value::Text("foo\u{dc}".to_string()));
        assert_eq!(info.data[1][2], Value::Text("bar\u{cd}".to_string()));
    }

    #[test]
    fn test_no_index_without_keys() {
        let store = Store::in_memory();
        store
            .save(&[], Record::new().with("foo\u{de}", 3), Some("Chico\u{cc}"))
            .unwrap();
        let observed = store
            .execute("PRAGMA index_list(\"Chico\u{cc}\")", ())
            .unwrap();
        assert_eq!(
            observed.keys,
            vec!["seq", "name", "unique", "origin", "partial"]
        );
        assert!(observed.data.is_empty());
    }

    #[test]
    fn test_colliding_index_name_reported() {
        let store = Store::in_memory();
        store
            .save(&["id"], Record::new().with("id", 1), Some("Chico\u{bb}"))
            .unwrap();
        let err = store
            .save(&["id"], Record::new().with("id", 1), Some("Chico"))
            .unwrap_err();
        assert!(err.to_string().contains("Chico_id_unique"));
    }

    #[test]
    fn test_missing_unique_key_rejected() {
        let store = Store::in_memory();
        let err = store
            .save(&["id"], Record::new().with("name", "x"), None)
            .unwrap_err();
        assert!(err.to_string().contains("id"));
        let db = store.db().unwrap();
        assert!(!SchemaManager::new(&db.conn).table_exists("swdata").unwrap());
    }

    #[test]
    fn test_first_save_adds_column_to_existing_table() {
        let (_dir, path) = file_store();
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute("CREATE TABLE swdata (a TEXT)", []).unwrap();
            conn.execute("INSERT INTO swdata VALUES ('boo\u{aa}')", [])
                .unwrap();
        }

        // first operation of a fresh handle
        let store = Store::open_path(&path);
        store
            .save(
                &["id"],
                Record::new()
                    .with("id", 1)
                    .with("a", "bar\u{aa}")
                    .with("b", "foo\u{aa}"),
                None,
            )
            .unwrap();

        let rows = store.select("a, b FROM swdata ORDER BY rowid").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("b"), Some(&Value::Null));
        assert_eq!(rows[1].get("b"), Some(&Value::Text("foo\u{aa}".to_string())));
    }

    #[test]
    fn test_table_created_by_other_handle() {
        let (_dir, path) = file_store();
        let first = Store::open_path(&path);
        let second = Store::open_path(&path);

        second.save(&[], Record::new().with("a", 1), None).unwrap();
        first
            .save(&[], Record::new().with("a", 2).with("b", 3), None)
            .unwrap();
        second
            .save(&[], Record::new().with("c", 4), None)
            .unwrap();

        let result = first.execute("SELECT * FROM swdata", ()).unwrap();
        assert_eq!(result.keys, vec!["a", "b", "c"]);
        assert_eq!(result.data.len(), 3);
    }

    #[test]
    fn test_save_after_drop() {
        let store = Store::in_memory();
        store
            .save(&["id"], Record::new().with("id", 7), Some("dropper\u{aa}"))
            .unwrap();
        store.execute("DROP TABLE \"dropper\u{aa}\"", ()).unwrap();
        store
            .save(&["id"], Record::new().with("id", 9), Some("dropper\u{aa}"))
            .unwrap();
        store
            .save(&["id"], Record::new().with("id", 9), Some("dropper\u{aa}"))
            .unwrap();
        assert_eq!(count(&store, "dropper\u{aa}"), 1);
    }

    #[test]
    fn test_value_kinds_stored() {
        let (_dir, path) = file_store();
        let store = Store::open_path(&path);
        let date = NaiveDate::from_ymd_opt(1991, 3, 30).unwrap();
        let datetime = NaiveDate::from_ymd_opt(1990, 3, 30)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        store
            .save(
                &[],
                Record::new()
                    .with("yes", true)
                    .with("no", false)
                    .with("birthday\u{aa}", date)
                    .with("at", datetime)
                    .with("raw", vec![0u8, 0x22])
                    .with("name", "LeTourneau\u{1234}"),
                Some("kinds"),
            )
            .unwrap();

        let raw = Connection::open(&path).unwrap();
        let row: (i64, i64, String, String, Vec<u8>, String) = raw
            .query_row(
                "SELECT \"yes\", \"no\", \"birthday\u{aa}\", \"at\", \"raw\", \"name\" FROM kinds",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?)),
            )
            .unwrap();
        assert_eq!(
            row,
            (
                1,
                0,
                "1991-03-30".to_string(),
                "1990-03-30 00:00:00.000000".to_string(),
                vec![0u8, 0x22],
                "LeTourneau\u{1234}".to_string()
            )
        );
    }

    #[test]
    fn test_config_default_table() {
        let (_dir, path) = file_store();
        let config = ScraperwikiConfig {
            database_path: path,
            default_table: "rows".to_string(),
            ..Default::default()
        };
        let store = Store::new(&config);
        store.save(&[], Record::new().with("a", 1), None).unwrap();
        assert_eq!(store.default_table(), "rows");
        assert_eq!(count(&store, "rows"), 1);
    }

    /// Counts WARN events seen while installed as the default subscriber
    struct WarnCounter(std::sync::Arc<std::sync::atomic::AtomicUsize>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCounter {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
        }
    }

    fn count_warnings(f: impl FnOnce()) -> usize {
        use tracing_subscriber::layer::SubscriberExt;

        let warnings = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(warnings.clone()));
        tracing::subscriber::with_default(subscriber, f);
        warnings.load(std::sync::atomic::Ordering::SeqCst)
    }

    #[test]
    fn test_first_save_emits_no_warnings() {
        let (_dir, path) = file_store();
        let warnings = count_warnings(|| {
            let store = Store::open_path(&path);
            store
                .save(
                    &["id"],
                    Record::new().with("id", 1).with("name", "first"),
                    None,
                )
                .unwrap();
            store
                .save(
                    &["id"],
                    Record::new().with("id", 1).with("extra", 2.5),
                    None,
                )
                .unwrap();
            store.save_var("seen", true).unwrap();
        });
        assert_eq!(warnings, 0);
    }

    #[test]
    #[allow(deprecated)]
    fn test_deprecated_commit_warns() {
        let warnings = count_warnings(|| Store::in_memory().commit());
        assert_eq!(warnings, 1);
    }
}
