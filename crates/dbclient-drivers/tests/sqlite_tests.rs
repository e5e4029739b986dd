#![cfg(feature = "sqlite")]

/// Integration tests for the SQLite provider driven through CommandAssembler
use dbclient_drivers::sqlite::SqliteProvider;
use dbclient_drivers::{
    CommandAssembler, CommandKind, ConnectionSettings, DbType, StreamOptions, TypeHint, Value,
    load_settings,
};
use indoc::formatdoc;
use pretty_assertions::assert_eq;
use std::sync::{Arc, Once};
use tempfile::TempDir;

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Test database on disk; every execution opens its own connection
struct TestDatabase {
    _dir: TempDir,
    settings: Arc<ConnectionSettings>,
}

impl TestDatabase {
    fn new() -> Self {
        init_tracing();
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("orders.db");
        let settings = ConnectionSettings::new(Arc::new(SqliteProvider::new()))
            .with_connection_string("DefaultConnection", &format!("Data Source={}", path.display()));
        let db = Self {
            _dir: dir,
            settings: Arc::new(settings),
        };

        for statement in [
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, active BOOLEAN NOT NULL)",
            "INSERT INTO users VALUES (1, 'alice', 1), (2, 'bob', 0), (3, 'carol', 1), (4, 'dave', 1)",
        ] {
            db.assembler(statement)
                .execute_non_query()
                .expect("Failed to set up schema");
        }
        db
    }

    fn assembler(&self, sql: &str) -> CommandAssembler {
        CommandAssembler::new(Arc::clone(&self.settings)).with_command_text(sql)
    }
}

fn names(table: &dbclient_drivers::DataTable) -> Vec<String> {
    table
        .column_values("name")
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect()
}

#[test]
fn test_in_list_expansion_selects_matching_rows() {
    let db = TestDatabase::new();
    let mut assembler =
        db.assembler("SELECT name FROM users WHERE id IN (@ids) AND active = @active ORDER BY id");
    assembler
        .bindings_mut()
        .add_value("ids", vec![1, 2, 3])
        .unwrap()
        .add_value("active", true)
        .unwrap();

    let table = assembler.materialize_table().unwrap();

    assert_eq!(names(&table), vec!["alice", "carol"]);
}

#[test]
fn test_bare_placeholder_gets_parentheses() {
    let db = TestDatabase::new();
    let mut assembler = db.assembler("SELECT COUNT(*) FROM users WHERE name IN :names");
    assembler
        .bindings_mut()
        .add("names", vec!["bob", "dave", "zed"], TypeHint::of(DbType::String))
        .unwrap();

    assert_eq!(assembler.execute_scalar().unwrap(), Value::Int64(2));
}

#[test]
fn test_empty_list_matches_nothing() {
    let db = TestDatabase::new();
    let mut assembler = db.assembler("SELECT COUNT(*) FROM users WHERE id IN (@ids)");
    assembler.bindings_mut().add_value("ids", Vec::<i64>::new()).unwrap();

    assert_eq!(assembler.execute_scalar().unwrap(), Value::Int64(0));

    let mut assembler = db.assembler("SELECT COUNT(*) FROM users WHERE id NOT IN @ids");
    assembler.bindings_mut().add_value("ids", Vec::<i64>::new()).unwrap();
    // NOT IN (NULL) is never true
    assert_eq!(assembler.execute_scalar().unwrap(), Value::Int64(0));
}

#[test]
fn test_unreferenced_binding_is_ignored() {
    let db = TestDatabase::new();
    let mut assembler = db.assembler("SELECT name FROM users WHERE id = @id");
    assembler
        .bindings_mut()
        .add_value("id", 4)
        .unwrap()
        .add_value("unused", vec![1, 2])
        .unwrap();

    assert_eq!(assembler.execute_scalar().unwrap(), Value::from("dave"));
}

#[test]
fn test_non_query_with_list() {
    let db = TestDatabase::new();
    let mut assembler = db.assembler("UPDATE users SET active = 0 WHERE id IN (@ids)");
    assembler.bindings_mut().add_value("ids", vec![1, 3]).unwrap();

    assert_eq!(assembler.execute_non_query().unwrap(), 2);

    let remaining = db
        .assembler("SELECT COUNT(*) FROM users WHERE active = 1")
        .execute_scalar()
        .unwrap();
    assert_eq!(remaining, Value::Int64(1));
}

#[test]
fn test_row_stream_reads_rows_as_requested() {
    let db = TestDatabase::new();
    // abs() overflows on the third row
    let mut assembler = db.assembler(
        "WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < 5) \
         SELECT CASE WHEN n = 3 THEN abs(-9223372036854775807 - 1) ELSE n END AS n \
         FROM seq WHERE n IN (@ids)",
    );
    assembler.bindings_mut().add_value("ids", vec![1, 2, 3, 4]).unwrap();

    let mut stream = assembler.open_row_stream(StreamOptions::default()).unwrap();
    assert_eq!(stream.columns().len(), 1);

    let first = stream.next_row().unwrap().unwrap();
    assert_eq!(first.get(0), Some(&Value::Int64(1)));
    let second = stream.next_row().unwrap().unwrap();
    assert_eq!(second.get_by_name("n"), Some(&Value::Int64(2)));
    assert!(!stream.is_closed());

    assert!(stream.next_row().unwrap_err().is_driver());
    assert!(stream.is_closed());
    assert_eq!(stream.rows_read(), 2);
}

#[test]
fn test_closed_stream_releases_database() {
    let db = TestDatabase::new();
    let mut stream = db
        .assembler("WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq) SELECT n FROM seq")
        .open_row_stream(StreamOptions::default())
        .unwrap();
    let first = stream.next_row().unwrap().unwrap();
    assert_eq!(first.get(0), Some(&Value::Int64(1)));
    stream.close().unwrap();

    let mut update = db.assembler("UPDATE users SET active = 0 WHERE id = @id");
    update.bindings_mut().add_value("id", 1).unwrap();
    assert_eq!(update.execute_non_query().unwrap(), 1);
}

#[test]
fn test_row_stream_reads_bound_list() {
    let db = TestDatabase::new();
    let mut assembler = db.assembler("SELECT id, name, active FROM users WHERE id IN (@ids) ORDER BY id");
    assembler.bindings_mut().add_value("ids", vec![2, 4]).unwrap();

    let mut stream = assembler.open_row_stream(StreamOptions::default()).unwrap();
    assert_eq!(stream.columns().len(), 3);

    let first = stream.next_row().unwrap().unwrap();
    assert_eq!(first.get_by_name("name"), Some(&Value::from("bob")));
    assert_eq!(first.get_by_name("active"), Some(&Value::Bool(false)));

    let second = stream.next_row().unwrap().unwrap();
    assert_eq!(second.get(0), Some(&Value::Int64(4)));
    assert!(stream.next_row().unwrap().is_none());
    assert!(stream.is_closed());
}

#[test]
fn test_single_row_stream() {
    let db = TestDatabase::new();
    let rows: Vec<_> = db
        .assembler("SELECT id FROM users ORDER BY id")
        .open_row_stream(StreamOptions::single_row())
        .unwrap()
        .collect::<dbclient_drivers::Result<_>>()
        .unwrap();

    assert_eq!(rows.len(), 1);
}

#[test]
fn test_materialize_empty_result_keeps_columns() {
    let db = TestDatabase::new();
    let table = db
        .assembler("SELECT id, name FROM users WHERE 0")
        .materialize_table()
        .unwrap();

    assert!(!table.has_rows());
    assert_eq!(table.column_count(), 2);
    assert_eq!(table.column_index("NAME"), Some(1));
}

#[test]
fn test_stored_procedure_is_driver_error() {
    let db = TestDatabase::new();
    let err = db
        .assembler("usp_users")
        .with_command_kind(CommandKind::StoredProcedure)
        .execute_non_query()
        .unwrap_err();

    assert!(err.is_driver());
}

#[test]
fn test_invalid_sql_is_driver_error() {
    let db = TestDatabase::new();
    let err = db.assembler("SELEC name FROM users").execute_scalar().unwrap_err();
    assert!(err.is_driver());
}

#[test]
fn test_missing_connection_string() {
    let db = TestDatabase::new();
    let err = db
        .assembler("SELECT 1")
        .with_connection_name("Reporting")
        .execute_scalar()
        .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_settings_loaded_from_toml() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("app.db");
    let config_path = dir.path().join("dbclient.toml");
    std::fs::write(
        &config_path,
        formatdoc! {r#"
            [ConnectionStrings]
            DefaultConnection = "{}"

            [AppSettings]
            DbProviderFactory = "SQLite"
        "#, db_path.display()},
    )
    .unwrap();

    let settings = Arc::new(load_settings(&config_path).unwrap());
    CommandAssembler::new(Arc::clone(&settings))
        .with_command_text("CREATE TABLE t (v TEXT)")
        .execute_non_query()
        .unwrap();

    let mut insert =
        CommandAssembler::new(Arc::clone(&settings)).with_command_text("INSERT INTO t VALUES (@v)");
    insert.bindings_mut().add_value("v", "hello").unwrap();
    assert_eq!(insert.execute_non_query().unwrap(), 1);

    let value = CommandAssembler::new(settings)
        .with_command_text("SELECT v FROM t")
        .execute_scalar()
        .unwrap();
    assert_eq!(value, Value::from("hello"));
}
