use super::*;
use dbe_db::{DbError, DuckDbBackend, SqliteBackend};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;
use tempfile::TempDir;

const TABLE: &str = DEFAULT_HISTORY_TABLE;

struct Fixture {
    _dir: TempDir,
    scripts: PathBuf,
    db_path: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let scripts = dir.path().join("dbscripts");
        std::fs::create_dir(&scripts).unwrap();
        let db_path = dir.path().join("target.duckdb");
        Self {
            _dir: dir,
            scripts,
            db_path,
        }
    }

    fn write(&self, name: &str, sql: &str) {
        std::fs::write(self.scripts.join(name), sql).unwrap();
    }

    fn duckdb(&self) -> MigrationEngine {
        let backend = DuckDbBackend::new(self.db_path.display().to_string());
        MigrationEngine::new(Box::new(backend), EngineOptions::default())
    }

    fn sqlite(&self) -> MigrationEngine {
        let path = self.db_path.with_extension("db");
        let backend = SqliteBackend::new(path.display().to_string());
        MigrationEngine::new(Box::new(backend), EngineOptions::default())
    }
}

fn history_versions(engine: &MigrationEngine) -> Vec<u32> {
    engine
        .session()
        .unwrap()
        .list_applied_entries(TABLE)
        .unwrap()
        .iter()
        .map(|e| e.version)
        .collect()
}

fn table_exists(engine: &MigrationEngine, name: &str) -> bool {
    engine.session().unwrap().relation_exists(name).unwrap()
}

#[derive(Clone, Default)]
struct RecordingObserver {
    events: Rc<RefCell<Vec<String>>>,
}

impl MigrationObserver for RecordingObserver {
    fn initialized(&mut self, db_type: &str, _target: &str, db: bool, table: bool) {
        self.events
            .borrow_mut()
            .push(format!("initialized {db_type} {db} {table}"));
    }

    fn validated(&mut self, checked: usize) {
        self.events.borrow_mut().push(format!("validated {checked}"));
    }

    fn script_skipped(&mut self, script: &ScriptFile, _reason: &SkipReason) {
        self.events
            .borrow_mut()
            .push(format!("skipped {}", script.version()));
    }

    fn script_started(&mut self, script: &ScriptFile, transactional: bool) {
        self.events
            .borrow_mut()
            .push(format!("started {} {transactional}", script.version()));
    }

    fn script_applied(&mut self, script: &ScriptFile, _elapsed: Duration) {
        self.events
            .borrow_mut()
            .push(format!("applied {}", script.version()));
    }

    fn script_failed(&mut self, script: &ScriptFile, _error: &MigrateError) {
        self.events
            .borrow_mut()
            .push(format!("failed {}", script.version()));
    }
}

#[test]
fn test_evolve_applies_scripts_in_version_order() {
    let fx = Fixture::new();
    fx.write("V1_1__Add_orders.sql", "CREATE TABLE orders (id INT, customer_id INT);");
    fx.write("V1_0__Init.sql", "CREATE TABLE customers (id INT);");

    let mut engine = fx.duckdb();
    let report = engine.evolve(&fx.scripts, 0).unwrap();

    assert_eq!(engine.state(), EngineState::Done);
    assert_eq!(report.starting_version, 0);
    assert_eq!(report.final_version, 101);
    assert_eq!(report.applied_versions(), vec![100, 101]);
    assert!(report.skipped.is_empty());
    assert!(table_exists(&engine, "customers"));
    assert!(table_exists(&engine, "orders"));
    assert_eq!(history_versions(&engine), vec![100, 101]);
}

#[test]
fn test_history_records_path_and_hash() {
    let fx = Fixture::new();
    let sql = "CREATE TABLE customers (id INT);";
    fx.write("V1_0__Init.sql", sql);

    let mut engine = fx.duckdb();
    engine.evolve(&fx.scripts, 0).unwrap();

    let entries = engine.session().unwrap().list_applied_entries(TABLE).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0].path,
        fx.scripts.join("V1_0__Init.sql").display().to_string()
    );
    assert_eq!(entries[0].content_hash, ContentHash::of(sql.as_bytes()));
}

#[test]
fn test_second_run_applies_nothing() {
    let fx = Fixture::new();
    fx.write("V1_0__Init.sql", "CREATE TABLE customers (id INT);");

    fx.duckdb().evolve(&fx.scripts, 0).unwrap();

    let mut engine = fx.duckdb();
    let report = engine.evolve(&fx.scripts, 0).unwrap();
    assert!(report.applied.is_empty());
    assert_eq!(report.starting_version, 100);
    assert_eq!(report.final_version, 100);
    assert_eq!(
        report.skipped[0].reason,
        SkipReason::AlreadyApplied { current: 100 }
    );
    assert_eq!(history_versions(&engine), vec![100]);
}

#[test]
fn test_only_newer_scripts_run() {
    let fx = Fixture::new();
    fx.write("V1_0__Init.sql", "CREATE TABLE customers (id INT);");
    fx.duckdb().evolve(&fx.scripts, 0).unwrap();

    fx.write("V1_1__Add_orders.sql", "CREATE TABLE orders (id INT);");
    let mut engine = fx.duckdb();
    let report = engine.evolve(&fx.scripts, 0).unwrap();

    assert_eq!(report.applied_versions(), vec![101]);
    assert_eq!(history_versions(&engine), vec![100, 101]);
}

#[test]
fn test_script_below_current_version_is_ignored() {
    let fx = Fixture::new();
    fx.write("V2_0__Init.sql", "CREATE TABLE customers (id INT);");
    fx.duckdb().evolve(&fx.scripts, 0).unwrap();

    fx.write("V1_5__Late.sql", "CREATE TABLE late (id INT);");
    let mut engine = fx.duckdb();
    let report = engine.evolve(&fx.scripts, 0).unwrap();

    assert!(report.applied.is_empty());
    assert_eq!(report.skipped[0].version, 105);
    assert!(!table_exists(&engine, "late"));

    let status = engine.status(&fx.scripts).unwrap();
    assert_eq!(status[0].version, 105);
    assert_eq!(status[0].state, ScriptState::Ignored);
}

#[test]
fn test_ceiling_limits_applied_versions() {
    let fx = Fixture::new();
    fx.write("V1_0__Init.sql", "CREATE TABLE a (id INT);");
    fx.write("V1_1__Second.sql", "CREATE TABLE b (id INT);");
    fx.write("V2_0__Third.sql", "CREATE TABLE c (id INT);");

    let mut engine = fx.duckdb();
    let report = engine.evolve(&fx.scripts, 101).unwrap();

    assert_eq!(report.applied_versions(), vec![100, 101]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].version, 200);
    assert_eq!(
        report.skipped[0].reason,
        SkipReason::AboveCeiling { ceiling: 101 }
    );
    assert!(!table_exists(&engine, "c"));
}

#[test]
fn test_modified_script_blocks_run() {
    let fx = Fixture::new();
    fx.write("V1_0__Init.sql", "CREATE TABLE customers (id INT);");
    fx.duckdb().evolve(&fx.scripts, 0).unwrap();

    fx.write("V1_0__Init.sql", "CREATE TABLE customers (id BIGINT);");
    fx.write("V1_1__Add_orders.sql", "CREATE TABLE orders (id INT);");

    let mut engine = fx.duckdb();
    engine.initialize().unwrap();
    let err = engine.validate_scripts(&fx.scripts).unwrap_err();

    assert!(err.is_drift());
    match err {
        MigrateError::ScriptModified {
            version,
            recorded,
            current,
            ..
        } => {
            assert_eq!(version, 100);
            assert_ne!(recorded, current);
        }
        other => panic!("expected ScriptModified, got {other:?}"),
    }
    assert_eq!(engine.state(), EngineState::Failed);
    assert!(!table_exists(&engine, "orders"));
    assert_eq!(history_versions(&engine), vec![100]);
}

#[test]
fn test_deleted_script_blocks_run() {
    let fx = Fixture::new();
    fx.write("V1_0__Init.sql", "CREATE TABLE customers (id INT);");
    fx.duckdb().evolve(&fx.scripts, 0).unwrap();

    std::fs::remove_file(fx.scripts.join("V1_0__Init.sql")).unwrap();
    fx.write("V1_1__Add_orders.sql", "CREATE TABLE orders (id INT);");

    let mut engine = fx.duckdb();
    let err = engine.evolve(&fx.scripts, 0).unwrap_err();
    assert!(matches!(
        err,
        MigrateError::ScriptNotFound { version: 100, .. }
    ));
    assert!(!table_exists(&engine, "orders"));
}

#[test]
fn test_failed_script_rolls_back_and_stops() {
    let fx = Fixture::new();
    fx.write("V1_0__Init.sql", "CREATE TABLE a (id INT);");
    fx.write(
        "V1_1__Broken.sql",
        "CREATE TABLE b (id INT);\nGO\nSELECT * FROM no_such_table;",
    );
    fx.write("V1_2__After.sql", "CREATE TABLE c (id INT);");

    let mut engine = fx.duckdb();
    let err = engine.evolve(&fx.scripts, 0).unwrap_err();

    match &err {
        MigrateError::ScriptFailed { version, source, .. } => {
            assert_eq!(*version, 101);
            assert!(source.to_string().contains("[D004]"));
        }
        other => panic!("expected ScriptFailed, got {other:?}"),
    }
    assert!(!err.is_drift());
    assert_eq!(engine.state(), EngineState::Failed);
    assert!(table_exists(&engine, "a"));
    assert!(!table_exists(&engine, "b"));
    assert!(!table_exists(&engine, "c"));
    assert_eq!(history_versions(&engine), vec![100]);
}

#[test]
fn test_no_transaction_script_keeps_earlier_batches() {
    let fx = Fixture::new();
    fx.write(
        "V1_0__Loose.sql",
        "-- DBEVOLVE: NO_TRANSACTION\nCREATE TABLE kept (id INT);\nGO\nSELECT * FROM no_such_table;",
    );

    let mut engine = fx.duckdb();
    let err = engine.evolve(&fx.scripts, 0).unwrap_err();

    assert!(matches!(err, MigrateError::ScriptFailed { version: 100, .. }));
    assert!(table_exists(&engine, "kept"));
    assert!(history_versions(&engine).is_empty());
}

#[test]
fn test_report_counts_batches() {
    let fx = Fixture::new();
    fx.write(
        "V1_0__Init.sql",
        "CREATE TABLE a (id INT);\ngo\nINSERT INTO a VALUES (1);\nGO\n",
    );

    let mut engine = fx.duckdb();
    let report = engine.evolve(&fx.scripts, 0).unwrap();

    assert_eq!(report.applied[0].batches, 2);
    assert!(report.applied[0].transactional);
    assert_eq!(
        engine.session().unwrap().query_count("SELECT * FROM a").unwrap(),
        1
    );
}

#[test]
fn test_run_before_validate_is_rejected() {
    let fx = Fixture::new();
    fx.write("V1_0__Init.sql", "CREATE TABLE a (id INT);");

    let mut engine = fx.duckdb();
    let err = engine.run_scripts(&fx.scripts, 0).unwrap_err();
    assert!(matches!(
        err,
        MigrateError::InvalidState {
            state: EngineState::Uninitialized,
            ..
        }
    ));
    assert_eq!(engine.state(), EngineState::Uninitialized);

    engine.initialize().unwrap();
    let err = engine.run_scripts(&fx.scripts, 0).unwrap_err();
    assert!(matches!(
        err,
        MigrateError::InvalidState {
            state: EngineState::Initialized,
            ..
        }
    ));
}

#[test]
fn test_initialize_twice_is_rejected() {
    let fx = Fixture::new();
    let mut engine = fx.duckdb();
    engine.initialize().unwrap();
    assert!(matches!(
        engine.initialize(),
        Err(MigrateError::InvalidState { .. })
    ));
}

#[test]
fn test_failed_engine_accepts_nothing() {
    let fx = Fixture::new();
    fx.write("V1_0__Broken.sql", "SELECT * FROM no_such_table;");

    let mut engine = fx.duckdb();
    engine.evolve(&fx.scripts, 0).unwrap_err();
    assert_eq!(engine.state(), EngineState::Failed);

    let err = engine.validate_scripts(&fx.scripts).unwrap_err();
    assert!(matches!(
        err,
        MigrateError::InvalidState {
            state: EngineState::Failed,
            ..
        }
    ));
}

#[test]
fn test_done_engine_can_run_again() {
    let fx = Fixture::new();
    fx.write("V1_0__Init.sql", "CREATE TABLE a (id INT);");

    let mut engine = fx.duckdb();
    engine.evolve(&fx.scripts, 0).unwrap();

    fx.write("V1_1__More.sql", "CREATE TABLE b (id INT);");
    engine.validate_scripts(&fx.scripts).unwrap();
    let report = engine.run_scripts(&fx.scripts, 0).unwrap();
    assert_eq!(report.applied_versions(), vec![101]);
}

#[test]
fn test_done_engine_requires_validation_before_next_run() {
    let fx = Fixture::new();
    fx.write("V1_0__Init.sql", "CREATE TABLE a (id INT);");

    let mut engine = fx.duckdb();
    engine.evolve(&fx.scripts, 0).unwrap();

    fx.write("V1_0__Init.sql", "CREATE TABLE a (id BIGINT);");
    fx.write("V1_1__More.sql", "CREATE TABLE b (id INT);");
    let err = engine.run_scripts(&fx.scripts, 0).unwrap_err();
    assert!(matches!(
        err,
        MigrateError::InvalidState {
            state: EngineState::Done,
            ..
        }
    ));
    assert_eq!(engine.state(), EngineState::Done);

    let err = engine.validate_scripts(&fx.scripts).unwrap_err();
    assert!(matches!(err, MigrateError::ScriptModified { version: 100, .. }));
    assert!(!table_exists(&engine, "b"));
}

#[test]
fn test_failed_history_insert_rolls_back_script() {
    let fx = Fixture::new();
    fx.write(
        "V1_0__Drops_history.sql",
        &format!("CREATE TABLE sneaky (id INTEGER);\nDROP TABLE \"{TABLE}\";"),
    );

    for mut engine in [fx.duckdb(), fx.sqlite()] {
        let err = engine.evolve(&fx.scripts, 0).unwrap_err();

        match &err {
            MigrateError::Db(DbError::ExecutionError(message)) => {
                assert!(message.contains("failed to record version 100"), "{message}");
            }
            other => panic!("expected a history insert failure, got {other:?}"),
        }
        assert!(err.to_string().contains("[D003]"));
        assert_eq!(engine.state(), EngineState::Failed);
        assert!(!table_exists(&engine, "sneaky"));
        assert!(table_exists(&engine, TABLE));
        assert!(history_versions(&engine).is_empty());
    }
}

#[test]
fn test_overlong_script_path_is_rejected_before_running() {
    let fx = Fixture::new();
    let mut scripts = fx.scripts.clone();
    for part in ["a", "b", "c", "d", "e", "f"] {
        scripts.push(part.repeat(100));
    }
    std::fs::create_dir_all(&scripts).unwrap();
    std::fs::write(
        scripts.join("V1_0__Init.sql"),
        "CREATE TABLE long_path_table (id INT);",
    )
    .unwrap();

    let mut engine = fx.duckdb();
    let err = engine.evolve(&scripts, 0).unwrap_err();

    match err {
        MigrateError::PathTooLong { len, max, .. } => {
            assert_eq!(max, MAX_HISTORY_PATH_LEN);
            assert!(len > max);
        }
        other => panic!("expected PathTooLong, got {other:?}"),
    }
    assert!(!table_exists(&engine, "long_path_table"));
    assert!(history_versions(&engine).is_empty());
}

#[test]
fn test_script_changed_after_discovery_is_rejected() {
    let fx = Fixture::new();
    fx.write("V1_0__Init.sql", "CREATE TABLE a (id INT);");

    let mut engine = fx.duckdb();
    engine.initialize().unwrap();
    let session = engine.session().unwrap();

    let script = ScriptFile::from_contents(
        fx.scripts.join("V1_0__Init.sql").display().to_string(),
        b"CREATE TABLE other (id INT);",
    )
    .unwrap();
    let err = apply_script(session, TABLE, &script, &mut LogObserver).unwrap_err();

    assert!(matches!(err, MigrateError::ScriptChanged { .. }));
    assert!(!table_exists(&engine, "a"));
}

#[test]
fn test_invalid_utf8_script_fails_before_running() {
    let fx = Fixture::new();
    std::fs::write(fx.scripts.join("V1_0__Init.sql"), [0x43, 0xff, 0xfe]).unwrap();

    let mut engine = fx.duckdb();
    let err = engine.evolve(&fx.scripts, 0).unwrap_err();
    assert!(matches!(
        err,
        MigrateError::Core(dbe_core::CoreError::ScriptEncoding { .. })
    ));
    assert!(history_versions(&engine).is_empty());
}

#[test]
fn test_invalid_script_name_fails_discovery() {
    let fx = Fixture::new();
    fx.write("init.sql", "CREATE TABLE a (id INT);");

    let mut engine = fx.duckdb();
    engine.initialize().unwrap();
    let err = engine.validate_scripts(&fx.scripts).unwrap_err();
    assert!(matches!(
        err,
        MigrateError::Core(dbe_core::CoreError::InvalidScriptName { .. })
    ));
}

#[test]
fn test_custom_history_table() {
    let fx = Fixture::new();
    fx.write("V1_0__Init.sql", "CREATE TABLE a (id INT);");

    let backend = DuckDbBackend::new(fx.db_path.display().to_string());
    let options = EngineOptions {
        history_table: "schema_versions".to_string(),
        ..EngineOptions::default()
    };
    let mut engine = MigrationEngine::new(Box::new(backend), options);
    engine.evolve(&fx.scripts, 0).unwrap();

    let session = engine.session().unwrap();
    assert!(session.relation_exists("schema_versions").unwrap());
    assert!(!session.relation_exists(TABLE).unwrap());
    assert_eq!(session.current_version("schema_versions").unwrap(), 100);
}

#[test]
fn test_status_reports_each_state() {
    let fx = Fixture::new();
    fx.write("V1_0__Init.sql", "CREATE TABLE a (id INT);");
    fx.write("V1_1__Second.sql", "CREATE TABLE b (id INT);");
    fx.write("V1_2__Third.sql", "CREATE TABLE c (id INT);");
    fx.duckdb().evolve(&fx.scripts, 0).unwrap();

    std::fs::remove_file(fx.scripts.join("V1_0__Init.sql")).unwrap();
    fx.write("V1_1__Second.sql", "CREATE TABLE b (id BIGINT);");
    fx.write("V2_0__Pending.sql", "CREATE TABLE d (id INT);");

    let mut engine = fx.duckdb();
    engine.initialize().unwrap();
    let status = engine.status(&fx.scripts).unwrap();

    let states: Vec<(u32, ScriptState)> = status.iter().map(|s| (s.version, s.state)).collect();
    assert_eq!(
        states,
        vec![
            (100, ScriptState::Missing),
            (101, ScriptState::Modified),
            (102, ScriptState::Applied),
            (200, ScriptState::Pending),
        ]
    );
    assert!(status[0].applied_at.is_some());
    assert!(status[3].applied_at.is_none());
    assert_eq!(history_versions(&engine), vec![100, 101, 102]);
}

#[test]
fn test_status_requires_initialize() {
    let fx = Fixture::new();
    let engine = fx.duckdb();
    assert!(matches!(
        engine.status(&fx.scripts),
        Err(MigrateError::InvalidState { .. })
    ));
}

#[test]
fn test_observer_sees_events_in_order() {
    let fx = Fixture::new();
    fx.write("V1_0__Init.sql", "CREATE TABLE a (id INT);");
    fx.write("V1_1__Loose.sql", "-- DBEVOLVE: NO_TRANSACTION\nCREATE TABLE b (id INT);");
    fx.write("V3_0__Later.sql", "CREATE TABLE c (id INT);");

    let observer = RecordingObserver::default();
    let events = Rc::clone(&observer.events);
    let mut engine = fx.duckdb().with_observer(Box::new(observer));
    engine.evolve(&fx.scripts, 200).unwrap();

    assert_eq!(
        *events.borrow(),
        vec![
            "initialized duckdb true true",
            "validated 0",
            "started 100 true",
            "applied 100",
            "started 101 false",
            "applied 101",
            "skipped 300",
        ]
    );
}

#[test]
fn test_observer_sees_failure() {
    let fx = Fixture::new();
    fx.write("V1_0__Broken.sql", "SELECT * FROM no_such_table;");

    let observer = RecordingObserver::default();
    let events = Rc::clone(&observer.events);
    let mut engine = fx.duckdb().with_observer(Box::new(observer));
    engine.evolve(&fx.scripts, 0).unwrap_err();

    assert_eq!(events.borrow().last().map(String::as_str), Some("failed 100"));
}

#[test]
fn test_sqlite_backend_end_to_end() {
    let fx = Fixture::new();
    fx.write("V1_0__Init.sql", "CREATE TABLE a (id INTEGER);");
    fx.write(
        "V1_1__Broken.sql",
        "CREATE TABLE b (id INTEGER);\nGO\nINSERT INTO missing VALUES (1);",
    );

    let mut engine = fx.sqlite();
    let err = engine.evolve(&fx.scripts, 0).unwrap_err();

    assert!(matches!(err, MigrateError::ScriptFailed { version: 101, .. }));
    assert!(table_exists(&engine, "a"));
    assert!(!table_exists(&engine, "b"));
    assert_eq!(history_versions(&engine), vec![100]);

    fx.write("V1_1__Broken.sql", "CREATE TABLE b (id INTEGER);");
    let mut engine = fx.sqlite();
    let report = engine.evolve(&fx.scripts, 0).unwrap();
    assert_eq!(report.applied_versions(), vec![101]);
}

#[test]
fn test_engine_state_display() {
    assert_eq!(EngineState::Uninitialized.to_string(), "uninitialized");
    assert_eq!(EngineState::Applying.to_string(), "applying");
    assert_eq!(EngineState::Failed.to_string(), "failed");
}
