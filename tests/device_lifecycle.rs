//! Device lifecycle through the public harness surface: provisioning,
//! deallocation, scoped sessions and persistence across reconnects.

mod common;

use std::panic::{catch_unwind, AssertUnwindSafe};

use common::*;
use nvmefs_harness::device::testing::AdminOp;
use nvmefs_harness::{Error, FixtureScope, ProvisioningState, Value};
use proptest::prelude::*;

// ============================================================================
// Provisioning
// ============================================================================

#[test]
fn provisioning_with_placement_yields_configured_handles() {
    let rig = Rig::new();
    rig.provision(true);
    assert_eq!(
        rig.fake.placement_handles(NAMESPACE_ID),
        Some(vec![0, 1, 2, 3, 4, 5, 6])
    );
    assert!(rig.fake.placement_enabled());
}

#[test]
fn provisioning_without_placement_yields_none() {
    let rig = Rig::new();
    rig.provision(false);
    assert_eq!(rig.fake.placement_handles(NAMESPACE_ID), Some(Vec::new()));
    assert!(!rig.fake.placement_enabled());
}

#[test]
fn reprovisioning_is_deterministic() {
    let rig = Rig::new();
    for enable in [true, false, true] {
        rig.provision(enable);
        let expected = if enable { 7 } else { 0 };
        assert_eq!(
            rig.fake.placement_handles(NAMESPACE_ID).map(|h| h.len()),
            Some(expected)
        );
        assert!(rig.fake.namespace_attached(NAMESPACE_ID));
    }
    assert_eq!(rig.fake.calls(AdminOp::DeleteNamespace), 2);
}

// ============================================================================
// Deallocation
// ============================================================================

#[test]
fn deallocate_without_namespace_never_fails() {
    let rig = Rig::new();
    let device = rig.manager().open(DEVICE_PATH).unwrap();
    rig.manager().deallocate(&device, NAMESPACE_ID).unwrap();
    rig.manager().deallocate(&device, NAMESPACE_ID).unwrap();
    assert_eq!(rig.spy.deallocations(), 0);
}

#[test]
fn deallocate_twice_leaves_same_erased_state() {
    let rig = Rig::new();
    rig.provision(false);
    let mut conn = rig.connect();
    conn.execute("CREATE TABLE t (a INTEGER);").unwrap();
    conn.execute("INSERT INTO t VALUES (1), (2);").unwrap();
    conn.close().unwrap();
    assert!(rig.fake.written_blocks(NAMESPACE_ID) > 0);

    let device = rig.manager().open(DEVICE_PATH).unwrap();
    rig.manager().deallocate(&device, NAMESPACE_ID).unwrap();
    let first = rig.fake.read_block(NAMESPACE_ID, 0).unwrap();
    rig.manager().deallocate(&device, NAMESPACE_ID).unwrap();
    let second = rig.fake.read_block(NAMESPACE_ID, 0).unwrap();

    assert_eq!(first, second);
    assert_eq!(rig.fake.written_blocks(NAMESPACE_ID), 0);
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn create_insert_close_reopen_returns_rows_in_order() {
    let rig = Rig::new();
    rig.provision(false);

    let mut conn = rig.connect();
    conn.execute("CREATE TABLE t (a INTEGER);").unwrap();
    conn.execute("INSERT INTO t VALUES (1), (2), (3);").unwrap();
    conn.close().unwrap();

    let mut conn = rig.reopen();
    let rows = conn.query("SELECT * FROM t;").unwrap();
    assert_eq!(
        rows,
        vec![
            vec![Value::Int(1)],
            vec![Value::Int(2)],
            vec![Value::Int(3)],
        ]
    );
    conn.close().unwrap();
}

#[test]
fn schema_and_table_survive_reopen() {
    let rig = Rig::new();
    rig.provision(true);

    let mut conn = rig.connect();
    conn.execute("CREATE SCHEMA test_schema;").unwrap();
    conn.execute("CREATE TABLE test_schema.test_table (id INTEGER, name VARCHAR);")
        .unwrap();
    conn.execute("INSERT INTO test_schema.test_table VALUES (1, 'Alice'), (2, 'Bob');")
        .unwrap();
    conn.close().unwrap();

    let mut conn = rig.reopen();
    let rows = conn.query("SELECT * FROM test_schema.test_table;").unwrap();
    assert_eq!(rows[1], vec![Value::Int(2), Value::text("Bob")]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn committed_writes_survive_reopen(batches in proptest::collection::vec(
        proptest::collection::vec(any::<i64>(), 1..8),
        0..6,
    )) {
        let rig = Rig::new();
        rig.provision(false);

        let mut conn = rig.connect();
        conn.execute("CREATE TABLE w (v BIGINT);").unwrap();
        for batch in &batches {
            let values = batch
                .iter()
                .map(|v| format!("({v})"))
                .collect::<Vec<_>>()
                .join(", ");
            conn.execute(&format!("INSERT INTO w VALUES {values};")).unwrap();
        }
        conn.close().unwrap();

        let mut conn = rig.reopen();
        let rows = conn.query("SELECT * FROM w;").unwrap();
        let expected: Vec<Vec<Value>> = batches
            .iter()
            .flatten()
            .map(|v| vec![Value::Int(*v)])
            .collect();
        prop_assert_eq!(rows, expected);
    }
}

// ============================================================================
// Scoped sessions
// ============================================================================

#[test]
fn release_runs_exactly_once_when_body_panics() {
    let rig = Rig::new();

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let mut session = rig
            .controller
            .acquire(FixtureScope::Module, DEVICE_PATH, &backend())
            .unwrap();
        session.execute("CREATE TABLE t (a INTEGER);").unwrap();
        panic!("assertion in test body");
    }));

    assert!(outcome.is_err());
    assert_eq!(rig.spy.deallocations(), 1);
    assert_eq!(rig.connector.closed(), 1);
    assert_eq!(rig.fake.written_blocks(NAMESPACE_ID), 0);
}

#[test]
fn explicit_release_is_not_repeated_on_drop() {
    let rig = Rig::new();
    let session = rig
        .controller
        .acquire(FixtureScope::Session, DEVICE_PATH, &backend())
        .unwrap();
    assert_eq!(session.device().state(), ProvisioningState::InUse);
    session.release().unwrap();

    assert_eq!(rig.spy.deallocations(), 1);
    assert_eq!(rig.connector.closed(), 1);
}

#[test]
fn teardown_erases_what_the_session_wrote() {
    let rig = Rig::new();
    rig.controller
        .with_session(FixtureScope::Module, DEVICE_PATH, &backend(), |conn| {
            conn.execute("CREATE TABLE t (a INTEGER);")?;
            conn.execute("INSERT INTO t VALUES (42);")
        })
        .unwrap();

    // A test-scoped session reuses the namespace without provisioning.
    let result = rig
        .controller
        .with_session(FixtureScope::Test, DEVICE_PATH, &backend(), |conn| {
            conn.query("SELECT * FROM t;")
        });
    assert!(matches!(result, Err(Error::Engine(_))));
    assert_eq!(rig.fake.calls(AdminOp::CreateNamespace), 1);
}

#[test]
fn failed_setup_still_attempts_deallocation() {
    let rig = Rig::new();
    rig.fake.fail_next(AdminOp::AttachNamespace);

    let err = rig
        .controller
        .acquire(FixtureScope::Module, DEVICE_PATH, &backend())
        .err()
        .unwrap();

    assert!(matches!(err, Error::Namespace { op: "attach", .. }));
    // The namespace was created but never attached: nothing to erase.
    assert!(rig.fake.namespace_created(NAMESPACE_ID));
    assert_eq!(rig.spy.deallocations(), 0);
    assert_eq!(rig.connector.opened(), 0);
}

#[test]
fn wrong_device_fails_before_any_configuration() {
    let rig = Rig::new();
    let err = rig
        .controller
        .acquire(FixtureScope::Module, "/dev/nvme7", &backend())
        .err()
        .unwrap();
    assert!(matches!(err, Error::DeviceQuery { .. }));
    assert_eq!(rig.fake.calls(AdminOp::SetPlacement), 0);
}
