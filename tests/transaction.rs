use common::{MockExecutor, School, school};
use pgweave::prelude::*;
use pgweave::{ErrorKind, TransactionStage};

mod common;

fn migrated(registry: &SchemaRegistry) -> MockExecutor {
    let mut executor = MockExecutor::new();
    Migrator::new(registry, MigrationConfig::enabled())
        .migrate_relations(&mut executor)
        .unwrap();
    executor.log.clear();
    executor
}

#[test]
fn committed_statements_stay() {
    let School { registry, users, .. } = school();
    let users = registry.table(users).unwrap();
    let mut session = Session::new(migrated(&registry));

    let mut tx = session.transaction().unwrap();
    tx.run(users.insert(&["name", "email"]).values(["ada", "ada@example.com"]))
        .unwrap();
    tx.run(users.insert(&["name", "email"]).values(["alan", "alan@example.com"]))
        .unwrap();
    tx.commit().unwrap();

    let executor = session.into_inner();
    assert_eq!(executor.catalog.rows.get("users"), Some(&2));
    assert_eq!(
        executor.log,
        vec![
            "BEGIN",
            "INSERT INTO users (name, email) VALUES ($1,$2)",
            "INSERT INTO users (name, email) VALUES ($1,$2)",
            "COMMIT"
        ]
    );
}

#[test]
fn dropped_transaction_rolls_back() {
    let School { registry, users, .. } = school();
    let users = registry.table(users).unwrap();
    let mut session = Session::new(migrated(&registry));

    {
        let mut tx = session.transaction().unwrap();
        tx.run(users.insert(&["name"]).values(["ada"])).unwrap();
    }

    let executor = session.into_inner();
    assert_eq!(executor.catalog.rows.get("users"), None);
    assert_eq!(executor.log.last().map(String::as_str), Some("ROLLBACK"));
}

#[test]
fn executor_failure_aborts_the_transaction() {
    let School { registry, users, courses, .. } = school();
    let users = registry.table(users).unwrap();
    let courses = registry.table(courses).unwrap();
    let executor = migrated(&registry).fail_when("INSERT INTO courses");
    let mut session = Session::new(executor);

    let mut tx = session.transaction().unwrap();
    tx.run(users.insert(&["name"]).values(["ada"])).unwrap();
    let err = tx.run(courses.insert(&["title"]).values(["rust"])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FailedOperation);
    assert!(tx.is_finished());

    let err = tx.run(users.insert(&["name"]).values(["alan"])).unwrap_err();
    assert_eq!(
        err.kind(),
        ErrorKind::FailedTransaction(TransactionStage::Statement)
    );
    drop(tx);

    let executor = session.into_inner();
    assert_eq!(executor.count("ROLLBACK"), 1);
    assert_eq!(executor.catalog.rows.get("users"), None);
}

#[test]
fn validation_errors_leave_the_transaction_open() {
    let School { registry, users, .. } = school();
    let users = registry.table(users).unwrap();
    let mut session = Session::new(migrated(&registry));

    let mut tx = session.transaction().unwrap();
    let err = tx
        .run(users.insert(&["nickname"]).values(["ada"]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);
    assert!(!tx.is_finished());
    tx.run(users.insert(&["name"]).values(["ada"])).unwrap();
    tx.commit().unwrap();

    let executor = session.into_inner();
    assert_eq!(executor.catalog.rows.get("users"), Some(&1));
    assert_eq!(executor.count("INSERT"), 1);
}

#[test]
fn scanners_apply_the_found_policy() {
    let School { registry, users, .. } = school();
    let users = registry.table(users).unwrap();
    let ada = Rows::new(vec!["id".into(), "name".into()]).with_row(vec![Value::Int(1), Value::from("ada")]);
    let executor = migrated(&registry)
        .returning(ada.clone())
        .returning(Rows::new(vec!["id".into()]))
        .returning(ada);
    let mut session = Session::new(executor);

    let mut names = Vec::new();
    let count = session
        .run(
            users
                .select(&["id", "name"])
                .r#where(field("name").is_equal("ada"))
                .scanner(|rows| {
                    for row in rows {
                        names.push(row.get_by_name::<String>("name")?);
                    }
                    Ok(!names.is_empty())
                }),
        )
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(names, vec!["ada"]);

    let err = session
        .run(users.select(&["id"]).scanner(|rows| Ok(rows.next_row().is_some())))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = session
        .run(
            users
                .select(&["id"])
                .r#where(field("email").is_equal("ada@example.com"))
                .scanner(|rows| Ok(rows.next_row().is_some()))
                .throw_on_found(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Found);
}

#[test]
fn scan_exists_never_fails() {
    let School { registry, users, .. } = school();
    let users = registry.table(users).unwrap();
    let mut session = Session::new(migrated(&registry));

    let mut exists = true;
    session
        .run(users.select(&["id"]).limit(1).scanner(scan_exists(&mut exists)))
        .unwrap();
    assert!(!exists);
}

#[test]
fn invalid_queries_never_reach_the_executor() {
    let School { registry, users, .. } = school();
    let users = registry.table(users).unwrap();
    let mut session = Session::new(migrated(&registry));

    let err = session
        .run(users.update().set("nickname", "ada"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);
    assert!(session.executor().log.is_empty());
}
