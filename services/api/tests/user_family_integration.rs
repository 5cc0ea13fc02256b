//! Integration tests for the user-family service against PostgreSQL
//!
//! These tests need a reachable database (`DATABASE_URL`). Each test starts
//! from an empty schema, so they are serialized.

use std::sync::Arc;

use api::error::ApiError;
use api::models::{Family, User};
use api::repositories::{UserRepository, UserStore};
use api::services::UserService;
use common::database::{DatabaseConfig, init_pool};
use serial_test::serial;
use sqlx::PgPool;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS nationality (
    nationality_id SERIAL PRIMARY KEY,
    nationality_name TEXT NOT NULL,
    nationality_code TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS customer (
    customer_id SERIAL PRIMARY KEY,
    nationality_id INT NOT NULL,
    cst_name TEXT NOT NULL,
    cst_dob TEXT NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS family_list (
    fl_id SERIAL PRIMARY KEY,
    cst_id INT NOT NULL,
    fl_name TEXT NOT NULL CHECK (char_length(fl_name) <= 50),
    fl_dob TEXT NOT NULL
);
"#;

/// Connect, (re)create the schema, and reset all tables.
async fn setup() -> Result<PgPool, Box<dyn std::error::Error>> {
    let config = DatabaseConfig::from_env()?;
    let pool = init_pool(&config).await?;

    sqlx::raw_sql(SCHEMA).execute(&pool).await?;
    sqlx::raw_sql("TRUNCATE family_list, customer, nationality RESTART IDENTITY")
        .execute(&pool)
        .await?;
    sqlx::query(
        "INSERT INTO nationality (nationality_name, nationality_code) VALUES ($1, $2)",
    )
    .bind("Indonesian")
    .bind("ID")
    .execute(&pool)
    .await?;

    Ok(pool)
}

fn service(pool: &PgPool) -> UserService {
    UserService::new(Arc::new(UserRepository::new(pool.clone())))
}

fn user(name: &str, dob: &str, nationality_id: i32, families: Vec<Family>) -> User {
    User {
        user_id: 0,
        name: name.to_string(),
        dob: dob.to_string(),
        nationality_id,
        families,
    }
}

fn family(family_id: i32, user_id: i32, name: &str, dob: &str) -> Family {
    Family {
        family_id,
        user_id,
        name: name.to_string(),
        dob: dob.to_string(),
    }
}

async fn customer_count(pool: &PgPool) -> Result<i64, Box<dyn std::error::Error>> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM customer")
        .fetch_one(pool)
        .await?)
}

#[tokio::test]
#[serial]
async fn create_then_detail_returns_families_in_order() -> TestResult {
    let pool = setup().await?;
    let users = service(&pool);

    let id = users
        .create(&user(
            "Alice Tan",
            "1990-05-12",
            1,
            vec![
                family(0, 0, "Bobby Tan", "2015-01-01"),
                family(0, 0, "Cindy Tan", "2017-06-30"),
                family(0, 0, "Danny Tan", "2019-11-09"),
            ],
        ))
        .await?;

    let detail = users.detail(id).await?;
    assert_eq!(detail.user_id, id);
    assert_eq!(detail.name, "Alice Tan");
    assert_eq!(detail.dob, "1990-05-12");
    assert_eq!(detail.nationality.nationality_name, "Indonesian");
    assert_eq!(detail.nationality.nationality_code, "ID");

    assert_eq!(detail.families.len(), 3);
    let names: Vec<&str> = detail.families.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Bobby Tan", "Cindy Tan", "Danny Tan"]);
    assert!(
        detail.families.windows(2).all(|w| w[0].family_id < w[1].family_id),
        "families must be ordered by ascending family id"
    );
    assert!(detail.families.iter().all(|f| f.user_id == id));

    Ok(())
}

#[tokio::test]
#[serial]
async fn list_defaults_families_and_missing_nationality() -> TestResult {
    let pool = setup().await?;
    let users = service(&pool);

    // nationality 999 has no reference row
    users
        .create(&user("Erwin Smith", "1980-03-22", 999, vec![]))
        .await?;

    let all = users.list().await?;
    assert_eq!(all.len(), 1);
    assert!(all[0].families.is_empty(), "families default to empty, not null");
    assert_eq!(all[0].nationality.nationality_name, "");
    assert_eq!(all[0].nationality.nationality_code, "");

    Ok(())
}

#[tokio::test]
#[serial]
async fn invalid_dob_is_rejected_with_zero_writes() -> TestResult {
    let pool = setup().await?;
    let users = service(&pool);

    let err = users
        .create(&user("Alice Tan", "2023-13-40", 1, vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert_eq!(customer_count(&pool).await?, 0);

    Ok(())
}

#[tokio::test]
#[serial]
async fn create_rolls_back_user_when_family_insert_fails() -> TestResult {
    let pool = setup().await?;
    let repo = UserRepository::new(pool.clone());

    // Straight to the repository, past validation: the oversized name
    // violates the fl_name length constraint during the bulk insert.
    let oversized = "x".repeat(60);
    let result = repo
        .create(&user(
            "Alice Tan",
            "1990-05-12",
            1,
            vec![family(0, 0, &oversized, "2015-01-01")],
        ))
        .await;

    assert!(result.is_err(), "bulk family insert should fail");
    assert_eq!(
        customer_count(&pool).await?,
        0,
        "user row must not survive a failed family insert"
    );

    Ok(())
}

#[tokio::test]
#[serial]
async fn update_upserts_and_leaves_omitted_families_untouched() -> TestResult {
    let pool = setup().await?;
    let users = service(&pool);

    let id = users
        .create(&user(
            "Alice Tan",
            "1990-05-12",
            1,
            vec![
                family(0, 0, "Bobby Tan", "2015-01-01"),
                family(0, 0, "Cindy Tan", "2017-06-30"),
            ],
        ))
        .await?;

    let before = users.detail(id).await?;
    let bobby = before.families[0].clone();
    let cindy = before.families[1].clone();

    // Rename Bobby in place, add a new member, omit Cindy entirely.
    users
        .update(&User {
            user_id: id,
            name: "Alice Tanaka".to_string(),
            dob: "1990-05-12".to_string(),
            nationality_id: 1,
            families: vec![
                family(bobby.family_id, id, "Robert Tan", "2015-01-01"),
                family(0, id, "Eddie Tan", "2021-08-15"),
            ],
        })
        .await?;

    let after = users.detail(id).await?;
    assert_eq!(after.name, "Alice Tanaka");
    assert_eq!(after.families.len(), 3, "omitted family must not be deleted");

    let renamed = after
        .families
        .iter()
        .find(|f| f.family_id == bobby.family_id)
        .expect("updated family still present");
    assert_eq!(renamed.name, "Robert Tan");

    let untouched = after
        .families
        .iter()
        .find(|f| f.family_id == cindy.family_id)
        .expect("omitted family still present");
    assert_eq!(untouched.name, "Cindy Tan");
    assert_eq!(untouched.dob, "2017-06-30");

    let added = after
        .families
        .iter()
        .find(|f| f.name == "Eddie Tan")
        .expect("new family inserted");
    assert!(added.family_id > 0, "sentinel id must be replaced");
    assert_ne!(added.family_id, bobby.family_id);
    assert_ne!(added.family_id, cindy.family_id);

    Ok(())
}

#[tokio::test]
#[serial]
async fn update_of_missing_user_is_not_found() -> TestResult {
    let pool = setup().await?;
    let users = service(&pool);

    let mut missing = user("Alice Tan", "1990-05-12", 1, vec![]);
    missing.user_id = 4242;

    let err = users.update(&missing).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    Ok(())
}

#[tokio::test]
#[serial]
async fn delete_removes_user_and_all_families() -> TestResult {
    let pool = setup().await?;
    let users = service(&pool);

    let id = users
        .create(&user(
            "Alice Tan",
            "1990-05-12",
            1,
            vec![
                family(0, 0, "Bobby Tan", "2015-01-01"),
                family(0, 0, "Cindy Tan", "2017-06-30"),
            ],
        ))
        .await?;

    users.delete(id).await?;

    let err = users.detail(id).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM family_list WHERE cst_id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await?;
    assert_eq!(orphans, 0);

    Ok(())
}

#[tokio::test]
#[serial]
async fn delete_family_removes_exactly_one_row() -> TestResult {
    let pool = setup().await?;
    let users = service(&pool);

    let alice = users
        .create(&user(
            "Alice Tan",
            "1990-05-12",
            1,
            vec![
                family(0, 0, "Bobby Tan", "2015-01-01"),
                family(0, 0, "Cindy Tan", "2017-06-30"),
            ],
        ))
        .await?;
    let frank = users
        .create(&user(
            "Frank Lim",
            "1985-09-03",
            1,
            vec![family(0, 0, "Grace Lim", "2012-04-18")],
        ))
        .await?;

    let bobby_id = users.detail(alice).await?.families[0].family_id;

    users.delete_family(alice, bobby_id).await?;

    let alice_after = users.detail(alice).await?;
    assert_eq!(alice_after.families.len(), 1);
    assert_eq!(alice_after.families[0].name, "Cindy Tan");

    let frank_after = users.detail(frank).await?;
    assert_eq!(frank_after.families.len(), 1, "other users' families untouched");

    // deleting the same row again reports not-found
    let err = users.delete_family(alice, bobby_id).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    Ok(())
}
