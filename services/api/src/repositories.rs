//! Repositories for database operations
//!
//! `UserRepository` owns all SQL and every transaction boundary. Multi
//! statement operations (create, update, delete) run inside one transaction
//! each; an uncommitted `sqlx::Transaction` rolls back on drop, which also
//! covers cancellation while a statement is in flight.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::info;

use crate::models::{Family, Nationality, User, UserDetailResponse};

/// Persistence capability consumed by the user service.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// List every user with nationality and ordered family members.
    async fn list(&self) -> Result<Vec<UserDetailResponse>>;

    /// Insert a user and all supplied family members atomically,
    /// returning the generated user id.
    async fn create(&self, user: &User) -> Result<i32>;

    /// Fetch one user in the list shape, `None` when the id is absent.
    async fn get_detail(&self, user_id: i32) -> Result<Option<UserDetailResponse>>;

    /// Update the user's scalar fields and upsert the supplied family
    /// members. Returns `false` when the user id does not exist, in which
    /// case nothing was written.
    async fn update(&self, user: &User) -> Result<bool>;

    /// Delete the user row and every family row referencing it.
    async fn delete(&self, user_id: i32) -> Result<()>;

    /// Delete exactly one family row matching both ids. Returns whether
    /// a row was removed.
    async fn delete_family(&self, user_id: i32, family_id: i32) -> Result<bool>;
}

const USER_DETAIL_QUERY: &str = r#"
SELECT
    cust.customer_id AS user_id,
    cust.cst_name AS name,
    cust.cst_dob AS dob,
    cust.nationality_id,
    COALESCE(nat.nationality_name, '') AS nationality_name,
    COALESCE(nat.nationality_code, '') AS nationality_code,
    COALESCE(
        (
            SELECT JSON_AGG(
                JSON_BUILD_OBJECT(
                    'family_id', fl.fl_id::int,
                    'user_id', fl.cst_id::int,
                    'name', fl.fl_name,
                    'dob', fl.fl_dob
                ) ORDER BY fl.fl_id ASC
            )
            FROM family_list fl
            WHERE fl.cst_id = cust.customer_id
        ),
        '[]'::JSON
    ) AS families
FROM customer cust
LEFT JOIN nationality nat ON cust.nationality_id = nat.nationality_id
"#;

/// User repository backed by PostgreSQL.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn detail_from_row(row: &PgRow) -> Result<UserDetailResponse> {
        let nationality_id: i32 = row.try_get("nationality_id")?;
        let Json(families): Json<Vec<Family>> = row
            .try_get("families")
            .context("malformed families JSON in row")?;

        Ok(UserDetailResponse {
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            dob: row.try_get("dob")?,
            nationality_id,
            nationality: Nationality {
                nationality_id,
                nationality_name: row.try_get("nationality_name")?,
                nationality_code: row.try_get("nationality_code")?,
            },
            families,
        })
    }

    /// Upsert family members inside the caller's transaction, all rows in
    /// one conflict-aware statement. A family id of 0 draws a fresh id from
    /// the shared sequence; existing ids update in place (last write wins).
    async fn upsert_family_members(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        families: &[Family],
    ) -> Result<()> {
        if families.is_empty() {
            return Ok(());
        }

        let ids: Vec<i32> = families.iter().map(|f| f.family_id).collect();
        let owners: Vec<i32> = families.iter().map(|f| f.user_id).collect();
        let names: Vec<String> = families.iter().map(|f| f.name.clone()).collect();
        let dobs: Vec<String> = families.iter().map(|f| f.dob.clone()).collect();

        sqlx::query(
            r#"
            INSERT INTO family_list (fl_id, cst_id, fl_name, fl_dob)
            SELECT
                CASE WHEN f.fl_id = 0
                     THEN nextval('family_list_fl_id_seq')::int
                     ELSE f.fl_id
                END,
                f.cst_id,
                f.fl_name,
                f.fl_dob
            FROM UNNEST($1::int[], $2::int[], $3::text[], $4::text[])
                 AS f(fl_id, cst_id, fl_name, fl_dob)
            ON CONFLICT (fl_id) DO UPDATE SET
                cst_id = EXCLUDED.cst_id,
                fl_name = EXCLUDED.fl_name,
                fl_dob = EXCLUDED.fl_dob
            "#,
        )
        .bind(&ids)
        .bind(&owners)
        .bind(&names)
        .bind(&dobs)
        .execute(&mut **tx)
        .await
        .context("failed to upsert family members")?;

        info!(count = families.len(), "upserted family members");
        Ok(())
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn list(&self) -> Result<Vec<UserDetailResponse>> {
        let rows = sqlx::query(USER_DETAIL_QUERY).fetch_all(&self.pool).await?;

        rows.iter().map(Self::detail_from_row).collect()
    }

    async fn create(&self, user: &User) -> Result<i32> {
        let mut tx = self.pool.begin().await?;

        let customer_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO customer (nationality_id, cst_name, cst_dob)
            VALUES ($1, $2, $3)
            RETURNING customer_id
            "#,
        )
        .bind(user.nationality_id)
        .bind(&user.name)
        .bind(&user.dob)
        .fetch_one(&mut *tx)
        .await?;

        if !user.families.is_empty() {
            // Columnar bulk load: one round trip for all rows, each stamped
            // with the freshly generated user id.
            let names: Vec<String> = user.families.iter().map(|f| f.name.clone()).collect();
            let dobs: Vec<String> = user.families.iter().map(|f| f.dob.clone()).collect();

            sqlx::query(
                r#"
                INSERT INTO family_list (cst_id, fl_name, fl_dob)
                SELECT $1, f.fl_name, f.fl_dob
                FROM UNNEST($2::text[], $3::text[]) AS f(fl_name, fl_dob)
                "#,
            )
            .bind(customer_id)
            .bind(&names)
            .bind(&dobs)
            .execute(&mut *tx)
            .await
            .context("failed to bulk insert family members")?;
        }

        tx.commit().await.context("failed to commit transaction")?;

        info!(
            user_id = customer_id,
            families = user.families.len(),
            "created user with family members"
        );

        Ok(customer_id)
    }

    async fn get_detail(&self, user_id: i32) -> Result<Option<UserDetailResponse>> {
        let query = format!("{USER_DETAIL_QUERY} WHERE cust.customer_id = $1");
        let row = sqlx::query(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::detail_from_row).transpose()
    }

    async fn update(&self, user: &User) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let updated: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE customer
            SET nationality_id = $1, cst_name = $2, cst_dob = $3, updated_at = CURRENT_TIMESTAMP
            WHERE customer_id = $4
            RETURNING customer_id
            "#,
        )
        .bind(user.nationality_id)
        .bind(&user.name)
        .bind(&user.dob)
        .bind(user.user_id)
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_none() {
            return Ok(false);
        }

        self.upsert_family_members(&mut tx, &user.families).await?;

        tx.commit().await.context("failed to commit transaction")?;
        Ok(true)
    }

    async fn delete(&self, user_id: i32) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Families first, so the cascade also holds under a foreign key
        // from family_list to customer.
        sqlx::query("DELETE FROM family_list WHERE cst_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM customer WHERE customer_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await.context("failed to commit transaction")?;
        Ok(())
    }

    async fn delete_family(&self, user_id: i32, family_id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM family_list WHERE cst_id = $1 AND fl_id = $2")
            .bind(user_id)
            .bind(family_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
