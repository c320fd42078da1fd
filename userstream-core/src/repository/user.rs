use sqlx::{postgres::PgRow, PgPool, Postgres, QueryBuilder, Row};

use super::filter::UserFilter;
use crate::{
    models::{User, UserId},
    Result,
};

const USER_COLUMNS: &str =
    "id, first_name, last_name, email_address, created_at, deleted_at, merged_at, parent_user_id";

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new user.
    ///
    /// A second insert with the same id fails with `Error::AlreadyExists`.
    pub async fn insert(&self, user: &User) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO users (id, first_name, last_name, email_address, created_at, deleted_at, merged_at, parent_user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email_address)
        .bind(user.created_at)
        .bind(user.deleted_at)
        .bind(user.merged_at)
        .bind(user.parent_user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get user by ID
    pub async fn get_by_id(&self, user_id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_user).transpose()
    }

    /// All users matching the filter, ordered by id
    pub async fn find_filtered(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let mut qb = Self::filtered_query(filter);
        let rows = qb.build().fetch_all(&self.pool).await?;

        rows.into_iter().map(Self::row_to_user).collect()
    }

    fn filtered_query(filter: &UserFilter) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users"));
        filter.apply(&mut qb);
        qb.push(" ORDER BY id");
        qb
    }

    /// Convert database row to User model
    fn row_to_user(row: PgRow) -> Result<User> {
        Ok(User {
            id: row.try_get("id")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email_address: row.try_get("email_address")?,
            created_at: row.try_get("created_at")?,
            deleted_at: row.try_get("deleted_at")?,
            merged_at: row.try_get("merged_at")?,
            parent_user_id: row.try_get("parent_user_id")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filtered_query_orders_by_id() {
        let filter = UserFilter::from_pairs([("last_name", "Hopper")]).unwrap();
        let qb = UserRepository::filtered_query(&filter);

        assert_eq!(
            qb.sql(),
            format!("SELECT {USER_COLUMNS} FROM users WHERE last_name IN ($1) ORDER BY id")
        );
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_insert_and_fetch() {
        let url = std::env::var("DATABASE_URL").unwrap();
        let pool = PgPool::connect(&url).await.unwrap();
        let repo = UserRepository::new(pool);

        let user = crate::test_helpers::UserFixture::new().with_id(990_001).build();
        repo.insert(&user).await.unwrap();

        let fetched = repo.get_by_id(user.id).await.unwrap();
        assert_eq!(fetched, Some(user.clone()));

        let again = repo.insert(&user).await.unwrap_err();
        assert!(matches!(again, crate::Error::AlreadyExists(_)));
    }
}
