use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database. Callers store `email` lowercased; the unique
/// index on that column is what makes concurrent registration safe.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub campus: Option<String>,
    pub created_at: OffsetDateTime,
}

const USER_COLUMNS: &str = "id, name, email, password_hash, phone, department, campus, created_at";

/// Partial profile update; `None` fields are left untouched.
#[derive(Debug, Default, Clone)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub campus: Option<String>,
    pub password_hash: Option<String>,
}

/// Directory search is limited to these two columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Department,
    Campus,
}

impl SearchField {
    pub fn from_category(category: &str) -> Option<Self> {
        match category {
            "department" => Some(SearchField::Department),
            "campus" => Some(SearchField::Campus),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            SearchField::Department => "department",
            SearchField::Campus => "campus",
        }
    }
}

pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Duplicate (normalized) email surfaces as a unique violation from the
    /// database rather than a pre-check, so two concurrent registrations
    /// cannot both win.
    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        let sql = format!(
            "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(name)
            .bind(email)
            .bind(password_hash)
            .fetch_one(db)
            .await
    }

    pub async fn update_by_id(
        db: &PgPool,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                department = COALESCE($5, department),
                campus = COALESCE($6, campus),
                password_hash = COALESCE($7, password_hash)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(&changes.name)
            .bind(&changes.email)
            .bind(&changes.phone)
            .bind(&changes.department)
            .bind(&changes.campus)
            .bind(&changes.password_hash)
            .fetch_optional(db)
            .await
    }

    pub async fn set_password_hash(
        db: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>(
            "UPDATE users SET password_hash = $2 WHERE id = $1 RETURNING id",
        )
        .bind(id)
        .bind(password_hash)
        .fetch_optional(db)
        .await
    }

    pub async fn search_page(
        db: &PgPool,
        field: SearchField,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>, sqlx::Error> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {} ILIKE '%' || $1 || '%' \
             ORDER BY name ASC, id ASC LIMIT $2 OFFSET $3",
            field.column()
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(query)
            .bind(limit)
            .bind(offset)
            .fetch_all(db)
            .await
    }

    pub async fn search_count(
        db: &PgPool,
        field: SearchField,
        query: &str,
    ) -> Result<i64, sqlx::Error> {
        let sql = format!(
            "SELECT COUNT(*) FROM users WHERE {} ILIKE '%' || $1 || '%'",
            field.column()
        );
        sqlx::query_scalar::<_, i64>(&sql)
            .bind(query)
            .fetch_one(db)
            .await
    }
}
