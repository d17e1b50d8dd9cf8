use crate::models::{IngredientRow, TagRow, UserRow};
use crate::{Database, OptionalExt, is_unique_violation};
use anyhow::Result;
use rusqlite::{Connection, Row};

const USER_COLUMNS: &str = "id, email, username, first_name, last_name, password, created_at";

/// Fields of a new account. `password` is already hashed.
pub struct NewUser<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password: &'a str,
}

impl Database {
    // -- Users --

    /// Inserts a user and returns its id, or `None` when the email or
    /// username is already taken.
    pub fn create_user(&self, user: &NewUser<'_>) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (email, username, first_name, last_name, password)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (user.email, user.username, user.first_name, user.last_name, user.password),
            );
            match inserted {
                Ok(_) => Ok(Some(conn.last_insert_rowid())),
                Err(e) if is_unique_violation(&e) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                [id],
                map_user,
            )
            .optional()
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                [email],
                map_user,
            )
            .optional()
        })
    }

    /// All users, newest account first.
    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id DESC"))?;
            let rows = stmt
                .query_map([], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Users followed by `follower_id`, in the order they were followed.
    pub fn list_followed_users(&self, follower_id: i64) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.email, u.username, u.first_name, u.last_name, u.password, u.created_at
                 FROM follows f
                 JOIN users u ON u.id = f.following_id
                 WHERE f.follower_id = ?1
                 ORDER BY f.id",
            )?;
            let rows = stmt
                .query_map([follower_id], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_password(&self, user_id: i64, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET password = ?1 WHERE id = ?2",
                rusqlite::params![password_hash, user_id],
            )?;
            Ok(changed == 1)
        })
    }

    // -- Tags --

    /// Inserts a tag unless one with the same color or slug exists.
    /// Returns whether a row was written.
    pub fn insert_tag(&self, name: &str, color: &str, slug: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO tags (name, color, slug) VALUES (?1, ?2, ?3)",
                (name, color, slug),
            )?;
            Ok(changed == 1)
        })
    }

    pub fn list_tags(&self) -> Result<Vec<TagRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, color, slug FROM tags ORDER BY id")?;
            let rows = stmt
                .query_map([], map_tag)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_tag(&self, id: i64) -> Result<Option<TagRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, color, slug FROM tags WHERE id = ?1",
                [id],
                map_tag,
            )
            .optional()
        })
    }

    // -- Ingredients --

    /// Inserts an ingredient unless the same (name, unit) pair exists.
    pub fn insert_ingredient(&self, name: &str, measurement_unit: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO ingredients (name, measurement_unit) VALUES (?1, ?2)",
                (name, measurement_unit),
            )?;
            Ok(changed == 1)
        })
    }

    pub fn list_ingredients(&self) -> Result<Vec<IngredientRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, name, measurement_unit FROM ingredients ORDER BY name, id")?;
            let rows = stmt
                .query_map([], map_ingredient)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_ingredient(&self, id: i64) -> Result<Option<IngredientRow>> {
        self.with_conn(|conn| query_ingredient(conn, id))
    }

    /// Returns the ids from `ids` that have no ingredient row.
    pub fn missing_ingredients(&self, ids: &[i64]) -> Result<Vec<i64>> {
        self.with_conn(|conn| {
            let mut missing = Vec::new();
            for &id in ids {
                if query_ingredient(conn, id)?.is_none() {
                    missing.push(id);
                }
            }
            Ok(missing)
        })
    }
}

fn query_ingredient(conn: &Connection, id: i64) -> Result<Option<IngredientRow>> {
    conn.query_row(
        "SELECT id, name, measurement_unit FROM ingredients WHERE id = ?1",
        [id],
        map_ingredient,
    )
    .optional()
}

pub(crate) fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        password: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub(crate) fn map_tag(row: &Row<'_>) -> rusqlite::Result<TagRow> {
    Ok(TagRow {
        id: row.get(0)?,
        name: row.get(1)?,
        color: row.get(2)?,
        slug: row.get(3)?,
    })
}

fn map_ingredient(row: &Row<'_>) -> rusqlite::Result<IngredientRow> {
    Ok(IngredientRow {
        id: row.get(0)?,
        name: row.get(1)?,
        measurement_unit: row.get(2)?,
    })
}
