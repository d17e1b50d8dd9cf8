use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                email       TEXT NOT NULL UNIQUE,
                username    TEXT NOT NULL UNIQUE,
                first_name  TEXT NOT NULL,
                last_name   TEXT NOT NULL,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE tags (
                id      INTEGER PRIMARY KEY AUTOINCREMENT,
                name    TEXT NOT NULL,
                color   TEXT NOT NULL UNIQUE,
                slug    TEXT NOT NULL UNIQUE
            );

            CREATE TABLE ingredients (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                name                TEXT NOT NULL,
                measurement_unit    TEXT NOT NULL,
                UNIQUE(name, measurement_unit)
            );

            CREATE TABLE recipes (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                author_id       INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                name            TEXT NOT NULL,
                text            TEXT NOT NULL,
                cooking_time    INTEGER NOT NULL CHECK (cooking_time >= 1),
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_recipes_author ON recipes(author_id, created_at);

            CREATE TABLE recipe_ingredients (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                recipe_id       INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                ingredient_id   INTEGER NOT NULL REFERENCES ingredients(id) ON DELETE CASCADE,
                amount          INTEGER NOT NULL CHECK (amount >= 1),
                UNIQUE(recipe_id, ingredient_id)
            );

            CREATE TABLE recipe_tags (
                recipe_id   INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                tag_id      INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                PRIMARY KEY (recipe_id, tag_id)
            );

            CREATE TABLE favourites (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                recipe_id   INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                UNIQUE(user_id, recipe_id)
            );

            CREATE TABLE carts (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                recipe_id   INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                UNIQUE(user_id, recipe_id)
            );

            CREATE TABLE follows (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                follower_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                following_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                CHECK (follower_id <> following_id),
                UNIQUE(follower_id, following_id)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn self_follow_is_rejected_by_the_schema() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        conn.execute(
            "INSERT INTO users (email, username, first_name, last_name, password)
             VALUES ('a@x.io', 'a', 'A', 'A', 'h')",
            [],
        )
        .unwrap();

        let err = conn
            .execute("INSERT INTO follows (follower_id, following_id) VALUES (1, 1)", [])
            .unwrap_err();
        assert!(err.to_string().contains("CHECK"));
    }
}
