//! Presence-flag relationships between a user and a target row.
//!
//! Favourites, cart entries and follows share one shape: an `(actor, target)`
//! pair that is either present or absent, guarded by a UNIQUE constraint.

use anyhow::Result;

use crate::{Database, is_unique_violation};

/// Names the table and columns backing one relationship kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeTable {
    pub table: &'static str,
    pub actor_column: &'static str,
    pub target_column: &'static str,
}

impl EdgeTable {
    pub const FAVOURITES: Self = Self {
        table: "favourites",
        actor_column: "user_id",
        target_column: "recipe_id",
    };

    pub const CARTS: Self = Self {
        table: "carts",
        actor_column: "user_id",
        target_column: "recipe_id",
    };

    pub const FOLLOWS: Self = Self {
        table: "follows",
        actor_column: "follower_id",
        target_column: "following_id",
    };
}

impl Database {
    /// Creates the edge. Returns `false` when it already existed; the check
    /// is the table's UNIQUE constraint, so concurrent inserts cannot both win.
    pub fn insert_edge(&self, edge: EdgeTable, actor_id: i64, target_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let sql = format!(
                "INSERT INTO {} ({}, {}) VALUES (?1, ?2)",
                edge.table, edge.actor_column, edge.target_column
            );
            match conn.execute(&sql, [actor_id, target_id]) {
                Ok(_) => Ok(true),
                Err(e) if is_unique_violation(&e) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Deletes the edge. Returns `false` when there was nothing to delete.
    pub fn delete_edge(&self, edge: EdgeTable, actor_id: i64, target_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let sql = format!(
                "DELETE FROM {} WHERE {} = ?1 AND {} = ?2",
                edge.table, edge.actor_column, edge.target_column
            );
            let changed = conn.execute(&sql, [actor_id, target_id])?;
            Ok(changed > 0)
        })
    }

    pub fn edge_exists(&self, edge: EdgeTable, actor_id: i64, target_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1 AND {} = ?2)",
                edge.table, edge.actor_column, edge.target_column
            );
            let exists: bool = conn.query_row(&sql, [actor_id, target_id], |row| row.get(0))?;
            Ok(exists)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::tests::user;

    #[test]
    fn second_insert_of_the_same_edge_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");

        assert!(db.insert_edge(EdgeTable::FOLLOWS, alice, bob).unwrap());
        assert!(!db.insert_edge(EdgeTable::FOLLOWS, alice, bob).unwrap());
        // Direction matters.
        assert!(db.insert_edge(EdgeTable::FOLLOWS, bob, alice).unwrap());
        assert!(db.edge_exists(EdgeTable::FOLLOWS, alice, bob).unwrap());
    }

    #[test]
    fn delete_reports_missing_edges() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");

        assert!(!db.delete_edge(EdgeTable::FOLLOWS, alice, bob).unwrap());
        db.insert_edge(EdgeTable::FOLLOWS, alice, bob).unwrap();
        assert!(db.delete_edge(EdgeTable::FOLLOWS, alice, bob).unwrap());
        assert!(!db.edge_exists(EdgeTable::FOLLOWS, alice, bob).unwrap());
    }
}
