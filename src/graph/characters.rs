use std::collections::HashSet;

use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::{info, warn};

use crate::graph::model::{Character, CharacterId, RecordKind};
use crate::graph::sqlite::{is_unique_violation, require_non_empty, resolve_slug, GraphDb, GraphDbError};
use crate::slug;

const CHARACTER_COLUMNS: &str = "character_id, slug, name, starred, selected";

fn character_from_row(row: &Row<'_>) -> rusqlite::Result<Character> {
    Ok(Character {
        id: CharacterId(row.get(0)?),
        slug: row.get(1)?,
        name: row.get(2)?,
        starred: row.get::<_, i64>(3)? != 0,
        selected: row.get::<_, i64>(4)? != 0,
    })
}

fn taken_slugs(conn: &Connection, base: &str) -> Result<HashSet<String>, GraphDbError> {
    let mut stmt = conn.prepare("SELECT slug FROM characters WHERE slug = ?1 OR slug LIKE ?2")?;
    let rows = stmt.query_map(params![base, format!("{}-%", base)], |row| {
        row.get::<_, String>(0)
    })?;
    let mut taken = HashSet::new();
    for row in rows {
        taken.insert(row?);
    }
    Ok(taken)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CascadeReport {
    pub vitals: usize,
    pub relationships: usize,
}

impl GraphDb {
    /// Creates a character and returns the slug it was given: the generated base if free,
    /// otherwise the base with the lowest free suffix from `-2` upwards.
    pub fn create_character(&mut self, name: &str) -> Result<String, GraphDbError> {
        let name = require_non_empty("name", name)?;
        let base = slug::generate(name);
        if base.is_empty() {
            return Err(GraphDbError::Validation {
                field: "name",
                reason: "has no characters usable in a slug",
            });
        }

        for attempt in 1..=self.max_slug_attempts {
            match self.claim_slug(&base, name) {
                Ok(slug) => {
                    info!(%slug, name, "created character");
                    return Ok(slug);
                }
                // Probe and insert share an IMMEDIATE transaction, so this only fires when
                // something outside that transaction wrote the slug first.
                Err(GraphDbError::Sqlite(err)) if is_unique_violation(&err) => {
                    warn!(%base, attempt, "slug claim collided, retrying");
                }
                Err(err) => return Err(err),
            }
        }

        Err(GraphDbError::ConflictRetryExhausted {
            base,
            attempts: self.max_slug_attempts,
        })
    }

    fn claim_slug(&mut self, base: &str, name: &str) -> Result<String, GraphDbError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let taken = taken_slugs(&tx, base)?;

        let mut suffix = 1;
        let mut candidate = slug::with_suffix(base, suffix);
        while taken.contains(&candidate) {
            suffix += 1;
            candidate = slug::with_suffix(base, suffix);
        }

        tx.execute(
            "INSERT INTO characters (slug, name, starred, selected) VALUES (?1, ?2, 0, 0)",
            params![candidate, name],
        )?;
        tx.commit()?;
        Ok(candidate)
    }

    /// Changes the display name only. The slug keeps addressing the character.
    pub fn rename_character(&mut self, slug: &str, new_name: &str) -> Result<(), GraphDbError> {
        let new_name = require_non_empty("name", new_name)?;
        let changed = self.conn.execute(
            "UPDATE characters SET name = ?1 WHERE slug = ?2",
            params![new_name, slug],
        )?;
        if changed == 0 {
            return Err(GraphDbError::not_found(RecordKind::Character, slug));
        }
        info!(slug, name = new_name, "renamed character");
        Ok(())
    }

    pub fn set_starred(&mut self, slug: &str, starred: bool) -> Result<(), GraphDbError> {
        self.set_flag(slug, "starred", starred)
    }

    pub fn set_selected(&mut self, slug: &str, selected: bool) -> Result<(), GraphDbError> {
        self.set_flag(slug, "selected", selected)
    }

    fn set_flag(&mut self, slug: &str, column: &'static str, value: bool) -> Result<(), GraphDbError> {
        let sql = format!("UPDATE characters SET {} = ?1 WHERE slug = ?2", column);
        let changed = self
            .conn
            .execute(&sql, params![if value { 1 } else { 0 }, slug])?;
        if changed == 0 {
            return Err(GraphDbError::not_found(RecordKind::Character, slug));
        }
        info!(slug, flag = column, value, "updated character flag");
        Ok(())
    }

    /// Deletes a character together with its vitals and every relationship that starts
    /// or ends at it. Nothing is removed unless all of it is.
    pub fn delete_character(&mut self, id: CharacterId) -> Result<CascadeReport, GraphDbError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let slug: Option<String> = tx
            .query_row(
                "SELECT slug FROM characters WHERE character_id = ?1",
                params![id.0],
                |row| row.get(0),
            )
            .optional()?;
        let Some(slug) = slug else {
            return Err(GraphDbError::not_found(RecordKind::Character, id));
        };

        let vitals = tx.execute("DELETE FROM vitals WHERE character_id = ?1", params![id.0])?;
        let relationships = tx.execute(
            "DELETE FROM relationships WHERE from_character_id = ?1 OR to_character_id = ?1",
            params![id.0],
        )?;
        tx.execute("DELETE FROM characters WHERE character_id = ?1", params![id.0])?;
        tx.commit()?;

        info!(%slug, vitals, relationships, "deleted character");
        Ok(CascadeReport {
            vitals,
            relationships,
        })
    }

    pub fn get_character(&self, slug: &str) -> Result<Option<Character>, GraphDbError> {
        let sql = format!("SELECT {} FROM characters WHERE slug = ?1", CHARACTER_COLUMNS);
        let character = self
            .conn
            .query_row(&sql, params![slug], character_from_row)
            .optional()?;
        Ok(character)
    }

    pub fn list_characters(&self) -> Result<Vec<Character>, GraphDbError> {
        let sql = format!(
            "SELECT {} FROM characters ORDER BY name, character_id",
            CHARACTER_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], character_from_row)?;
        let mut characters = Vec::new();
        for row in rows {
            characters.push(row?);
        }
        Ok(characters)
    }

    pub fn resolve_id(&self, slug: &str) -> Result<Option<CharacterId>, GraphDbError> {
        resolve_slug(&self.conn, slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> GraphDb {
        GraphDb::open_in_memory().unwrap()
    }

    #[test]
    fn colliding_names_get_numbered_slugs() {
        let mut db = db();
        assert_eq!(db.create_character("Harry Potter").unwrap(), "harry-potter");
        assert_eq!(db.create_character("Harry Potter").unwrap(), "harry-potter-2");
        assert_eq!(db.create_character("harry   potter!").unwrap(), "harry-potter-3");
        assert_eq!(db.list_characters().unwrap().len(), 3);
    }

    #[test]
    fn suffix_fills_the_first_gap() {
        let mut db = db();
        db.create_character("Ron").unwrap();
        db.create_character("Ron").unwrap();
        db.create_character("Ron").unwrap();
        let id = db.resolve_id("ron-2").unwrap().unwrap();
        db.delete_character(id).unwrap();

        assert_eq!(db.create_character("Ron").unwrap(), "ron-2");
    }

    #[test]
    fn unrelated_prefixes_do_not_count_as_taken() {
        let mut db = db();
        db.create_character("Ron Weasley").unwrap();
        assert_eq!(db.create_character("Ron").unwrap(), "ron");
    }

    #[test]
    fn new_characters_have_default_flags() {
        let mut db = db();
        db.create_character("Luna Lovegood").unwrap();
        let luna = db.get_character("luna-lovegood").unwrap().unwrap();
        assert_eq!(luna.name, "Luna Lovegood");
        assert!(!luna.starred);
        assert!(!luna.selected);
    }

    #[test]
    fn names_without_slug_material_are_invalid() {
        let mut db = db();
        assert!(matches!(
            db.create_character("   "),
            Err(GraphDbError::Validation { field: "name", .. })
        ));
        assert!(matches!(
            db.create_character("?!"),
            Err(GraphDbError::Validation { field: "name", .. })
        ));
        assert!(db.list_characters().unwrap().is_empty());
    }

    // Squats on whatever slug is being inserted, so every claim hits the UNIQUE index.
    const SQUATTER_TRIGGER: &str = "
        CREATE TRIGGER squat_slug BEFORE INSERT ON characters
        WHEN NEW.name <> 'Squatter'
        BEGIN
          INSERT INTO characters (slug, name) VALUES (NEW.slug, 'Squatter');
        END;";

    #[test]
    fn colliding_claims_retry_until_the_bound() {
        let mut db = db();
        db.create_character("Neville").unwrap();
        db.conn.execute_batch(SQUATTER_TRIGGER).unwrap();
        db.max_slug_attempts = 3;

        match db.create_character("Neville") {
            Err(GraphDbError::ConflictRetryExhausted { base, attempts }) => {
                assert_eq!(base, "neville");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected result {:?}", other),
        }
        // Every failed claim rolled back, squatter rows included.
        let slugs: Vec<String> = db
            .list_characters()
            .unwrap()
            .into_iter()
            .map(|c| c.slug)
            .collect();
        assert_eq!(slugs, ["neville"]);

        db.conn.execute_batch("DROP TRIGGER squat_slug;").unwrap();
        assert_eq!(db.create_character("Neville").unwrap(), "neville-2");
    }

    #[test]
    fn default_bound_never_exhausts_on_a_fresh_store() {
        let mut db = db();
        for expected in ["neville", "neville-2", "neville-3"] {
            assert_eq!(db.create_character("Neville").unwrap(), expected);
        }
    }

    #[test]
    fn rename_keeps_the_slug() {
        let mut db = db();
        db.create_character("Hermione Granger").unwrap();
        db.rename_character("hermione-granger", "Hermione Weasley")
            .unwrap();

        let hermione = db.get_character("hermione-granger").unwrap().unwrap();
        assert_eq!(hermione.name, "Hermione Weasley");
        assert!(db.get_character("hermione-weasley").unwrap().is_none());
    }

    #[test]
    fn rename_of_unknown_slug_is_not_found() {
        let mut db = db();
        let err = db.rename_character("nobody", "Somebody").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn flags_toggle_independently() {
        let mut db = db();
        db.create_character("Harry Potter").unwrap();
        db.set_starred("harry-potter", true).unwrap();

        let harry = db.get_character("harry-potter").unwrap().unwrap();
        assert!(harry.starred);
        assert!(!harry.selected);

        db.set_selected("harry-potter", true).unwrap();
        db.set_starred("harry-potter", false).unwrap();
        let harry = db.get_character("harry-potter").unwrap().unwrap();
        assert!(!harry.starred);
        assert!(harry.selected);

        assert!(db.set_starred("nobody", true).unwrap_err().is_not_found());
    }

    #[test]
    fn list_is_sorted_by_name() {
        let mut db = db();
        for name in ["Ron Weasley", "Draco Malfoy", "Luna Lovegood", "Harry Potter"] {
            db.create_character(name).unwrap();
        }
        let names: Vec<String> = db
            .list_characters()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(
            names,
            ["Draco Malfoy", "Harry Potter", "Luna Lovegood", "Ron Weasley"]
        );
    }

    #[test]
    fn missing_lookups_are_absent_not_errors() {
        let db = db();
        assert!(db.get_character("nobody").unwrap().is_none());
        assert!(db.resolve_id("nobody").unwrap().is_none());
    }

    #[test]
    fn delete_of_unknown_id_is_not_found() {
        let mut db = db();
        let err = db.delete_character(CharacterId(42)).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn concurrent_creates_never_share_a_slug() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db");
        GraphDb::open(&path).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let mut db = GraphDb::open(&path).unwrap();
                    (0..5)
                        .map(|_| db.create_character("Harry Potter").unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut slugs: Vec<String> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        slugs.sort();
        let before = slugs.len();
        slugs.dedup();
        assert_eq!(before, 20);
        assert_eq!(slugs.len(), 20);
        assert!(slugs.contains(&"harry-potter".to_string()));
        assert!(slugs.contains(&"harry-potter-20".to_string()));
    }
}
