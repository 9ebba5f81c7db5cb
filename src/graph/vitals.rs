use rusqlite::{params, Connection, TransactionBehavior};
use tracing::{debug, info};

use crate::graph::model::{CharacterId, Vital};
use crate::graph::sqlite::{require_character, require_non_empty, GraphDb, GraphDbError};

// Conflicting rows are updated in place, so a vital keeps its original position.
const UPSERT_VITAL: &str = "INSERT INTO vitals (character_id, name, value) VALUES (?1, ?2, ?3) \
     ON CONFLICT (character_id, name) DO UPDATE SET value = excluded.value";

fn upsert_vital_row(
    conn: &Connection,
    character_id: CharacterId,
    name: &str,
    value: &str,
) -> Result<(), GraphDbError> {
    let name = require_non_empty("vital name", name)?;
    conn.execute(UPSERT_VITAL, params![character_id.0, name, value])?;
    Ok(())
}

impl GraphDb {
    pub fn upsert_vital(
        &mut self,
        character_id: CharacterId,
        name: &str,
        value: &str,
    ) -> Result<(), GraphDbError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        require_character(&tx, character_id)?;
        upsert_vital_row(&tx, character_id, name, value)?;
        tx.commit()?;
        debug!(%character_id, name, "upserted vital");
        Ok(())
    }

    /// Applies a whole vitals form at once; either every pair lands or none does.
    pub fn update_vitals(
        &mut self,
        character_id: CharacterId,
        vitals: &[(String, String)],
    ) -> Result<(), GraphDbError> {
        for (name, _) in vitals {
            require_non_empty("vital name", name)?;
        }
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        require_character(&tx, character_id)?;
        for (name, value) in vitals {
            upsert_vital_row(&tx, character_id, name, value)?;
        }
        tx.commit()?;
        info!(%character_id, count = vitals.len(), "updated vitals");
        Ok(())
    }

    pub fn delete_vital(&mut self, character_id: CharacterId, name: &str) -> Result<bool, GraphDbError> {
        let removed = self.conn.execute(
            "DELETE FROM vitals WHERE character_id = ?1 AND name = ?2",
            params![character_id.0, name.trim()],
        )?;
        if removed > 0 {
            debug!(%character_id, name, "deleted vital");
        }
        Ok(removed > 0)
    }

    /// Vitals in the order they were first added.
    pub fn list_vitals(&self, character_id: CharacterId) -> Result<Vec<Vital>, GraphDbError> {
        require_character(&self.conn, character_id)?;
        let mut stmt = self.conn.prepare(
            "SELECT name, value FROM vitals WHERE character_id = ?1 ORDER BY vital_id",
        )?;
        let rows = stmt.query_map(params![character_id.0], |row| {
            Ok(Vital {
                name: row.get(0)?,
                value: row.get(1)?,
            })
        })?;
        let mut vitals = Vec::new();
        for row in rows {
            vitals.push(row?);
        }
        Ok(vitals)
    }
}
