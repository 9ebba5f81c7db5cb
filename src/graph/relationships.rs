use rusqlite::{params, OptionalExtension, TransactionBehavior};
use tracing::info;

use crate::graph::model::{
    CandidateTarget, CharacterId, OutgoingEdge, RecordKind, Relationship, RelationshipDetail,
    RelationshipId,
};
use crate::graph::sqlite::{require_character, require_non_empty, resolve_slug, GraphDb, GraphDbError};

impl GraphDb {
    /// Creates an edge `from_slug -> to_slug` when `relationship_id` is `None`, otherwise
    /// relabels and retargets that edge. The edge being updated must start at `from_slug`.
    ///
    /// Creation never deduplicates: an identical `(from, to, label)` edge may already exist.
    pub fn upsert_relationship(
        &mut self,
        from_slug: &str,
        relationship_id: Option<RelationshipId>,
        label: &str,
        to_slug: &str,
    ) -> Result<RelationshipId, GraphDbError> {
        let label = require_non_empty("label", label)?;
        let to_slug = require_non_empty("target", to_slug)?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let from_id = resolve_slug(&tx, from_slug)?
            .ok_or_else(|| GraphDbError::not_found(RecordKind::Character, from_slug))?;
        let to_id = resolve_slug(&tx, to_slug)?
            .ok_or_else(|| GraphDbError::not_found(RecordKind::Character, to_slug))?;

        let id = match relationship_id {
            Some(id) => {
                let changed = tx.execute(
                    "UPDATE relationships SET label = ?1, to_character_id = ?2 \
                     WHERE relationship_id = ?3 AND from_character_id = ?4",
                    params![label, to_id.0, id.0, from_id.0],
                )?;
                if changed == 0 {
                    return Err(GraphDbError::not_found(RecordKind::Relationship, id));
                }
                id
            }
            None => {
                tx.execute(
                    "INSERT INTO relationships (from_character_id, to_character_id, label) VALUES (?1, ?2, ?3)",
                    params![from_id.0, to_id.0, label],
                )?;
                RelationshipId(tx.last_insert_rowid())
            }
        };
        tx.commit()?;

        info!(%id, from = from_slug, to = to_slug, label, "saved relationship");
        Ok(id)
    }

    pub fn delete_relationship(&mut self, id: RelationshipId) -> Result<(), GraphDbError> {
        let removed = self.conn.execute(
            "DELETE FROM relationships WHERE relationship_id = ?1",
            params![id.0],
        )?;
        if removed == 0 {
            return Err(GraphDbError::not_found(RecordKind::Relationship, id));
        }
        info!(%id, "deleted relationship");
        Ok(())
    }

    pub fn get_relationship(&self, id: RelationshipId) -> Result<Option<Relationship>, GraphDbError> {
        let relationship = self
            .conn
            .query_row(
                "SELECT relationship_id, from_character_id, to_character_id, label \
                 FROM relationships WHERE relationship_id = ?1",
                params![id.0],
                |row| {
                    Ok(Relationship {
                        id: RelationshipId(row.get(0)?),
                        from_character_id: CharacterId(row.get(1)?),
                        to_character_id: CharacterId(row.get(2)?),
                        label: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(relationship)
    }

    pub fn list_outgoing(&self, character_id: CharacterId) -> Result<Vec<OutgoingEdge>, GraphDbError> {
        require_character(&self.conn, character_id)?;
        let mut stmt = self.conn.prepare(
            "SELECT label, to_character_id FROM relationships \
             WHERE from_character_id = ?1 ORDER BY relationship_id",
        )?;
        let rows = stmt.query_map(params![character_id.0], |row| {
            Ok(OutgoingEdge {
                label: row.get(0)?,
                to_character_id: CharacterId(row.get(1)?),
            })
        })?;
        let mut edges = Vec::new();
        for row in rows {
            edges.push(row?);
        }
        Ok(edges)
    }

    /// Outgoing edges with the target's name and slug read at query time.
    pub fn list_outgoing_with_details(
        &self,
        character_id: CharacterId,
    ) -> Result<Vec<RelationshipDetail>, GraphDbError> {
        require_character(&self.conn, character_id)?;
        let mut stmt = self.conn.prepare(
            "SELECT r.relationship_id, r.label, t.name, t.slug \
             FROM relationships r \
             JOIN characters t ON t.character_id = r.to_character_id \
             WHERE r.from_character_id = ?1 \
             ORDER BY r.relationship_id",
        )?;
        let rows = stmt.query_map(params![character_id.0], |row| {
            Ok(RelationshipDetail {
                relationship_id: RelationshipId(row.get(0)?),
                label: row.get(1)?,
                to_character_name: row.get(2)?,
                to_character_slug: row.get(3)?,
            })
        })?;
        let mut details = Vec::new();
        for row in rows {
            details.push(row?);
        }
        Ok(details)
    }

    pub fn list_outgoing_for_slug(&self, slug: &str) -> Result<Vec<RelationshipDetail>, GraphDbError> {
        let id = self
            .resolve_id(slug)?
            .ok_or_else(|| GraphDbError::not_found(RecordKind::Character, slug))?;
        self.list_outgoing_with_details(id)
    }

    pub fn list_candidate_targets(
        &self,
        excluding_slug: &str,
    ) -> Result<Vec<CandidateTarget>, GraphDbError> {
        let mut stmt = self.conn.prepare(
            "SELECT name, slug FROM characters WHERE slug <> ?1 ORDER BY name, character_id",
        )?;
        let rows = stmt.query_map(params![excluding_slug], |row| {
            Ok(CandidateTarget {
                name: row.get(0)?,
                slug: row.get(1)?,
            })
        })?;
        let mut targets = Vec::new();
        for row in rows {
            targets.push(row?);
        }
        Ok(targets)
    }
}
