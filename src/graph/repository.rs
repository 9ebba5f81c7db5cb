use crate::graph::characters::CascadeReport;
use crate::graph::model::{
    CandidateTarget, Character, CharacterId, OutgoingEdge, Relationship, RelationshipDetail,
    RelationshipId, Vital,
};
use crate::graph::sqlite::{GraphDb, GraphDbError};

pub trait GraphRepository {
    fn create_character(&mut self, name: &str) -> Result<String, GraphDbError>;
    fn rename_character(&mut self, slug: &str, new_name: &str) -> Result<(), GraphDbError>;
    fn set_starred(&mut self, slug: &str, starred: bool) -> Result<(), GraphDbError>;
    fn set_selected(&mut self, slug: &str, selected: bool) -> Result<(), GraphDbError>;
    fn delete_character(&mut self, id: CharacterId) -> Result<CascadeReport, GraphDbError>;
    fn get_character(&self, slug: &str) -> Result<Option<Character>, GraphDbError>;
    fn list_characters(&self) -> Result<Vec<Character>, GraphDbError>;
    fn resolve_id(&self, slug: &str) -> Result<Option<CharacterId>, GraphDbError>;

    fn upsert_vital(
        &mut self,
        character_id: CharacterId,
        name: &str,
        value: &str,
    ) -> Result<(), GraphDbError>;
    fn update_vitals(
        &mut self,
        character_id: CharacterId,
        vitals: &[(String, String)],
    ) -> Result<(), GraphDbError>;
    fn delete_vital(&mut self, character_id: CharacterId, name: &str) -> Result<bool, GraphDbError>;
    fn list_vitals(&self, character_id: CharacterId) -> Result<Vec<Vital>, GraphDbError>;

    fn upsert_relationship(
        &mut self,
        from_slug: &str,
        relationship_id: Option<RelationshipId>,
        label: &str,
        to_slug: &str,
    ) -> Result<RelationshipId, GraphDbError>;
    fn delete_relationship(&mut self, id: RelationshipId) -> Result<(), GraphDbError>;
    fn get_relationship(&self, id: RelationshipId) -> Result<Option<Relationship>, GraphDbError>;
    fn list_outgoing(&self, character_id: CharacterId) -> Result<Vec<OutgoingEdge>, GraphDbError>;
    fn list_outgoing_with_details(
        &self,
        character_id: CharacterId,
    ) -> Result<Vec<RelationshipDetail>, GraphDbError>;
    fn list_outgoing_for_slug(&self, slug: &str) -> Result<Vec<RelationshipDetail>, GraphDbError>;
    fn list_candidate_targets(
        &self,
        excluding_slug: &str,
    ) -> Result<Vec<CandidateTarget>, GraphDbError>;
}

impl GraphRepository for GraphDb {
    fn create_character(&mut self, name: &str) -> Result<String, GraphDbError> {
        GraphDb::create_character(self, name)
    }

    fn rename_character(&mut self, slug: &str, new_name: &str) -> Result<(), GraphDbError> {
        GraphDb::rename_character(self, slug, new_name)
    }

    fn set_starred(&mut self, slug: &str, starred: bool) -> Result<(), GraphDbError> {
        GraphDb::set_starred(self, slug, starred)
    }

    fn set_selected(&mut self, slug: &str, selected: bool) -> Result<(), GraphDbError> {
        GraphDb::set_selected(self, slug, selected)
    }

    fn delete_character(&mut self, id: CharacterId) -> Result<CascadeReport, GraphDbError> {
        GraphDb::delete_character(self, id)
    }

    fn get_character(&self, slug: &str) -> Result<Option<Character>, GraphDbError> {
        GraphDb::get_character(self, slug)
    }

    fn list_characters(&self) -> Result<Vec<Character>, GraphDbError> {
        GraphDb::list_characters(self)
    }

    fn resolve_id(&self, slug: &str) -> Result<Option<CharacterId>, GraphDbError> {
        GraphDb::resolve_id(self, slug)
    }

    fn upsert_vital(
        &mut self,
        character_id: CharacterId,
        name: &str,
        value: &str,
    ) -> Result<(), GraphDbError> {
        GraphDb::upsert_vital(self, character_id, name, value)
    }

    fn update_vitals(
        &mut self,
        character_id: CharacterId,
        vitals: &[(String, String)],
    ) -> Result<(), GraphDbError> {
        GraphDb::update_vitals(self, character_id, vitals)
    }

    fn delete_vital(&mut self, character_id: CharacterId, name: &str) -> Result<bool, GraphDbError> {
        GraphDb::delete_vital(self, character_id, name)
    }

    fn list_vitals(&self, character_id: CharacterId) -> Result<Vec<Vital>, GraphDbError> {
        GraphDb::list_vitals(self, character_id)
    }

    fn upsert_relationship(
        &mut self,
        from_slug: &str,
        relationship_id: Option<RelationshipId>,
        label: &str,
        to_slug: &str,
    ) -> Result<RelationshipId, GraphDbError> {
        GraphDb::upsert_relationship(self, from_slug, relationship_id, label, to_slug)
    }

    fn delete_relationship(&mut self, id: RelationshipId) -> Result<(), GraphDbError> {
        GraphDb::delete_relationship(self, id)
    }

    fn get_relationship(&self, id: RelationshipId) -> Result<Option<Relationship>, GraphDbError> {
        GraphDb::get_relationship(self, id)
    }

    fn list_outgoing(&self, character_id: CharacterId) -> Result<Vec<OutgoingEdge>, GraphDbError> {
        GraphDb::list_outgoing(self, character_id)
    }

    fn list_outgoing_with_details(
        &self,
        character_id: CharacterId,
    ) -> Result<Vec<RelationshipDetail>, GraphDbError> {
        GraphDb::list_outgoing_with_details(self, character_id)
    }

    fn list_outgoing_for_slug(&self, slug: &str) -> Result<Vec<RelationshipDetail>, GraphDbError> {
        GraphDb::list_outgoing_for_slug(self, slug)
    }

    fn list_candidate_targets(
        &self,
        excluding_slug: &str,
    ) -> Result<Vec<CandidateTarget>, GraphDbError> {
        GraphDb::list_candidate_targets(self, excluding_slug)
    }
}
