pub mod characters;
pub mod model;
pub mod relationships;
pub mod repository;
pub mod sqlite;
pub mod vitals;

pub use characters::CascadeReport;
pub use model::{
    CandidateTarget, Character, CharacterId, OutgoingEdge, RecordKind, Relationship,
    RelationshipDetail, RelationshipId, Vital,
};
pub use repository::GraphRepository;
pub use sqlite::{GraphDb, GraphDbError};
