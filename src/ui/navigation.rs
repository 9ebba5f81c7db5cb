use serde::Serialize;

use crate::graph::model::{Character, RelationshipDetail, Vital};
use crate::selection::character_slug_from_path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListItem {
    pub content: String,
    pub link: Option<String>,
    pub starred: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterAction {
    Vitals,
    Relationships,
}

impl CharacterAction {
    pub const ALL: [CharacterAction; 2] = [CharacterAction::Vitals, CharacterAction::Relationships];

    pub fn label(self) -> &'static str {
        match self {
            CharacterAction::Vitals => "Vitals",
            CharacterAction::Relationships => "Relationships",
        }
    }

    fn segment(self) -> &'static str {
        match self {
            CharacterAction::Vitals => "vitals",
            CharacterAction::Relationships => "relationships",
        }
    }

    /// The action named by the segment after the slug in `/characters/<slug>/<action>`.
    pub fn from_path(path: &str) -> Option<Self> {
        let slug = character_slug_from_path(path)?;
        let rest = path.strip_prefix("/characters/")?.strip_prefix(slug)?;
        let segment = rest.strip_prefix('/')?.split('/').next()?;
        Self::ALL.into_iter().find(|action| action.segment() == segment)
    }
}

pub const CHARACTERS_ROOT: &str = "/characters";

pub fn characters_root_item(selected: bool) -> ListItem {
    ListItem {
        content: "Characters".to_string(),
        link: Some(CHARACTERS_ROOT.to_string()),
        starred: false,
        selected,
    }
}

pub fn character_link(slug: &str) -> String {
    format!("{}/{}", CHARACTERS_ROOT, slug)
}

pub fn action_link(slug: &str, action: CharacterAction) -> String {
    format!("{}/{}/{}", CHARACTERS_ROOT, slug, action.segment())
}

pub fn character_menu(characters: &[Character], current_slug: Option<&str>) -> Vec<ListItem> {
    characters
        .iter()
        .map(|character| ListItem {
            content: character.name.clone(),
            link: Some(character_link(&character.slug)),
            starred: character.starred,
            selected: current_slug == Some(character.slug.as_str()),
        })
        .collect()
}

pub fn character_actions(slug: &str, current: Option<CharacterAction>) -> Vec<ListItem> {
    CharacterAction::ALL
        .into_iter()
        .map(|action| ListItem {
            content: action.label().to_string(),
            link: Some(action_link(slug, action)),
            starred: false,
            selected: current == Some(action),
        })
        .collect()
}

pub fn render_list(items: &[ListItem]) -> String {
    let mut output = String::new();
    for item in items {
        let marker = if item.selected { '>' } else { ' ' };
        let star = if item.starred { '*' } else { ' ' };
        output.push_str(&format!("{}{} {}", marker, star, item.content));
        if let Some(link) = &item.link {
            output.push_str(&format!("  ({})", link));
        }
        output.push('\n');
    }
    output
}

pub fn render_vitals(vitals: &[Vital]) -> String {
    let mut output = String::new();
    for vital in vitals {
        output.push_str(&format!("  {}: {}\n", vital.name, vital.value));
    }
    output
}

pub fn render_relationships(relationships: &[RelationshipDetail]) -> String {
    let mut output = String::new();
    for relationship in relationships {
        output.push_str(&format!(
            "  [{}] {}: {} ({})\n",
            relationship.relationship_id,
            relationship.label,
            relationship.to_character_name,
            relationship.to_character_slug
        ));
    }
    output
}
