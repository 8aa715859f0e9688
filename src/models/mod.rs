use serde::{Deserialize, Serialize};

/// A reading or a game placed inside a learning-path category.
///
/// Exactly one of `reading_id` / `game_id` is set by the backend. Game items
/// point at the reading they are nested under through `prerequisite_reading_id`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Item {
    pub id: i64,
    pub sequence_order: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub reading_id: Option<i64>,
    #[serde(default)]
    pub game_id: Option<i64>,
    #[serde(default)]
    pub prerequisite_reading_id: Option<i64>,
}

fn default_active() -> bool {
    true
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ItemKind {
    Reading,
    Game,
}

impl Item {
    pub fn kind(&self) -> ItemKind {
        if self.reading_id.is_some() {
            ItemKind::Reading
        } else {
            ItemKind::Game
        }
    }

    pub fn is_reading(&self) -> bool {
        self.kind() == ItemKind::Reading
    }

    /// True when this is a game nested under `reading_id`.
    pub fn is_game_of(&self, reading_id: i64) -> bool {
        self.kind() == ItemKind::Game && self.prerequisite_reading_id == Some(reading_id)
    }

    pub fn order_entry(&self) -> ItemOrderEntry {
        ItemOrderEntry {
            reading_id: self.reading_id,
            game_id: self.game_id,
            sequence_order: self.sequence_order,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Category {
    pub category_id: i64,
    #[serde(default)]
    pub category_name: String,
    #[serde(default)]
    pub items: Vec<Item>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct LearningPath {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub difficulty_level: Option<String>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

/// One row of the item order payload sent after a reading/game move.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct ItemOrderEntry {
    pub reading_id: Option<i64>,
    pub game_id: Option<i64>,
    pub sequence_order: u32,
}

/// Identifies an item to delete. Deleting a reading cascades to its games on
/// the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ItemRef {
    Reading { category_id: i64, reading_id: i64 },
    Game { category_id: i64, game_id: i64 },
}

impl ItemRef {
    pub fn category_id(&self) -> i64 {
        match self {
            ItemRef::Reading { category_id, .. } | ItemRef::Game { category_id, .. } => {
                *category_id
            }
        }
    }
}
