use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum MoveKind {
    Category,
    Reading,
    Game,
}

/// An ordered list a drag can start from or land in.
///
/// The string form doubles as the droppable id carried by drag events:
/// `categories`, `readings-<category_id>`, `games-<category_id>-<reading_id>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Scope {
    Categories,
    Readings { category_id: i64 },
    Games { category_id: i64, reading_id: i64 },
}

impl Scope {
    /// The move kind a drag inside this scope describes.
    pub fn kind(&self) -> MoveKind {
        match self {
            Scope::Categories => MoveKind::Category,
            Scope::Readings { .. } => MoveKind::Reading,
            Scope::Games { .. } => MoveKind::Game,
        }
    }

    pub fn category_id(&self) -> Option<i64> {
        match self {
            Scope::Categories => None,
            Scope::Readings { category_id } | Scope::Games { category_id, .. } => {
                Some(*category_id)
            }
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Categories => write!(f, "categories"),
            Scope::Readings { category_id } => write!(f, "readings-{category_id}"),
            Scope::Games {
                category_id,
                reading_id,
            } => write!(f, "games-{category_id}-{reading_id}"),
        }
    }
}

impl FromStr for Scope {
    type Err = MoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || MoveError::BadDroppableId(s.to_string());
        let s_trim = s.trim();

        if s_trim == "categories" {
            return Ok(Scope::Categories);
        }
        if let Some(rest) = s_trim.strip_prefix("readings-") {
            let category_id = rest.parse::<i64>().map_err(|_| bad())?;
            return Ok(Scope::Readings { category_id });
        }
        if let Some(rest) = s_trim.strip_prefix("games-") {
            // Ids are never negative, so a single '-' separates them.
            let (c, r) = rest.split_once('-').ok_or_else(bad)?;
            let category_id = c.parse::<i64>().map_err(|_| bad())?;
            let reading_id = r.parse::<i64>().map_err(|_| bad())?;
            return Ok(Scope::Games {
                category_id,
                reading_id,
            });
        }

        Err(bad())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Location {
    pub scope: Scope,
    pub index: usize,
}

impl Location {
    pub fn new(scope: Scope, index: usize) -> Self {
        Self { scope, index }
    }
}

/// One user-initiated reorder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct MoveCommand {
    pub kind: MoveKind,
    pub source: Location,
    pub destination: Location,
}

impl MoveCommand {
    /// Build a command from a finished drag; the kind follows the source scope.
    pub fn from_drag(source: Location, destination: Location) -> Self {
        Self {
            kind: source.scope.kind(),
            source,
            destination,
        }
    }

    pub fn is_same_position(&self) -> bool {
        self.source == self.destination
    }

    /// Scope containment rules, checked before anything is touched.
    pub fn validate(&self) -> Result<(), MoveError> {
        if self.kind != MoveKind::Category && self.source.scope != self.destination.scope {
            return Err(MoveError::CrossScope {
                kind: self.kind,
                from: self.source.scope,
                to: self.destination.scope,
            });
        }

        for scope in [self.source.scope, self.destination.scope] {
            if scope.kind() != self.kind {
                return Err(MoveError::KindMismatch {
                    kind: self.kind,
                    scope,
                });
            }
        }

        Ok(())
    }
}

/// A move the engine refuses to execute. Nothing is mutated when one of these
/// is returned.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub(crate) enum MoveError {
    #[error("cannot move a {kind} from {from} to {to}")]
    CrossScope { kind: MoveKind, from: Scope, to: Scope },

    #[error("a {kind} move cannot address {scope}")]
    KindMismatch { kind: MoveKind, scope: Scope },

    #[error("{0} does not exist in this learning path")]
    UnknownScope(Scope),

    #[error("index {index} is out of range for {scope} ({len} entries)")]
    IndexOutOfRange {
        scope: Scope,
        index: usize,
        len: usize,
    },

    #[error("unrecognised droppable id {0:?}")]
    BadDroppableId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_droppable_id_roundtrip() {
        for scope in [
            Scope::Categories,
            Scope::Readings { category_id: 7 },
            Scope::Games {
                category_id: 7,
                reading_id: 42,
            },
        ] {
            let id = scope.to_string();
            assert_eq!(id.parse::<Scope>(), Ok(scope));
        }
    }

    #[test]
    fn test_scope_rejects_malformed_ids() {
        for id in ["", "category", "readings-", "readings-x", "games-7", "games-7-x"] {
            assert!(
                matches!(id.parse::<Scope>(), Err(MoveError::BadDroppableId(_))),
                "{id:?} should not parse"
            );
        }
    }

    #[test]
    fn test_cross_category_reading_move_is_rejected() {
        let cmd = MoveCommand::from_drag(
            Location::new(Scope::Readings { category_id: 1 }, 0),
            Location::new(Scope::Readings { category_id: 2 }, 0),
        );
        assert_eq!(cmd.kind, MoveKind::Reading);
        assert!(matches!(cmd.validate(), Err(MoveError::CrossScope { .. })));
    }

    #[test]
    fn test_cross_reading_game_move_is_rejected() {
        let cmd = MoveCommand::from_drag(
            Location::new(
                Scope::Games {
                    category_id: 1,
                    reading_id: 10,
                },
                0,
            ),
            Location::new(
                Scope::Games {
                    category_id: 1,
                    reading_id: 20,
                },
                1,
            ),
        );
        assert!(matches!(cmd.validate(), Err(MoveError::CrossScope { .. })));
    }

    #[test]
    fn test_kind_must_match_scope_shape() {
        let cmd = MoveCommand {
            kind: MoveKind::Reading,
            source: Location::new(Scope::Categories, 0),
            destination: Location::new(Scope::Categories, 1),
        };
        assert!(matches!(cmd.validate(), Err(MoveError::KindMismatch { .. })));
    }

    #[test]
    fn test_move_kind_display_is_snake_case() {
        assert_eq!(MoveKind::Category.to_string(), "category");
        assert_eq!(MoveKind::Game.as_ref(), "game");
    }
}
