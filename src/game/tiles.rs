use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Sentinel written to the wire in place of a number the viewer is not
/// allowed to see.
pub const HIDDEN_NUMBER: i8 = -1;

/// Highest tile number in the deck; numbers run 0..=MAX_TILE_NUMBER.
pub const MAX_TILE_NUMBER: u8 = 11;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TileColor {
    // Black sorts before White when numbers tie
    Black,
    White,
}

/// A single tile. `number` and `color` are fixed at deck creation;
/// `revealed` flips to true at most once and never back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub number: u8,
    pub color: TileColor,
    pub revealed: bool,
}

impl Tile {
    pub fn new(number: u8, color: TileColor) -> Self {
        Self {
            number,
            color,
            revealed: false,
        }
    }

    /// Sort key for the hand invariant: ascending by number, Black before
    /// White on ties.
    pub fn sort_key(&self) -> (u8, TileColor) {
        (self.number, self.color)
    }

    /// Projects this tile for a viewer. When `hide_number` is set and the
    /// tile has not been revealed, the number is replaced by the sentinel.
    pub fn info(&self, hide_number: bool) -> TileInfo {
        if self.revealed || !hide_number {
            TileInfo {
                number: self.number as i8,
                color: self.color,
                revealed: self.revealed,
            }
        } else {
            TileInfo {
                number: HIDDEN_NUMBER,
                color: self.color,
                revealed: self.revealed,
            }
        }
    }

    /// Builds the full 24-tile deck: numbers 0..=11 in both colors.
    pub fn full_deck() -> Vec<Tile> {
        let mut deck = Vec::with_capacity(24);
        for number in 0..=MAX_TILE_NUMBER {
            deck.push(Tile::new(number, TileColor::Black));
            deck.push(Tile::new(number, TileColor::White));
        }
        deck
    }
}

/// What a viewer is told about a tile. The owner (or anyone, once the tile
/// is revealed) sees the true number; everyone else sees the sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileInfo {
    pub number: i8,
    pub color: TileColor,
    pub revealed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_full_deck_composition() {
        let deck = Tile::full_deck();
        assert_eq!(deck.len(), 24);

        for number in 0..=MAX_TILE_NUMBER {
            for color in [TileColor::Black, TileColor::White] {
                let count = deck
                    .iter()
                    .filter(|t| t.number == number && t.color == color)
                    .count();
                assert_eq!(count, 1, "deck should hold exactly one {} {}", color, number);
            }
        }
        assert!(deck.iter().all(|t| !t.revealed));
    }

    #[test]
    fn test_hidden_tile_masks_number() {
        let tile = Tile::new(7, TileColor::White);
        let hidden = tile.info(true);
        assert_eq!(hidden.number, HIDDEN_NUMBER);
        assert_eq!(hidden.color, TileColor::White);
        assert!(!hidden.revealed);
    }

    #[test]
    fn test_owner_always_sees_number() {
        let tile = Tile::new(7, TileColor::White);
        let visible = tile.info(false);
        assert_eq!(visible.number, 7);
    }

    #[test]
    fn test_revealed_tile_visible_to_everyone() {
        let mut tile = Tile::new(3, TileColor::Black);
        tile.revealed = true;
        let info = tile.info(true);
        assert_eq!(info.number, 3);
        assert!(info.revealed);
    }

    #[rstest]
    #[case(Tile::new(2, TileColor::White), Tile::new(3, TileColor::Black))]
    #[case(Tile::new(5, TileColor::Black), Tile::new(5, TileColor::White))]
    #[case(Tile::new(0, TileColor::Black), Tile::new(0, TileColor::White))]
    fn test_sort_key_ordering(#[case] smaller: Tile, #[case] larger: Tile) {
        assert!(smaller.sort_key() < larger.sort_key());
    }

    #[test]
    fn test_color_serialization() {
        assert_eq!(
            serde_json::to_string(&TileColor::Black).unwrap(),
            "\"BLACK\""
        );
        assert_eq!(
            serde_json::to_string(&TileColor::White).unwrap(),
            "\"WHITE\""
        );
    }
}
