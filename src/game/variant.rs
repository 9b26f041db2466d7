//! Rule variant selection.

use serde::{Deserialize, Serialize};

/// Backgammon rule variant.
///
/// Variants are data, not a type hierarchy: the engine inspects the tag at
/// the few sites where the rules actually diverge (entry, bear-off,
/// direction, third die).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Variant {
    /// Standard backgammon: fixed starting layout, opposed directions,
    /// overshooting bear-off rolls allowed.
    #[default]
    Backgammon,
    /// Acey-deucey: all checkers start off the board and must enter;
    /// bear-off requires exact rolls.
    AceyDeucey,
    /// Tabula: as acey-deucey, but both players travel in the same
    /// direction and three dice are rolled.
    Tabula,
}

impl Variant {
    /// Number of dice rolled each turn.
    pub fn dice(self) -> usize {
        match self {
            Variant::Tabula => 3,
            _ => 2,
        }
    }
}

impl From<Variant> for u8 {
    fn from(variant: Variant) -> Self {
        match variant {
            Variant::Backgammon => 0,
            Variant::AceyDeucey => 1,
            Variant::Tabula => 2,
        }
    }
}

impl TryFrom<u8> for Variant {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Variant::Backgammon),
            1 => Ok(Variant::AceyDeucey),
            2 => Ok(Variant::Tabula),
            other => Err(format!("unknown variant tag: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_tag_round_trip() {
        for variant in [Variant::Backgammon, Variant::AceyDeucey, Variant::Tabula] {
            assert_eq!(Variant::try_from(u8::from(variant)), Ok(variant));
        }
        assert!(Variant::try_from(3).is_err());
    }

    #[test]
    fn test_dice_count() {
        assert_eq!(Variant::Backgammon.dice(), 2);
        assert_eq!(Variant::Tabula.dice(), 3);
    }
}
