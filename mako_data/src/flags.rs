use serde::Serialize;

/// Collect every tag whose mask is fully present in `raw`. One decoder for
/// all the bit-packed fields the record tables carry; each record kind just
/// supplies its own table.
pub fn decode_flags<T: Copy>(raw: u32, table: &[(u32, T)]) -> Vec<T> {
    table
        .iter()
        .filter(|(mask, _)| raw & mask == *mask)
        .map(|(_, tag)| *tag)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TargetFlag {
    Selectable,
    SelectAll,
    ToggleMulti,
    FixedRow,
    ShortRange,
    AllRows,
    RandomTarget,
    StartOnEnemy,
}

impl TargetFlag {
    pub fn label(self) -> &'static str {
        match self {
            TargetFlag::Selectable => "selectable",
            TargetFlag::SelectAll => "select_all",
            TargetFlag::ToggleMulti => "toggle_multi",
            TargetFlag::FixedRow => "fixed_row",
            TargetFlag::ShortRange => "short_range",
            TargetFlag::AllRows => "all_rows",
            TargetFlag::RandomTarget => "random_target",
            TargetFlag::StartOnEnemy => "start_on_enemy",
        }
    }
}

/// Each mask assigns exactly one derived flag; 0x20 and 0x40 in particular
/// are distinct rows/random bits and must never alias each other.
pub const TARGET_FLAGS: &[(u32, TargetFlag)] = &[
    (0x01, TargetFlag::Selectable),
    (0x02, TargetFlag::SelectAll),
    (0x04, TargetFlag::ToggleMulti),
    (0x08, TargetFlag::FixedRow),
    (0x10, TargetFlag::ShortRange),
    (0x20, TargetFlag::AllRows),
    (0x40, TargetFlag::RandomTarget),
    (0x80, TargetFlag::StartOnEnemy),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Element {
    Fire,
    Ice,
    Bolt,
    Earth,
    Bio,
    Gravity,
    Water,
    Wind,
    Holy,
    Restorative,
    Cut,
    Hit,
    Punch,
    Shoot,
    Shout,
    Hidden,
}

impl Element {
    pub fn label(self) -> &'static str {
        match self {
            Element::Fire => "fire",
            Element::Ice => "ice",
            Element::Bolt => "bolt",
            Element::Earth => "earth",
            Element::Bio => "bio",
            Element::Gravity => "gravity",
            Element::Water => "water",
            Element::Wind => "wind",
            Element::Holy => "holy",
            Element::Restorative => "restorative",
            Element::Cut => "cut",
            Element::Hit => "hit",
            Element::Punch => "punch",
            Element::Shoot => "shoot",
            Element::Shout => "shout",
            Element::Hidden => "hidden",
        }
    }
}

pub const ELEMENT_FLAGS: &[(u32, Element)] = &[
    (0x0001, Element::Fire),
    (0x0002, Element::Ice),
    (0x0004, Element::Bolt),
    (0x0008, Element::Earth),
    (0x0010, Element::Bio),
    (0x0020, Element::Gravity),
    (0x0040, Element::Water),
    (0x0080, Element::Wind),
    (0x0100, Element::Holy),
    (0x0200, Element::Restorative),
    (0x0400, Element::Cut),
    (0x0800, Element::Hit),
    (0x1000, Element::Punch),
    (0x2000, Element::Shoot),
    (0x4000, Element::Shout),
    (0x8000, Element::Hidden),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusEffect {
    Death,
    NearDeath,
    Sleep,
    Poison,
    Sadness,
    Fury,
    Confusion,
    Silence,
    Haste,
    Slow,
    Stop,
    Frog,
    Small,
    SlowNumb,
    Petrify,
    Regen,
    Barrier,
    MagicBarrier,
    Reflect,
    Dual,
    Shield,
    DeathSentence,
    Manipulate,
    Berserk,
}

impl StatusEffect {
    pub fn label(self) -> &'static str {
        match self {
            StatusEffect::Death => "death",
            StatusEffect::NearDeath => "near_death",
            StatusEffect::Sleep => "sleep",
            StatusEffect::Poison => "poison",
            StatusEffect::Sadness => "sadness",
            StatusEffect::Fury => "fury",
            StatusEffect::Confusion => "confusion",
            StatusEffect::Silence => "silence",
            StatusEffect::Haste => "haste",
            StatusEffect::Slow => "slow",
            StatusEffect::Stop => "stop",
            StatusEffect::Frog => "frog",
            StatusEffect::Small => "small",
            StatusEffect::SlowNumb => "slow_numb",
            StatusEffect::Petrify => "petrify",
            StatusEffect::Regen => "regen",
            StatusEffect::Barrier => "barrier",
            StatusEffect::MagicBarrier => "magic_barrier",
            StatusEffect::Reflect => "reflect",
            StatusEffect::Dual => "dual",
            StatusEffect::Shield => "shield",
            StatusEffect::DeathSentence => "death_sentence",
            StatusEffect::Manipulate => "manipulate",
            StatusEffect::Berserk => "berserk",
        }
    }
}

pub const STATUS_FLAGS: &[(u32, StatusEffect)] = &[
    (0x00000001, StatusEffect::Death),
    (0x00000002, StatusEffect::NearDeath),
    (0x00000004, StatusEffect::Sleep),
    (0x00000008, StatusEffect::Poison),
    (0x00000010, StatusEffect::Sadness),
    (0x00000020, StatusEffect::Fury),
    (0x00000040, StatusEffect::Confusion),
    (0x00000080, StatusEffect::Silence),
    (0x00000100, StatusEffect::Haste),
    (0x00000200, StatusEffect::Slow),
    (0x00000400, StatusEffect::Stop),
    (0x00000800, StatusEffect::Frog),
    (0x00001000, StatusEffect::Small),
    (0x00002000, StatusEffect::SlowNumb),
    (0x00004000, StatusEffect::Petrify),
    (0x00008000, StatusEffect::Regen),
    (0x00010000, StatusEffect::Barrier),
    (0x00020000, StatusEffect::MagicBarrier),
    (0x00040000, StatusEffect::Reflect),
    (0x00080000, StatusEffect::Dual),
    (0x00100000, StatusEffect::Shield),
    (0x00200000, StatusEffect::DeathSentence),
    (0x00400000, StatusEffect::Manipulate),
    (0x00800000, StatusEffect::Berserk),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_only_fully_present_masks() {
        let flags = decode_flags(0x21, TARGET_FLAGS);
        assert_eq!(flags, vec![TargetFlag::Selectable, TargetFlag::AllRows]);
    }

    #[test]
    fn all_rows_and_random_target_are_distinct() {
        assert_eq!(decode_flags(0x20, TARGET_FLAGS), vec![TargetFlag::AllRows]);
        assert_eq!(
            decode_flags(0x40, TARGET_FLAGS),
            vec![TargetFlag::RandomTarget]
        );
    }

    #[test]
    fn zero_decodes_to_nothing() {
        assert!(decode_flags(0, ELEMENT_FLAGS).is_empty());
        assert!(decode_flags(0, STATUS_FLAGS).is_empty());
    }

    #[test]
    fn status_table_covers_all_24_bits() {
        let decoded = decode_flags(0x00FF_FFFF, STATUS_FLAGS);
        assert_eq!(decoded.len(), 24);
    }
}
