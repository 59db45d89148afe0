/// `record id → display name`, built once per text section and consumed by
/// dependent records.
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    entries: Vec<String>,
}

impl NameTable {
    pub fn new(entries: Vec<String>) -> Self {
        NameTable { entries }
    }

    pub fn get(&self, id: usize) -> Option<&str> {
        self.entries.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Friendly names for the save-memory cells the field scripts touch most.
/// Callers fall back to the raw bank/address pair when a cell is not listed.
pub fn savemap_variable_name(bank: u8, address: u8) -> Option<&'static str> {
    match (bank, address) {
        (1, 0) => Some("progress_main"),
        (1, 1) => Some("progress_chapter"),
        (1, 4) => Some("love_points_aeris"),
        (1, 5) => Some("love_points_tifa"),
        (1, 6) => Some("love_points_yuffie"),
        (1, 7) => Some("love_points_barret"),
        (1, 16) => Some("party_gp"),
        (2, 0) => Some("timer_hours"),
        (2, 1) => Some("timer_minutes"),
        (2, 2) => Some("timer_seconds"),
        (3, 0) => Some("temp_byte_0"),
        (3, 1) => Some("temp_byte_1"),
        _ => None,
    }
}

/// Conventional labels for the fixed script entry-point slots.
pub fn script_slot_name(slot: usize) -> Option<&'static str> {
    match slot {
        0 => Some("init"),
        1 => Some("main"),
        2 => Some("on_talk"),
        3 => Some("on_collide"),
        4 => Some("on_push"),
        _ => None,
    }
}

/// Labels for the animation channels every field model reserves.
pub fn animation_label(index: u8) -> Option<&'static str> {
    match index {
        0 => Some("idle"),
        1 => Some("walk"),
        2 => Some("run"),
        3 => Some("climb"),
        4 => Some("jump"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_table_lookups() {
        let table = NameTable::new(vec!["Attack".into(), "Magic".into()]);
        assert_eq!(table.get(1), Some("Magic"));
        assert_eq!(table.get(2), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn unknown_identifiers_fall_through() {
        assert_eq!(savemap_variable_name(1, 0), Some("progress_main"));
        assert_eq!(savemap_variable_name(14, 200), None);
        assert_eq!(script_slot_name(2), Some("on_talk"));
        assert_eq!(script_slot_name(31), None);
        assert_eq!(animation_label(1), Some("walk"));
        assert_eq!(animation_label(99), None);
    }
}
