use std::collections::HashMap;

use crate::parser::{CompanyDirectory, StudentPreference};

use super::types::TimeSlot;

/// Zero-based slot index for a slot letter ('A' -> 0, 'B' -> 1, ...).
/// Lowercase letters are accepted; anything else is not a slot code.
pub fn slot_index_from_letter(letter: char) -> Option<usize> {
    let upper = letter.to_ascii_uppercase();
    upper
        .is_ascii_uppercase()
        .then(|| (upper as usize) - ('A' as usize))
}

/// The standard five-slot day used when no custom sequence is configured.
pub fn default_time_slots() -> Vec<TimeSlot> {
    vec![
        TimeSlot::new('A', "8:45 – 9:30"),
        TimeSlot::new('B', "9:50 – 10:35"),
        TimeSlot::new('C', "10:35 – 11:20"),
        TimeSlot::new('D', "11:40 – 12:25"),
        TimeSlot::new('E', "12:25 – 13:10"),
    ]
}

/// Tallies how many students rank each company as their first choice.
/// Wish tokens are resolved through the directory, so numeric and literal
/// first wishes land on the same counter.
pub fn count_first_wishes(
    students: &[StudentPreference],
    directory: &CompanyDirectory,
) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for student in students {
        if let Some(first) = student.wishes.first() {
            *counts.entry(directory.resolve(first)).or_insert(0) += 1;
        }
    }
    counts
}
