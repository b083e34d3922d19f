use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::parser::Company;

/// One fixed time interval of the day, identified by a letter code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub letter: char,
    pub time_range: String,
}

impl TimeSlot {
    pub fn new(letter: char, time_range: &str) -> Self {
        Self {
            letter,
            time_range: time_range.to_string(),
        }
    }
}

/// A student seated in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatedStudent {
    pub id: String,
    pub name: String,
}

/// One occurrence of a company's presentation in one room during one slot.
///
/// The roster only ever grows during an allocation run; there is no
/// removal operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanySession {
    pub company_name: String,
    pub room: String,
    pub time_slot: char,
    pub time_range: String,
    pub capacity: usize,
    pub students: Vec<SeatedStudent>,
}

impl CompanySession {
    pub fn new(company: &Company, room: &str, slot: &TimeSlot) -> Self {
        Self {
            company_name: company.name.clone(),
            room: room.to_string(),
            time_slot: slot.letter,
            time_range: slot.time_range.clone(),
            capacity: company.capacity,
            students: Vec::new(),
        }
    }

    /// Seats a student. Returns `false` and leaves the roster untouched
    /// when the session is already at capacity.
    pub fn add_student(&mut self, student_id: &str, name: &str) -> bool {
        if self.is_full() {
            return false;
        }
        self.students.push(SeatedStudent {
            id: student_id.to_string(),
            name: name.to_string(),
        });
        true
    }

    pub fn is_full(&self) -> bool {
        self.students.len() >= self.capacity
    }

    pub fn has_student(&self, student_id: &str) -> bool {
        self.students.iter().any(|s| s.id == student_id)
    }
}

/// Maps (company name, slot index) to the session held there. Rebuilt from
/// empty on every allocation run.
pub type Schedule = HashMap<(String, usize), CompanySession>;
