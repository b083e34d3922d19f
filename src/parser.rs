use csv::Reader;
use std::collections::HashMap;
use std::error::Error;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::schedule::slot_utils::slot_index_from_letter;

/// Maximum number of ranked wishes a student can submit.
pub const MAX_WISHES: usize = 6;

/// A single wish cell as written in the students table.
///
/// Students may refer to a company either by its 1-based position in the
/// company table or by its literal name. The token is parsed once when the
/// row is read and resolved against a `CompanyDirectory` during allocation,
/// so the order in which the tables were loaded does not matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WishToken {
    /// 1-based position in the company table.
    Index(usize),
    /// Literal company name, trimmed.
    Name(String),
}

impl WishToken {
    /// Parses a wish cell. Returns `None` for empty cells.
    pub fn parse(cell: &str) -> Option<WishToken> {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(num) = trimmed.parse::<u64>() {
            return Some(WishToken::Index(num as usize));
        }
        // Spreadsheets hand numeric cells over as "3.0"; truncate them the
        // same way the import always has
        if let Ok(num) = trimmed.parse::<f64>() {
            if num.is_finite() && num >= 0.0 {
                return Some(WishToken::Index(num as usize));
            }
        }
        Some(WishToken::Name(trimmed.to_string()))
    }
}

/// Bidirectional mapping between a company's 1-based position in the
/// company list and its trimmed name.
#[derive(Debug, Clone, Default)]
pub struct CompanyDirectory {
    names: Vec<String>,
    numbers: HashMap<String, usize>,
}

impl CompanyDirectory {
    pub fn from_companies(companies: &[Company]) -> Self {
        let mut names = Vec::with_capacity(companies.len());
        let mut numbers = HashMap::new();
        for (idx, company) in companies.iter().enumerate() {
            let normalized = company.name.trim().to_string();
            numbers.insert(normalized.clone(), idx + 1);
            names.push(normalized);
        }
        Self { names, numbers }
    }

    /// Resolves a wish token to a company name.
    ///
    /// Numeric tokens without a matching company row fall back to their
    /// decimal form so they still show up verbatim in reports.
    pub fn resolve(&self, wish: &WishToken) -> String {
        match wish {
            WishToken::Index(n) => {
                if *n >= 1 && *n <= self.names.len() {
                    self.names[n - 1].clone()
                } else {
                    n.to_string()
                }
            }
            WishToken::Name(name) => name.clone(),
        }
    }

    /// 1-based position of a company name, if present.
    pub fn number_of(&self, name: &str) -> Option<usize> {
        self.numbers.get(name.trim()).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One student's ranked wish list, created once from an input row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentPreference {
    pub student_id: String,
    pub name: String,
    pub wishes: Vec<WishToken>,
}

impl StudentPreference {
    /// Class label portion of the student id ("10A_3" -> "10A").
    pub fn class_name(&self) -> &str {
        self.student_id.split('_').next().unwrap_or(&self.student_id)
    }

    /// Weighted fulfilment score over the ranked wishes.
    ///
    /// `realized[i]` says whether the wish attempted in slot `i` was
    /// granted; position `i` carries weight `max_wishes - i`. The
    /// denominator is the fixed triangular sum over all `max_wishes`
    /// positions: an all-true sequence of length `max_wishes` scores
    /// exactly 100.0, an all-false sequence scores 0.0.
    pub fn satisfaction_score(&self, realized: &[bool], max_wishes: usize) -> f64 {
        let max_points = max_wishes * (max_wishes + 1) / 2;
        if max_points == 0 {
            return 0.0;
        }
        let total_points: usize = realized
            .iter()
            .enumerate()
            .filter(|(_, granted)| **granted)
            .map(|(i, _)| max_wishes.saturating_sub(i))
            .sum();
        total_points as f64 / max_points as f64 * 100.0
    }
}

/// One company offering information sessions, created once from an input row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub name: String,
    /// Display-only; allocation never looks at it.
    pub specialty: String,
    /// Maximum students per single session.
    pub capacity: usize,
    /// Upper bound on sessions this company may run.
    pub max_sessions: usize,
    /// Zero-based index of the first slot the company is available in.
    pub earliest_slot: usize,
    /// Fixed venue for this company, bypassing the room pool.
    pub pinned_room: Option<String>,
}

impl Company {
    /// Slot indices this company never holds sessions in.
    pub fn blocked_slots(&self) -> std::ops::Range<usize> {
        0..self.earliest_slot
    }
}

fn find_column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

/// Parses a count cell, accepting spreadsheet-style "12.0" floats.
fn parse_positive_int(cell: &str) -> Option<usize> {
    let trimmed = cell.trim();
    if let Ok(n) = trimmed.parse::<usize>() {
        return (n > 0).then_some(n);
    }
    let n = trimmed.parse::<f64>().ok()?;
    (n >= 1.0 && n.fract() == 0.0).then(|| n as usize)
}

/// Parses the earliest-slot letter code: empty means slot 0, otherwise the
/// first character of the trimmed cell maps via its offset from 'A'.
fn parse_earliest_slot(cell: &str) -> Result<usize, String> {
    let trimmed = cell.trim();
    match trimmed.chars().next() {
        None => Ok(0),
        Some(first) => slot_index_from_letter(first)
            .ok_or_else(|| format!("'{trimmed}' is not a slot letter")),
    }
}

/// Loads student preference rows from a CSV file.
pub fn load_student_preferences<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<StudentPreference>, Box<dyn Error>> {
    read_student_preferences(Reader::from_path(path)?)
}

/// Reads student preference rows from any CSV source.
///
/// Required columns: "Klasse", "Name", "Vorname". Wish columns "Wahl 1"
/// through "Wahl 6" are read in fixed order; the unspaced "Wahl1" spelling
/// is accepted too. Blank filler rows are skipped, but row numbering in
/// the student id keeps counting them.
pub fn read_student_preferences<R: Read>(
    mut reader: Reader<R>,
) -> Result<Vec<StudentPreference>, Box<dyn Error>> {
    let headers = reader.headers()?.clone();
    let class_col = find_column(&headers, "Klasse")
        .ok_or("invalid format: students table is missing the 'Klasse' column")?;
    let surname_col = find_column(&headers, "Name")
        .ok_or("invalid format: students table is missing the 'Name' column")?;
    let first_name_col = find_column(&headers, "Vorname")
        .ok_or("invalid format: students table is missing the 'Vorname' column")?;

    let wish_cols: Vec<Option<usize>> = (1..=MAX_WISHES)
        .map(|i| {
            find_column(&headers, &format!("Wahl {i}"))
                .or_else(|| find_column(&headers, &format!("Wahl{i}")))
        })
        .collect();

    let mut students = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result?;
        let class = record.get(class_col).unwrap_or("").trim();
        let surname = record.get(surname_col).unwrap_or("").trim();
        let first_name = record.get(first_name_col).unwrap_or("").trim();

        if class.is_empty() && surname.is_empty() && first_name.is_empty() {
            continue;
        }

        let wishes: Vec<WishToken> = wish_cols
            .iter()
            .filter_map(|col| col.and_then(|c| record.get(c)).and_then(WishToken::parse))
            .collect();

        students.push(StudentPreference {
            student_id: format!("{}_{}", class, row_idx + 1),
            name: format!("{}, {}", surname, first_name),
            wishes,
        });
    }

    Ok(students)
}

/// Loads company rows from a CSV file.
pub fn load_companies<P: AsRef<Path>>(path: P) -> Result<Vec<Company>, Box<dyn Error>> {
    read_companies(Reader::from_path(path)?)
}

/// Reads company rows from any CSV source.
///
/// Required columns: "Unternehmen", "Max. Teilnehmer", "Max.
/// Veranstaltungen". Optional: "Fachrichtung", "Frühester Zeitpunkt"
/// (slot letter, empty means first slot), "Fester Raum" (pinned venue).
/// A capacity or session count that is not a positive integer is an
/// invalid-format error naming the row, not a crash.
pub fn read_companies<R: Read>(mut reader: Reader<R>) -> Result<Vec<Company>, Box<dyn Error>> {
    let headers = reader.headers()?.clone();
    let name_col = find_column(&headers, "Unternehmen")
        .ok_or("invalid format: company table is missing the 'Unternehmen' column")?;
    let capacity_col = find_column(&headers, "Max. Teilnehmer")
        .ok_or("invalid format: company table is missing the 'Max. Teilnehmer' column")?;
    let sessions_col = find_column(&headers, "Max. Veranstaltungen")
        .ok_or("invalid format: company table is missing the 'Max. Veranstaltungen' column")?;
    let specialty_col = find_column(&headers, "Fachrichtung");
    let earliest_col = find_column(&headers, "Frühester Zeitpunkt");
    let pinned_col = find_column(&headers, "Fester Raum");

    let mut companies = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result?;
        // 1-based data row for error messages, counting the header line
        let row = row_idx + 2;

        let name = record.get(name_col).unwrap_or("").trim().to_string();
        if name.is_empty() {
            continue;
        }

        let capacity =
            parse_positive_int(record.get(capacity_col).unwrap_or("")).ok_or_else(|| {
                format!("invalid format: 'Max. Teilnehmer' in row {row} is not a positive integer")
            })?;
        let max_sessions =
            parse_positive_int(record.get(sessions_col).unwrap_or("")).ok_or_else(|| {
                format!(
                    "invalid format: 'Max. Veranstaltungen' in row {row} is not a positive integer"
                )
            })?;

        let earliest_slot = match earliest_col.and_then(|c| record.get(c)) {
            Some(cell) => parse_earliest_slot(cell)
                .map_err(|e| format!("invalid format: 'Frühester Zeitpunkt' in row {row}: {e}"))?,
            None => 0,
        };

        let specialty = specialty_col
            .and_then(|c| record.get(c))
            .unwrap_or("")
            .trim()
            .to_string();
        let pinned_room = pinned_col
            .and_then(|c| record.get(c))
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(String::from);

        companies.push(Company {
            name,
            specialty,
            capacity,
            max_sessions,
            earliest_slot,
            pinned_room,
        });
    }

    Ok(companies)
}

/// Loads the room pool from a CSV file.
pub fn load_rooms<P: AsRef<Path>>(path: P) -> Result<Vec<String>, Box<dyn Error>> {
    read_rooms(Reader::from_path(path)?)
}

/// Reads the room pool from any CSV source.
///
/// Only rows whose first column is a plain room number enter the pool;
/// named venues such as "Aula" are reachable through a company's pinned
/// room instead.
pub fn read_rooms<R: Read>(mut reader: Reader<R>) -> Result<Vec<String>, Box<dyn Error>> {
    let mut rooms = Vec::new();
    for result in reader.records() {
        let record = result?;
        let cell = record.get(0).unwrap_or("").trim();
        if let Some(room) = parse_room_number(cell) {
            rooms.push(room);
        }
    }
    Ok(rooms)
}

fn parse_room_number(cell: &str) -> Option<String> {
    if cell.is_empty() {
        return None;
    }
    if cell.chars().all(|c| c.is_ascii_digit()) {
        return cell.parse::<u64>().ok().map(|n| n.to_string());
    }
    // "104.0" from a numeric spreadsheet column
    let n = cell.parse::<f64>().ok()?;
    (n.is_finite() && n >= 0.0 && n.fract() == 0.0).then(|| (n as u64).to_string())
}
