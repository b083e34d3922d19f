use csv::WriterBuilder;
use std::error::Error;
use std::fs::OpenOptions;
use std::path::Path;

use crate::form::submission::FormSubmission;
use crate::parser::MAX_WISHES;

/// Appends a wish-form submission to the students CSV, creating the file
/// with its header row on first use. The column layout matches what
/// `parser::read_student_preferences` expects, plus a leading timestamp.
pub fn append_submission_to_csv(
    submission: &FormSubmission,
    csv_path: &Path,
) -> Result<(), Box<dyn Error>> {
    let write_header = !csv_path.exists();

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(file);

    if write_header {
        let mut header = vec![
            "Zeitstempel".to_string(),
            "Klasse".to_string(),
            "Name".to_string(),
            "Vorname".to_string(),
        ];
        for i in 1..=MAX_WISHES {
            header.push(format!("Wahl {i}"));
        }
        wtr.write_record(&header)?;
    }

    let mut record = vec![
        submission.timestamp.clone(),
        submission.class.trim().to_string(),
        submission.surname.trim().to_string(),
        submission.first_name.trim().to_string(),
    ];
    for i in 0..MAX_WISHES {
        record.push(
            submission
                .wishes
                .get(i)
                .map(|w| w.trim().to_string())
                .unwrap_or_default(),
        );
    }
    wtr.write_record(&record)?;

    wtr.flush()?;
    Ok(())
}
