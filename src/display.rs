use std::error::Error;
use std::fs::File;
use std::io::Write;

use crate::schedule::{CompanySession, ScheduleService};

/// Sessions sorted by company name, then slot index.
fn sorted_sessions(service: &ScheduleService) -> Vec<(&(String, usize), &CompanySession)> {
    let mut sessions: Vec<_> = service.get_schedule().iter().collect();
    sessions.sort_by(|a, b| a.0.cmp(b.0));
    sessions
}

/// Prints the generated schedule and per-company statistics to stdout.
pub fn print_schedule(service: &ScheduleService) {
    let sessions = sorted_sessions(service);
    println!("\n=== Generated Schedule ===");
    println!("Total sessions: {}", sessions.len());

    println!("\nTime slots:");
    for slot in service.time_slots() {
        println!("  {} ({})", slot.letter, slot.time_range);
    }

    for ((company_name, _), session) in &sessions {
        println!(
            "  {} -> slot {} ({}), room {}, {}/{} seats taken",
            company_name,
            session.time_slot,
            session.time_range,
            session.room,
            session.students.len(),
            session.capacity
        );
    }

    println!("\nCompany demand:");
    for stats in service.company_statistics() {
        println!(
            "  {}. {}: {} first choices, {} sessions needed, {} open, room {}",
            stats.number,
            stats.name,
            stats.first_choice_demand,
            stats.sessions_needed,
            stats.sessions_open,
            stats.room.as_deref().unwrap_or("-")
        );
    }

    let plans = service.student_day_plans();
    if !plans.is_empty() {
        let average: f64 =
            plans.iter().map(|p| p.satisfaction_score).sum::<f64>() / plans.len() as f64;
        println!("\nStudents seated: {}", plans.len());
        println!("Average satisfaction: {:.1}%", average);
    }
}

/// Writes every student's personal day plan, grouped by class.
pub fn write_student_schedules(
    service: &ScheduleService,
    filename: &str,
) -> Result<(), Box<dyn Error>> {
    let mut file = File::create(filename)?;

    writeln!(file, "** Student Schedules **")?;

    // Group day plans by class, classes in sorted order
    let mut plans = service.student_day_plans();
    plans.sort_by(|a, b| a.class_name.cmp(&b.class_name));

    let mut current_class = String::new();
    for plan in &plans {
        if plan.class_name != current_class {
            current_class = plan.class_name.clone();
            writeln!(file, "\n== Klasse {} ==", current_class)?;
        }

        writeln!(
            file,
            "\n{} - Klasse {} - Score: {:.1}%",
            plan.name, plan.class_name, plan.satisfaction_score
        )?;
        for visit in &plan.visits {
            writeln!(
                file,
                "  {} ({})  {}  Raum {}  Wunsch {}",
                visit.time_slot, visit.time_range, visit.company, visit.room, visit.wish_rank
            )?;
        }
        if plan.visits.is_empty() {
            writeln!(file, "  [NO SESSIONS]")?;
        }
    }

    Ok(())
}

/// Writes one attendance list per session, with numbered signature lines
/// left blank for walk-ins.
pub fn write_attendance_lists(
    service: &ScheduleService,
    filename: &str,
) -> Result<(), Box<dyn Error>> {
    let mut file = File::create(filename)?;

    writeln!(file, "** Attendance Lists **")?;

    for ((company_name, _), session) in sorted_sessions(service) {
        writeln!(
            file,
            "\n{} | Zeitfenster {} ({}) | Raum {}",
            company_name, session.time_slot, session.time_range, session.room
        )?;
        writeln!(file, "  Nr. | Name | Klasse | Unterschrift")?;

        let mut roster = session.students.clone();
        roster.sort_by(|a, b| a.name.cmp(&b.name));
        let mut line_no = 0;
        for seated in &roster {
            line_no += 1;
            let class_name = seated.id.split('_').next().unwrap_or("");
            writeln!(file, "  {}. | {} | {} |", line_no, seated.name, class_name)?;
        }
        // Five spare lines for late additions
        for _ in 0..5 {
            line_no += 1;
            writeln!(file, "  {}. | | |", line_no)?;
        }
    }

    Ok(())
}
