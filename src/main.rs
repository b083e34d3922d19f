mod display;
mod form;
mod parser;
mod schedule;
mod web;

use display::{print_schedule, write_attendance_lists, write_student_schedules};
use parser::{load_companies, load_rooms, load_student_preferences};
use schedule::ScheduleService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Check if we should run in web mode
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && args[1] == "web" {
        let port = args
            .get(2)
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8080);
        let password = std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string()); // Default password, change this!

        println!("Starting web server on port {}...", port);
        println!("Admin password: {}", password);
        println!("Access the API at http://localhost:{}", port);

        web::start_server(port, password).await?;
        return Ok(());
    }

    // CLI mode: three CSV paths, or the default data/ layout
    let students_path = args.get(1).map(String::as_str).unwrap_or("data/students.csv");
    let companies_path = args.get(2).map(String::as_str).unwrap_or("data/companies.csv");
    let rooms_path = args.get(3).map(String::as_str).unwrap_or("data/rooms.csv");

    println!("Loading input tables...");
    let students = load_student_preferences(students_path)?;
    let companies = load_companies(companies_path)?;
    let rooms = load_rooms(rooms_path)?;
    println!(
        "Loaded {} students, {} companies, {} rooms",
        students.len(),
        companies.len(),
        rooms.len()
    );

    let mut service = ScheduleService::new();
    service.load_student_preferences(students)?;
    service.load_companies(companies)?;
    service.load_rooms(rooms)?;

    println!("\n=== Generating Schedule ===");
    service.generate_schedule()?;

    print_schedule(&service);

    // Write reports to files
    println!("\n=== Writing Reports ===");
    write_student_schedules(&service, "student_schedules.txt")?;
    write_attendance_lists(&service, "attendance_lists.txt")?;
    println!("Reports saved to:");
    println!("  - student_schedules.txt");
    println!("  - attendance_lists.txt");

    Ok(())
}
