use actix_web::{middleware, web, App, HttpRequest, HttpResponse, HttpServer, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::form::{append_submission_to_csv, validate_submission, FormSubmission, WishFormRequest};
use crate::parser;
use crate::schedule::{ScheduleService, SeatedStudent};

/// In-memory application state. The mutex serializes allocation runs:
/// the engine is single-threaded and must never see concurrent mutation.
pub struct AppState {
    pub service: Mutex<ScheduleService>,
    /// On-disk students CSV that wish-form submissions are appended to.
    pub students_csv: PathBuf,
    pub admin_password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    password: String,
}

#[derive(Serialize)]
pub struct SessionView {
    company: String,
    slot_index: usize,
    time_slot: char,
    time_range: String,
    room: String,
    students: Vec<SeatedStudent>,
}

fn is_authorized(req: &HttpRequest, state: &AppState) -> bool {
    req.headers()
        .get("X-Admin-Password")
        .and_then(|v| v.to_str().ok())
        .map(|p| p == state.admin_password)
        .unwrap_or(false)
}

// Admin login endpoint
async fn admin_login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if req.password == state.admin_password {
        Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
    } else {
        Ok(HttpResponse::Unauthorized()
            .json(serde_json::json!({"success": false, "error": "Invalid password"})))
    }
}

// Admin CSV upload endpoint for one of the three input tables
async fn upload_table(
    table: web::Path<String>,
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !is_authorized(&req, &state) {
        return Ok(HttpResponse::Unauthorized()
            .json(serde_json::json!({"success": false, "error": "Unauthorized"})));
    }

    let reader = csv::Reader::from_reader(body.as_ref());
    let mut service = state.service.lock().unwrap();

    let outcome = match table.as_str() {
        "students" => parser::read_student_preferences(reader)
            .map_err(|e| e.to_string())
            .and_then(|students| {
                // Keep the on-disk copy in sync so form submissions extend it
                std::fs::write(&state.students_csv, &body).map_err(|e| e.to_string())?;
                service.load_student_preferences(students)
            }),
        "companies" => parser::read_companies(reader)
            .map_err(|e| e.to_string())
            .and_then(|companies| service.load_companies(companies)),
        "rooms" => parser::read_rooms(reader)
            .map_err(|e| e.to_string())
            .and_then(|rooms| service.load_rooms(rooms)),
        _ => {
            return Ok(HttpResponse::BadRequest().json(
                serde_json::json!({"success": false, "error": "Unknown table, expected students, companies or rooms"}),
            ))
        }
    };

    match outcome {
        Ok(()) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "data_loaded": service.is_data_loaded()
        }))),
        Err(e) => Ok(HttpResponse::BadRequest()
            .json(serde_json::json!({"success": false, "error": e}))),
    }
}

// Runs the allocation over the loaded tables
async fn generate(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse> {
    if !is_authorized(&req, &state) {
        return Ok(HttpResponse::Unauthorized()
            .json(serde_json::json!({"success": false, "error": "Unauthorized"})));
    }

    let mut service = state.service.lock().unwrap();
    match service.generate_schedule() {
        Ok(()) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "sessions": service.get_schedule().len()
        }))),
        Err(reason) => Ok(HttpResponse::BadRequest()
            .json(serde_json::json!({"success": false, "error": reason}))),
    }
}

// Schedule endpoint
async fn get_schedule(state: web::Data<AppState>) -> Result<HttpResponse> {
    let service = state.service.lock().unwrap();
    if service.get_schedule().is_empty() {
        return Ok(
            HttpResponse::NotFound().json(serde_json::json!({"error": "Schedule not available"}))
        );
    }

    let mut sessions: Vec<SessionView> = service
        .get_schedule()
        .iter()
        .map(|((company, slot_index), session)| SessionView {
            company: company.clone(),
            slot_index: *slot_index,
            time_slot: session.time_slot,
            time_range: session.time_range.clone(),
            room: session.room.clone(),
            students: session.students.clone(),
        })
        .collect();
    sessions.sort_by(|a, b| (&a.company, a.slot_index).cmp(&(&b.company, b.slot_index)));

    Ok(HttpResponse::Ok().json(sessions))
}

// Per-company statistics endpoint
async fn get_stats(state: web::Data<AppState>) -> Result<HttpResponse> {
    let service = state.service.lock().unwrap();
    if !service.is_data_loaded() {
        return Ok(
            HttpResponse::NotFound().json(serde_json::json!({"error": "No data available"}))
        );
    }
    Ok(HttpResponse::Ok().json(service.company_statistics()))
}

// Per-student day plans with satisfaction scores
async fn get_students(state: web::Data<AppState>) -> Result<HttpResponse> {
    let service = state.service.lock().unwrap();
    if service.students().is_empty() {
        return Ok(
            HttpResponse::NotFound().json(serde_json::json!({"error": "No data available"}))
        );
    }
    Ok(HttpResponse::Ok().json(service.student_day_plans()))
}

// Wish-form submission endpoint: validate, append to the students CSV,
// reload the students table from it
async fn submit_wishes(
    req: web::Json<WishFormRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let mut service = state.service.lock().unwrap();

    let company_count = match service.companies().len() {
        0 => None,
        n => Some(n),
    };
    if let Err(e) = validate_submission(&req, company_count) {
        return Ok(
            HttpResponse::BadRequest().json(serde_json::json!({"success": false, "error": e}))
        );
    }

    let submission = FormSubmission {
        timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        class: req.class.clone(),
        surname: req.surname.clone(),
        first_name: req.first_name.clone(),
        wishes: req.wishes.clone(),
    };
    append_submission_to_csv(&submission, &state.students_csv).map_err(|e| {
        actix_web::error::ErrorInternalServerError(format!("Failed to save submission: {}", e))
    })?;

    let students = parser::load_student_preferences(&state.students_csv).map_err(|e| {
        actix_web::error::ErrorInternalServerError(format!("Failed to reload students: {}", e))
    })?;
    let count = students.len();
    service.load_student_preferences(students).map_err(|e| {
        actix_web::error::ErrorInternalServerError(format!("Failed to reload students: {}", e))
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "students": count
    })))
}

pub async fn start_server(port: u16, admin_password: String) -> std::io::Result<()> {
    let app_state = web::Data::new(AppState {
        service: Mutex::new(ScheduleService::new()),
        students_csv: PathBuf::from("submitted_students.csv"),
        admin_password,
    });

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .route("/api/login", web::post().to(admin_login))
            .route("/api/upload/{table}", web::post().to(upload_table))
            .route("/api/generate", web::post().to(generate))
            .route("/api/schedule", web::get().to(get_schedule))
            .route("/api/stats", web::get().to(get_stats))
            .route("/api/students", web::get().to(get_students))
            .route("/api/submit", web::post().to(submit_wishes))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
