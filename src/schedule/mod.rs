pub mod engine;
pub mod slot_utils;
pub mod types;

pub use engine::{CompanyStats, ScheduleService, StudentDayPlan};
pub use slot_utils::default_time_slots;
pub use types::{CompanySession, Schedule, SeatedStudent, TimeSlot};
