use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::parser::{Company, CompanyDirectory, StudentPreference, MAX_WISHES};

use super::slot_utils::{count_first_wishes, default_time_slots};
use super::types::{CompanySession, Schedule, TimeSlot};

/// One stop in a student's personal day plan.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedVisit {
    pub slot_index: usize,
    pub time_slot: char,
    pub time_range: String,
    pub company: String,
    pub room: String,
    /// 1-based rank of the wish this visit fulfils.
    pub wish_rank: usize,
}

/// A student's day plan with the satisfaction score derived from it.
#[derive(Debug, Clone, Serialize)]
pub struct StudentDayPlan {
    pub student_id: String,
    pub name: String,
    pub class_name: String,
    pub visits: Vec<PlannedVisit>,
    pub satisfaction_score: f64,
}

/// Per-company allocation statistics.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyStats {
    /// 1-based position in the company table, the number students put on
    /// their wish forms.
    pub number: usize,
    pub name: String,
    pub first_choice_demand: usize,
    /// ceil(demand / capacity), clamped to the company's session limit.
    pub sessions_needed: usize,
    pub sessions_open: usize,
    pub room: Option<String>,
}

/// Orchestrates one allocation run: session counts from first-choice
/// demand, room assignment, session materialization, greedy seating.
///
/// The time-slot sequence is explicit configuration held by the service;
/// every company shares the index space it defines.
pub struct ScheduleService {
    students: Vec<StudentPreference>,
    companies: Vec<Company>,
    rooms: Vec<String>,
    schedule: Schedule,
    time_slots: Vec<TimeSlot>,
}

impl ScheduleService {
    pub fn new() -> Self {
        Self::with_time_slots(default_time_slots())
    }

    /// Creates a service over a custom slot sequence.
    pub fn with_time_slots(time_slots: Vec<TimeSlot>) -> Self {
        Self {
            students: Vec::new(),
            companies: Vec::new(),
            rooms: Vec::new(),
            schedule: Schedule::new(),
            time_slots,
        }
    }

    pub fn load_student_preferences(
        &mut self,
        students: Vec<StudentPreference>,
    ) -> Result<(), String> {
        if students.is_empty() {
            return Err("invalid format: students table contains no rows".to_string());
        }
        self.students = students;
        Ok(())
    }

    pub fn load_companies(&mut self, companies: Vec<Company>) -> Result<(), String> {
        if companies.is_empty() {
            return Err("invalid format: company table contains no rows".to_string());
        }
        self.companies = companies;
        Ok(())
    }

    pub fn load_rooms(&mut self, rooms: Vec<String>) -> Result<(), String> {
        if rooms.is_empty() {
            return Err("invalid format: room table contains no usable rooms".to_string());
        }
        self.rooms = rooms;
        Ok(())
    }

    /// True once all three input tables are loaded and non-empty.
    pub fn is_data_loaded(&self) -> bool {
        !self.students.is_empty() && !self.companies.is_empty() && !self.rooms.is_empty()
    }

    pub fn time_slots(&self) -> &[TimeSlot] {
        &self.time_slots
    }

    pub fn students(&self) -> &[StudentPreference] {
        &self.students
    }

    pub fn companies(&self) -> &[Company] {
        &self.companies
    }

    pub fn get_schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Runs the allocation.
    ///
    /// On any failure the schedule is left empty: the caller never sees a
    /// partial schedule. The error carries a human-readable reason.
    pub fn generate_schedule(&mut self) -> Result<(), String> {
        self.schedule.clear();
        if !self.is_data_loaded() {
            return Err(
                "cannot generate: students, companies and rooms must all be loaded".to_string(),
            );
        }
        let schedule = self.build_schedule()?;
        self.schedule = schedule;
        Ok(())
    }

    fn build_schedule(&self) -> Result<Schedule, String> {
        let directory = CompanyDirectory::from_companies(&self.companies);
        let first_wish_counts = count_first_wishes(&self.students, &directory);

        // Highest first-choice demand picks its room first; ties keep
        // input order
        let mut sorted_companies: Vec<&Company> = self.companies.iter().collect();
        sorted_companies.sort_by_key(|company| {
            Reverse(
                first_wish_counts
                    .get(company.name.trim())
                    .copied()
                    .unwrap_or(0),
            )
        });

        let mut schedule = Schedule::new();
        let mut available_rooms = self.rooms.clone();

        for company in &sorted_companies {
            let room = match &company.pinned_room {
                Some(room) => room.clone(),
                None => {
                    if available_rooms.is_empty() {
                        // Pool exhausted: recycle it in original order
                        available_rooms = self.rooms.clone();
                    }
                    available_rooms.remove(0)
                }
            };

            // One session per eligible slot; blocked slots stay empty
            for slot_idx in 0..self.time_slots.len() {
                if company.blocked_slots().contains(&slot_idx) {
                    continue;
                }
                let session = CompanySession::new(company, &room, &self.time_slots[slot_idx]);
                schedule.insert((company.name.clone(), slot_idx), session);
            }
        }

        // First choices are hard requirements: a single miss voids the run
        let mut assigned_slots: HashMap<&str, HashSet<usize>> = HashMap::new();
        for student in &self.students {
            let Some(first_wish) = student.wishes.first() else {
                continue;
            };
            let company_name = directory.resolve(first_wish);
            let mut seated = false;
            for slot_idx in 0..self.time_slots.len() {
                if let Some(session) = schedule.get_mut(&(company_name.clone(), slot_idx)) {
                    if session.add_student(&student.student_id, &student.name) {
                        assigned_slots
                            .entry(student.student_id.as_str())
                            .or_default()
                            .insert(slot_idx);
                        seated = true;
                        break;
                    }
                }
            }
            if !seated {
                return Err(format!(
                    "first choice '{}' could not be seated for {}",
                    company_name, student.name
                ));
            }
        }

        // Remaining wishes are best effort; a wish with no free compatible
        // slot is skipped
        for student in &self.students {
            let taken = assigned_slots
                .entry(student.student_id.as_str())
                .or_default();
            for wish in student.wishes.iter().skip(1) {
                let company_name = directory.resolve(wish);
                for slot_idx in 0..self.time_slots.len() {
                    if taken.contains(&slot_idx) {
                        continue;
                    }
                    if let Some(session) = schedule.get_mut(&(company_name.clone(), slot_idx)) {
                        if session.add_student(&student.student_id, &student.name) {
                            taken.insert(slot_idx);
                            break;
                        }
                    }
                }
            }
        }

        Ok(schedule)
    }

    /// Demand, session counts and room per company, in input order.
    pub fn company_statistics(&self) -> Vec<CompanyStats> {
        let directory = CompanyDirectory::from_companies(&self.companies);
        let first_wish_counts = count_first_wishes(&self.students, &directory);

        self.companies
            .iter()
            .enumerate()
            .map(|(idx, company)| {
                let demand = first_wish_counts
                    .get(company.name.trim())
                    .copied()
                    .unwrap_or(0);
                let sessions_open = (company.earliest_slot..self.time_slots.len())
                    .filter(|slot_idx| {
                        self.schedule
                            .contains_key(&(company.name.clone(), *slot_idx))
                    })
                    .count();
                let room = (company.earliest_slot..self.time_slots.len()).find_map(|slot_idx| {
                    self.schedule
                        .get(&(company.name.clone(), slot_idx))
                        .map(|session| session.room.clone())
                });
                CompanyStats {
                    number: directory.number_of(&company.name).unwrap_or(idx + 1),
                    name: company.name.clone(),
                    first_choice_demand: demand,
                    sessions_needed: sessions_needed(demand, company),
                    sessions_open,
                    room,
                }
            })
            .collect()
    }

    /// Day plans for every loaded student, in input order.
    pub fn student_day_plans(&self) -> Vec<StudentDayPlan> {
        let directory = CompanyDirectory::from_companies(&self.companies);
        self.students
            .iter()
            .map(|student| self.day_plan_with_directory(student, &directory))
            .collect()
    }

    /// Rebuilds one student's slot-by-slot plan from the schedule.
    pub fn student_day_plan(&self, student: &StudentPreference) -> StudentDayPlan {
        let directory = CompanyDirectory::from_companies(&self.companies);
        self.day_plan_with_directory(student, &directory)
    }

    fn day_plan_with_directory(
        &self,
        student: &StudentPreference,
        directory: &CompanyDirectory,
    ) -> StudentDayPlan {
        let mut visits = Vec::new();
        let mut realized = Vec::with_capacity(self.time_slots.len());

        for (slot_idx, slot) in self.time_slots.iter().enumerate() {
            let mut found = false;
            for (wish_idx, wish) in student.wishes.iter().enumerate() {
                let company_name = directory.resolve(wish);
                if let Some(session) = self.schedule.get(&(company_name.clone(), slot_idx)) {
                    if session.has_student(&student.student_id) {
                        visits.push(PlannedVisit {
                            slot_index: slot_idx,
                            time_slot: slot.letter,
                            time_range: slot.time_range.clone(),
                            company: company_name,
                            room: session.room.clone(),
                            wish_rank: wish_idx + 1,
                        });
                        found = true;
                        break;
                    }
                }
            }
            realized.push(found);
        }

        let satisfaction_score = student.satisfaction_score(&realized, MAX_WISHES);
        StudentDayPlan {
            student_id: student.student_id.clone(),
            name: student.name.clone(),
            class_name: student.class_name().to_string(),
            visits,
            satisfaction_score,
        }
    }
}

impl Default for ScheduleService {
    fn default() -> Self {
        Self::new()
    }
}

/// Sessions a company must run to absorb its first-choice demand, without
/// floating point: ceil(demand / capacity), clamped to `max_sessions`.
fn sessions_needed(demand: usize, company: &Company) -> usize {
    if demand == 0 {
        return 0;
    }
    demand.div_ceil(company.capacity).min(company.max_sessions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::WishToken;

    fn company(name: &str, capacity: usize, max_sessions: usize, earliest_slot: usize) -> Company {
        Company {
            name: name.to_string(),
            specialty: String::new(),
            capacity,
            max_sessions,
            earliest_slot,
            pinned_room: None,
        }
    }

    fn student(id: &str, name: &str, wishes: Vec<WishToken>) -> StudentPreference {
        StudentPreference {
            student_id: id.to_string(),
            name: name.to_string(),
            wishes,
        }
    }

    fn idx(n: usize) -> WishToken {
        WishToken::Index(n)
    }

    fn service_with(
        students: Vec<StudentPreference>,
        companies: Vec<Company>,
        rooms: &[&str],
    ) -> ScheduleService {
        let mut service = ScheduleService::new();
        service.load_student_preferences(students).unwrap();
        service.load_companies(companies).unwrap();
        service
            .load_rooms(rooms.iter().map(|r| r.to_string()).collect())
            .unwrap();
        service
    }

    fn slot_of(service: &ScheduleService, company: &str, student_id: &str) -> Option<usize> {
        service
            .get_schedule()
            .iter()
            .find(|((name, _), session)| name == company && session.has_student(student_id))
            .map(|((_, slot_idx), _)| *slot_idx)
    }

    #[test]
    fn generate_without_data_fails() {
        let mut service = ScheduleService::new();
        let err = service.generate_schedule().unwrap_err();
        assert!(err.contains("must all be loaded"));
        assert!(service.get_schedule().is_empty());
        assert!(!service.is_data_loaded());
    }

    #[test]
    fn end_to_end_both_first_choices_seated() {
        // Two students, three companies (capacities 5/4/3, max sessions
        // 2/2/1, earliest A/B/A), four rooms
        let students = vec![
            student("10A_1", "Müller, Anna", vec![idx(1), idx(2), idx(3)]),
            student("10A_2", "Schmidt, Ben", vec![idx(2), idx(1), idx(3)]),
        ];
        let companies = vec![
            company("Alpha", 5, 2, 0),
            company("Beta", 4, 2, 1),
            company("Gamma", 3, 1, 0),
        ];
        let mut service = service_with(students, companies, &["101", "102", "103", "104"]);

        assert!(service.generate_schedule().is_ok());

        let anna_slot = slot_of(&service, "Alpha", "10A_1").expect("Anna seated at Alpha");
        let ben_slot = slot_of(&service, "Beta", "10A_2").expect("Ben seated at Beta");
        // First-choice sessions respect each company's earliest slot
        assert!(ben_slot >= 1);
        assert!(anna_slot < 5);

        // Beta never opens a session before its earliest slot
        assert!(!service
            .get_schedule()
            .contains_key(&("Beta".to_string(), 0)));
    }

    #[test]
    fn unseatable_first_choice_voids_the_run() {
        let students = vec![
            student("10A_1", "Müller, Anna", vec![idx(1)]),
            student("10A_2", "Schmidt, Ben", vec![idx(1)]),
        ];
        // One seat in total across all slots: capacity 1, one session
        let mut slots_service = ScheduleService::with_time_slots(vec![TimeSlot::new(
            'A',
            "8:45 – 9:30",
        )]);
        slots_service.load_student_preferences(students).unwrap();
        slots_service
            .load_companies(vec![company("Solo", 1, 1, 0)])
            .unwrap();
        slots_service.load_rooms(vec!["101".to_string()]).unwrap();

        let err = slots_service.generate_schedule().unwrap_err();
        assert!(err.contains("Solo"));
        assert!(err.contains("Schmidt, Ben"));
        // No partial schedule survives a failed run
        assert!(slots_service.get_schedule().is_empty());
    }

    #[test]
    fn unknown_first_wish_company_voids_the_run() {
        let students = vec![student(
            "10A_1",
            "Müller, Anna",
            vec![WishToken::Name("Unbekannt AG".to_string())],
        )];
        let mut service = service_with(students, vec![company("Alpha", 5, 2, 0)], &["101"]);

        let err = service.generate_schedule().unwrap_err();
        assert!(err.contains("Unbekannt AG"));
        assert!(service.get_schedule().is_empty());
    }

    #[test]
    fn generation_is_deterministic() {
        let build = || {
            let students = vec![
                student("10A_1", "Müller, Anna", vec![idx(1), idx(2)]),
                student("10A_2", "Schmidt, Ben", vec![idx(2), idx(3)]),
                student("10B_1", "Weber, Cem", vec![idx(1), idx(3), idx(2)]),
            ];
            let companies = vec![
                company("Alpha", 2, 2, 0),
                company("Beta", 3, 2, 0),
                company("Gamma", 4, 1, 1),
            ];
            let mut service = service_with(students, companies, &["101", "102"]);
            service.generate_schedule().unwrap();
            service
        };

        let first = build();
        let second = build();
        assert_eq!(first.get_schedule(), second.get_schedule());

        // Re-running on unchanged input reproduces the same schedule
        let mut third = build();
        let before = third.get_schedule().clone();
        third.generate_schedule().unwrap();
        assert_eq!(&before, third.get_schedule());
    }

    #[test]
    fn seated_students_only_appear_in_wished_companies_once_per_slot() {
        let students = vec![
            student("10A_1", "Müller, Anna", vec![idx(1), idx(2), idx(3)]),
            student("10A_2", "Schmidt, Ben", vec![idx(2), idx(2), idx(1)]),
            student("10B_1", "Weber, Cem", vec![idx(3), idx(1)]),
        ];
        let companies = vec![
            company("Alpha", 2, 2, 0),
            company("Beta", 2, 2, 0),
            company("Gamma", 2, 1, 0),
        ];
        let mut service = service_with(students, companies, &["101", "102", "103"]);
        service.generate_schedule().unwrap();

        let directory = CompanyDirectory::from_companies(service.companies());
        for student in service.students() {
            let wished: Vec<String> = student
                .wishes
                .iter()
                .map(|w| directory.resolve(w))
                .collect();
            let mut seen_slots = HashSet::new();
            for ((company_name, slot_idx), session) in service.get_schedule() {
                if session.has_student(&student.student_id) {
                    assert!(
                        wished.contains(company_name),
                        "{} seated at unwished {}",
                        student.student_id,
                        company_name
                    );
                    assert!(
                        seen_slots.insert(*slot_idx),
                        "{} double-booked in slot {}",
                        student.student_id,
                        slot_idx
                    );
                }
            }
        }
    }

    #[test]
    fn overflow_demand_spills_into_later_slots() {
        let students = vec![
            student("10A_1", "Müller, Anna", vec![idx(1)]),
            student("10A_2", "Schmidt, Ben", vec![idx(1)]),
            student("10A_3", "Weber, Cem", vec![idx(1)]),
        ];
        let mut service = service_with(students, vec![company("Alpha", 2, 2, 0)], &["101"]);
        service.generate_schedule().unwrap();

        let schedule = service.get_schedule();
        let first = &schedule[&("Alpha".to_string(), 0)];
        let second = &schedule[&("Alpha".to_string(), 1)];
        assert_eq!(first.students.len(), 2);
        assert!(first.has_student("10A_1"));
        assert!(first.has_student("10A_2"));
        assert!(second.has_student("10A_3"));
    }

    #[test]
    fn second_wish_moves_to_a_free_slot() {
        let students = vec![student("10A_1", "Müller, Anna", vec![idx(1), idx(2)])];
        let companies = vec![company("Alpha", 5, 2, 0), company("Beta", 5, 2, 0)];
        let mut service = service_with(students, companies, &["101", "102"]);
        service.generate_schedule().unwrap();

        // First wish lands in slot 0; the second wish must not collide
        assert_eq!(slot_of(&service, "Alpha", "10A_1"), Some(0));
        assert_eq!(slot_of(&service, "Beta", "10A_1"), Some(1));
    }

    #[test]
    fn room_pool_wraps_around_when_exhausted() {
        let students = vec![
            student("10A_1", "Müller, Anna", vec![idx(1)]),
            student("10A_2", "Schmidt, Ben", vec![idx(1)]),
            student("10A_3", "Weber, Cem", vec![idx(2)]),
        ];
        let companies = vec![
            company("Alpha", 5, 2, 0),
            company("Beta", 5, 2, 0),
            company("Gamma", 5, 1, 0),
        ];
        let mut service = service_with(students, companies, &["101", "102"]);
        service.generate_schedule().unwrap();

        let room_of = |name: &str| {
            service.get_schedule()[&(name.to_string(), 0)]
                .room
                .clone()
        };
        // Priority order is Alpha (2 first wishes), Beta (1), Gamma (0);
        // Gamma recycles the pool and shares Alpha's room
        assert_eq!(room_of("Alpha"), "101");
        assert_eq!(room_of("Beta"), "102");
        assert_eq!(room_of("Gamma"), "101");
    }

    #[test]
    fn pinned_company_bypasses_the_room_pool() {
        let students = vec![
            student("10A_1", "Müller, Anna", vec![idx(1)]),
            student("10A_2", "Schmidt, Ben", vec![idx(1)]),
            student("10A_3", "Weber, Cem", vec![idx(2)]),
        ];
        let mut pinned = company("Polizei", 5, 3, 0);
        pinned.pinned_room = Some("Aula".to_string());
        let companies = vec![pinned, company("Alpha", 5, 2, 0)];
        let mut service = service_with(students, companies, &["101"]);
        service.generate_schedule().unwrap();

        let schedule = service.get_schedule();
        assert_eq!(schedule[&("Polizei".to_string(), 0)].room, "Aula");
        // The pinned company consumed no pool room
        assert_eq!(schedule[&("Alpha".to_string(), 0)].room, "101");
    }

    #[test]
    fn earliest_slot_blocks_early_sessions() {
        let students = vec![student("10A_1", "Müller, Anna", vec![idx(1)])];
        let mut service = service_with(students, vec![company("Alpha", 5, 2, 2)], &["101"]);
        service.generate_schedule().unwrap();

        let schedule = service.get_schedule();
        assert!(!schedule.contains_key(&("Alpha".to_string(), 0)));
        assert!(!schedule.contains_key(&("Alpha".to_string(), 1)));
        for slot_idx in 2..5 {
            assert!(schedule.contains_key(&("Alpha".to_string(), slot_idx)));
        }
        assert_eq!(slot_of(&service, "Alpha", "10A_1"), Some(2));
    }

    #[test]
    fn wishless_students_are_left_unseated_without_failing() {
        let students = vec![
            student("10A_1", "Müller, Anna", vec![idx(1)]),
            student("10A_2", "Schmidt, Ben", vec![]),
        ];
        let mut service = service_with(students, vec![company("Alpha", 5, 2, 0)], &["101"]);
        service.generate_schedule().unwrap();

        for session in service.get_schedule().values() {
            assert!(!session.has_student("10A_2"));
        }
        let plans = service.student_day_plans();
        assert_eq!(plans[1].visits.len(), 0);
        assert_eq!(plans[1].satisfaction_score, 0.0);
    }

    #[test]
    fn statistics_report_demand_and_clamped_session_counts() {
        let students = vec![
            student("10A_1", "Müller, Anna", vec![idx(1)]),
            student("10A_2", "Schmidt, Ben", vec![idx(1)]),
            student("10A_3", "Weber, Cem", vec![idx(1)]),
            student("10A_4", "Klein, Dana", vec![idx(1)]),
            student("10A_5", "Roth, Emil", vec![idx(1)]),
        ];
        let companies = vec![company("Alpha", 2, 2, 0), company("Beta", 5, 2, 1)];
        let mut service = service_with(students, companies, &["101", "102"]);
        service.generate_schedule().unwrap();

        let stats = service.company_statistics();
        assert_eq!(stats[0].number, 1);
        assert_eq!(stats[0].name, "Alpha");
        assert_eq!(stats[0].first_choice_demand, 5);
        // ceil(5 / 2) = 3, clamped to the limit of 2
        assert_eq!(stats[0].sessions_needed, 2);
        assert_eq!(stats[0].sessions_open, 5);
        assert_eq!(stats[0].room.as_deref(), Some("101"));

        assert_eq!(stats[1].number, 2);
        assert_eq!(stats[1].first_choice_demand, 0);
        assert_eq!(stats[1].sessions_needed, 0);
        assert_eq!(stats[1].sessions_open, 4);
    }

    #[test]
    fn day_plan_scores_a_single_realized_first_wish() {
        let students = vec![student("10A_1", "Müller, Anna", vec![idx(1)])];
        let mut service = service_with(students, vec![company("Alpha", 5, 2, 0)], &["101"]);
        service.generate_schedule().unwrap();

        let plan = service.student_day_plan(&service.students()[0].clone());
        assert_eq!(plan.class_name, "10A");
        assert_eq!(plan.visits.len(), 1);
        assert_eq!(plan.visits[0].company, "Alpha");
        assert_eq!(plan.visits[0].wish_rank, 1);
        assert_eq!(plan.visits[0].slot_index, 0);
        // First slot realized only: 6 of the 21 weight points
        assert!((plan.satisfaction_score - 600.0 / 21.0).abs() < 1e-10);
    }
}
