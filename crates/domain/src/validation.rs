//! Pure validation functions for domain invariants (§3, §9 REDESIGN FLAG).
//!
//! These replace attribute/decorator-driven validation: every function here
//! is a plain, side-effect-free check invoked by the coordinator or the
//! assignment transaction before touching any repository.

use std::collections::BTreeSet;

use crate::contractor::Contractor;
use crate::job::Job;

/// The system-wide skill tag catalogue (§3 Supplemented feature in
/// SPEC_FULL.md). Seeded by migration in storage; callers normalize tags to
/// lowercase before checking membership.
#[derive(Debug, Clone, Default)]
pub struct SkillCatalogue {
    pub tags: BTreeSet<String>,
}

impl SkillCatalogue {
    pub fn new(tags: impl IntoIterator<Item = String>) -> Self {
        Self {
            tags: tags.into_iter().collect(),
        }
    }

    pub fn contains_all(&self, required: &BTreeSet<String>) -> bool {
        required.iter().all(|tag| self.tags.contains(tag))
    }
}

/// §3 Contractor invariants: non-overlapping weekly hours, every skill from
/// the catalogue.
pub fn validate_contractor(contractor: &Contractor, catalogue: &SkillCatalogue) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    if !contractor.has_non_overlapping_weekly_hours() {
        errors.push("weekly hours contain overlapping intervals on some weekday".to_string());
    }
    if !catalogue.contains_all(&contractor.skills) {
        errors.push("one or more contractor skills are not in the skill catalogue".to_string());
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// §3 Job invariants: duration fits the service window, required skills
/// exist in the catalogue.
pub fn validate_job(job: &Job, catalogue: &SkillCatalogue) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    if !job.service_window.is_ordered() {
        errors.push("service window start must precede end".to_string());
    }
    if !job.duration_fits_window() {
        errors.push("job duration must be positive and fit inside the service window".to_string());
    }
    if !catalogue.contains_all(&job.required_skills) {
        errors.push("one or more required skills are not in the skill catalogue".to_string());
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Hard skill filter used by the coordinator (§4.7 step 2): contractor's
/// skill set must be a superset of the job's required skills.
pub fn contractor_has_required_skills(contractor: &Contractor, job: &Job) -> bool {
    job.required_skills.is_subset(&contractor.skills)
}
