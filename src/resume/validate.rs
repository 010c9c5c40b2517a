//! Field format checks for [`Resume`]
//!
//! Empty fields are always accepted. List entries must not be empty.

use super::{Basics, Education, Project, Resume, Work};
use regex::Regex;
use reqwest::Url;
use std::fmt;
use std::sync::LazyLock;

/// ISO 8601 calendar date, truncated to year or month if needed
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}(-(0[1-9]|1[0-2])(-(0[1-9]|[12]\d|3[01]))?)?$").expect("valid date pattern")
});

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern"));

static SEMVER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(-[0-9A-Za-z.-]+)?(\+[0-9A-Za-z.-]+)?$",
    )
    .expect("valid semver pattern")
});

/// A field that failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Path to the field, e.g. `work[1].startDate`
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Default)]
struct Validator {
    issues: Vec<ValidationIssue>,
}

impl Validator {
    fn fail(&mut self, field: impl Into<String>, message: &str) {
        self.issues.push(ValidationIssue {
            field: field.into(),
            message: message.to_string(),
        });
    }

    fn url(&mut self, field: impl Into<String>, value: &str) {
        if !value.is_empty() && Url::parse(value).is_err() {
            self.fail(field, "must be a valid URL");
        }
    }

    fn email(&mut self, field: impl Into<String>, value: &str) {
        if !value.is_empty() && !EMAIL_RE.is_match(value) {
            self.fail(field, "must be a valid email address");
        }
    }

    fn date(&mut self, field: impl Into<String>, value: &str) {
        if !value.is_empty() && !DATE_RE.is_match(value) {
            self.fail(field, "must be a date (YYYY, YYYY-MM or YYYY-MM-DD)");
        }
    }

    fn semver(&mut self, field: impl Into<String>, value: &str) {
        if !value.is_empty() && !SEMVER_RE.is_match(value) {
            self.fail(field, "must be a semantic version");
        }
    }

    /// Every entry of `items` must differ from the empty value.
    fn entries<T: Default + PartialEq>(&mut self, field: &str, items: &[T]) {
        let blank = T::default();
        for (i, item) in items.iter().enumerate() {
            if *item == blank {
                self.fail(format!("{field}[{i}]"), "must not be empty");
            }
        }
    }

    fn finish(self) -> Result<(), Vec<ValidationIssue>> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(self.issues)
        }
    }
}

pub(super) fn resume(resume: &Resume) -> Result<(), Vec<ValidationIssue>> {
    let mut v = Validator::default();

    basics(&mut v, &resume.basics);

    v.entries("work", &resume.work);
    for (i, work) in resume.work.iter().enumerate() {
        work_entry(&mut v, &format!("work[{i}]"), work);
    }

    v.entries("volunteer", &resume.volunteer);
    for (i, entry) in resume.volunteer.iter().enumerate() {
        let path = format!("volunteer[{i}]");
        v.url(format!("{path}.url"), &entry.url);
        v.date(format!("{path}.startDate"), &entry.start_date);
        v.date(format!("{path}.endDate"), &entry.end_date);
        v.entries(&format!("{path}.highlights"), &entry.highlights);
    }

    v.entries("education", &resume.education);
    for (i, entry) in resume.education.iter().enumerate() {
        education(&mut v, &format!("education[{i}]"), entry);
    }

    v.entries("awards", &resume.awards);
    for (i, award) in resume.awards.iter().enumerate() {
        v.date(format!("awards[{i}].date"), &award.date);
    }

    v.entries("publications", &resume.publications);
    for (i, publication) in resume.publications.iter().enumerate() {
        v.date(format!("publications[{i}].releaseDate"), &publication.release_date);
        v.url(format!("publications[{i}].url"), &publication.url);
    }

    v.entries("skills", &resume.skills);
    for (i, skill) in resume.skills.iter().enumerate() {
        v.entries(&format!("skills[{i}].keywords"), &skill.keywords);
    }

    v.entries("languages", &resume.languages);
    v.entries("interests", &resume.interests);
    for (i, interest) in resume.interests.iter().enumerate() {
        v.entries(&format!("interests[{i}].keywords"), &interest.keywords);
    }

    v.entries("references", &resume.references);

    v.entries("projects", &resume.projects);
    for (i, entry) in resume.projects.iter().enumerate() {
        project(&mut v, &format!("projects[{i}]"), entry);
    }

    if let Some(meta) = &resume.meta {
        v.semver("meta.version", &meta.version);
    }

    v.finish()
}

fn basics(v: &mut Validator, basics: &Basics) {
    v.url("basics.image", &basics.image);
    v.email("basics.email", &basics.email);
    v.url("basics.url", &basics.url);
    v.entries("basics.profiles", &basics.profiles);
    for (i, profile) in basics.profiles.iter().enumerate() {
        v.url(format!("basics.profiles[{i}].url"), &profile.url);
    }
}

fn work_entry(v: &mut Validator, path: &str, work: &Work) {
    v.url(format!("{path}.url"), &work.url);
    v.date(format!("{path}.startDate"), &work.start_date);
    v.date(format!("{path}.endDate"), &work.end_date);
    v.entries(&format!("{path}.highlights"), &work.highlights);
}

fn education(v: &mut Validator, path: &str, education: &Education) {
    v.date(format!("{path}.startDate"), &education.start_date);
    v.date(format!("{path}.endDate"), &education.end_date);
    v.entries(&format!("{path}.courses"), &education.courses);
}

fn project(v: &mut Validator, path: &str, project: &Project) {
    v.entries(&format!("{path}.highlights"), &project.highlights);
    v.entries(&format!("{path}.keywords"), &project.keywords);
    v.date(format!("{path}.startDate"), &project.start_date);
    v.date(format!("{path}.endDate"), &project.end_date);
    v.url(format!("{path}.url"), &project.url);
    v.entries(&format!("{path}.roles"), &project.roles);
}
