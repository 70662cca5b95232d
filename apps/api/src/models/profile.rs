use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    /// "First Last", skipping whichever part is missing.
    pub fn full_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A named profile owned by a user. Contact fields feed the resume header.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub phone_number: Option<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EducationRow {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub institution: String,
    pub degree: Option<String>,
    pub field_of_study: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExperienceRow {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub company: String,
    pub position: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectRow {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub title: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub technologies: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SkillRow {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub name: String,
    pub proficiency: Option<String>,
}

/// Read-only snapshot of everything a resume is generated from.
/// Fetched fresh for every generation request; never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileAggregate {
    pub user: UserRow,
    pub profile: ProfileRow,
    pub education: Vec<EducationRow>,
    pub experience: Vec<ExperienceRow>,
    pub projects: Vec<ProjectRow>,
    pub skills: Vec<SkillRow>,
}

impl ProfileAggregate {
    /// Name shown to the LLM: the user's name, else the profile name.
    pub fn candidate_name(&self) -> String {
        let full_name = self.user.full_name();
        if !full_name.is_empty() {
            return full_name;
        }
        let profile_name = self.profile.name.trim();
        if profile_name.is_empty() {
            "The Candidate".to_string()
        } else {
            profile_name.to_string()
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_skips_missing_parts() {
        let mut user = fixtures::user();
        user.last_name = None;
        assert_eq!(user.full_name(), "Ada");

        user.first_name = Some("  ".to_string());
        assert_eq!(user.full_name(), "");
    }

    #[test]
    fn test_candidate_name_falls_back_to_profile_name() {
        let mut aggregate = fixtures::aggregate();
        assert_eq!(aggregate.candidate_name(), "Ada Lovelace");

        aggregate.user.first_name = None;
        aggregate.user.last_name = None;
        assert_eq!(aggregate.candidate_name(), "Backend roles");

        aggregate.profile.name = String::new();
        assert_eq!(aggregate.candidate_name(), "The Candidate");
    }
}
