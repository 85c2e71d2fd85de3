//! Tournament data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{EngineError, EngineResult};

/// Tournament ID type
pub type TournamentId = i64;

/// Team ID type
pub type TeamId = i64;

/// User ID type
pub type UserId = i64;

/// Highest group count; groups are labelled with a single letter
pub const MAX_GROUPS: u32 = 26;

/// Supported sports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sport {
    LoL,
    Soccer,
    Basketball,
    Futsal,
}

impl Sport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::LoL => "LoL",
            Sport::Soccer => "Soccer",
            Sport::Basketball => "Basketball",
            Sport::Futsal => "Futsal",
        }
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sport {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lol" | "leagueoflegends" => Ok(Sport::LoL),
            "soccer" | "football" => Ok(Sport::Soccer),
            "basketball" => Ok(Sport::Basketball),
            "futsal" => Ok(Sport::Futsal),
            other => Err(EngineError::InvalidConfig(format!("unknown sport '{other}'"))),
        }
    }
}

/// Competition format
///
/// Group and playoff settings only exist on the formats that use them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TournamentFormat {
    /// Single-elimination bracket
    Tournament,
    /// Round-robin, optionally split into groups
    League { group_count: Option<u32> },
    /// Round-robin groups followed by a bracket of the top teams
    Hybrid {
        group_count: Option<u32>,
        playoff_teams: u32,
    },
}

impl TournamentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentFormat::Tournament => "TOURNAMENT",
            TournamentFormat::League { .. } => "LEAGUE",
            TournamentFormat::Hybrid { .. } => "HYBRID",
        }
    }

    pub fn group_count(&self) -> Option<u32> {
        match self {
            TournamentFormat::Tournament => None,
            TournamentFormat::League { group_count } => *group_count,
            TournamentFormat::Hybrid { group_count, .. } => *group_count,
        }
    }

    pub fn playoff_teams(&self) -> Option<u32> {
        match self {
            TournamentFormat::Hybrid { playoff_teams, .. } => Some(*playoff_teams),
            _ => None,
        }
    }

    /// Number of groups the league phase is split into
    pub fn effective_groups(&self) -> u32 {
        self.group_count().unwrap_or(1).max(1)
    }

    /// Build a format from its parts, dropping settings the format does not use
    pub fn from_parts(
        kind: &str,
        group_count: Option<u32>,
        playoff_teams: Option<u32>,
    ) -> EngineResult<Self> {
        match kind.to_ascii_uppercase().as_str() {
            "TOURNAMENT" => Ok(TournamentFormat::Tournament),
            "LEAGUE" => Ok(TournamentFormat::League { group_count }),
            "HYBRID" => Ok(TournamentFormat::Hybrid {
                group_count,
                playoff_teams: playoff_teams.ok_or_else(|| {
                    EngineError::InvalidConfig("hybrid tournaments need playoff_teams".to_string())
                })?,
            }),
            other => Err(EngineError::InvalidConfig(format!("unknown format '{other}'"))),
        }
    }

    /// Check group and playoff settings
    ///
    /// # Errors
    ///
    /// * `EngineError::InvalidConfig` - Group count out of range or fewer than two playoff teams
    /// * `EngineError::IndivisiblePlayoffSplit` - Playoff teams cannot be split evenly across groups
    pub fn validate(&self) -> EngineResult<()> {
        if let Some(groups) = self.group_count() {
            if !(1..=MAX_GROUPS).contains(&groups) {
                return Err(EngineError::InvalidConfig(format!(
                    "group_count must be 1-{MAX_GROUPS}, got {groups}"
                )));
            }
        }

        if let TournamentFormat::Hybrid { playoff_teams, .. } = self {
            if *playoff_teams < 2 {
                return Err(EngineError::InvalidConfig(
                    "playoff_teams must be at least 2".to_string(),
                ));
            }
            let groups = self.effective_groups();
            if playoff_teams % groups != 0 {
                return Err(EngineError::IndivisiblePlayoffSplit {
                    playoff_teams: *playoff_teams,
                    group_count: groups,
                });
            }
        }

        Ok(())
    }
}

impl fmt::Display for TournamentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle phase, without phase-specific data
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TournamentPhase {
    Recruiting,
    Upcoming,
    Ongoing,
    Ended,
}

impl TournamentPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentPhase::Recruiting => "RECRUITING",
            TournamentPhase::Upcoming => "UPCOMING",
            TournamentPhase::Ongoing => "ONGOING",
            TournamentPhase::Ended => "ENDED",
        }
    }
}

impl fmt::Display for TournamentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TournamentPhase {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RECRUITING" => Ok(TournamentPhase::Recruiting),
            "UPCOMING" => Ok(TournamentPhase::Upcoming),
            "ONGOING" => Ok(TournamentPhase::Ongoing),
            "ENDED" => Ok(TournamentPhase::Ended),
            other => Err(EngineError::InvalidConfig(format!("unknown status '{other}'"))),
        }
    }
}

/// Tournament status
///
/// Advances RECRUITING → (UPCOMING) → ONGOING → ENDED and never goes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TournamentStatus {
    /// Accepting join requests
    Recruiting,
    /// Recruitment closed, schedule not generated yet
    Upcoming,
    /// Schedule generated, results being reported
    Ongoing,
    /// Finished; bracket tournaments always have a champion
    Ended { champion: Option<TeamId> },
}

impl TournamentStatus {
    pub fn phase(&self) -> TournamentPhase {
        match self {
            TournamentStatus::Recruiting => TournamentPhase::Recruiting,
            TournamentStatus::Upcoming => TournamentPhase::Upcoming,
            TournamentStatus::Ongoing => TournamentPhase::Ongoing,
            TournamentStatus::Ended { .. } => TournamentPhase::Ended,
        }
    }

    pub fn champion(&self) -> Option<TeamId> {
        match self {
            TournamentStatus::Ended { champion } => *champion,
            _ => None,
        }
    }

    /// Whether a schedule may still be generated
    pub fn is_pre_start(&self) -> bool {
        matches!(
            self,
            TournamentStatus::Recruiting | TournamentStatus::Upcoming
        )
    }

    pub fn from_columns(status: &str, champion: Option<TeamId>) -> EngineResult<Self> {
        Ok(match status.parse::<TournamentPhase>()? {
            TournamentPhase::Recruiting => TournamentStatus::Recruiting,
            TournamentPhase::Upcoming => TournamentStatus::Upcoming,
            TournamentPhase::Ongoing => TournamentStatus::Ongoing,
            TournamentPhase::Ended => TournamentStatus::Ended { champion },
        })
    }
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.phase().as_str())
    }
}

/// How the current schedule was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BracketGeneration {
    Random,
    Manual,
}

impl BracketGeneration {
    pub fn as_str(&self) -> &'static str {
        match self {
            BracketGeneration::Random => "random",
            BracketGeneration::Manual => "manual",
        }
    }
}

impl FromStr for BracketGeneration {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(BracketGeneration::Random),
            "manual" => Ok(BracketGeneration::Manual),
            other => Err(EngineError::Corrupt(format!(
                "unknown bracket generation '{other}'"
            ))),
        }
    }
}

/// Tournament
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub sport: Sport,
    pub description: Option<String>,
    pub is_private: bool,
    /// Present only on private tournaments
    pub invite_code: Option<String>,
    pub manager_id: UserId,
    pub format: TournamentFormat,
    pub status: TournamentStatus,
    pub target_team_count: Option<u32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub bracket_generation: Option<BracketGeneration>,
    pub created_at: DateTime<Utc>,
}

impl Tournament {
    pub fn is_managed_by(&self, user_id: UserId) -> bool {
        self.manager_id == user_id
    }
}

/// Input for creating a tournament
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTournament {
    pub name: String,
    pub sport: Sport,
    pub description: Option<String>,
    pub is_private: bool,
    pub format: TournamentFormat,
    pub target_team_count: Option<u32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl NewTournament {
    /// Create a public single-elimination tournament with no date window
    pub fn new(name: impl Into<String>, sport: Sport) -> Self {
        Self {
            name: name.into(),
            sport,
            description: None,
            is_private: false,
            format: TournamentFormat::Tournament,
            target_team_count: None,
            start_date: None,
            end_date: None,
        }
    }

    pub fn with_format(mut self, format: TournamentFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_window(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn private(mut self) -> Self {
        self.is_private = true;
        self
    }
}

/// Partial update of tournament settings; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TournamentSettings {
    pub name: Option<String>,
    pub description: Option<String>,
    pub target_team_count: Option<u32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub group_count: Option<u32>,
    pub playoff_teams: Option<u32>,
}

/// Team roster entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub sport: Sport,
}

/// Participation request status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantStatus {
    Pending,
    Approved,
    Rejected,
}

impl ParticipantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantStatus::Pending => "PENDING",
            ParticipantStatus::Approved => "APPROVED",
            ParticipantStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticipantStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(ParticipantStatus::Pending),
            "APPROVED" => Ok(ParticipantStatus::Approved),
            "REJECTED" => Ok(ParticipantStatus::Rejected),
            other => Err(EngineError::InvalidConfig(format!(
                "unknown participant status '{other}'"
            ))),
        }
    }
}

/// A team's participation in a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub tournament_id: TournamentId,
    pub team_id: TeamId,
    pub status: ParticipantStatus,
    pub requested_at: DateTime<Utc>,
}

/// Listing filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TournamentFilter {
    pub status: Option<TournamentPhase>,
    pub sport: Option<Sport>,
    /// 1-based page number
    pub page: Option<u32>,
}

/// Listing row
#[derive(Debug, Clone, Serialize)]
pub struct TournamentSummary {
    pub tournament: Tournament,
    pub approved_teams: i64,
}

/// Tournament detail view
#[derive(Debug, Clone, Serialize)]
pub struct TournamentDetail {
    pub tournament: Tournament,
    pub teams: Vec<Team>,
    pub champion: Option<Team>,
}

/// Participant with its roster entry
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantDetail {
    #[serde(flatten)]
    pub participant: Participant,
    pub team: Team,
}

/// One pairing of a hand-made bracket; a missing `team_b` is a bye
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualPairing {
    pub team_a: TeamId,
    pub team_b: Option<TeamId>,
    pub round_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sport_parse_case_insensitive() {
        assert_eq!("lol".parse::<Sport>().unwrap(), Sport::LoL);
        assert_eq!("SOCCER".parse::<Sport>().unwrap(), Sport::Soccer);
        assert!("chess".parse::<Sport>().is_err());
    }

    #[test]
    fn test_format_from_parts_drops_unused_settings() {
        let format = TournamentFormat::from_parts("tournament", Some(4), Some(8)).unwrap();
        assert_eq!(format, TournamentFormat::Tournament);
        assert_eq!(format.group_count(), None);
        assert_eq!(format.playoff_teams(), None);

        let format = TournamentFormat::from_parts("LEAGUE", Some(2), Some(8)).unwrap();
        assert_eq!(
            format,
            TournamentFormat::League {
                group_count: Some(2)
            }
        );
        assert_eq!(format.playoff_teams(), None);
    }

    #[test]
    fn test_hybrid_requires_playoff_teams() {
        assert!(TournamentFormat::from_parts("HYBRID", Some(2), None).is_err());
    }

    #[test]
    fn test_validate_indivisible_playoff() {
        let format = TournamentFormat::Hybrid {
            group_count: Some(3),
            playoff_teams: 4,
        };
        assert!(matches!(
            format.validate(),
            Err(EngineError::IndivisiblePlayoffSplit {
                playoff_teams: 4,
                group_count: 3
            })
        ));

        let format = TournamentFormat::Hybrid {
            group_count: Some(2),
            playoff_teams: 4,
        };
        assert!(format.validate().is_ok());
    }

    #[test]
    fn test_validate_group_range() {
        let format = TournamentFormat::League {
            group_count: Some(27),
        };
        assert!(format.validate().is_err());
        let format = TournamentFormat::League {
            group_count: Some(0),
        };
        assert!(format.validate().is_err());
    }

    #[test]
    fn test_status_columns() {
        let status = TournamentStatus::from_columns("ENDED", Some(7)).unwrap();
        assert_eq!(status, TournamentStatus::Ended { champion: Some(7) });
        assert_eq!(status.champion(), Some(7));
        assert_eq!(status.to_string(), "ENDED");

        let status = TournamentStatus::from_columns("ONGOING", Some(7)).unwrap();
        assert_eq!(status, TournamentStatus::Ongoing);
        assert_eq!(status.champion(), None);
    }

    #[test]
    fn test_phase_ordering_is_lifecycle_order() {
        assert!(TournamentPhase::Recruiting < TournamentPhase::Upcoming);
        assert!(TournamentPhase::Upcoming < TournamentPhase::Ongoing);
        assert!(TournamentPhase::Ongoing < TournamentPhase::Ended);
    }
}
