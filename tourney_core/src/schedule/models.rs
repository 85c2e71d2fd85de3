//! Match data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{EngineError, EngineResult};
use crate::tournament::{TeamId, TournamentId};

/// Match ID type
pub type MatchId = i64;

/// Phase a match belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    /// Round-robin phase
    League,
    /// Single-elimination phase
    Tournament,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::League => "LEAGUE",
            Stage::Tournament => "TOURNAMENT",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LEAGUE" => Ok(Stage::League),
            "TOURNAMENT" => Ok(Stage::Tournament),
            other => Err(EngineError::Corrupt(format!("unknown stage '{other}'"))),
        }
    }
}

/// Final score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub team_a: i32,
    pub team_b: i32,
}

impl Score {
    pub fn new(team_a: i32, team_b: i32) -> Self {
        Self { team_a, team_b }
    }

    pub fn is_draw(&self) -> bool {
        self.team_a == self.team_b
    }
}

/// Match state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchState {
    /// Waiting for a result
    Upcoming,
    /// Resolved; byes and empty slots have no score
    Done {
        score: Option<Score>,
        winner: Option<TeamId>,
    },
}

impl MatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchState::Upcoming => "UPCOMING",
            MatchState::Done { .. } => "DONE",
        }
    }

    /// Rebuild from stored columns
    pub fn from_columns(
        status: &str,
        team_a_score: Option<i32>,
        team_b_score: Option<i32>,
        winner: Option<TeamId>,
    ) -> EngineResult<Self> {
        match status {
            "UPCOMING" => Ok(MatchState::Upcoming),
            "DONE" => Ok(MatchState::Done {
                score: team_a_score
                    .zip(team_b_score)
                    .map(|(a, b)| Score::new(a, b)),
                winner,
            }),
            other => Err(EngineError::Corrupt(format!(
                "unknown match status '{other}'"
            ))),
        }
    }
}

/// Scheduled match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub stage: Stage,
    /// Group label for league rounds, depth label for bracket rounds
    pub round_name: String,
    pub team_a: Option<TeamId>,
    pub team_b: Option<TeamId>,
    pub scheduled_at: DateTime<Utc>,
    pub state: MatchState,
}

impl Match {
    pub fn is_done(&self) -> bool {
        matches!(self.state, MatchState::Done { .. })
    }

    pub fn winner(&self) -> Option<TeamId> {
        match self.state {
            MatchState::Done { winner, .. } => winner,
            MatchState::Upcoming => None,
        }
    }

    pub fn score(&self) -> Option<Score> {
        match self.state {
            MatchState::Done { score, .. } => score,
            MatchState::Upcoming => None,
        }
    }

    /// Both teams, when neither slot is empty
    pub fn both_teams(&self) -> Option<(TeamId, TeamId)> {
        self.team_a.zip(self.team_b)
    }

    pub fn involves(&self, team_id: TeamId) -> bool {
        self.team_a == Some(team_id) || self.team_b == Some(team_id)
    }
}

/// Match about to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMatch {
    pub stage: Stage,
    pub round_name: String,
    pub team_a: Option<TeamId>,
    pub team_b: Option<TeamId>,
    pub scheduled_at: DateTime<Utc>,
    pub state: MatchState,
}

impl NewMatch {
    /// Create a pairing; a lone team gets a bye and an empty slot resolves with no winner
    pub fn pairing(
        stage: Stage,
        round_name: impl Into<String>,
        team_a: Option<TeamId>,
        team_b: Option<TeamId>,
        scheduled_at: DateTime<Utc>,
    ) -> Self {
        let state = match (team_a, team_b) {
            (Some(_), Some(_)) => MatchState::Upcoming,
            (Some(sole), None) | (None, Some(sole)) => MatchState::Done {
                score: None,
                winner: Some(sole),
            },
            (None, None) => MatchState::Done {
                score: None,
                winner: None,
            },
        };

        Self {
            stage,
            round_name: round_name.into(),
            team_a,
            team_b,
            scheduled_at,
            state,
        }
    }

    pub fn is_bye(&self) -> bool {
        self.team_a.is_some() != self.team_b.is_some()
    }

    /// Attach an id, producing the stored form
    pub fn into_match(self, id: MatchId, tournament_id: TournamentId) -> Match {
        Match {
            id,
            tournament_id,
            stage: self.stage,
            round_name: self.round_name,
            team_a: self.team_a,
            team_b: self.team_b,
            scheduled_at: self.scheduled_at,
            state: self.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairing_states() {
        let at = Utc::now();

        let full = NewMatch::pairing(Stage::Tournament, "결승", Some(1), Some(2), at);
        assert_eq!(full.state, MatchState::Upcoming);
        assert!(!full.is_bye());

        let bye = NewMatch::pairing(Stage::Tournament, "준결승", Some(3), None, at);
        assert_eq!(
            bye.state,
            MatchState::Done {
                score: None,
                winner: Some(3)
            }
        );
        assert!(bye.is_bye());

        let empty = NewMatch::pairing(Stage::Tournament, "8강", None, None, at);
        assert_eq!(
            empty.state,
            MatchState::Done {
                score: None,
                winner: None
            }
        );
    }

    #[test]
    fn test_state_from_columns() {
        let state = MatchState::from_columns("DONE", Some(2), Some(1), Some(5)).unwrap();
        assert_eq!(
            state,
            MatchState::Done {
                score: Some(Score::new(2, 1)),
                winner: Some(5)
            }
        );

        let state = MatchState::from_columns("DONE", Some(2), None, Some(5)).unwrap();
        assert_eq!(
            state,
            MatchState::Done {
                score: None,
                winner: Some(5)
            }
        );

        assert!(MatchState::from_columns("LIVE", None, None, None).is_err());
    }

    #[test]
    fn test_state_serializes_with_status_tag() {
        let json = serde_json::to_value(MatchState::Upcoming).unwrap();
        assert_eq!(json["status"], "UPCOMING");

        let json = serde_json::to_value(MatchState::Done {
            score: Some(Score::new(1, 0)),
            winner: Some(4),
        })
        .unwrap();
        assert_eq!(json["status"], "DONE");
        assert_eq!(json["winner"], 4);
        assert_eq!(json["score"]["team_a"], 1);
    }
}
