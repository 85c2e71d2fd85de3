//! PostgreSQL store.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use super::repository::{Store, StoreTx};
use crate::errors::{EngineError, EngineResult};
use crate::points::{PointsChange, PointsEntry, UserAccount};
use crate::prediction::{NewPrediction, Prediction, PredictionId, PredictionStatus};
use crate::schedule::{Match, MatchId, MatchState, NewMatch, Stage};
use crate::tournament::{
    BracketGeneration, NewTournament, Participant, ParticipantStatus, Team, TeamId, Tournament,
    TournamentFilter, TournamentFormat, TournamentId, TournamentStatus, TournamentSummary, UserId,
};

const TOURNAMENT_COLUMNS: &str = "t.id, t.name, t.sport, t.description, t.is_private, \
     t.invite_code, t.manager_id, t.format, t.group_count, t.playoff_teams, t.status, \
     t.champion_team_id, t.target_team_count, t.start_date, t.end_date, \
     t.bracket_generation, t.created_at";

const MATCH_COLUMNS: &str = "id, tournament_id, stage, round_name, team_a_id, team_b_id, \
     scheduled_at, status, team_a_score, team_b_score, winner_team_id";

const PREDICTION_COLUMNS: &str =
    "id, match_id, user_id, predicted_team_id, bet_amount, status, payout, created_at";

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> EngineResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }
}

/// Open PostgreSQL transaction; rolled back by sqlx when dropped uncommitted
struct PgTx {
    tx: Transaction<'static, Postgres>,
}

fn utc(naive: NaiveDateTime) -> DateTime<Utc> {
    naive.and_utc()
}

fn opt_u32(value: Option<i32>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok())
}

fn unique_violation(err: sqlx::Error, conflict: EngineError) -> EngineError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => conflict,
        _ => EngineError::Database(err),
    }
}

fn tournament_from_row(r: &PgRow) -> EngineResult<Tournament> {
    let format_kind: String = r.get("format");
    let format = TournamentFormat::from_parts(
        &format_kind,
        opt_u32(r.get("group_count")),
        opt_u32(r.get("playoff_teams")),
    )
    .map_err(|e| EngineError::Corrupt(e.to_string()))?;
    let status: String = r.get("status");
    let sport: String = r.get("sport");

    Ok(Tournament {
        id: r.get("id"),
        name: r.get("name"),
        sport: sport
            .parse()
            .map_err(|_| EngineError::Corrupt(format!("unknown sport '{sport}'")))?,
        description: r.get("description"),
        is_private: r.get("is_private"),
        invite_code: r.get("invite_code"),
        manager_id: r.get("manager_id"),
        format,
        status: TournamentStatus::from_columns(&status, r.get("champion_team_id"))?,
        target_team_count: opt_u32(r.get("target_team_count")),
        start_date: r.get::<Option<NaiveDateTime>, _>("start_date").map(utc),
        end_date: r.get::<Option<NaiveDateTime>, _>("end_date").map(utc),
        bracket_generation: r
            .get::<Option<String>, _>("bracket_generation")
            .map(|g| g.parse::<BracketGeneration>())
            .transpose()?,
        created_at: utc(r.get("created_at")),
    })
}

fn team_from_row(r: &PgRow) -> EngineResult<Team> {
    let sport: String = r.get("sport");
    Ok(Team {
        id: r.get("id"),
        name: r.get("name"),
        sport: sport
            .parse()
            .map_err(|_| EngineError::Corrupt(format!("unknown sport '{sport}'")))?,
    })
}

fn participant_from_row(r: &PgRow) -> EngineResult<Participant> {
    let status: String = r.get("status");
    Ok(Participant {
        tournament_id: r.get("tournament_id"),
        team_id: r.get("team_id"),
        status: status
            .parse()
            .map_err(|_| EngineError::Corrupt(format!("unknown participant status '{status}'")))?,
        requested_at: utc(r.get("requested_at")),
    })
}

fn match_from_row(r: &PgRow) -> EngineResult<Match> {
    let stage: String = r.get("stage");
    let status: String = r.get("status");
    Ok(Match {
        id: r.get("id"),
        tournament_id: r.get("tournament_id"),
        stage: stage.parse()?,
        round_name: r.get("round_name"),
        team_a: r.get("team_a_id"),
        team_b: r.get("team_b_id"),
        scheduled_at: utc(r.get("scheduled_at")),
        state: MatchState::from_columns(
            &status,
            r.get("team_a_score"),
            r.get("team_b_score"),
            r.get("winner_team_id"),
        )?,
    })
}

fn prediction_from_row(r: &PgRow) -> EngineResult<Prediction> {
    let status: String = r.get("status");
    Ok(Prediction {
        id: r.get("id"),
        match_id: r.get("match_id"),
        user_id: r.get("user_id"),
        predicted_team_id: r.get("predicted_team_id"),
        bet_amount: r.get("bet_amount"),
        status: status.parse()?,
        payout: r.get("payout"),
        created_at: utc(r.get("created_at")),
    })
}

fn entry_from_row(r: &PgRow) -> EngineResult<PointsEntry> {
    let direction: String = r.get("direction");
    let entry_type: String = r.get("entry_type");
    Ok(PointsEntry {
        id: r.get("id"),
        user_id: r.get("user_id"),
        amount: r.get("amount"),
        balance_after: r.get("balance_after"),
        direction: direction.parse()?,
        entry_type: entry_type.parse()?,
        match_id: r.get("match_id"),
        prediction_id: r.get("prediction_id"),
        created_at: utc(r.get("created_at")),
    })
}

impl PgTx {
    async fn append_entry(&mut self, change: &PointsChange, balance_after: i64) -> EngineResult<()> {
        sqlx::query(
            "INSERT INTO points_entries
                 (user_id, amount, balance_after, direction, entry_type, match_id, prediction_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(change.user_id)
        .bind(change.amount)
        .bind(balance_after)
        .bind(change.entry_type.direction().to_string())
        .bind(change.entry_type.to_string())
        .bind(change.match_id)
        .bind(change.prediction_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn require_user(&mut self, user_id: UserId) -> EngineResult<()> {
        match self.user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(EngineError::UserNotFound(user_id)),
        }
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn insert_tournament(
        &mut self,
        manager_id: UserId,
        new: &NewTournament,
        invite_code: Option<String>,
    ) -> EngineResult<Tournament> {
        let row = sqlx::query(
            "INSERT INTO tournaments
                 (name, sport, description, is_private, invite_code, manager_id, format,
                  group_count, playoff_teams, status, target_team_count, start_date, end_date)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'RECRUITING', $10, $11, $12)
             RETURNING id",
        )
        .bind(&new.name)
        .bind(new.sport.as_str())
        .bind(&new.description)
        .bind(new.is_private)
        .bind(&invite_code)
        .bind(manager_id)
        .bind(new.format.as_str())
        .bind(new.format.group_count().map(|g| g as i32))
        .bind(new.format.playoff_teams().map(|p| p as i32))
        .bind(new.target_team_count.map(|c| c as i32))
        .bind(new.start_date.map(|d| d.naive_utc()))
        .bind(new.end_date.map(|d| d.naive_utc()))
        .fetch_one(&mut *self.tx)
        .await?;

        let id: TournamentId = row.get("id");
        self.tournament(id)
            .await?
            .ok_or(EngineError::TournamentNotFound(id))
    }

    async fn tournament(&mut self, id: TournamentId) -> EngineResult<Option<Tournament>> {
        let sql = format!("SELECT {TOURNAMENT_COLUMNS} FROM tournaments t WHERE t.id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(tournament_from_row).transpose()
    }

    async fn lock_tournament(&mut self, id: TournamentId) -> EngineResult<Option<Tournament>> {
        let sql =
            format!("SELECT {TOURNAMENT_COLUMNS} FROM tournaments t WHERE t.id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(tournament_from_row).transpose()
    }

    async fn list_tournaments(
        &mut self,
        filter: &TournamentFilter,
        limit: i64,
        offset: i64,
    ) -> EngineResult<Vec<TournamentSummary>> {
        let sql = format!(
            "SELECT {TOURNAMENT_COLUMNS},
                    (SELECT COUNT(*) FROM tournament_teams tt
                      WHERE tt.tournament_id = t.id AND tt.status = 'APPROVED') AS approved_teams
             FROM tournaments t
             WHERE ($1::TEXT IS NULL OR t.status = $1)
               AND ($2::TEXT IS NULL OR t.sport = $2)
             ORDER BY t.created_at DESC, t.id DESC
             LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query(&sql)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.sport.map(|s| s.as_str()))
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *self.tx)
            .await?;

        rows.iter()
            .map(|r| {
                Ok(TournamentSummary {
                    tournament: tournament_from_row(r)?,
                    approved_teams: r.get("approved_teams"),
                })
            })
            .collect()
    }

    async fn update_tournament(&mut self, t: &Tournament) -> EngineResult<()> {
        let result = sqlx::query(
            "UPDATE tournaments
             SET name = $2, description = $3, format = $4, group_count = $5, playoff_teams = $6,
                 status = $7, champion_team_id = $8, target_team_count = $9, start_date = $10,
                 end_date = $11, bracket_generation = $12
             WHERE id = $1",
        )
        .bind(t.id)
        .bind(&t.name)
        .bind(&t.description)
        .bind(t.format.as_str())
        .bind(t.format.group_count().map(|g| g as i32))
        .bind(t.format.playoff_teams().map(|p| p as i32))
        .bind(t.status.phase().as_str())
        .bind(t.status.champion())
        .bind(t.target_team_count.map(|c| c as i32))
        .bind(t.start_date.map(|d| d.naive_utc()))
        .bind(t.end_date.map(|d| d.naive_utc()))
        .bind(t.bracket_generation.map(|g| g.as_str()))
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(EngineError::TournamentNotFound(t.id));
        }
        Ok(())
    }

    async fn team(&mut self, id: TeamId) -> EngineResult<Option<Team>> {
        let row = sqlx::query("SELECT id, name, sport FROM teams WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(team_from_row).transpose()
    }

    async fn teams(&mut self, ids: &[TeamId]) -> EngineResult<Vec<Team>> {
        let rows = sqlx::query("SELECT id, name, sport FROM teams WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&mut *self.tx)
            .await?;
        let found = rows
            .iter()
            .map(team_from_row)
            .collect::<EngineResult<Vec<Team>>>()?;

        Ok(ids
            .iter()
            .filter_map(|id| found.iter().find(|t| t.id == *id).cloned())
            .collect())
    }

    async fn participant(
        &mut self,
        tournament_id: TournamentId,
        team_id: TeamId,
    ) -> EngineResult<Option<Participant>> {
        let row = sqlx::query(
            "SELECT tournament_id, team_id, status, requested_at
             FROM tournament_teams WHERE tournament_id = $1 AND team_id = $2",
        )
        .bind(tournament_id)
        .bind(team_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(participant_from_row).transpose()
    }

    async fn insert_participant(
        &mut self,
        tournament_id: TournamentId,
        team_id: TeamId,
    ) -> EngineResult<Participant> {
        let row = sqlx::query(
            "INSERT INTO tournament_teams (tournament_id, team_id, status)
             VALUES ($1, $2, 'PENDING')
             RETURNING tournament_id, team_id, status, requested_at",
        )
        .bind(tournament_id)
        .bind(team_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| unique_violation(e, EngineError::AlreadyJoined))?;
        participant_from_row(&row)
    }

    async fn set_participant_status(
        &mut self,
        tournament_id: TournamentId,
        team_id: TeamId,
        status: ParticipantStatus,
    ) -> EngineResult<()> {
        let result = sqlx::query(
            "UPDATE tournament_teams SET status = $3 WHERE tournament_id = $1 AND team_id = $2",
        )
        .bind(tournament_id)
        .bind(team_id)
        .bind(status.as_str())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(EngineError::ParticipantNotFound {
                tournament_id,
                team_id,
            });
        }
        Ok(())
    }

    async fn participants(
        &mut self,
        tournament_id: TournamentId,
        status: Option<ParticipantStatus>,
    ) -> EngineResult<Vec<Participant>> {
        let rows = sqlx::query(
            "SELECT tournament_id, team_id, status, requested_at
             FROM tournament_teams
             WHERE tournament_id = $1 AND ($2::TEXT IS NULL OR status = $2)
             ORDER BY requested_at, team_id",
        )
        .bind(tournament_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&mut *self.tx)
        .await?;
        rows.iter().map(participant_from_row).collect()
    }

    async fn insert_matches(
        &mut self,
        tournament_id: TournamentId,
        matches: &[NewMatch],
    ) -> EngineResult<Vec<Match>> {
        let mut inserted = Vec::with_capacity(matches.len());
        for new in matches {
            let score = match new.state {
                MatchState::Done { score, .. } => score,
                MatchState::Upcoming => None,
            };
            let row = sqlx::query(
                "INSERT INTO matches
                     (tournament_id, stage, round_name, team_a_id, team_b_id, scheduled_at,
                      status, team_a_score, team_b_score, winner_team_id)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                 RETURNING id",
            )
            .bind(tournament_id)
            .bind(new.stage.as_str())
            .bind(&new.round_name)
            .bind(new.team_a)
            .bind(new.team_b)
            .bind(new.scheduled_at.naive_utc())
            .bind(new.state.as_str())
            .bind(score.map(|s| s.team_a))
            .bind(score.map(|s| s.team_b))
            .bind(match new.state {
                MatchState::Done { winner, .. } => winner,
                MatchState::Upcoming => None,
            })
            .fetch_one(&mut *self.tx)
            .await?;

            inserted.push(new.clone().into_match(row.get("id"), tournament_id));
        }
        Ok(inserted)
    }

    async fn match_by_id(&mut self, id: MatchId) -> EngineResult<Option<Match>> {
        let sql = format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(match_from_row).transpose()
    }

    async fn matches(
        &mut self,
        tournament_id: TournamentId,
        stage: Option<Stage>,
    ) -> EngineResult<Vec<Match>> {
        let sql = format!(
            "SELECT {MATCH_COLUMNS} FROM matches
             WHERE tournament_id = $1 AND ($2::TEXT IS NULL OR stage = $2)
             ORDER BY id"
        );
        let rows = sqlx::query(&sql)
            .bind(tournament_id)
            .bind(stage.map(|s| s.as_str()))
            .fetch_all(&mut *self.tx)
            .await?;
        rows.iter().map(match_from_row).collect()
    }

    async fn round_matches(
        &mut self,
        tournament_id: TournamentId,
        stage: Stage,
        round_name: &str,
    ) -> EngineResult<Vec<Match>> {
        let sql = format!(
            "SELECT {MATCH_COLUMNS} FROM matches
             WHERE tournament_id = $1 AND stage = $2 AND round_name = $3
             ORDER BY id"
        );
        let rows = sqlx::query(&sql)
            .bind(tournament_id)
            .bind(stage.as_str())
            .bind(round_name)
            .fetch_all(&mut *self.tx)
            .await?;
        rows.iter().map(match_from_row).collect()
    }

    async fn round_exists(
        &mut self,
        tournament_id: TournamentId,
        stage: Stage,
        round_name: &str,
    ) -> EngineResult<bool> {
        let row = sqlx::query(
            "SELECT EXISTS(
                 SELECT 1 FROM matches
                 WHERE tournament_id = $1 AND stage = $2 AND round_name = $3
             ) AS present",
        )
        .bind(tournament_id)
        .bind(stage.as_str())
        .bind(round_name)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row.get("present"))
    }

    async fn update_match_state(&mut self, id: MatchId, state: &MatchState) -> EngineResult<()> {
        let (score, winner) = match *state {
            MatchState::Done { score, winner } => (score, winner),
            MatchState::Upcoming => (None, None),
        };
        let result = sqlx::query(
            "UPDATE matches
             SET status = $2, team_a_score = $3, team_b_score = $4, winner_team_id = $5
             WHERE id = $1",
        )
        .bind(id)
        .bind(state.as_str())
        .bind(score.map(|s| s.team_a))
        .bind(score.map(|s| s.team_b))
        .bind(winner)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(EngineError::MatchNotFound(id));
        }
        Ok(())
    }

    async fn bettable_matches(&mut self) -> EngineResult<Vec<Match>> {
        let sql = format!(
            "SELECT {MATCH_COLUMNS} FROM matches
             WHERE team_a_id IS NOT NULL AND team_b_id IS NOT NULL
             ORDER BY scheduled_at, id"
        );
        let rows = sqlx::query(&sql).fetch_all(&mut *self.tx).await?;
        rows.iter().map(match_from_row).collect()
    }

    async fn user(&mut self, id: UserId) -> EngineResult<Option<UserAccount>> {
        let row = sqlx::query("SELECT id, username, points FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(|r| UserAccount {
            id: r.get("id"),
            username: r.get("username"),
            points: r.get("points"),
        }))
    }

    async fn debit_points(&mut self, change: &PointsChange) -> EngineResult<Option<i64>> {
        // Conditional update: never drives a balance negative
        let row = sqlx::query(
            "UPDATE users SET points = points - $1
             WHERE id = $2 AND points >= $1
             RETURNING points",
        )
        .bind(change.amount)
        .bind(change.user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        match row {
            Some(row) => {
                let balance: i64 = row.get("points");
                self.append_entry(change, balance).await?;
                Ok(Some(balance))
            }
            None => {
                self.require_user(change.user_id).await?;
                Ok(None)
            }
        }
    }

    async fn credit_points(&mut self, change: &PointsChange) -> EngineResult<i64> {
        let row = sqlx::query("UPDATE users SET points = points + $1 WHERE id = $2 RETURNING points")
            .bind(change.amount)
            .bind(change.user_id)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or(EngineError::UserNotFound(change.user_id))?;

        let balance: i64 = row.get("points");
        self.append_entry(change, balance).await?;
        Ok(balance)
    }

    async fn points_history(
        &mut self,
        user_id: UserId,
        limit: i64,
    ) -> EngineResult<Vec<PointsEntry>> {
        let rows = sqlx::query(
            "SELECT id, user_id, amount, balance_after, direction, entry_type, match_id,
                    prediction_id, created_at
             FROM points_entries
             WHERE user_id = $1
             ORDER BY id DESC
             LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&mut *self.tx)
        .await?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn insert_prediction(&mut self, new: &NewPrediction) -> EngineResult<Prediction> {
        let sql = format!(
            "INSERT INTO predictions (match_id, user_id, predicted_team_id, bet_amount, status)
             VALUES ($1, $2, $3, $4, 'pending')
             RETURNING {PREDICTION_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(new.match_id)
            .bind(new.user_id)
            .bind(new.predicted_team_id)
            .bind(new.bet_amount)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| unique_violation(e, EngineError::AlreadyPredicted))?;
        prediction_from_row(&row)
    }

    async fn prediction_for(
        &mut self,
        user_id: UserId,
        match_id: MatchId,
    ) -> EngineResult<Option<Prediction>> {
        let sql = format!(
            "SELECT {PREDICTION_COLUMNS} FROM predictions WHERE user_id = $1 AND match_id = $2"
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(match_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(prediction_from_row).transpose()
    }

    async fn predictions_for_match(
        &mut self,
        match_id: MatchId,
        status: Option<PredictionStatus>,
    ) -> EngineResult<Vec<Prediction>> {
        let sql = format!(
            "SELECT {PREDICTION_COLUMNS} FROM predictions
             WHERE match_id = $1 AND ($2::TEXT IS NULL OR status = $2)
             ORDER BY id"
        );
        let rows = sqlx::query(&sql)
            .bind(match_id)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&mut *self.tx)
            .await?;
        rows.iter().map(prediction_from_row).collect()
    }

    async fn predictions_for_user(&mut self, user_id: UserId) -> EngineResult<Vec<Prediction>> {
        let sql = format!(
            "SELECT {PREDICTION_COLUMNS} FROM predictions WHERE user_id = $1 ORDER BY id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&mut *self.tx)
            .await?;
        rows.iter().map(prediction_from_row).collect()
    }

    async fn settle_prediction(
        &mut self,
        id: PredictionId,
        status: PredictionStatus,
        payout: i64,
    ) -> EngineResult<()> {
        sqlx::query("UPDATE predictions SET status = $2, payout = $3 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .bind(payout)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> EngineResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
