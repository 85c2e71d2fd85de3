//! Tournament manager: lifecycle, scheduling and result reporting.

use log::{debug, info};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

use super::models::{
    BracketGeneration, ManualPairing, NewTournament, Participant, ParticipantDetail,
    ParticipantStatus, Team, TeamId, Tournament, TournamentDetail, TournamentFilter,
    TournamentFormat, TournamentId, TournamentSettings, TournamentStatus, TournamentSummary,
    UserId,
};
use super::progression::{Advancement, advance_round};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::db::timeouts::with_timeout;
use crate::db::{Store, StoreTx};
use crate::errors::{EngineError, EngineResult};
use crate::prediction::settlement::{SettlementSummary, settle_match};
use crate::prediction::{MatchDetail, PoolSnapshot, is_betting_open};
use crate::schedule::window::{bracket_base, next_round_base};
use crate::schedule::{
    DateWindow, MANUAL_ROUND_LABEL, Match, MatchId, MatchState, NewMatch, Score, Stage,
    generate_bracket, generate_invite_code, generate_league_schedule, shuffle_teams,
};
use crate::standings::{GroupStandings, league_tables, top_qualifiers};

/// Matches created when a tournament starts
#[derive(Debug, Clone, Serialize)]
pub struct StartOutcome {
    pub tournament: Tournament,
    pub matches: Vec<Match>,
}

/// Result of recording a match result
#[derive(Debug, Clone, Serialize)]
pub struct ResultOutcome {
    #[serde(rename = "match")]
    pub match_: Match,
    pub settlement: SettlementSummary,
    pub advancement: Advancement,
}

/// Playoff bracket created from the league tables
#[derive(Debug, Clone, Serialize)]
pub struct PlayoffOutcome {
    pub qualifiers: Vec<TeamId>,
    pub matches: Vec<Match>,
}

/// Ranked league tables with the teams they mention
#[derive(Debug, Clone, Serialize)]
pub struct LeagueStandings {
    pub groups: Vec<GroupStandings>,
    pub teams: Vec<Team>,
}

/// Bracket round in creation order
#[derive(Debug, Clone, Serialize)]
pub struct BracketRound {
    pub round_name: String,
    pub matches: Vec<Match>,
}

/// Tournament manager
#[derive(Clone)]
pub struct TournamentManager {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

/// Load a tournament and hold its lock
async fn load_locked(tx: &mut dyn StoreTx, id: TournamentId) -> EngineResult<Tournament> {
    tx.lock_tournament(id)
        .await?
        .ok_or(EngineError::TournamentNotFound(id))
}

/// Load and lock a tournament the caller manages
async fn load_managed(
    tx: &mut dyn StoreTx,
    id: TournamentId,
    caller: UserId,
) -> EngineResult<Tournament> {
    let tournament = load_locked(tx, id).await?;
    if !tournament.is_managed_by(caller) {
        return Err(EngineError::NotManager);
    }
    Ok(tournament)
}

async fn load(tx: &mut dyn StoreTx, id: TournamentId) -> EngineResult<Tournament> {
    tx.tournament(id)
        .await?
        .ok_or(EngineError::TournamentNotFound(id))
}

async fn approved_team_ids(
    tx: &mut dyn StoreTx,
    id: TournamentId,
) -> EngineResult<Vec<TeamId>> {
    Ok(tx
        .participants(id, Some(ParticipantStatus::Approved))
        .await?
        .into_iter()
        .map(|p| p.team_id)
        .collect())
}

/// Schedule generation must not run twice
fn ensure_startable(tournament: &Tournament) -> EngineResult<()> {
    match tournament.status {
        TournamentStatus::Recruiting | TournamentStatus::Upcoming => Ok(()),
        TournamentStatus::Ongoing => Err(EngineError::AlreadyStarted),
        TournamentStatus::Ended { .. } => Err(EngineError::invalid_state(
            "RECRUITING or UPCOMING",
            tournament.status,
        )),
    }
}

fn ensure_ongoing(tournament: &Tournament) -> EngineResult<()> {
    if tournament.status != TournamentStatus::Ongoing {
        return Err(EngineError::invalid_state("ONGOING", tournament.status));
    }
    Ok(())
}

/// Winner implied by the score unless given; a given winner must agree with
/// an unequal score
fn resolve_winner(
    (team_a, team_b): (TeamId, TeamId),
    score: Score,
    winner: Option<TeamId>,
) -> EngineResult<Option<TeamId>> {
    if score.team_a < 0 || score.team_b < 0 {
        return Err(EngineError::InvalidResult(
            "scores cannot be negative".to_string(),
        ));
    }

    let implied = match score.team_a.cmp(&score.team_b) {
        std::cmp::Ordering::Greater => Some(team_a),
        std::cmp::Ordering::Less => Some(team_b),
        std::cmp::Ordering::Equal => None,
    };

    match winner {
        Some(w) if w != team_a && w != team_b => Err(EngineError::InvalidResult(format!(
            "team {w} did not play this match"
        ))),
        Some(w) if implied.is_some_and(|i| i != w) => Err(EngineError::InvalidResult(format!(
            "winner {w} contradicts the score {}-{}",
            score.team_a, score.team_b
        ))),
        Some(w) => Ok(Some(w)),
        None => Ok(implied),
    }
}

impl TournamentManager {
    /// Create a new tournament manager
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create a tournament in RECRUITING status
    ///
    /// Private tournaments get a random invite code.
    ///
    /// # Errors
    ///
    /// * `EngineError::InvalidConfig` - Empty name or invalid group settings
    /// * `EngineError::IndivisiblePlayoffSplit` - Playoff teams not divisible by groups
    /// * `EngineError::UserNotFound` - Unknown manager
    pub async fn create_tournament(
        &self,
        manager_id: UserId,
        new: NewTournament,
    ) -> EngineResult<Tournament> {
        with_timeout(self.config.transaction_timeout, async {
            if new.name.trim().is_empty() {
                return Err(EngineError::InvalidConfig(
                    "tournament name cannot be empty".to_string(),
                ));
            }
            new.format.validate()?;

            let mut tx = self.store.begin().await?;
            if tx.user(manager_id).await?.is_none() {
                return Err(EngineError::UserNotFound(manager_id));
            }

            let invite_code = new.is_private.then(generate_invite_code);
            let tournament = tx.insert_tournament(manager_id, &new, invite_code).await?;
            tx.commit().await?;

            info!(
                "Created {} tournament {} '{}' (manager {})",
                tournament.format, tournament.id, tournament.name, manager_id
            );
            Ok(tournament)
        })
        .await
    }

    /// Update tournament settings
    ///
    /// Group settings are frozen once the schedule exists.
    pub async fn update_settings(
        &self,
        caller: UserId,
        tournament_id: TournamentId,
        settings: TournamentSettings,
    ) -> EngineResult<Tournament> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.store.begin().await?;
            let mut tournament = load_managed(tx.as_mut(), tournament_id, caller).await?;

            let touches_groups = settings.group_count.is_some() || settings.playoff_teams.is_some();
            if touches_groups && !tournament.status.is_pre_start() {
                return Err(EngineError::invalid_state(
                    "RECRUITING or UPCOMING",
                    tournament.status,
                ));
            }

            if let Some(name) = settings.name {
                if name.trim().is_empty() {
                    return Err(EngineError::InvalidConfig(
                        "tournament name cannot be empty".to_string(),
                    ));
                }
                tournament.name = name;
            }
            if let Some(description) = settings.description {
                tournament.description = Some(description);
            }
            if let Some(count) = settings.target_team_count {
                tournament.target_team_count = Some(count);
            }
            if let Some(start) = settings.start_date {
                tournament.start_date = Some(start);
            }
            if let Some(end) = settings.end_date {
                tournament.end_date = Some(end);
            }

            tournament.format = match tournament.format {
                TournamentFormat::Tournament if touches_groups => {
                    return Err(EngineError::InvalidConfig(
                        "single-elimination tournaments have no groups".to_string(),
                    ));
                }
                TournamentFormat::Tournament => TournamentFormat::Tournament,
                TournamentFormat::League { group_count } => {
                    if settings.playoff_teams.is_some() {
                        return Err(EngineError::InvalidConfig(
                            "leagues have no playoff".to_string(),
                        ));
                    }
                    TournamentFormat::League {
                        group_count: settings.group_count.or(group_count),
                    }
                }
                TournamentFormat::Hybrid {
                    group_count,
                    playoff_teams,
                } => TournamentFormat::Hybrid {
                    group_count: settings.group_count.or(group_count),
                    playoff_teams: settings.playoff_teams.unwrap_or(playoff_teams),
                },
            };
            tournament.format.validate()?;

            tx.update_tournament(&tournament).await?;
            tx.commit().await?;

            debug!("Updated settings of tournament {}", tournament.id);
            Ok(tournament)
        })
        .await
    }

    /// Tournament with its approved teams and champion
    pub async fn get_tournament(&self, tournament_id: TournamentId) -> EngineResult<TournamentDetail> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.store.begin().await?;
            let tournament = load(tx.as_mut(), tournament_id).await?;
            let ids = approved_team_ids(tx.as_mut(), tournament_id).await?;
            let teams = tx.teams(&ids).await?;
            let champion = match tournament.status.champion() {
                Some(team_id) => tx.team(team_id).await?,
                None => None,
            };

            Ok(TournamentDetail {
                tournament,
                teams,
                champion,
            })
        })
        .await
    }

    /// One page of tournaments, newest first
    pub async fn list_tournaments(
        &self,
        filter: &TournamentFilter,
    ) -> EngineResult<Vec<TournamentSummary>> {
        with_timeout(self.config.transaction_timeout, async {
            let page = i64::from(filter.page.unwrap_or(1).max(1));
            let limit = self.config.page_size;
            let mut tx = self.store.begin().await?;
            tx.list_tournaments(filter, limit, (page - 1) * limit).await
        })
        .await
    }

    /// Request to join a tournament with a team
    ///
    /// # Errors
    ///
    /// * `EngineError::InvalidState` - Recruitment is closed
    /// * `EngineError::InvalidInviteCode` - Private tournament and the code does not match
    /// * `EngineError::SportMismatch` - Team plays another sport
    /// * `EngineError::AlreadyJoined` - Team already applied
    pub async fn join_tournament(
        &self,
        tournament_id: TournamentId,
        team_id: TeamId,
        invite_code: Option<&str>,
    ) -> EngineResult<Participant> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.store.begin().await?;
            let tournament = load_locked(tx.as_mut(), tournament_id).await?;

            if tournament.status != TournamentStatus::Recruiting {
                return Err(EngineError::invalid_state("RECRUITING", tournament.status));
            }
            if tournament.is_private && tournament.invite_code.as_deref() != invite_code {
                return Err(EngineError::InvalidInviteCode);
            }

            let team = tx
                .team(team_id)
                .await?
                .ok_or(EngineError::TeamNotFound(team_id))?;
            if team.sport != tournament.sport {
                return Err(EngineError::SportMismatch {
                    team: team.sport.to_string(),
                    tournament: tournament.sport.to_string(),
                });
            }
            if tx.participant(tournament_id, team_id).await?.is_some() {
                return Err(EngineError::AlreadyJoined);
            }

            let participant = tx.insert_participant(tournament_id, team_id).await?;
            tx.commit().await?;

            info!("Team {} applied to tournament {}", team_id, tournament_id);
            Ok(participant)
        })
        .await
    }

    /// Stop accepting join requests: RECRUITING → UPCOMING
    pub async fn close_recruitment(
        &self,
        caller: UserId,
        tournament_id: TournamentId,
    ) -> EngineResult<Tournament> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.store.begin().await?;
            let mut tournament = load_managed(tx.as_mut(), tournament_id, caller).await?;

            if tournament.status != TournamentStatus::Recruiting {
                return Err(EngineError::invalid_state("RECRUITING", tournament.status));
            }
            tournament.status = TournamentStatus::Upcoming;
            tx.update_tournament(&tournament).await?;
            tx.commit().await?;

            info!("Tournament {} closed recruitment", tournament_id);
            Ok(tournament)
        })
        .await
    }

    pub async fn approve_participant(
        &self,
        caller: UserId,
        tournament_id: TournamentId,
        team_id: TeamId,
    ) -> EngineResult<Participant> {
        self.decide_participant(caller, tournament_id, team_id, ParticipantStatus::Approved)
            .await
    }

    pub async fn reject_participant(
        &self,
        caller: UserId,
        tournament_id: TournamentId,
        team_id: TeamId,
    ) -> EngineResult<Participant> {
        self.decide_participant(caller, tournament_id, team_id, ParticipantStatus::Rejected)
            .await
    }

    async fn decide_participant(
        &self,
        caller: UserId,
        tournament_id: TournamentId,
        team_id: TeamId,
        decision: ParticipantStatus,
    ) -> EngineResult<Participant> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.store.begin().await?;
            let tournament = load_managed(tx.as_mut(), tournament_id, caller).await?;
            if !tournament.status.is_pre_start() {
                return Err(EngineError::invalid_state(
                    "RECRUITING or UPCOMING",
                    tournament.status,
                ));
            }

            let mut participant = tx.participant(tournament_id, team_id).await?.ok_or(
                EngineError::ParticipantNotFound {
                    tournament_id,
                    team_id,
                },
            )?;
            if participant.status != ParticipantStatus::Pending {
                return Err(EngineError::AlreadyProcessed(
                    participant.status.as_str().to_lowercase(),
                ));
            }

            tx.set_participant_status(tournament_id, team_id, decision)
                .await?;
            tx.commit().await?;
            participant.status = decision;

            info!(
                "Team {} {} for tournament {}",
                team_id,
                decision.as_str().to_lowercase(),
                tournament_id
            );
            Ok(participant)
        })
        .await
    }

    /// Participants with their teams; approved ones unless a status is given
    pub async fn list_participants(
        &self,
        tournament_id: TournamentId,
        status: Option<ParticipantStatus>,
    ) -> EngineResult<Vec<ParticipantDetail>> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.store.begin().await?;
            load(tx.as_mut(), tournament_id).await?;

            let participants = tx
                .participants(
                    tournament_id,
                    Some(status.unwrap_or(ParticipantStatus::Approved)),
                )
                .await?;
            let ids: Vec<TeamId> = participants.iter().map(|p| p.team_id).collect();
            let teams = tx.teams(&ids).await?;

            Ok(participants
                .into_iter()
                .filter_map(|participant| {
                    let team = teams.iter().find(|t| t.id == participant.team_id)?.clone();
                    Some(ParticipantDetail { participant, team })
                })
                .collect())
        })
        .await
    }

    /// Generate the schedule and move the tournament to ONGOING
    ///
    /// Approved teams are shuffled, then scheduled by format: a bracket for
    /// single elimination, a round-robin league otherwise.
    ///
    /// # Errors
    ///
    /// * `EngineError::NotManager` - Caller does not manage the tournament
    /// * `EngineError::AlreadyStarted` - Schedule already generated
    /// * `EngineError::InsufficientTeams` - Fewer than two approved teams, or too few for the groups
    pub async fn start_tournament(
        &self,
        caller: UserId,
        tournament_id: TournamentId,
    ) -> EngineResult<StartOutcome> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.store.begin().await?;
            let mut tournament = load_managed(tx.as_mut(), tournament_id, caller).await?;
            ensure_startable(&tournament)?;

            let mut teams = approved_team_ids(tx.as_mut(), tournament_id).await?;
            if teams.len() < 2 {
                return Err(EngineError::InsufficientTeams {
                    needed: 2,
                    current: teams.len(),
                });
            }
            shuffle_teams(&mut teams);

            let now = self.clock.now();
            let window = DateWindow::effective(
                tournament.start_date,
                tournament.end_date,
                now,
                self.config.default_window(),
            );

            let new_matches = match tournament.format {
                TournamentFormat::Tournament => generate_bracket(
                    &teams,
                    Stage::Tournament,
                    bracket_base(tournament.start_date, now, &self.config),
                    &self.config,
                )?,
                TournamentFormat::League { group_count } => {
                    generate_league_schedule(&teams, group_count, &window, &self.config)?
                }
                TournamentFormat::Hybrid {
                    group_count,
                    playoff_teams,
                } => {
                    tournament.format.validate()?;
                    if playoff_teams as usize > teams.len() {
                        return Err(EngineError::InsufficientTeams {
                            needed: playoff_teams as usize,
                            current: teams.len(),
                        });
                    }
                    let league_window = window.scaled(self.config.hybrid_league_share);
                    generate_league_schedule(&teams, group_count, &league_window, &self.config)?
                }
            };

            let matches = tx.insert_matches(tournament_id, &new_matches).await?;
            tournament.status = TournamentStatus::Ongoing;
            tournament.bracket_generation = Some(BracketGeneration::Random);
            tx.update_tournament(&tournament).await?;
            tx.commit().await?;

            info!(
                "Tournament {} started: {} teams, {} matches",
                tournament_id,
                teams.len(),
                matches.len()
            );
            Ok(StartOutcome {
                tournament,
                matches,
            })
        })
        .await
    }

    /// Start the tournament with hand-made pairings instead of a random draw
    ///
    /// # Errors
    ///
    /// * `EngineError::InvalidBracket` - No real pairing, an unapproved team, or a team used twice
    pub async fn create_manual_bracket(
        &self,
        caller: UserId,
        tournament_id: TournamentId,
        pairings: Vec<ManualPairing>,
    ) -> EngineResult<StartOutcome> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.store.begin().await?;
            let mut tournament = load_managed(tx.as_mut(), tournament_id, caller).await?;
            ensure_startable(&tournament)?;

            if !pairings.iter().any(|p| p.team_b.is_some()) {
                return Err(EngineError::InvalidBracket(
                    "at least one pairing needs two teams".to_string(),
                ));
            }

            let approved: HashSet<TeamId> = approved_team_ids(tx.as_mut(), tournament_id)
                .await?
                .into_iter()
                .collect();
            let mut seen = HashSet::new();
            for team in pairings
                .iter()
                .flat_map(|p| std::iter::once(p.team_a).chain(p.team_b))
            {
                if !approved.contains(&team) {
                    return Err(EngineError::InvalidBracket(format!(
                        "team {team} is not an approved participant"
                    )));
                }
                if !seen.insert(team) {
                    return Err(EngineError::InvalidBracket(format!(
                        "team {team} appears more than once"
                    )));
                }
            }

            let base = bracket_base(tournament.start_date, self.clock.now(), &self.config);
            let interval = self.config.bracket_interval();
            let new_matches: Vec<NewMatch> = pairings
                .into_iter()
                .enumerate()
                .map(|(i, p)| {
                    NewMatch::pairing(
                        Stage::Tournament,
                        p.round_name
                            .unwrap_or_else(|| MANUAL_ROUND_LABEL.to_string()),
                        Some(p.team_a),
                        p.team_b,
                        base + interval * i as i32,
                    )
                })
                .collect();

            let matches = tx.insert_matches(tournament_id, &new_matches).await?;
            tournament.status = TournamentStatus::Ongoing;
            tournament.bracket_generation = Some(BracketGeneration::Manual);
            tx.update_tournament(&tournament).await?;
            tx.commit().await?;

            info!(
                "Tournament {} started with a manual bracket of {} matches",
                tournament_id,
                matches.len()
            );
            Ok(StartOutcome {
                tournament,
                matches,
            })
        })
        .await
    }

    /// Record a match result, settle its predictions and advance the bracket
    ///
    /// The winner is implied by an unequal score when not given. A draw is only
    /// allowed in league matches and refunds every prediction.
    ///
    /// # Errors
    ///
    /// * `EngineError::NotManager` - Caller does not manage the tournament
    /// * `EngineError::MatchAlreadyDone` - The match already has a result
    /// * `EngineError::InvalidResult` - Negative score, foreign or contradicting winner, bracket draw
    pub async fn report_result(
        &self,
        caller: UserId,
        match_id: MatchId,
        team_a_score: i32,
        team_b_score: i32,
        winner: Option<TeamId>,
    ) -> EngineResult<ResultOutcome> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.store.begin().await?;
            let unlocked = tx
                .match_by_id(match_id)
                .await?
                .ok_or(EngineError::MatchNotFound(match_id))?;
            let mut tournament =
                load_managed(tx.as_mut(), unlocked.tournament_id, caller).await?;

            // Re-read under the tournament lock
            let mut m = tx
                .match_by_id(match_id)
                .await?
                .ok_or(EngineError::MatchNotFound(match_id))?;
            if m.is_done() {
                return Err(EngineError::MatchAlreadyDone(match_id));
            }
            ensure_ongoing(&tournament)?;

            let teams = m.both_teams().ok_or_else(|| {
                EngineError::InvalidResult("match has no opponent".to_string())
            })?;
            let score = Score::new(team_a_score, team_b_score);
            let winner = resolve_winner(teams, score, winner)?;
            if winner.is_none() && m.stage == Stage::Tournament {
                return Err(EngineError::InvalidResult(
                    "elimination matches need a winner".to_string(),
                ));
            }

            m.state = MatchState::Done {
                score: Some(score),
                winner,
            };
            tx.update_match_state(m.id, &m.state).await?;

            let settlement = settle_match(tx.as_mut(), m.id, winner).await?;
            let advancement = advance_round(
                tx.as_mut(),
                &mut tournament,
                &m,
                &self.config,
                self.clock.now(),
            )
            .await?;
            tx.commit().await?;

            info!(
                "Match {} of tournament {} finished {}-{}, winner {:?}",
                m.id, m.tournament_id, team_a_score, team_b_score, winner
            );
            Ok(ResultOutcome {
                match_: m,
                settlement,
                advancement,
            })
        })
        .await
    }

    /// Seed the playoff bracket of a hybrid tournament from the league tables
    ///
    /// Takes the top `playoff_teams / groups` of every group, group by group.
    ///
    /// # Errors
    ///
    /// * `EngineError::NotHybrid` - Not a league-then-playoff tournament
    /// * `EngineError::LeaguePhaseIncomplete` - League matches still pending
    /// * `EngineError::PlayoffAlreadyStarted` - Playoff matches exist
    /// * `EngineError::IndivisiblePlayoffSplit` - Playoff teams not divisible by groups
    pub async fn start_playoff(
        &self,
        caller: UserId,
        tournament_id: TournamentId,
    ) -> EngineResult<PlayoffOutcome> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.store.begin().await?;
            let tournament = load_managed(tx.as_mut(), tournament_id, caller).await?;
            let TournamentFormat::Hybrid { playoff_teams, .. } = tournament.format else {
                return Err(EngineError::NotHybrid);
            };
            ensure_ongoing(&tournament)?;

            if !tx
                .matches(tournament_id, Some(Stage::Tournament))
                .await?
                .is_empty()
            {
                return Err(EngineError::PlayoffAlreadyStarted);
            }

            let league = tx.matches(tournament_id, Some(Stage::League)).await?;
            let pending = league.iter().filter(|m| !m.is_done()).count();
            if league.is_empty() || pending > 0 {
                return Err(EngineError::LeaguePhaseIncomplete { pending });
            }

            let roster = approved_team_ids(tx.as_mut(), tournament_id).await?;
            let tables = league_tables(&league, &roster);
            let groups = tables.len() as u32;
            if groups == 0 || playoff_teams % groups != 0 {
                return Err(EngineError::IndivisiblePlayoffSplit {
                    playoff_teams,
                    group_count: groups,
                });
            }

            let qualifiers = top_qualifiers(&tables, (playoff_teams / groups) as usize);
            let last_league_match = league.iter().map(|m| m.scheduled_at).max();
            let base = next_round_base(last_league_match, self.clock.now(), &self.config);
            let new_matches = generate_bracket(&qualifiers, Stage::Tournament, base, &self.config)?;
            let matches = tx.insert_matches(tournament_id, &new_matches).await?;
            tx.commit().await?;

            info!(
                "Tournament {} playoff started with {} qualifiers from {} group(s)",
                tournament_id,
                qualifiers.len(),
                groups
            );
            Ok(PlayoffOutcome {
                qualifiers,
                matches,
            })
        })
        .await
    }

    /// End a league once every match has a result
    ///
    /// A single-table league crowns the table leader; grouped leagues end
    /// without a champion.
    pub async fn finish_league(
        &self,
        caller: UserId,
        tournament_id: TournamentId,
    ) -> EngineResult<Tournament> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.store.begin().await?;
            let mut tournament = load_managed(tx.as_mut(), tournament_id, caller).await?;
            if !matches!(tournament.format, TournamentFormat::League { .. }) {
                return Err(EngineError::NotLeague);
            }
            ensure_ongoing(&tournament)?;

            let league = tx.matches(tournament_id, Some(Stage::League)).await?;
            let pending = league.iter().filter(|m| !m.is_done()).count();
            if pending > 0 {
                return Err(EngineError::LeaguePhaseIncomplete { pending });
            }

            let roster = approved_team_ids(tx.as_mut(), tournament_id).await?;
            let tables = league_tables(&league, &roster);
            let champion = match tables.as_slice() {
                [single] => single.rows.first().map(|row| row.team_id),
                _ => None,
            };

            tournament.status = TournamentStatus::Ended { champion };
            tx.update_tournament(&tournament).await?;
            tx.commit().await?;

            info!(
                "League {} finished, champion {:?}",
                tournament_id, champion
            );
            Ok(tournament)
        })
        .await
    }

    /// Ranked league tables per group
    pub async fn get_standings(&self, tournament_id: TournamentId) -> EngineResult<LeagueStandings> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.store.begin().await?;
            load(tx.as_mut(), tournament_id).await?;

            let league = tx.matches(tournament_id, Some(Stage::League)).await?;
            let roster = approved_team_ids(tx.as_mut(), tournament_id).await?;
            let groups = league_tables(&league, &roster);

            let ids: Vec<TeamId> = groups
                .iter()
                .flat_map(|g| g.rows.iter().map(|row| row.team_id))
                .collect();
            let teams = tx.teams(&ids).await?;

            Ok(LeagueStandings { groups, teams })
        })
        .await
    }

    /// Elimination rounds grouped by label, in creation order
    pub async fn get_bracket(&self, tournament_id: TournamentId) -> EngineResult<Vec<BracketRound>> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.store.begin().await?;
            load(tx.as_mut(), tournament_id).await?;

            let mut rounds: Vec<BracketRound> = Vec::new();
            for m in tx.matches(tournament_id, Some(Stage::Tournament)).await? {
                match rounds.iter_mut().find(|r| r.round_name == m.round_name) {
                    Some(round) => round.matches.push(m),
                    None => rounds.push(BracketRound {
                        round_name: m.round_name.clone(),
                        matches: vec![m],
                    }),
                }
            }
            Ok(rounds)
        })
        .await
    }

    /// League matches ordered by group label, then creation
    pub async fn get_league_matches(&self, tournament_id: TournamentId) -> EngineResult<Vec<Match>> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.store.begin().await?;
            load(tx.as_mut(), tournament_id).await?;

            let mut matches = tx.matches(tournament_id, Some(Stage::League)).await?;
            matches.sort_by(|a, b| a.round_name.cmp(&b.round_name).then(a.id.cmp(&b.id)));
            Ok(matches)
        })
        .await
    }

    /// Match with its teams and betting pool
    pub async fn get_match(
        &self,
        match_id: MatchId,
        viewer: Option<UserId>,
    ) -> EngineResult<MatchDetail> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.store.begin().await?;
            let m = tx
                .match_by_id(match_id)
                .await?
                .ok_or(EngineError::MatchNotFound(match_id))?;

            let team_a = match m.team_a {
                Some(id) => tx.team(id).await?,
                None => None,
            };
            let team_b = match m.team_b {
                Some(id) => tx.team(id).await?,
                None => None,
            };
            let predictions = tx.predictions_for_match(match_id, None).await?;
            let viewer_points = match viewer {
                Some(user_id) => tx.user(user_id).await?.map(|u| u.points),
                None => None,
            };

            Ok(MatchDetail {
                pool: PoolSnapshot::from_predictions(&m, &predictions),
                is_betting_open: is_betting_open(&m, self.clock.now(), &self.config),
                match_: m,
                team_a,
                team_b,
                viewer_points,
            })
        })
        .await
    }
}
