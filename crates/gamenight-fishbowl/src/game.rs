//! The Fishbowl game session.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use gamenight_protocol::{Event, JoinGameRequest, OutgoingMessage, PlayerId, decode_body};
use gamenight_room::{GameSession, GameState, RoomError, SessionContext, SessionCore};
use gamenight_timer::TimerTicket;
use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::Value;
use tracing::{debug, info};

use crate::api::{
    ChangeCardRequest, ChangeSettingsRequest, ChangeType, CreatedGameEvent, FishbowlAction,
    MovePlayerRequest, RemoveTeamRequest, Settings, SubmitWordsRequest, UpdatedGameEvent,
    UpdatedRoomEvent,
};
use crate::convert::{clean_words, teams_view};

/// Extra seconds on a fresh turn's clock, so the player can read the
/// first card before time starts to matter.
pub const TURN_GRACE_SECS: u64 = 2;

/// Teams a new game starts with.
const INITIAL_TEAMS: usize = 2;

/// Teams `0` and `1` can never be removed.
const MIN_REMOVABLE_TEAM: usize = 2;

/// A game of Fishbowl.
#[derive(Debug)]
pub struct Fishbowl {
    core: SessionCore,
    settings: Settings,

    teams: Vec<Vec<PlayerId>>,
    words: HashMap<PlayerId, Vec<String>>,

    /// Front is the card in play.
    cards_in_round: VecDeque<String>,
    total_num_cards: usize,
    team_scores_by_round: Vec<Vec<u32>>,
    current_round: usize,
    /// Index into each team of the player whose turn is next.
    current_players: Vec<usize>,
    currently_playing_team: usize,
    winning_team: Option<usize>,

    last_card_guessed: String,
    num_cards_guessed_in_turn: u32,
    skips_in_turn: u32,
    /// Set when the turn starts, cleared on the first card action.
    turn_just_started: bool,
    /// The turn was cut short by the end of a round and resumes with the
    /// time it had left.
    turn_continued: bool,
    turn_started_at_ms: u64,
    /// Seconds on the clock of the current (or next continued) turn.
    timer_length: u64,
}

impl Default for Fishbowl {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl Fishbowl {
    pub fn new(settings: Settings) -> Self {
        Self {
            core: SessionCore::new(),
            settings,
            teams: vec![Vec::new(); INITIAL_TEAMS],
            words: HashMap::new(),
            cards_in_round: VecDeque::new(),
            total_num_cards: 0,
            team_scores_by_round: Vec::new(),
            current_round: 0,
            current_players: Vec::new(),
            currently_playing_team: 0,
            winning_team: None,
            last_card_guessed: String::new(),
            num_cards_guessed_in_turn: 0,
            skips_in_turn: 0,
            turn_just_started: false,
            turn_continued: false,
            turn_started_at_ms: 0,
            timer_length: 0,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn teams(&self) -> &[Vec<PlayerId>] {
        &self.teams
    }

    pub fn words_of(&self, player: PlayerId) -> &[String] {
        self.words.get(&player).map_or(&[], Vec::as_slice)
    }

    pub fn current_round(&self) -> usize {
        self.current_round
    }

    pub fn currently_playing_team(&self) -> usize {
        self.currently_playing_team
    }

    pub fn cards_left_in_round(&self) -> usize {
        self.cards_in_round.len()
    }

    pub fn current_card(&self) -> Option<&str> {
        self.cards_in_round.front().map(String::as_str)
    }

    pub fn scores_by_round(&self) -> &[Vec<u32>] {
        &self.team_scores_by_round
    }

    pub fn winning_team(&self) -> Option<usize> {
        self.winning_team
    }

    /// Seconds on the clock of the current or next continued turn.
    pub fn timer_length(&self) -> u64 {
        self.timer_length
    }

    /// The player whose turn it is, once the game has started.
    pub fn current_player(&self) -> Option<PlayerId> {
        let team = self.teams.get(self.currently_playing_team)?;
        let idx = *self.current_players.get(self.currently_playing_team)?;
        team.get(idx).copied()
    }

    // -----------------------------------------------------------------------
    // Checks
    // -----------------------------------------------------------------------

    fn require_owner(ctx: &SessionContext<'_>, player: PlayerId) -> Result<(), RoomError> {
        if ctx.player(player).is_some_and(|p| p.is_room_owner()) {
            Ok(())
        } else {
            Err(RoomError::NotOwner)
        }
    }

    fn require_waiting_room(&self) -> Result<(), RoomError> {
        match self.core.state() {
            GameState::WaitingRoom => Ok(()),
            other => Err(RoomError::WrongState(other)),
        }
    }

    fn require_current_player(&self, player: PlayerId) -> Result<(), RoomError> {
        if self.current_player() == Some(player) {
            Ok(())
        } else {
            Err(RoomError::NotCurrentPlayer)
        }
    }

    // -----------------------------------------------------------------------
    // Waiting-room actions
    // -----------------------------------------------------------------------

    fn add_team(&mut self, ctx: &mut SessionContext<'_>, player: PlayerId) -> Result<(), RoomError> {
        Self::require_owner(ctx, player)?;
        self.require_waiting_room()?;
        self.teams.push(Vec::new());
        debug!(room_code = %ctx.room_code(), teams = self.teams.len(), "team added");
        self.send_updates(ctx, None);
        Ok(())
    }

    fn remove_team(
        &mut self,
        ctx: &mut SessionContext<'_>,
        player: PlayerId,
        req: RemoveTeamRequest,
    ) -> Result<(), RoomError> {
        Self::require_owner(ctx, player)?;
        self.require_waiting_room()?;
        if req.team < MIN_REMOVABLE_TEAM || req.team >= self.teams.len() {
            return Err(RoomError::rejected("That is not a valid team to remove."));
        }
        let removed = self.teams.remove(req.team);
        self.teams[req.team - 1].extend(removed);
        debug!(room_code = %ctx.room_code(), team = req.team, "team removed");
        self.send_updates(ctx, None);
        Ok(())
    }

    fn move_player(
        &mut self,
        ctx: &mut SessionContext<'_>,
        player: PlayerId,
        req: MovePlayerRequest,
    ) -> Result<(), RoomError> {
        Self::require_owner(ctx, player)?;
        self.require_waiting_room()?;
        if req.from_team >= self.teams.len() || req.to_team >= self.teams.len() {
            return Err(RoomError::rejected("The team indexes are invalid."));
        }
        let target = ctx
            .find_player(&req.player_name)
            .ok_or_else(|| RoomError::rejected("That player is not in the game."))?;
        if self.remove_from_teams(target).is_none() {
            return Err(RoomError::rejected("That player is not in the game."));
        }
        self.teams[req.to_team].push(target);
        self.send_updates(ctx, None);
        Ok(())
    }

    fn change_settings(
        &mut self,
        ctx: &mut SessionContext<'_>,
        player: PlayerId,
        req: ChangeSettingsRequest,
    ) -> Result<(), RoomError> {
        Self::require_owner(ctx, player)?;
        self.require_waiting_room()?;
        if !req.settings.is_playable() {
            return Err(RoomError::rejected("Those settings are not valid."));
        }
        self.settings = req.settings;
        info!(room_code = %ctx.room_code(), settings = ?self.settings, "settings changed");
        self.send_updates(ctx, None);
        Ok(())
    }

    fn submit_words(
        &mut self,
        ctx: &mut SessionContext<'_>,
        player: PlayerId,
        req: SubmitWordsRequest,
    ) -> Result<(), RoomError> {
        self.require_waiting_room()?;
        let words = clean_words(req.words);
        if words.len() < self.settings.num_words_required {
            return Err(RoomError::rejected(format!(
                "At least {} words are required.",
                self.settings.num_words_required
            )));
        }
        self.words.insert(player, words);
        self.send_updates(ctx, None);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Turn actions
    // -----------------------------------------------------------------------

    fn start_turn(&mut self, ctx: &mut SessionContext<'_>, player: PlayerId) -> Result<(), RoomError> {
        self.require_current_player(player)?;
        self.core.transition(GameState::TurnActive)?;

        self.turn_just_started = true;
        self.num_cards_guessed_in_turn = 0;
        self.skips_in_turn = 0;
        self.last_card_guessed.clear();
        if !self.turn_continued {
            self.timer_length = self.settings.timer_length + TURN_GRACE_SECS;
        }
        self.turn_started_at_ms = unix_millis();
        self.core
            .start_timer(ctx, Duration::from_secs(self.timer_length));

        info!(room_code = %ctx.room_code(), player_id = %player, secs = self.timer_length, "turn started");
        self.send_updates(ctx, None);
        Ok(())
    }

    fn change_card(
        &mut self,
        ctx: &mut SessionContext<'_>,
        player: PlayerId,
        req: ChangeCardRequest,
    ) -> Result<(), RoomError> {
        self.require_current_player(player)?;
        if self.core.state() != GameState::TurnActive {
            debug!(room_code = %ctx.room_code(), "card change after the turn ended ignored");
            return Ok(());
        }

        match req.change_type {
            ChangeType::Correct => self.mark_correct(ctx)?,
            ChangeType::Skip => {
                if self.skips_in_turn >= self.settings.max_skips_per_turn {
                    return Err(RoomError::rejected(
                        "You cannot skip any more cards this turn.",
                    ));
                }
                self.skips_in_turn += 1;
                if self.cards_in_round.len() > 1 {
                    self.cards_in_round.rotate_left(1);
                }
            }
        }
        self.turn_just_started = false;
        self.send_updates(ctx, None);
        Ok(())
    }

    fn mark_correct(&mut self, ctx: &mut SessionContext<'_>) -> Result<(), RoomError> {
        let Some(card) = self.cards_in_round.pop_front() else {
            return Ok(());
        };
        if let Some(score) = self
            .team_scores_by_round
            .get_mut(self.current_round)
            .and_then(|round| round.get_mut(self.currently_playing_team))
        {
            *score += 1;
        }
        self.num_cards_guessed_in_turn += 1;
        self.last_card_guessed = card;

        let standings = self.standings();
        if standings.decided {
            self.finish(ctx, standings.leader)?;
        } else if self.cards_in_round.is_empty() {
            self.end_round(ctx, standings.leader)?;
        }
        Ok(())
    }

    /// The deck ran out mid-turn: move to the next round, or end the game
    /// after the last one.
    fn end_round(&mut self, ctx: &mut SessionContext<'_>, leader: usize) -> Result<(), RoomError> {
        let remaining = self.core.stop_timer().unwrap_or_default();
        self.timer_length = ceil_secs(remaining);
        self.turn_continued = self.timer_length > 0;

        self.current_round += 1;
        info!(room_code = %ctx.room_code(), round = self.current_round, "round finished");
        if self.current_round < self.settings.rounds.len() {
            self.core.transition(GameState::TurnStart)?;
            self.deal_round();
            if !self.turn_continued {
                self.advance_turn();
            }
            Ok(())
        } else {
            self.finish(ctx, leader)
        }
    }

    fn finish(&mut self, ctx: &mut SessionContext<'_>, winner: usize) -> Result<(), RoomError> {
        self.core.transition(GameState::GameOver)?;
        self.core.stop_timer();
        self.turn_continued = false;
        self.winning_team = Some(winner);
        info!(room_code = %ctx.room_code(), winning_team = winner, "game over");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Deck and turn order
    // -----------------------------------------------------------------------

    /// Rebuilds the deck from every player's words and shuffles it.
    fn deal_round(&mut self) {
        self.cards_in_round = self
            .teams
            .iter()
            .flatten()
            .filter_map(|id| self.words.get(id))
            .flatten()
            .cloned()
            .collect();
        self.total_num_cards = self.cards_in_round.len();
        self.shuffle();
    }

    fn shuffle(&mut self) {
        self.cards_in_round
            .make_contiguous()
            .shuffle(&mut rand::rng());
    }

    /// Next player of the team that just played, then the next team with
    /// anyone on it.
    fn advance_turn(&mut self) {
        let team = self.currently_playing_team;
        if let (Some(idx), Some(members)) =
            (self.current_players.get_mut(team), self.teams.get(team))
        {
            if !members.is_empty() {
                *idx = (*idx + 1) % members.len();
            }
        }
        self.currently_playing_team = self.next_non_empty_team(team);
    }

    fn next_non_empty_team(&self, after: usize) -> usize {
        let n = self.teams.len();
        if n == 0 {
            return after;
        }
        (1..=n)
            .map(|step| (after + step) % n)
            .find(|t| !self.teams[*t].is_empty())
            .unwrap_or(after)
    }

    /// Keeps turn-order indexes valid after the teams changed.
    fn repair_turn_order(&mut self) {
        self.current_players.resize(self.teams.len(), 0);
        for (idx, team) in self.current_players.iter_mut().zip(&self.teams) {
            if *idx >= team.len() {
                *idx = 0;
            }
        }
        let playing = self.currently_playing_team;
        if self.teams.get(playing).is_none_or(Vec::is_empty) {
            self.currently_playing_team = self.next_non_empty_team(playing);
        }
    }

    /// Returns the `(team, position)` the player was taken from.
    fn remove_from_teams(&mut self, player: PlayerId) -> Option<(usize, usize)> {
        for (t, team) in self.teams.iter_mut().enumerate() {
            if let Some(pos) = team.iter().position(|p| *p == player) {
                team.remove(pos);
                return Some((t, pos));
            }
        }
        None
    }

    /// Takes `player` off their team without handing the turn to someone
    /// else: members behind them shift down one seat, and so does the
    /// team's turn index.
    fn vacate(&mut self, player: PlayerId) {
        let Some((team, pos)) = self.remove_from_teams(player) else {
            return;
        };
        if let Some(idx) = self.current_players.get_mut(team) {
            if pos < *idx {
                *idx -= 1;
            }
        }
        self.repair_turn_order();
    }

    fn reset_scores(&mut self) {
        self.team_scores_by_round = vec![vec![0; self.teams.len()]; self.settings.rounds.len()];
    }

    fn standings(&self) -> Standings {
        let mut totals = vec![0u32; self.teams.len()];
        for round in &self.team_scores_by_round {
            for (team, score) in round.iter().enumerate() {
                if let Some(total) = totals.get_mut(team) {
                    *total += score;
                }
            }
        }
        Standings::from_totals(
            &totals,
            self.total_num_cards * self.settings.rounds.len(),
        )
    }

    // -----------------------------------------------------------------------
    // Updates
    // -----------------------------------------------------------------------

    /// Tells the room what changed.
    ///
    /// With `rejoined` set, only that player gets a full snapshot.
    fn send_updates(&self, ctx: &mut SessionContext<'_>, rejoined: Option<PlayerId>) {
        let teams = teams_view(ctx, &self.teams, &self.words, self.settings.num_words_required);

        if self.core.state() == GameState::WaitingRoom {
            let msg = OutgoingMessage::new(
                Event::UpdatedRoom,
                UpdatedRoomEvent {
                    game_type: ctx.game_type().to_owned(),
                    teams,
                    settings: self.settings.clone(),
                },
            );
            match rejoined {
                Some(player) => ctx.send_to(player, &msg),
                None => ctx.send_room(&msg),
            }
            return;
        }

        let turn_active = self.core.state() == GameState::TurnActive;
        let show_clock = turn_active && (self.turn_just_started || rejoined.is_some());
        let mut others = UpdatedGameEvent {
            game_type: None,
            teams: None,
            settings: None,
            state: self.core.state(),
            current_server_time: show_clock.then_some(self.turn_started_at_ms),
            timer_length: show_clock.then_some(self.timer_length),
            last_card_guessed: self.last_card_guessed.clone(),
            current_card: None,
            total_num_cards: self.total_num_cards,
            num_cards_left_in_round: self.cards_in_round.len(),
            num_cards_guessed_in_turn: self.num_cards_guessed_in_turn,
            team_scores_by_round: self.team_scores_by_round.clone(),
            winning_team: self.winning_team,
            current_round: self.current_round,
            current_players: self.current_players.clone(),
            currently_playing_team: self.currently_playing_team,
        };
        if rejoined.is_some() {
            others.game_type = Some(ctx.game_type().to_owned());
            others.teams = Some(teams);
            others.settings = Some(self.settings.clone());
        }

        let current = self.current_player();
        let mut theirs = others.clone();
        if turn_active {
            theirs.current_card = self.current_card().map(str::to_owned);
        }
        let for_current = OutgoingMessage::new(Event::UpdatedGame, theirs);
        let for_others = OutgoingMessage::new(Event::UpdatedGame, others);

        match rejoined {
            Some(player) if Some(player) == current => ctx.send_to(player, &for_current),
            Some(player) => ctx.send_to(player, &for_others),
            None => ctx.send_split(current, &for_current, &for_others),
        }
    }
}

// ---------------------------------------------------------------------------
// GameSession
// ---------------------------------------------------------------------------

impl GameSession for Fishbowl {
    fn state(&self) -> GameState {
        self.core.state()
    }

    fn add_player(&mut self, ctx: &mut SessionContext<'_>, player: PlayerId) -> Result<(), RoomError> {
        self.words.insert(player, Vec::new());
        self.teams[0].push(player);

        let msg = OutgoingMessage::new(
            Event::CreatedGame,
            CreatedGameEvent {
                room_code: ctx.room_code().clone(),
                game_type: ctx.game_type().to_owned(),
                teams: teams_view(ctx, &self.teams, &self.words, self.settings.num_words_required),
            },
        );
        ctx.send_to(player, &msg);
        Ok(())
    }

    fn join(
        &mut self,
        ctx: &mut SessionContext<'_>,
        player: PlayerId,
        is_new_player: bool,
        req: &JoinGameRequest,
    ) -> Result<(), RoomError> {
        if !is_new_player {
            debug!(room_code = %ctx.room_code(), player_id = %player, "sending rejoin snapshot");
            self.send_updates(ctx, Some(player));
            return Ok(());
        }
        if self.core.state() != GameState::WaitingRoom {
            return Err(RoomError::AlreadyStarted);
        }

        ctx.admit(player, &req.name, false)?;
        self.words.insert(player, Vec::new());
        self.teams[0].push(player);
        self.send_updates(ctx, None);
        Ok(())
    }

    fn start(&mut self, ctx: &mut SessionContext<'_>, _player: PlayerId) -> Result<(), RoomError> {
        self.core.check_transition(GameState::TurnStart)?;
        let non_empty: Vec<usize> = (0..self.teams.len())
            .filter(|t| !self.teams[*t].is_empty())
            .collect();
        if non_empty.is_empty() {
            return Err(RoomError::rejected("There are no players on any team."));
        }
        self.core.transition(GameState::TurnStart)?;

        let required = self.settings.num_words_required;
        for words in self.words.values_mut() {
            words.truncate(required);
        }
        self.deal_round();
        self.reset_scores();

        let mut rng = rand::rng();
        self.current_round = 0;
        self.current_players = self
            .teams
            .iter()
            .map(|team| if team.is_empty() { 0 } else { rng.random_range(0..team.len()) })
            .collect();
        self.currently_playing_team = non_empty[rng.random_range(0..non_empty.len())];
        self.winning_team = None;
        self.turn_continued = false;
        self.turn_just_started = false;
        self.num_cards_guessed_in_turn = 0;
        self.last_card_guessed.clear();

        info!(
            room_code = %ctx.room_code(),
            cards = self.total_num_cards,
            teams = self.teams.len(),
            "game started"
        );
        self.send_updates(ctx, None);
        Ok(())
    }

    fn rematch(&mut self, ctx: &mut SessionContext<'_>, _player: PlayerId) -> Result<(), RoomError> {
        self.core.transition(GameState::WaitingRoom)?;
        self.reset_scores();
        self.last_card_guessed.clear();
        self.winning_team = None;
        self.cards_in_round.clear();
        self.total_num_cards = 0;
        for words in self.words.values_mut() {
            words.clear();
        }
        info!(room_code = %ctx.room_code(), "rematch");
        self.send_updates(ctx, None);
        Ok(())
    }

    fn kick(
        &mut self,
        ctx: &mut SessionContext<'_>,
        player: PlayerId,
        player_name: &str,
    ) -> Result<(), RoomError> {
        self.vacate(player);
        self.words.remove(&player);
        info!(room_code = %ctx.room_code(), player_name, "player kicked");
        self.send_updates(ctx, None);
        Ok(())
    }

    fn handle_action(
        &mut self,
        ctx: &mut SessionContext<'_>,
        player: PlayerId,
        action: &str,
        body: &Value,
    ) -> Result<(), RoomError> {
        let Some(action) = FishbowlAction::lookup(action) else {
            return Err(RoomError::UnknownAction(action.to_owned()));
        };
        debug!(room_code = %ctx.room_code(), player_id = %player, %action, "fishbowl action");

        match action {
            FishbowlAction::AddTeam => self.add_team(ctx, player),
            FishbowlAction::RemoveTeam => self.remove_team(ctx, player, decode_body(body)?),
            FishbowlAction::MovePlayer => self.move_player(ctx, player, decode_body(body)?),
            FishbowlAction::ChangeSettings => {
                self.change_settings(ctx, player, decode_body(body)?)
            }
            FishbowlAction::SubmitWords => self.submit_words(ctx, player, decode_body(body)?),
            FishbowlAction::StartTurn => self.start_turn(ctx, player),
            FishbowlAction::ChangeCard => self.change_card(ctx, player, decode_body(body)?),
        }
    }

    fn turn_expired(&mut self, ctx: &mut SessionContext<'_>, ticket: TimerTicket) {
        if !self.core.expire_turn(ticket) {
            return;
        }
        self.turn_continued = false;
        self.turn_just_started = false;
        self.advance_turn();
        self.shuffle();
        info!(room_code = %ctx.room_code(), team = self.currently_playing_team, "turn timed out");
        self.send_updates(ctx, None);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Who is ahead, and whether anyone can still catch them.
#[derive(Debug, PartialEq, Eq)]
struct Standings {
    leader: usize,
    decided: bool,
}

impl Standings {
    /// `max_total` is every card of every round: the score still up for
    /// grabs is whatever nobody has scored yet.
    fn from_totals(totals: &[u32], max_total: usize) -> Self {
        let leader = totals
            .iter()
            .enumerate()
            .fold(0, |best, (team, total)| {
                if Some(total) > totals.get(best) { team } else { best }
            });
        let leading = totals.get(leader).copied().unwrap_or(0) as usize;
        let second = totals
            .iter()
            .enumerate()
            .filter(|(team, _)| *team != leader)
            .map(|(_, total)| *total as usize)
            .max()
            .unwrap_or(0);
        let achieved: usize = totals.iter().map(|t| *t as usize).sum();
        let remaining = max_total.saturating_sub(achieved);
        Self {
            leader,
            decided: remaining + second < leading,
        }
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}
