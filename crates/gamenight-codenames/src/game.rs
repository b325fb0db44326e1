//! The Codenames game session.

use std::collections::HashSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use gamenight_protocol::{Event, JoinGameRequest, OutgoingMessage, PlayerId, decode_body};
use gamenight_room::{GameSession, GameState, RoomError, SessionContext, SessionCore};
use gamenight_timer::TimerTicket;
use serde_json::Value;
use tracing::{debug, info};

use crate::api::{
    CardOwner, CardView, ChangeSettingsRequest, CodenamesAction, CreatedGameEvent, EndTurnRequest,
    MovePlayerRequest, PlayerView, Role, Settings, StartTurnRequest, TeamView, UpdatedGameEvent,
    UpdatedRoomEvent,
};
use crate::board::Board;

/// Codenames is always two teams.
pub const NUM_TEAMS: usize = 2;

/// Seats in the order new players fill them.
const SEATING_ORDER: [(usize, Role); 4] = [
    (0, Role::Spymaster),
    (0, Role::Guesser),
    (1, Role::Spymaster),
    (1, Role::Guesser),
];

/// One team's two seats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Seats {
    pub spymaster: Option<PlayerId>,
    pub guesser: Option<PlayerId>,
}

impl Seats {
    fn get(&self, role: Role) -> Option<PlayerId> {
        match role {
            Role::Spymaster => self.spymaster,
            Role::Guesser => self.guesser,
        }
    }

    fn slot(&mut self, role: Role) -> &mut Option<PlayerId> {
        match role {
            Role::Spymaster => &mut self.spymaster,
            Role::Guesser => &mut self.guesser,
        }
    }
}

/// A game of Codenames.
#[derive(Debug)]
pub struct Codenames {
    core: SessionCore,
    settings: Settings,

    board: Board,
    guessed: Vec<bool>,
    teams: [Seats; NUM_TEAMS],

    currently_playing_team: usize,
    /// The running clue's count, set by `start-turn`.
    num_cards: Option<usize>,
    last_guesses: Vec<String>,
    winning_team: Option<usize>,

    /// Set when the turn starts, cleared once the room has been told.
    turn_just_started: bool,
    turn_started_at_ms: u64,
}

impl Default for Codenames {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl Codenames {
    pub fn new(settings: Settings) -> Self {
        Self::with_board(settings, Board::deal(&mut rand::rng()))
    }

    /// A session playing on a board dealt elsewhere.
    pub fn with_board(settings: Settings, board: Board) -> Self {
        Self {
            core: SessionCore::new(),
            settings,
            guessed: vec![false; board.len()],
            board,
            teams: [Seats::default(); NUM_TEAMS],
            currently_playing_team: 0,
            num_cards: None,
            last_guesses: Vec::new(),
            winning_team: None,
            turn_just_started: false,
            turn_started_at_ms: 0,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn teams(&self) -> &[Seats; NUM_TEAMS] {
        &self.teams
    }

    pub fn is_guessed(&self, idx: usize) -> bool {
        self.guessed.get(idx).copied().unwrap_or(false)
    }

    pub fn currently_playing_team(&self) -> usize {
        self.currently_playing_team
    }

    pub fn winning_team(&self) -> Option<usize> {
        self.winning_team
    }

    pub fn num_cards(&self) -> Option<usize> {
        self.num_cards
    }

    /// Unguessed agents of `team`.
    pub fn cards_left(&self, team: usize) -> usize {
        self.board
            .team_cards(team)
            .filter(|idx| !self.is_guessed(*idx))
            .count()
    }

    pub fn current_spymaster(&self) -> Option<PlayerId> {
        self.teams[self.currently_playing_team].spymaster
    }

    pub fn current_guesser(&self) -> Option<PlayerId> {
        self.teams[self.currently_playing_team].guesser
    }

    fn seat_of(&self, player: PlayerId) -> Option<(usize, Role)> {
        SEATING_ORDER
            .into_iter()
            .find(|(team, role)| self.teams[*team].get(*role) == Some(player))
    }

    fn is_spymaster(&self, player: PlayerId) -> bool {
        self.seat_of(player)
            .is_some_and(|(_, role)| role == Role::Spymaster)
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

    fn require_current(&self, player: PlayerId, role: Role) -> Result<(), RoomError> {
        if self.teams[self.currently_playing_team].get(role) == Some(player) {
            Ok(())
        } else {
            Err(RoomError::rejected(format!("You are not the current {role}.")))
        }
    }

    // -----------------------------------------------------------------------
    // Owner actions
    // -----------------------------------------------------------------------

    /// Allowed in every state: after a kick mid-game this is how the
    /// owner fills the empty seat.
    fn move_player(
        &mut self,
        ctx: &mut SessionContext<'_>,
        player: PlayerId,
        req: MovePlayerRequest,
    ) -> Result<(), RoomError> {
        Self::require_owner(ctx, player)?;
        if req.to_team >= NUM_TEAMS {
            return Err(RoomError::rejected("The team indexes are invalid."));
        }
        let target = ctx
            .find_player(&req.player_name)
            .ok_or_else(|| RoomError::rejected("That player is not in the game."))?;
        let (from_team, from_role) = self
            .seat_of(target)
            .ok_or_else(|| RoomError::rejected("That player is not in the game."))?;

        let role = req.role();
        let displaced = self.teams[req.to_team].get(role);
        *self.teams[from_team].slot(from_role) = displaced;
        *self.teams[req.to_team].slot(role) = Some(target);

        debug!(room_code = %ctx.room_code(), player_id = %target, team = req.to_team, %role, "player moved");
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

    // -----------------------------------------------------------------------
    // Turn actions
    // -----------------------------------------------------------------------

    /// The spymaster gives a clue for `num_cards` cards.
    fn start_turn(
        &mut self,
        ctx: &mut SessionContext<'_>,
        player: PlayerId,
        req: StartTurnRequest,
    ) -> Result<(), RoomError> {
        self.require_current(player, Role::Spymaster)?;
        self.core.check_transition(GameState::TurnActive)?;
        let left = self.cards_left(self.currently_playing_team);
        if req.num_cards == 0 || req.num_cards > left {
            return Err(RoomError::rejected(format!(
                "The clue must be for between 1 and {left} cards."
            )));
        }
        self.core.transition(GameState::TurnActive)?;

        self.num_cards = Some(req.num_cards);
        self.turn_just_started = true;
        self.turn_started_at_ms = unix_millis();
        if self.settings.use_timer {
            self.core
                .start_timer(ctx, Duration::from_secs(self.settings.timer_length));
        }

        info!(
            room_code = %ctx.room_code(),
            team = self.currently_playing_team,
            num_cards = req.num_cards,
            "clue given"
        );
        self.send_updates(ctx, None);
        self.turn_just_started = false;
        Ok(())
    }

    /// The guesser submits their picks, which ends the turn.
    ///
    /// Every pick is validated before any card is revealed. Picks are then
    /// revealed in order until one misses: a neutral card or the other
    /// team's agent stops the rest, and the assassin ends the game.
    fn end_turn(
        &mut self,
        ctx: &mut SessionContext<'_>,
        player: PlayerId,
        req: EndTurnRequest,
    ) -> Result<(), RoomError> {
        self.require_current(player, Role::Guesser)?;
        self.core.check_transition(GameState::TurnStart)?;

        let allowed = self.num_cards.unwrap_or(0);
        if req.cards.len() > allowed {
            return Err(RoomError::rejected("You cannot make that many guesses."));
        }
        let mut picks = Vec::with_capacity(req.cards.len());
        let mut seen = HashSet::new();
        for word in &req.cards {
            let idx = self
                .board
                .position(word)
                .ok_or_else(|| RoomError::rejected(format!("\"{}\" is not on the board.", word.trim())))?;
            if self.is_guessed(idx) || !seen.insert(idx) {
                let word = self.board.word(idx).unwrap_or_default();
                return Err(RoomError::rejected(format!(
                    "Card \"{word}\" has already been guessed."
                )));
            }
            picks.push(idx);
        }

        let team = self.currently_playing_team;
        self.core.stop_timer();
        self.num_cards = None;
        self.last_guesses = picks
            .iter()
            .filter_map(|idx| self.board.word(*idx))
            .map(str::to_owned)
            .collect();

        let mut winner = None;
        for idx in picks {
            self.guessed[idx] = true;
            match self.board.owner(idx) {
                Some(CardOwner::Assassin) => {
                    winner = Some(other_team(team));
                    break;
                }
                Some(CardOwner::Team(owner)) => {
                    if self.cards_left(owner) == 0 {
                        winner = Some(owner);
                        break;
                    }
                    if owner != team {
                        break;
                    }
                }
                Some(CardOwner::Neutral) | None => break,
            }
        }

        match winner {
            Some(winner) => self.finish(ctx, winner)?,
            None => {
                self.core.transition(GameState::TurnStart)?;
                self.currently_playing_team = other_team(team);
                info!(room_code = %ctx.room_code(), team = self.currently_playing_team, "turn passed");
            }
        }
        self.send_updates(ctx, None);
        Ok(())
    }

    fn finish(&mut self, ctx: &mut SessionContext<'_>, winner: usize) -> Result<(), RoomError> {
        self.core.transition(GameState::GameOver)?;
        self.core.stop_timer();
        self.winning_team = Some(winner);
        info!(room_code = %ctx.room_code(), winning_team = winner, "game over");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Updates
    // -----------------------------------------------------------------------

    fn teams_view(&self, ctx: &SessionContext<'_>) -> Vec<TeamView> {
        let view = |id: Option<PlayerId>| {
            let player = ctx.player(id?)?;
            Some(PlayerView {
                name: player.name().to_owned(),
                is_room_owner: player.is_room_owner(),
            })
        };
        self.teams
            .iter()
            .map(|seats| TeamView {
                spymaster: view(seats.spymaster),
                guesser: view(seats.guesser),
            })
            .collect()
    }

    fn board_view(&self, with_key: bool) -> Vec<CardView> {
        self.board
            .words()
            .iter()
            .enumerate()
            .map(|(idx, word)| {
                let guessed = self.is_guessed(idx);
                CardView {
                    word: word.clone(),
                    owner: (with_key || guessed).then(|| self.board.owner(idx)).flatten(),
                    guessed,
                }
            })
            .collect()
    }

    /// Tells the room what changed.
    ///
    /// Spymasters get the board with its key; everyone else only sees
    /// the owners of guessed cards. With `rejoined` set, only that player
    /// gets a full snapshot.
    fn send_updates(&self, ctx: &mut SessionContext<'_>, rejoined: Option<PlayerId>) {
        let teams = self.teams_view(ctx);

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

        let timed = self.settings.use_timer && self.core.state() == GameState::TurnActive;
        let show_clock = timed && (self.turn_just_started || rejoined.is_some());
        let mut base = UpdatedGameEvent {
            game_type: None,
            teams: None,
            settings: None,
            state: self.core.state(),
            board: Vec::new(),
            num_cards: self.num_cards,
            current_server_time: show_clock.then_some(self.turn_started_at_ms),
            timer_length: show_clock.then_some(self.settings.timer_length),
            last_guesses: self.last_guesses.clone(),
            num_cards_left: (0..NUM_TEAMS).map(|t| self.cards_left(t)).collect(),
            winning_team: self.winning_team,
            currently_playing_team: self.currently_playing_team,
        };
        if rejoined.is_some() {
            base.game_type = Some(ctx.game_type().to_owned());
            base.teams = Some(teams);
            base.settings = Some(self.settings.clone());
        }

        let game_over = self.core.state() == GameState::GameOver;
        let mut keyed = base.clone();
        keyed.board = self.board_view(true);
        let mut open = base;
        open.board = self.board_view(game_over);
        let for_spymasters = OutgoingMessage::new(Event::UpdatedGame, keyed);
        let for_guessers = OutgoingMessage::new(Event::UpdatedGame, open);

        let recipients = match rejoined {
            Some(player) => vec![player],
            None => ctx.roster().to_vec(),
        };
        for player in recipients {
            if self.is_spymaster(player) {
                ctx.send_to(player, &for_spymasters);
            } else {
                ctx.send_to(player, &for_guessers);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// GameSession
// ---------------------------------------------------------------------------

impl GameSession for Codenames {
    fn state(&self) -> GameState {
        self.core.state()
    }

    fn add_player(&mut self, ctx: &mut SessionContext<'_>, player: PlayerId) -> Result<(), RoomError> {
        self.teams[0].spymaster = Some(player);

        let msg = OutgoingMessage::new(
            Event::CreatedGame,
            CreatedGameEvent {
                room_code: ctx.room_code().clone(),
                game_type: ctx.game_type().to_owned(),
                teams: self.teams_view(ctx),
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
        let Some((team, role)) = SEATING_ORDER
            .into_iter()
            .find(|(team, role)| self.teams[*team].get(*role).is_none())
        else {
            return Err(RoomError::rejected("This game is full."));
        };

        ctx.admit(player, &req.name, false)?;
        *self.teams[team].slot(role) = Some(player);
        debug!(room_code = %ctx.room_code(), player_id = %player, team, %role, "player seated");
        self.send_updates(ctx, None);
        Ok(())
    }

    fn start(&mut self, ctx: &mut SessionContext<'_>, _player: PlayerId) -> Result<(), RoomError> {
        self.core.check_transition(GameState::TurnStart)?;
        if self
            .teams
            .iter()
            .any(|seats| seats.spymaster.is_none() || seats.guesser.is_none())
        {
            return Err(RoomError::rejected(
                "Each team needs a spymaster and a guesser.",
            ));
        }
        self.core.transition(GameState::TurnStart)?;

        self.guessed = vec![false; self.board.len()];
        self.currently_playing_team = 0;
        self.num_cards = None;
        self.last_guesses.clear();
        self.winning_team = None;

        info!(room_code = %ctx.room_code(), "game started");
        self.send_updates(ctx, None);
        Ok(())
    }

    fn rematch(&mut self, ctx: &mut SessionContext<'_>, _player: PlayerId) -> Result<(), RoomError> {
        self.core.transition(GameState::WaitingRoom)?;
        self.board = Board::deal(&mut rand::rng());
        self.guessed = vec![false; self.board.len()];
        self.num_cards = None;
        self.last_guesses.clear();
        self.winning_team = None;
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
        if let Some((team, role)) = self.seat_of(player) {
            *self.teams[team].slot(role) = None;
        }
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
        let Some(action) = CodenamesAction::lookup(action) else {
            return Err(RoomError::UnknownAction(action.to_owned()));
        };
        debug!(room_code = %ctx.room_code(), player_id = %player, %action, "codenames action");

        match action {
            CodenamesAction::MovePlayer => self.move_player(ctx, player, decode_body(body)?),
            CodenamesAction::ChangeSettings => {
                self.change_settings(ctx, player, decode_body(body)?)
            }
            CodenamesAction::StartTurn => self.start_turn(ctx, player, decode_body(body)?),
            CodenamesAction::EndTurn => self.end_turn(ctx, player, decode_body(body)?),
        }
    }

    fn turn_expired(&mut self, ctx: &mut SessionContext<'_>, ticket: TimerTicket) {
        if !self.core.expire_turn(ticket) {
            return;
        }
        self.num_cards = None;
        self.last_guesses.clear();
        self.currently_playing_team = other_team(self.currently_playing_team);
        info!(room_code = %ctx.room_code(), team = self.currently_playing_team, "guessers ran out of time");
        self.send_updates(ctx, None);
    }
}

fn other_team(team: usize) -> usize {
    (team + 1) % NUM_TEAMS
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}
