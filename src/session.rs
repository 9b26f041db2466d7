//! Two-seat game session: the serialization point around one [`Game`].
//!
//! A session owns its game exclusively. The surrounding collaborator holds
//! each session behind a single lock and feeds it client commands in
//! arrival order, so every mutation of the game happens under the session's
//! guard; clients hold only the receiving end of their event channel.

use chrono::{DateTime, Utc};
use derive_more::{Display, Error};
use rand::Rng;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::events::{Command, Event, GameStateView};
use crate::game::board::{
    flip_moves, flip_space, sort_moves, Space, SPACE_BAR_OPPONENT, SPACE_BAR_PLAYER,
    SPACE_HOME_OPPONENT, SPACE_HOME_PLAYER,
};
use crate::game::variant::Variant;
use crate::game::Game;

/// Why a session operation was rejected. All of these are non-fatal: the
/// game is unchanged and the requesting client receives the reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum SessionError {
    /// Reseating is restricted to the names latched at match start.
    #[display("Match has already started.")]
    AlreadyStarted,
    /// Both seats are taken.
    #[display("Match is full.")]
    MatchFull,
    /// The session is password protected.
    #[display("Incorrect password.")]
    IncorrectPassword,
    /// Rolling and moving require both seats occupied.
    #[display("Waiting for an opponent.")]
    SeatsOpen,
    /// The game already has a winner.
    #[display("The game has ended.")]
    GameOver,
    /// Only the turn player may take this action.
    #[display("It is not your turn.")]
    NotYourTurn,
    /// The dice for this turn have already been rolled.
    #[display("You have already rolled.")]
    AlreadyRolled,
    /// The action requires the dice to have been rolled first.
    #[display("You must roll first.")]
    NotRolled,
    /// The doubling cube cannot be offered now.
    #[display("You cannot double at this time.")]
    DoubleNotAllowed,
}

/// A seated client: its identity plus the sending half of its event
/// channel. The receiving half lives with the connection task.
#[derive(Debug)]
pub struct ClientHandle {
    id: usize,
    name: String,
    player_number: i8,
    text_mode: bool,
    tx: mpsc::UnboundedSender<Event>,
}

impl ClientHandle {
    /// Creates a handle and the event receiver for the connection task.
    pub fn new(
        id: usize,
        name: impl Into<String>,
        text_mode: bool,
    ) -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id,
                name: name.into(),
                player_number: 0,
                text_mode,
                tx,
            },
            rx,
        )
    }

    /// Connection identifier.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Assigned seat, 0 while unseated.
    pub fn player_number(&self) -> i8 {
        self.player_number
    }

    fn send(&self, event: Event) {
        if self.tx.send(event).is_err() {
            debug!(client = %self.name, "dropped event for disconnected client");
        }
    }
}

/// One match: a game plus up to two seated clients.
#[derive(Debug)]
pub struct Session {
    id: usize,
    name: String,
    password: Option<String>,
    created: DateTime<Utc>,
    last_active: DateTime<Utc>,
    client1: Option<ClientHandle>,
    client2: Option<ClientHandle>,
    allowed1: Option<String>,
    allowed2: Option<String>,
    rejoin1: bool,
    rejoin2: bool,
    rematch: u32,
    game: Game,
}

impl Session {
    /// Creates a session around a fresh game of the given variant.
    pub fn new(
        id: usize,
        name: impl Into<String>,
        password: Option<String>,
        variant: Variant,
    ) -> Self {
        let now = Utc::now();
        info!(session = id, "creating session");
        Self {
            id,
            name: name.into(),
            password,
            created: now,
            last_active: now,
            client1: None,
            client2: None,
            allowed1: None,
            allowed2: None,
            rejoin1: false,
            rejoin2: false,
            rematch: 0,
            game: Game::new(variant),
        }
    }

    /// Session identifier.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Display name of the session.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// When the session was created.
    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// When the session last processed a command.
    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    /// Number of rematches played in this session.
    pub fn rematch(&self) -> u32 {
        self.rematch
    }

    /// The authoritative game.
    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Number of occupied seats.
    pub fn player_count(&self) -> usize {
        usize::from(self.client1.is_some()) + usize::from(self.client2.is_some())
    }

    /// True once both seats are empty; the surrounding collaborator reaps
    /// terminated sessions.
    pub fn terminated(&self) -> bool {
        self.client1.is_none() && self.client2.is_none()
    }

    /// Runs `f` for each seated client.
    pub fn each_client(&self, mut f: impl FnMut(&ClientHandle)) {
        if let Some(client) = &self.client1 {
            f(client);
        }
        if let Some(client) = &self.client2 {
            f(client);
        }
    }

    fn client(&self, client_id: usize) -> Option<&ClientHandle> {
        self.client1
            .as_ref()
            .filter(|c| c.id == client_id)
            .or_else(|| self.client2.as_ref().filter(|c| c.id == client_id))
    }

    /// The seated opponent of the identified client, if any.
    pub fn opponent(&self, client_id: usize) -> Option<&ClientHandle> {
        if self.client1.as_ref().is_some_and(|c| c.id == client_id) {
            self.client2.as_ref()
        } else if self.client2.as_ref().is_some_and(|c| c.id == client_id) {
            self.client1.as_ref()
        } else {
            None
        }
    }

    /// Seats a client.
    ///
    /// Once the match has started only the two latched names may (re)seat.
    /// The first client to an empty session gets a random seat; otherwise
    /// the free seat is filled. On success both seats receive `Joined` and
    /// a fresh board. On failure the handle is returned with the reason so
    /// the caller can still notify the client.
    #[instrument(skip(self, client, password), fields(session = self.id, client = %client.name))]
    pub fn add_client(
        &mut self,
        mut client: ClientHandle,
        password: Option<&str>,
    ) -> Result<i8, (ClientHandle, SessionError)> {
        if let Some(expected) = &self.password {
            if password != Some(expected.as_str()) {
                return Err((client, SessionError::IncorrectPassword));
            }
        }
        if self.allowed1.is_some()
            && self.allowed1.as_deref() != Some(client.name.as_str())
            && self.allowed2.as_deref() != Some(client.name.as_str())
        {
            return Err((client, SessionError::AlreadyStarted));
        }

        let player_number = match (&self.client1, &self.client2) {
            (Some(_), Some(_)) => return Err((client, SessionError::MatchFull)),
            (Some(_), None) => 2,
            (None, Some(_)) => 1,
            (None, None) => {
                if rand::thread_rng().gen_bool(0.5) {
                    1
                } else {
                    2
                }
            }
        };

        client.player_number = player_number;
        let joined = Event::Joined {
            game_id: self.id,
            player_number,
            player: client.name.clone(),
        };
        let rejoined;
        if player_number == 1 {
            self.game.player1.name = client.name.clone();
            rejoined = self.rejoin1;
            self.rejoin1 = true;
            self.client1 = Some(client);
        } else {
            self.game.player2.name = client.name.clone();
            rejoined = self.rejoin2;
            self.rejoin2 = true;
            self.client2 = Some(client);
        }
        self.last_active = Utc::now();

        if rejoined {
            info!(player_number, "client rejoined");
        } else {
            info!(player_number, "client seated");
        }
        self.each_client(|c| c.send(joined.clone()));
        self.broadcast_board();
        Ok(player_number)
    }

    /// Vacates the identified client's seat, blanking the player name and
    /// echoing `Left` to both sides.
    #[instrument(skip(self), fields(session = self.id))]
    pub fn remove_client(&mut self, client_id: usize) {
        let removed = if self.client1.as_ref().is_some_and(|c| c.id == client_id) {
            self.client1.take()
        } else if self.client2.as_ref().is_some_and(|c| c.id == client_id) {
            self.client2.take()
        } else {
            return;
        };
        let Some(removed) = removed else { return };

        if removed.player_number == 1 {
            self.game.player1.name.clear();
        } else {
            self.game.player2.name.clear();
        }
        self.last_active = Utc::now();
        info!(client = %removed.name, "client left");

        let left = Event::Left {
            player: removed.name.clone(),
        };
        removed.send(left.clone());
        if removed.text_mode {
            self.send_board(&removed);
        }
        if let Some(opponent) = self.client1.as_ref().or(self.client2.as_ref()) {
            opponent.send(left);
            if opponent.text_mode {
                self.send_board(opponent);
            }
        }
    }

    /// Rolls for the given seat.
    ///
    /// In turn 0 each seat independently rolls one die for initiative; a
    /// tie clears both and re-contests, otherwise the higher roller takes
    /// the turn and plays the contest dice. Afterward only the turn player
    /// may roll, and only when the dice are spent. The first initiative
    /// roll records the match start and latches the reseat names.
    #[instrument(skip(self), fields(session = self.id))]
    pub fn roll(&mut self, player: i8) -> Result<(), SessionError> {
        if self.client1.is_none() || self.client2.is_none() {
            return Err(SessionError::SeatsOpen);
        }
        if self.game.winner != 0 {
            return Err(SessionError::GameOver);
        }
        self.last_active = Utc::now();

        if self.game.turn == 0 {
            if player == 1 {
                if self.game.roll1 != 0 {
                    return Err(SessionError::AlreadyRolled);
                }
                self.game.roll1 = roll_die();
            } else {
                if self.game.roll2 != 0 {
                    return Err(SessionError::AlreadyRolled);
                }
                self.game.roll2 = roll_die();
            }

            if self.game.started.is_none() {
                self.game.started = Some(Utc::now());
            }
            if self.allowed1.is_none() {
                self.allowed1 = self.client1.as_ref().map(|c| c.name.clone());
                self.allowed2 = self.client2.as_ref().map(|c| c.name.clone());
            }

            if self.game.roll1 != 0 && self.game.roll2 != 0 {
                if self.game.roll1 == self.game.roll2 {
                    debug!("initiative tied, re-contesting");
                    self.game.roll1 = 0;
                    self.game.roll2 = 0;
                } else {
                    self.game.turn = if self.game.roll1 > self.game.roll2 { 1 } else { 2 };
                    if self.game.variant == Variant::Tabula {
                        self.game.roll3 = roll_die();
                    }
                    self.latch_reroll();
                    info!(turn = self.game.turn, "initiative resolved");
                }
            }
            return Ok(());
        }

        if player != self.game.turn {
            return Err(SessionError::NotYourTurn);
        }
        if self.game.roll1 != 0 || self.game.roll2 != 0 {
            return Err(SessionError::AlreadyRolled);
        }

        self.game.roll1 = roll_die();
        self.game.roll2 = roll_die();
        if self.game.variant == Variant::Tabula {
            self.game.roll3 = roll_die();
        }
        self.latch_reroll();
        debug!(
            roll1 = self.game.roll1,
            roll2 = self.game.roll2,
            roll3 = self.game.roll3,
            "dice rolled"
        );
        Ok(())
    }

    // Acey-deucey: rolling 1-2 earns a bonus turn after the moves are
    // played.
    fn latch_reroll(&mut self) {
        if self.game.variant == Variant::AceyDeucey
            && self.game.roll1.min(self.game.roll2) == 1
            && self.game.roll1.max(self.game.roll2) == 2
        {
            self.game.reroll = true;
        }
    }

    /// Ends the given seat's turn via [`Game::next_turn`], consuming any
    /// earned acey-deucey bonus turn.
    #[instrument(skip(self), fields(session = self.id))]
    pub fn end_turn(&mut self, player: i8) -> Result<(), SessionError> {
        if self.game.winner != 0 {
            return Err(SessionError::GameOver);
        }
        if self.game.turn == 0 || player != self.game.turn {
            return Err(SessionError::NotYourTurn);
        }
        if self.game.roll1 == 0 || self.game.roll2 == 0 {
            return Err(SessionError::NotRolled);
        }
        let reroll = self.game.reroll;
        self.game.reroll = false;
        self.game.next_turn(reroll);
        self.last_active = Utc::now();
        Ok(())
    }

    /// Concedes the game for the given seat.
    #[instrument(skip(self), fields(session = self.id))]
    pub fn resign(&mut self, player: i8) -> Result<(), SessionError> {
        if self.game.winner != 0 {
            return Err(SessionError::GameOver);
        }
        self.game.winner = if player == 1 { 2 } else { 1 };
        self.game.ended = Some(Utc::now());
        self.last_active = Utc::now();
        info!(winner = self.game.winner, "game resigned");
        Ok(())
    }

    /// Offers the doubling cube: only the turn player, only before
    /// rolling, never in tabula, and only while holding (or centered)
    /// cube rights. Acceptance is arbitrated outside the core; only the
    /// pending offer is stored here.
    #[instrument(skip(self), fields(session = self.id))]
    pub fn offer_double(&mut self, player: i8) -> Result<(), SessionError> {
        if self.game.variant == Variant::Tabula {
            return Err(SessionError::DoubleNotAllowed);
        }
        if self.game.winner != 0 {
            return Err(SessionError::GameOver);
        }
        if self.game.turn == 0 || player != self.game.turn {
            return Err(SessionError::NotYourTurn);
        }
        if self.game.roll1 != 0 || self.game.double_offered {
            return Err(SessionError::DoubleNotAllowed);
        }
        if self.game.double_player != 0 && self.game.double_player != player {
            return Err(SessionError::DoubleNotAllowed);
        }
        self.game.double_offered = true;
        self.last_active = Utc::now();
        info!(value = self.game.double_value * 2, "double offered");
        Ok(())
    }

    /// Resets the game for a rematch, keeping the seats, and deals fresh
    /// boards.
    #[instrument(skip(self), fields(session = self.id))]
    pub fn begin_rematch(&mut self) {
        self.rematch += 1;
        self.game.reset();
        self.game.started = None;
        self.game.ended = None;
        self.last_active = Utc::now();
        info!(rematch = self.rematch, "rematch started");
        self.broadcast_board();
    }

    /// Sends the per-client board view.
    ///
    /// Text-mode clients receive the rendered board as notices. Player 2
    /// receives a reflected snapshot: points mirrored, every slot negated,
    /// turn/winner/cube owner remapped, and pending and available moves
    /// flipped. The flip is purely presentational; the authoritative game
    /// is untouched.
    pub fn send_board(&self, client: &ClientHandle) {
        if client.text_mode {
            for line in self.game.board_state(client.player_number).lines() {
                client.send(Event::Notice {
                    message: line.to_string(),
                });
            }
            return;
        }

        let mut state = GameStateView {
            game: self.game.clone(),
            player_number: client.player_number,
            available: self.game.legal_moves(false),
        };

        if client.player_number == 2 {
            let variant = self.game.variant;
            let source = &self.game;
            let view = &mut state.game;

            state.player_number = 1;
            std::mem::swap(&mut view.player1, &mut view.player2);
            view.player1.number = 1;
            view.player2.number = 2;
            view.turn = flip_seat(source.turn);
            view.double_player = flip_seat(source.double_player);
            view.winner = flip_seat(source.winner);
            if view.roll1 == 0 || view.roll2 == 0 {
                std::mem::swap(&mut view.roll1, &mut view.roll2);
            }

            for space in 1..=24usize {
                view.board[space] = -source.board[flip_space(space as Space, 2, variant) as usize];
            }
            view.board[SPACE_HOME_PLAYER as usize] = -source.board[SPACE_HOME_OPPONENT as usize];
            view.board[SPACE_HOME_OPPONENT as usize] = -source.board[SPACE_HOME_PLAYER as usize];
            view.board[SPACE_BAR_PLAYER as usize] = -source.board[SPACE_BAR_OPPONENT as usize];
            view.board[SPACE_BAR_OPPONENT as usize] = -source.board[SPACE_BAR_PLAYER as usize];

            view.moves = flip_moves(&source.moves, 2, variant);
            state.available = flip_moves(&state.available, 2, variant);
        }

        sort_moves(&mut state.available);
        client.send(Event::Board { state });
    }

    fn broadcast_board(&self) {
        if let Some(client) = &self.client1 {
            self.send_board(client);
        }
        if let Some(client) = &self.client2 {
            self.send_board(client);
        }
    }

    fn fail(&self, client_id: usize, reason: impl Into<String>) {
        let reason = reason.into();
        if let Some(client) = self.client(client_id) {
            warn!(session = self.id, client = %client.name, reason = %reason, "command rejected");
            client.send(Event::Failed { reason });
        }
    }

    /// Dispatches a command from a seated client. Commands for the same
    /// session arrive through one guard, so effects are linearizable in
    /// arrival order. Rejections are answered with `Failed`; commands from
    /// unseated clients are dropped.
    #[instrument(skip(self, command), fields(session = self.id))]
    pub fn handle_command(&mut self, client_id: usize, command: Command) {
        let Some((player_number, name)) = self
            .client(client_id)
            .map(|c| (c.player_number, c.name.clone()))
        else {
            debug!(client_id, "command from unseated client dropped");
            return;
        };
        self.last_active = Utc::now();

        match command {
            Command::Join { .. } => {
                self.fail(client_id, "You are already seated at this match.");
            }
            Command::Leave => self.remove_client(client_id),
            Command::Roll => match self.roll(player_number) {
                Ok(()) => self.broadcast_board(),
                Err(err) => self.fail(client_id, err.to_string()),
            },
            Command::Move { moves } => {
                if self.game.turn != player_number {
                    self.fail(client_id, SessionError::NotYourTurn.to_string());
                    return;
                }
                let variant = self.game.variant;
                // Clients speak in their own frame; unflip into the
                // server's frame before committing.
                let physical = flip_moves(&moves, player_number, variant);
                match self.game.add_moves(&physical, false) {
                    Ok(applied) => {
                        self.each_client(|c| {
                            c.send(Event::Moved {
                                player: name.clone(),
                                moves: flip_moves(&applied, c.player_number, variant),
                            });
                        });
                        self.broadcast_board();
                    }
                    Err(err) => self.fail(client_id, err.to_string()),
                }
            }
            Command::Ok => match self.end_turn(player_number) {
                Ok(()) => self.broadcast_board(),
                Err(err) => self.fail(client_id, err.to_string()),
            },
            Command::Resign => match self.resign(player_number) {
                Ok(()) => self.broadcast_board(),
                Err(err) => self.fail(client_id, err.to_string()),
            },
            Command::Double => match self.offer_double(player_number) {
                Ok(()) => self.broadcast_board(),
                Err(err) => self.fail(client_id, err.to_string()),
            },
        }
    }
}

fn roll_die() -> i8 {
    rand::thread_rng().gen_range(1..=6)
}

fn flip_seat(player: i8) -> i8 {
    match player {
        1 => 2,
        2 => 1,
        other => other,
    }
}
