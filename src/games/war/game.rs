//! War game state and rules.

use anyhow::{anyhow, bail, ensure};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::core::{payload, Payload, StateList, StateValue};
use crate::session::{GameSession, Saveable};

/// Game type identifier.
pub const GAME_TYPE: &str = "war";

/// Cards dealt to each player by default (half a standard deck).
pub const DEFAULT_DECK_SIZE: usize = 26;

/// Action that flips the top card of both decks.
pub const PLAY: &str = "play";

/// Lowest and highest card rank (ace high).
const RANKS: std::ops::RangeInclusive<i64> = 2..=14;
const SUITS: usize = 4;

/// Two-player War.
///
/// Each `play` flips the top card of both decks. The higher rank takes the
/// round plus any pot left by earlier ties; a tie adds both cards to the
/// pot. The game ends when the decks run out.
#[derive(Clone, Debug, PartialEq)]
pub struct WarGame {
    players: [String; 2],
    decks: [Vec<i64>; 2],
    scores: [i64; 2],
    pot: i64,
    round: i64,
}

impl WarGame {
    /// Deal a new game with `deck_size` cards per player.
    pub fn new(players: [String; 2], deck_size: usize, seed: u64) -> anyhow::Result<Self> {
        ensure!(
            (1..=DEFAULT_DECK_SIZE).contains(&deck_size),
            "deck size must be 1-{DEFAULT_DECK_SIZE}, got {deck_size}"
        );
        ensure!(players[0] != players[1], "player names must differ");

        let mut cards: Vec<i64> = RANKS.flat_map(|rank| [rank; SUITS]).collect();
        cards.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));

        let second = cards.split_off(deck_size);
        let first = cards;
        Ok(Self {
            players,
            decks: [first, second[..deck_size].to_vec()],
            scores: [0, 0],
            pot: 0,
            round: 0,
        })
    }

    /// Player names.
    #[must_use]
    pub fn players(&self) -> &[String; 2] {
        &self.players
    }

    /// Rounds won by each player, in player order.
    #[must_use]
    pub fn scores(&self) -> [i64; 2] {
        self.scores
    }

    /// Cards left in each deck.
    #[must_use]
    pub fn cards_left(&self) -> [usize; 2] {
        [self.decks[0].len(), self.decks[1].len()]
    }

    /// Rounds played so far.
    #[must_use]
    pub fn round(&self) -> i64 {
        self.round
    }

    /// Points waiting for the next decisive round.
    #[must_use]
    pub fn pot(&self) -> i64 {
        self.pot
    }

    /// Leading player, or `None` on a tie.
    #[must_use]
    pub fn leader(&self) -> Option<&str> {
        match self.scores[0].cmp(&self.scores[1]) {
            std::cmp::Ordering::Greater => Some(self.players[0].as_str()),
            std::cmp::Ordering::Less => Some(self.players[1].as_str()),
            std::cmp::Ordering::Equal => None,
        }
    }

    fn play_round(&mut self) -> anyhow::Result<()> {
        ensure!(!self.is_finished(), "no cards left to play");
        let (Some(a), Some(b)) = (self.decks[0].pop(), self.decks[1].pop()) else {
            bail!("no cards left to play");
        };
        self.round += 1;
        self.pot += 1;
        match a.cmp(&b) {
            std::cmp::Ordering::Greater => self.scores[0] += std::mem::take(&mut self.pot),
            std::cmp::Ordering::Less => self.scores[1] += std::mem::take(&mut self.pot),
            std::cmp::Ordering::Equal => {}
        }
        Ok(())
    }
}

impl Saveable for WarGame {
    fn save_state(&self) -> StateValue {
        let list =
            |items: &[i64]| StateValue::List(items.iter().copied().map(StateValue::from).collect());
        StateValue::map()
            .with("players", vec![self.players[0].as_str(), self.players[1].as_str()])
            .with("decks", vec![list(&self.decks[0]), list(&self.decks[1])])
            .with("scores", list(&self.scores))
            .with("pot", self.pot)
            .with("round", self.round)
    }

    fn load_state(&mut self, state: &StateValue) -> anyhow::Result<()> {
        let players = pair(state, "players", |v| {
            v.as_text().map(str::to_string).ok_or_else(|| anyhow!("player name must be text"))
        })?;
        let decks = pair(state, "decks", |v| {
            ints(v.as_list().ok_or_else(|| anyhow!("deck must be a list"))?)
        })?;
        let scores = pair(state, "scores", |v| {
            v.as_int().ok_or_else(|| anyhow!("score must be an integer"))
        })?;
        let pot = int_field(state, "pot")?;
        let round = int_field(state, "round")?;
        ensure!(decks[0].len() == decks[1].len(), "decks must be the same size");

        *self = Self {
            players,
            decks,
            scores,
            pot,
            round,
        };
        Ok(())
    }
}

impl GameSession for WarGame {
    fn game_type(&self) -> &str {
        GAME_TYPE
    }

    fn apply_action(
        &mut self,
        actor_id: &str,
        action_type: &str,
        _data: &Payload,
    ) -> anyhow::Result<()> {
        ensure!(
            self.players.iter().any(|p| p == actor_id),
            "`{actor_id}` is not playing this game"
        );
        match action_type {
            PLAY => self.play_round(),
            other => bail!("unknown action `{other}`"),
        }
    }

    fn is_finished(&self) -> bool {
        self.decks.iter().any(Vec::is_empty)
    }

    fn save_metadata(&self) -> Payload {
        let scores: Payload = self
            .players
            .iter()
            .zip(self.scores)
            .map(|(name, score)| (name.clone(), StateValue::Int(score)))
            .collect();
        payload([
            ("round", self.round.into()),
            ("scores", StateValue::Map(scores)),
        ])
    }
}

fn field<'a>(state: &'a StateValue, key: &str) -> anyhow::Result<&'a StateValue> {
    state.get(key).ok_or_else(|| anyhow!("missing `{key}`"))
}

fn int_field(state: &StateValue, key: &str) -> anyhow::Result<i64> {
    field(state, key)?
        .as_int()
        .ok_or_else(|| anyhow!("`{key}` must be an integer"))
}

fn pair<T>(
    state: &StateValue,
    key: &str,
    parse: impl Fn(&StateValue) -> anyhow::Result<T>,
) -> anyhow::Result<[T; 2]> {
    let items = field(state, key)?
        .as_list()
        .ok_or_else(|| anyhow!("`{key}` must be a list"))?;
    ensure!(items.len() == 2, "`{key}` must have 2 entries, got {}", items.len());
    Ok([parse(&items[0])?, parse(&items[1])?])
}

fn ints(items: &StateList) -> anyhow::Result<Vec<i64>> {
    items
        .iter()
        .map(|v| {
            v.as_int()
                .filter(|rank| RANKS.contains(rank))
                .ok_or_else(|| anyhow!("invalid card {v:?}"))
        })
        .collect()
}
