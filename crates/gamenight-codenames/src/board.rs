//! The 5x5 word board and its hidden key.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::api::CardOwner;

/// Cards on the board.
pub const BOARD_SIZE: usize = 25;

/// Agents per team. The team that plays first has one more card to find.
pub const TEAM_CARDS: [usize; 2] = [6, 5];

const WORDS: &[&str] = &[
    "AFRICA", "AGENT", "AIR", "ALIEN", "AMAZON", "ANGEL", "ANTARCTICA", "APPLE", "ARM", "BACK",
    "BAND", "BANK", "BARK", "BEACH", "BELT", "BERLIN", "BERRY", "BOARD", "BOND", "BOOM", "BOW",
    "BOX", "BUG", "CANADA", "CAPITAL", "CELL", "CENTER", "CHINA", "CHOCOLATE", "CIRCLE", "CLUB",
    "COMPOUND", "COPPER", "CRASH", "CRICKET", "CROSS", "DEATH", "DICE", "DINOSAUR", "DOCTOR",
    "DOG", "DRESS", "DWARF", "EAGLE", "ENGINE", "EUROPE", "FACE", "FAIR", "FALL", "FIELD",
    "FIRE", "FISH", "FLUTE", "FLY", "FOREST", "GAME", "GAS", "GENIUS", "GIANT", "GLASS", "GLOVE",
    "GOLD", "GRASS", "GREEN", "HAM", "HEAD", "HEART", "HOOK", "HORN", "HORSE", "HOSPITAL",
    "ICE", "IRON", "JACK", "JET", "KEY", "KING", "KNIFE", "LAB", "LEMON", "LIGHT", "LINE",
    "LOCK", "LONDON", "MAIL", "MARCH", "MASS", "MATCH", "MERCURY", "MINT", "MOON", "MOUNT",
    "MOUSE", "NEEDLE", "NET", "NIGHT", "NOTE", "NUT", "OCTOPUS", "OIL", "OLIVE", "OPERA",
    "ORANGE", "PALM", "PAN", "PAPER", "PARK", "PASS", "PIANO", "PILOT", "PIPE", "PIRATE",
    "PITCH", "PLANE", "PLATE", "POINT", "POLE", "POOL", "PORT", "PRESS", "QUEEN", "RABBIT",
    "RING", "ROBOT", "ROCK", "ROME", "ROUND", "RULER", "SATURN", "SCALE", "SCHOOL", "SCREEN",
    "SHIP", "SHOE", "SLIP", "SNOW", "SPACE", "SPIDER", "SPRING", "STAR", "STRING", "TABLE",
    "TAIL", "TELESCOPE", "TIME", "TOWER", "TRAIN", "TRIANGLE", "TUBE", "UNICORN", "WASHER",
    "WATCH", "WAVE", "WHALE", "WIND", "WITCH", "YARD",
];

/// A dealt board: 25 distinct words and who each one belongs to.
#[derive(Debug, Clone)]
pub struct Board {
    words: Vec<String>,
    owners: Vec<CardOwner>,
}

impl Board {
    /// Deals a fresh board from the built-in word list.
    pub fn deal<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut pool: Vec<&str> = WORDS.to_vec();
        pool.shuffle(rng);
        let words = pool.into_iter().take(BOARD_SIZE).map(str::to_owned).collect();

        let mut owners = Vec::with_capacity(BOARD_SIZE);
        owners.push(CardOwner::Assassin);
        for (team, count) in TEAM_CARDS.iter().enumerate() {
            owners.extend(std::iter::repeat_n(CardOwner::Team(team), *count));
        }
        owners.resize(BOARD_SIZE, CardOwner::Neutral);
        owners.shuffle(rng);

        Self { words, owners }
    }

    /// A board with a fixed layout.
    ///
    /// Returns `None` unless there are as many owners as words.
    pub fn from_parts(words: Vec<String>, owners: Vec<CardOwner>) -> Option<Self> {
        (words.len() == owners.len()).then_some(Self { words, owners })
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn word(&self, idx: usize) -> Option<&str> {
        self.words.get(idx).map(String::as_str)
    }

    pub fn owner(&self, idx: usize) -> Option<CardOwner> {
        self.owners.get(idx).copied()
    }

    /// Finds a card by word, ignoring case and surrounding whitespace.
    pub fn position(&self, word: &str) -> Option<usize> {
        let word = word.trim();
        self.words.iter().position(|w| w.eq_ignore_ascii_case(word))
    }

    /// Cards belonging to `team`.
    pub fn team_cards(&self, team: usize) -> impl Iterator<Item = usize> + '_ {
        self.owners
            .iter()
            .enumerate()
            .filter(move |(_, owner)| **owner == CardOwner::Team(team))
            .map(|(idx, _)| idx)
    }
}
