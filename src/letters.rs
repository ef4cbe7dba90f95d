use include_dir::{include_dir, Dir};
use serde::Deserialize;
use serde_json::from_str;
use std::error::Error;

static ASSET_DIR: Dir = include_dir!("src/assets");

/// Letters the external classifier has been trained on. Camera quiz
/// targets must stay inside this set.
pub const CAMERA_ALPHABET: [char; 9] = ['A', 'B', 'C', 'D', 'H', 'L', 'V', 'Y', 'W'];

/// Letters are introduced four per level.
pub const LETTERS_PER_LEVEL: usize = 4;

/// One fingerspelling letter of the reference alphabet.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Letter {
    pub letter: char,
    pub instruction: String,
    pub emoji: String,
}

/// The ordered reference alphabet (A–W) with per-letter instructions
/// and sign references, embedded at compile time.
#[derive(Deserialize, Clone, Debug)]
pub struct Alphabet {
    pub name: String,
    pub size: u32,
    pub letters: Vec<Letter>,
}

impl Alphabet {
    pub fn load() -> Self {
        read_asset("letters.json").unwrap()
    }

    pub fn len(&self) -> usize {
        self.letters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    pub fn get(&self, letter: char) -> Option<&Letter> {
        let upper = letter.to_ascii_uppercase();
        self.letters.iter().find(|l| l.letter == upper)
    }

    /// Map a sign reference back to its letter. Used when reconstructing
    /// a spelled word from dropped icons.
    pub fn letter_for_sign(&self, sign: &str) -> Option<char> {
        self.letters
            .iter()
            .find(|l| l.emoji == sign)
            .map(|l| l.letter)
    }
}

/// The candidate words offered as word-spelling targets.
#[derive(Deserialize, Clone, Debug)]
pub struct WordList {
    pub name: String,
    pub size: u32,
    pub words: Vec<String>,
}

impl WordList {
    pub fn load() -> Self {
        read_asset("words.json").unwrap()
    }
}

fn read_asset<T: for<'de> Deserialize<'de>>(file_name: &str) -> Result<T, Box<dyn Error>> {
    let file = ASSET_DIR.get_file(file_name).expect("Asset file not found");

    let file_as_str = file
        .contents_utf8()
        .expect("Unable to interpret file as a string");

    let parsed = from_str(file_as_str).expect("Unable to deserialize asset json");

    Ok(parsed)
}
