//! Deck-based keystream generator and stream cipher.
//!
//! The entire cipher state is a 54-card deck: 52 ranked cards plus two
//! distinguishable jokers. Every advance rearranges the deck (joker
//! moves, a triple cut, a count cut) and reads one output card; keystream
//! bytes XORed with the payload give a symmetric stream cipher.

use hkdf::Hkdf;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroize;

/// Number of cards in the deck.
pub const DECK_SIZE: usize = 54;

/// Joker A; both jokers count as 53 wherever a joker's value is read.
const JOKER_A: u8 = 53;

/// Joker B.
const JOKER_B: u8 = 54;

/// HKDF salt for expanding seed material into a shuffle key.
const SALT_DECK_SEED: &[u8] = b"CARDWIRE-DECK-V1";

/// Errors from deck construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeckError {
    /// The supplied deck is not a permutation of the 54 card values.
    #[error("deck is not a permutation of the {DECK_SIZE} card values")]
    InvalidDeck,
}

/// Keystream generator over a 54-card deck.
///
/// The deck mutates in place on every advance, so a keystream must be
/// owned exclusively by one session and never shared across concurrent
/// callers.
pub struct Keystream {
    deck: Vec<u8>,
}

impl Keystream {
    /// Canonical ordered deck: 1 through 52, then the two jokers.
    pub fn new() -> Self {
        Self {
            deck: (1..=DECK_SIZE as u8).collect(),
        }
    }

    /// Uses an explicit deck ordering, top card first.
    pub fn from_deck(deck: Vec<u8>) -> Result<Self, DeckError> {
        if deck.len() != DECK_SIZE {
            return Err(DeckError::InvalidDeck);
        }
        let mut seen = [false; DECK_SIZE + 1];
        for &card in &deck {
            if card == 0 || card > DECK_SIZE as u8 || seen[card as usize] {
                return Err(DeckError::InvalidDeck);
            }
            seen[card as usize] = true;
        }
        Ok(Self { deck })
    }

    /// Keys the deck from arbitrary seed material.
    ///
    /// The seed is expanded with HKDF-SHA256 into a ChaCha20 key that
    /// drives a Fisher-Yates shuffle of the canonical deck, so equal
    /// seeds always yield equal decks and equal keystreams.
    pub fn from_seed(seed: &[u8]) -> Self {
        let mut rng = ChaCha20Rng::from_seed(derive_shuffle_key(seed));
        let mut deck: Vec<u8> = (1..=DECK_SIZE as u8).collect();
        deck.shuffle(&mut rng);
        Self { deck }
    }

    /// Current deck order, top card first.
    pub fn deck(&self) -> &[u8] {
        &self.deck
    }

    /// Produces the next keystream byte: four output values reduced mod 4
    /// and packed as consecutive two-bit groups, low bits first.
    pub fn next_byte(&mut self) -> u8 {
        let mut byte = 0u8;
        for shift in [0u8, 2, 4, 6] {
            byte |= (self.advance() % 4) << shift;
        }
        byte
    }

    /// Collects `n` keystream bytes.
    pub fn next_bytes(&mut self, n: usize) -> Vec<u8> {
        (0..n).map(|_| self.next_byte()).collect()
    }

    /// Runs rounds until one yields an output card and returns its value.
    ///
    /// A round whose output lands on a joker produces nothing and is
    /// retried internally; the returned value is always in `1..=52`.
    pub fn advance(&mut self) -> u8 {
        loop {
            self.move_jokers();
            self.triple_cut();
            self.count_cut();
            if let Some(value) = self.output_card() {
                return value;
            }
        }
    }

    /// Joker A moves down one position and Joker B down two, each
    /// wrapping past the bottom of the deck to just below the top card.
    fn move_jokers(&mut self) {
        let index_a = self.position(JOKER_A);
        self.deck.remove(index_a);
        if index_a == DECK_SIZE - 1 {
            self.deck.insert(1, JOKER_A);
        } else {
            self.deck.insert(index_a + 1, JOKER_A);
        }

        let index_b = self.position(JOKER_B);
        self.deck.remove(index_b);
        if index_b == DECK_SIZE - 2 {
            self.deck.insert(1, JOKER_B);
        } else if index_b == DECK_SIZE - 1 {
            self.deck.insert(2, JOKER_B);
        } else {
            self.deck.insert(index_b + 2, JOKER_B);
        }
    }

    /// Swaps everything above the higher joker with everything below the
    /// lower one; the middle third, jokers included, stays put.
    fn triple_cut(&mut self) {
        let mut first = self.position(JOKER_A);
        let mut second = self.position(JOKER_B);
        if first > second {
            std::mem::swap(&mut first, &mut second);
        }

        let mut cut = Vec::with_capacity(DECK_SIZE);
        cut.extend_from_slice(&self.deck[second + 1..]);
        cut.extend_from_slice(&self.deck[first..=second]);
        cut.extend_from_slice(&self.deck[..first]);
        self.deck = cut;
    }

    /// Cuts as many cards as the bottom card's value from the top and
    /// reinserts them just above the bottom card, which never moves.
    fn count_cut(&mut self) {
        let bottom = self.deck[DECK_SIZE - 1];
        if bottom == JOKER_A || bottom == JOKER_B {
            // a joker counts 53 here, which cuts the whole deck above the
            // bottom card back onto itself
            return;
        }

        let count = bottom as usize;
        let mut cut = Vec::with_capacity(DECK_SIZE);
        cut.extend_from_slice(&self.deck[count..DECK_SIZE - 1]);
        cut.extend_from_slice(&self.deck[..count]);
        cut.push(bottom);
        self.deck = cut;
    }

    /// Counts down from the top by the top card's value and reads the
    /// card found there; a joker there means no output this round.
    fn output_card(&self) -> Option<u8> {
        let mut top = self.deck[0];
        if top == JOKER_A || top == JOKER_B {
            top = JOKER_A;
        }
        let card = self.deck[top as usize];
        if card == JOKER_A || card == JOKER_B {
            None
        } else {
            Some(card)
        }
    }

    fn position(&self, card: u8) -> usize {
        self.deck
            .iter()
            .position(|&c| c == card)
            .expect("card present in a valid deck")
    }
}

impl Default for Keystream {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Keystream {
    fn drop(&mut self) {
        self.deck.zeroize();
    }
}

/// Expands seed material into a 32-byte shuffle key with HKDF-SHA256.
fn derive_shuffle_key(seed: &[u8]) -> [u8; 32] {
    let hk = Hkdf::<Sha256>::new(Some(SALT_DECK_SEED), seed);
    let mut key = [0u8; 32];
    hk.expand(b"deck", &mut key)
        .expect("HKDF expand should not fail");
    key
}

/// XOR stream cipher over a deck keystream.
pub struct StreamCipher {
    keystream: Keystream,
}

impl StreamCipher {
    /// Wraps an already-keyed keystream.
    pub fn new(keystream: Keystream) -> Self {
        Self { keystream }
    }

    /// Keys a fresh deck from seed material.
    pub fn from_seed(seed: &[u8]) -> Self {
        Self::new(Keystream::from_seed(seed))
    }

    /// Encrypts or decrypts `data`; XOR with the keystream is its own
    /// inverse. The deck advances exactly once per keystream value, so
    /// both ends must apply transforms in the same order.
    pub fn apply(&mut self, data: &[u8]) -> Vec<u8> {
        data.iter().map(|&b| b ^ self.keystream.next_byte()).collect()
    }

    /// Encrypts a payload.
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Vec<u8> {
        self.apply(plaintext)
    }

    /// Decrypts a payload.
    pub fn decrypt(&mut self, ciphertext: &[u8]) -> Vec<u8> {
        self.apply(ciphertext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_deck_order() {
        let keystream = Keystream::new();
        assert_eq!(keystream.deck().len(), DECK_SIZE);
        assert_eq!(keystream.deck()[0], 1);
        assert_eq!(keystream.deck()[DECK_SIZE - 1], JOKER_B);
    }

    #[test]
    fn test_from_deck_validation() {
        assert!(Keystream::from_deck((1..=54).collect()).is_ok());
        assert!(Keystream::from_deck(vec![1; DECK_SIZE]).is_err());
        assert!(Keystream::from_deck((1..=53).collect()).is_err());
        assert!(Keystream::from_deck(vec![0; DECK_SIZE]).is_err());

        let mut duplicated: Vec<u8> = (1..=54).collect();
        duplicated[0] = 2;
        assert!(Keystream::from_deck(duplicated).is_err());

        let mut out_of_range: Vec<u8> = (1..=54).collect();
        out_of_range[10] = 55;
        assert!(Keystream::from_deck(out_of_range).is_err());
    }

    #[test]
    fn test_deck_after_one_advance() {
        let mut keystream = Keystream::new();
        keystream.advance();

        let mut expected: Vec<u8> = (2..=54).collect();
        expected.push(1);
        assert_eq!(keystream.deck(), &expected[..]);
    }

    #[test]
    fn test_canonical_output_values() {
        let mut keystream = Keystream::new();
        let values: Vec<u8> = (0..12).map(|_| keystream.advance()).collect();
        assert_eq!(values, [4, 49, 10, 24, 8, 51, 44, 6, 4, 33, 20, 39]);
    }

    #[test]
    fn test_canonical_keystream_bytes() {
        let mut keystream = Keystream::new();
        assert_eq!(
            keystream.next_bytes(16),
            [36, 140, 196, 107, 9, 92, 156, 170, 123, 197, 54, 50, 109, 183, 15, 8]
        );
    }

    #[test]
    fn test_reversed_deck_keystream_bytes() {
        // jokers start on top, exercising the wrap rules
        let reversed: Vec<u8> = (1..=54).rev().collect();
        let mut keystream = Keystream::from_deck(reversed).unwrap();
        assert_eq!(
            keystream.next_bytes(8),
            [180, 144, 126, 123, 255, 48, 96, 72]
        );
    }

    #[test]
    fn test_interleaved_deck_keystream_bytes() {
        let deck: Vec<u8> = (2u8..=54).step_by(2).chain((1u8..=54).step_by(2)).collect();
        let mut keystream = Keystream::from_deck(deck).unwrap();
        assert_eq!(keystream.next_bytes(8), [43, 83, 213, 209, 22, 42, 183, 137]);
    }

    #[test]
    fn test_output_values_never_jokers() {
        let mut keystream = Keystream::from_seed(b"joker check");
        for _ in 0..500 {
            let value = keystream.advance();
            assert!((1..=52).contains(&value));
        }
    }

    #[test]
    fn test_deck_stays_a_permutation() {
        let mut keystream = Keystream::from_seed(b"permutation check");
        for _ in 0..200 {
            keystream.advance();
            let mut sorted = keystream.deck().to_vec();
            sorted.sort_unstable();
            let expected: Vec<u8> = (1..=54).collect();
            assert_eq!(sorted, expected);
        }
    }

    #[test]
    fn test_seeding_is_deterministic() {
        let mut a = Keystream::from_seed(b"shared secret");
        let mut b = Keystream::from_seed(b"shared secret");
        assert_eq!(a.deck(), b.deck());
        assert_eq!(a.next_bytes(64), b.next_bytes(64));
    }

    #[test]
    fn test_different_seeds_diverge() {
        let a = Keystream::from_seed(b"seed one");
        let b = Keystream::from_seed(b"seed two");
        assert_ne!(a.deck(), b.deck());
    }

    #[test]
    fn test_next_bytes_count() {
        let mut keystream = Keystream::new();
        assert_eq!(keystream.next_bytes(19).len(), 19);
    }

    #[test]
    fn test_cipher_roundtrip_canonical_deck() {
        let mut sender = StreamCipher::new(Keystream::new());
        let mut receiver = StreamCipher::new(Keystream::new());

        let plaintext = b"I love Rust!";
        let ciphertext = sender.encrypt(plaintext);
        assert_ne!(&ciphertext[..], &plaintext[..]);
        assert_eq!(receiver.decrypt(&ciphertext), plaintext);
    }

    #[test]
    fn test_cipher_roundtrip_seeded_deck() {
        let mut sender = StreamCipher::from_seed(b"session seed");
        let mut receiver = StreamCipher::from_seed(b"session seed");

        let plaintext = "\u{1f44b} unicode survives \u{1f98a}".as_bytes();
        assert_eq!(receiver.decrypt(&sender.encrypt(plaintext)), plaintext);
    }

    #[test]
    fn test_cipher_streams_across_calls() {
        let mut sender = StreamCipher::from_seed(b"chunked");
        let mut receiver = StreamCipher::from_seed(b"chunked");

        let first = sender.encrypt(b"part one");
        let second = sender.encrypt(b"part two");
        assert_eq!(receiver.decrypt(&first), b"part one");
        assert_eq!(receiver.decrypt(&second), b"part two");
    }
}
