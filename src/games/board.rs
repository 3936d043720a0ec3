use crate::types::{IntentError, PieceId};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// One word of a sentence puzzle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Piece {
    pub id: PieceId,
    pub word: String,
    /// Position in the server's piece list
    pub original_index: usize,
}

/// Pieces split between the unused pool and the answer being built.
///
/// Every piece of the prompt is in exactly one of the two lists. Moves between
/// them happen inside a single `&mut self` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Board {
    pool: Vec<Piece>,
    placed: Vec<Piece>,
}

impl Board {
    /// New board with a shuffled pool
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut board = Self::unshuffled(words);
        let mut rng = rand::rng();
        board.pool.shuffle(&mut rng);
        board
    }

    /// New board with the pool in server order
    pub fn unshuffled<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pool = words
            .into_iter()
            .enumerate()
            .map(|(index, word)| Piece {
                id: format!("piece-{}", index),
                word: word.into(),
                original_index: index,
            })
            .collect();
        Self {
            pool,
            placed: Vec::new(),
        }
    }

    pub fn pool(&self) -> &[Piece] {
        &self.pool
    }

    pub fn placed(&self) -> &[Piece] {
        &self.placed
    }

    pub fn len(&self) -> usize {
        self.pool.len() + self.placed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every piece has been placed
    pub fn is_complete(&self) -> bool {
        self.pool.is_empty() && !self.placed.is_empty()
    }

    /// Move a piece from the pool to the end of the answer
    pub fn place(&mut self, id: &str) -> Result<(), IntentError> {
        let index = self
            .pool
            .iter()
            .position(|piece| piece.id == id)
            .ok_or_else(|| IntentError::PieceNotInPool(id.to_string()))?;
        let piece = self.pool.remove(index);
        self.placed.push(piece);
        Ok(())
    }

    /// Move the piece at `slot` of the answer back to the pool
    pub fn unplace(&mut self, slot: usize) -> Result<(), IntentError> {
        if slot >= self.placed.len() {
            return Err(IntentError::NoPlacedPiece(slot));
        }
        let piece = self.placed.remove(slot);
        self.pool.push(piece);
        self.pool.sort_by_key(|piece| piece.original_index);
        Ok(())
    }

    /// Return every placed piece to the pool
    pub fn clear(&mut self) {
        self.pool.append(&mut self.placed);
        self.pool.sort_by_key(|piece| piece.original_index);
    }

    /// The answer as submitted: placed words joined by spaces
    pub fn answer(&self) -> String {
        self.placed
            .iter()
            .map(|piece| piece.word.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
