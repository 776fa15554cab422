//! Random join codes, plus a scripted generator for deterministic flows.

use crate::domain::{CODE_ALPHABET, CODE_LENGTH, JoinCode};
use crate::ports::CodeGenerator;
use rand::Rng;
use std::sync::Mutex;

/// Draws each of the 6 characters uniformly from `A-Z0-9` using the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCodeGenerator;

impl RandomCodeGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> JoinCode {
        let mut rng = rand::rng();
        let code: String = (0..CODE_LENGTH)
            .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        // Every symbol comes from the alphabet, so the strict parse cannot fail.
        JoinCode::parse(&code).unwrap_or_else(|_| unreachable!("generated code {code} is valid"))
    }
}

/// Replays a fixed list of codes in order, repeating the last one once exhausted.
pub struct SequenceCodeGenerator {
    codes: Vec<JoinCode>,
    next: Mutex<usize>,
}

impl SequenceCodeGenerator {
    /// # Panics
    /// If `codes` is empty.
    pub fn new(codes: Vec<JoinCode>) -> Self {
        assert!(!codes.is_empty(), "SequenceCodeGenerator needs at least one code");
        Self {
            codes,
            next: Mutex::new(0),
        }
    }
}

impl CodeGenerator for SequenceCodeGenerator {
    fn generate(&self) -> JoinCode {
        let mut next = self.next.lock().unwrap_or_else(|e| e.into_inner());
        let idx = (*next).min(self.codes.len() - 1);
        *next += 1;
        self.codes[idx].clone()
    }
}
