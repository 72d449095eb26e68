//! Handoff codes exchanged between actors out of band.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::order::OrderError;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Longest code accepted from checkout.
pub const MAX_CODE_LEN: usize = 32;

/// A short alphanumeric secret: the pickup code a driver shows the merchant,
/// or the delivery code the customer gives the driver.
///
/// Codes are only unique per order. Nothing checks for collisions between
/// open orders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HandoffCode(String);

impl HandoffCode {
    /// Accepts a trimmed, non-empty ASCII alphanumeric string of at most
    /// [`MAX_CODE_LEN`] characters. Case is preserved.
    pub fn parse(raw: &str) -> Result<Self, OrderError> {
        let code = raw.trim();
        if code.is_empty()
            || code.len() > MAX_CODE_LEN
            || !code.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(OrderError::InvalidCode {
                code: raw.to_string(),
            });
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Pickup codes are compared without regard to case.
    pub fn matches_ignore_case(&self, supplied: &str) -> bool {
        self.0.eq_ignore_ascii_case(supplied.trim())
    }

    /// Delivery codes must match byte for byte.
    pub fn matches_exact(&self, supplied: &str) -> bool {
        self.0 == supplied
    }
}

impl std::fmt::Display for HandoffCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for HandoffCode {
    type Error = OrderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HandoffCode> for String {
    fn from(code: HandoffCode) -> Self {
        code.0
    }
}

/// Source of fresh handoff codes.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> HandoffCode;
}

/// Uppercase alphanumeric codes drawn from the thread-local RNG.
#[derive(Debug, Clone, Copy)]
pub struct RandomCodeGenerator {
    length: usize,
}

impl RandomCodeGenerator {
    pub const DEFAULT_LENGTH: usize = 6;
    pub const MIN_LENGTH: usize = 4;
    pub const MAX_LENGTH: usize = 12;

    /// `length` is clamped to `MIN_LENGTH..=MAX_LENGTH`.
    pub fn new(length: usize) -> Self {
        Self {
            length: length.clamp(Self::MIN_LENGTH, Self::MAX_LENGTH),
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for RandomCodeGenerator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LENGTH)
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> HandoffCode {
        let mut rng = rand::thread_rng();
        let code: String = (0..self.length)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        HandoffCode(code)
    }
}

/// Hands out the same code every time. Useful when a test needs to know the
/// pickup code in advance.
#[derive(Debug, Clone)]
pub struct FixedCodeGenerator(HandoffCode);

impl FixedCodeGenerator {
    pub fn new(code: HandoffCode) -> Self {
        Self(code)
    }
}

impl CodeGenerator for FixedCodeGenerator {
    fn generate(&self) -> HandoffCode {
        self.0.clone()
    }
}
