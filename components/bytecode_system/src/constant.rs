//! Constant pool entries

use std::fmt;
use std::rc::Rc;

/// A literal stored in a chunk's constant pool.
#[derive(Debug, Clone)]
pub enum Constant {
    /// JavaScript number (IEEE 754 double)
    Number(f64),
    /// JavaScript string
    String(Rc<str>),
}

impl Constant {
    /// Identity used for pool deduplication. Numbers compare by bit pattern
    /// so `0` and `-0` (and distinct NaN payloads) stay separate entries.
    pub fn same_entry(&self, other: &Constant) -> bool {
        match (self, other) {
            (Constant::Number(a), Constant::Number(b)) => a.to_bits() == b.to_bits(),
            (Constant::String(a), Constant::String(b)) => a == b,
            _ => false,
        }
    }

    /// Try to get the number value
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Constant::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Try to get the string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Constant::String(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for Constant {
    fn eq(&self, other: &Self) -> bool {
        self.same_entry(other)
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Number(n) => write!(f, "{}", n),
            Constant::String(s) => write!(f, "{:?}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_zero_is_distinct_entry() {
        assert!(!Constant::Number(0.0).same_entry(&Constant::Number(-0.0)));
        assert!(Constant::Number(f64::NAN).same_entry(&Constant::Number(f64::NAN)));
    }
}
