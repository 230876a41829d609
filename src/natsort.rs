//! Natural (human) ordering for filenames.
//!
//! Splits a string into alternating text and number runs; number runs
//! compare by numeric value instead of character code, so `img1, img2,
//! img11` orders the way a person expects. A digit run followed by a dot
//! and more digits is one decimal token, so `img1.5` sorts between `img1.25`
//! and `img2`. The comparison is total and pure, which keeps sorting
//! deterministic, and runs of arbitrary length stay exact because magnitude
//! is compared by trimmed length before digits.

use std::cmp::Ordering;
use std::path::PathBuf;

/// One token of a natural sort key.
#[derive(Clone, Debug, PartialEq, Eq)]
enum NatToken {
    /// Number run, optionally with a decimal part. Leading zeros of the
    /// integer part are stripped into `zeros`; trailing zeros of the
    /// fractional part into `frac_zeros`. `"007.250"` →
    /// `{ zeros: 2, digits: "7", frac: "25", frac_zeros: 1 }`.
    Number {
        zeros: usize,
        digits: String,
        frac: String,
        frac_zeros: usize,
    },
    /// Non-digit run, compared lexically.
    Text(String),
}

impl NatToken {
    fn cmp_token(&self, other: &NatToken) -> Ordering {
        match (self, other) {
            (
                NatToken::Number {
                    zeros: za,
                    digits: da,
                    frac: fa,
                    frac_zeros: fza,
                },
                NatToken::Number {
                    zeros: zb,
                    digits: db,
                    frac: fb,
                    frac_zeros: fzb,
                },
            ) => {
                // Shorter trimmed digit strings are smaller integers; equal
                // lengths compare digit-by-digit. With the trailing zeros
                // trimmed, fractional parts order correctly under plain
                // lexical comparison ("125" < "25" < "5"). Stripped zeros
                // break exact numeric ties ("7" before "07", "1.5" before
                // "1.50") to keep the order strict.
                da.len()
                    .cmp(&db.len())
                    .then_with(|| da.cmp(db))
                    .then_with(|| fa.cmp(fb))
                    .then_with(|| za.cmp(zb))
                    .then_with(|| fza.cmp(fzb))
            }
            (NatToken::Text(a), NatToken::Text(b)) => a.cmp(b),
            // Numbers order before text at a kind mismatch.
            (NatToken::Number { .. }, NatToken::Text(_)) => Ordering::Less,
            (NatToken::Text(_), NatToken::Number { .. }) => Ordering::Greater,
        }
    }
}

/// Comparison key for natural ordering. Build once, sort by [`NatKey::cmp`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NatKey {
    tokens: Vec<NatToken>,
}

impl NatKey {
    /// Tokenize a string into its natural sort key. Empty strings and
    /// strings without digits degrade to pure lexical comparison.
    pub fn from_str(s: &str) -> Self {
        let mut tokens = Vec::new();
        let mut chars = s.chars().peekable();
        while let Some(&c) = chars.peek() {
            if c.is_ascii_digit() {
                let mut run = String::new();
                while let Some(&d) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    run.push(d);
                    chars.next();
                }
                // A dot directly after a digit run starts a decimal part.
                let mut frac_run = String::new();
                if chars.peek() == Some(&'.') {
                    chars.next();
                    while let Some(&d) = chars.peek() {
                        if !d.is_ascii_digit() {
                            break;
                        }
                        frac_run.push(d);
                        chars.next();
                    }
                }
                let trimmed = run.trim_start_matches('0');
                let frac_trimmed = frac_run.trim_end_matches('0');
                tokens.push(NatToken::Number {
                    zeros: run.len() - trimmed.len(),
                    digits: trimmed.to_string(),
                    frac: frac_trimmed.to_string(),
                    frac_zeros: frac_run.len() - frac_trimmed.len(),
                });
            } else {
                let mut run = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        break;
                    }
                    run.push(d);
                    chars.next();
                }
                tokens.push(NatToken::Text(run));
            }
        }
        Self { tokens }
    }
}

impl Ord for NatKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let mut a = self.tokens.iter();
        let mut b = other.tokens.iter();
        loop {
            match (a.next(), b.next()) {
                (Some(ta), Some(tb)) => {
                    let ord = ta.cmp_token(tb);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                (Some(_), None) => return Ordering::Greater,
                (None, Some(_)) => return Ordering::Less,
                (None, None) => return Ordering::Equal,
            }
        }
    }
}

impl PartialOrd for NatKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compare two strings with natural ordering.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    NatKey::from_str(a).cmp(&NatKey::from_str(b))
}

/// Sort a path list by the natural key of each file name (falling back to
/// the whole path when there is no file name). Stable.
pub fn sort_paths_naturally(paths: &mut [PathBuf]) {
    paths.sort_by_cached_key(|p| {
        let name = p
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| p.to_string_lossy().into_owned());
        NatKey::from_str(&name)
    });
}
