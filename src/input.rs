use std::collections::HashSet;

use log::warn;

use crate::error::InvalidCount;

/// Set of logical keys currently held down, keyed by lowercase name.
///
/// Key names follow the browser `KeyboardEvent.key` vocabulary (`"q"`,
/// `"arrowleft"`, ...). Writes are last-writer-wins per key, so a burst of
/// press/release events between two ticks collapses to the final state.
#[derive(Debug, Clone, Default)]
pub struct KeyInputState {
    held: HashSet<String>,
}

impl KeyInputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_held(&mut self, key: &str, held: bool) {
        let key = key.to_lowercase();
        if held {
            self.held.insert(key);
        } else {
            self.held.remove(&key);
        }
    }

    pub fn is_held(&self, key: &str) -> bool {
        if key.chars().any(char::is_uppercase) {
            self.held.contains(&key.to_lowercase())
        } else {
            self.held.contains(key)
        }
    }

    /// True when at least one of `keys` is held.
    pub fn any_held<S: AsRef<str>>(&self, keys: &[S]) -> bool {
        keys.iter().any(|key| self.is_held(key.as_ref()))
    }

    /// Releases every key, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.held.clear();
    }

    pub fn held_keys(&self) -> impl Iterator<Item = &str> {
        self.held.iter().map(String::as_str)
    }
}

/// Validates a raw numeric count coming from a UI control.
///
/// Fractional values are truncated toward zero. NaN, negative, infinite and
/// over-limit values are rejected.
pub fn validate_count(raw: f64, max: usize) -> Result<usize, InvalidCount> {
    if raw.is_nan() {
        return Err(InvalidCount::NotANumber(raw.to_string()));
    }
    if raw < 0.0 {
        return Err(InvalidCount::Negative(raw));
    }
    let whole = raw.trunc();
    if whole > max as f64 {
        return Err(InvalidCount::TooLarge {
            requested: whole,
            max,
        });
    }
    Ok(whole as usize)
}

/// Parses the text of a numeric input box the way `parseInt(text, 10)` does:
/// leading whitespace and an optional sign, then the longest run of digits.
/// Trailing garbage (including a fractional part) is ignored.
pub fn parse_requested_count(text: &str, max: usize) -> Result<usize, InvalidCount> {
    let trimmed = text.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return Err(InvalidCount::NotANumber(text.to_string()));
    }
    let magnitude: f64 = rest[..digits_len]
        .parse()
        .map_err(|_| InvalidCount::NotANumber(text.to_string()))?;
    let value = if negative { -magnitude } else { magnitude };
    validate_count(value, max)
}

/// Text buffer backing the "number of models" control.
///
/// Every edit re-parses the buffer. Valid values replace the requested count;
/// invalid ones are reported and the previous request is kept.
#[derive(Debug, Clone)]
pub struct CountField {
    text: String,
    requested: Option<usize>,
    max: usize,
}

impl CountField {
    pub fn new(max: usize) -> Self {
        Self {
            text: String::new(),
            requested: None,
            max,
        }
    }

    /// Seeds the field with an initial request (e.g. from the command line).
    pub fn with_text(max: usize, text: &str) -> Self {
        let mut field = Self::new(max);
        field.text = text.to_string();
        if let Err(err) = field.reparse() {
            warn!("ignoring initial instance count {text:?}: {err}");
        }
        field
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Last valid count entered, if any.
    pub fn requested(&self) -> Option<usize> {
        self.requested
    }

    /// Appends a typed character. Only characters a number box accepts are
    /// taken; returns `None` when the character was ignored.
    pub fn push(&mut self, ch: char) -> Option<Result<usize, InvalidCount>> {
        if !(ch.is_ascii_digit() || ch == '-' || ch == '.') {
            return None;
        }
        self.text.push(ch);
        Some(self.reparse())
    }

    pub fn backspace(&mut self) -> Option<Result<usize, InvalidCount>> {
        self.text.pop()?;
        Some(self.reparse())
    }

    pub fn reparse(&mut self) -> Result<usize, InvalidCount> {
        let parsed = parse_requested_count(&self.text, self.max);
        if let Ok(count) = parsed {
            self.requested = Some(count);
        }
        parsed
    }
}
