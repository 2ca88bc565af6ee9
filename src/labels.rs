//! EasyMotion jump labels.
//!
//! Candidates arrive sorted nearest-first. Up to 26 candidates get one letter
//! each. Beyond that, `P` leading letters are reserved as prefixes for
//! two-letter labels and the nearest `26 - P` candidates keep single letters
//! from the rest of the alphabet, so the closest targets stay one keystroke
//! away.

#[cfg(test)]
#[path = "labels_test.rs"]
mod labels_test;

use crate::camera::Point;

const ALPHABET: [char; 26] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w',
    'x', 'y', 'z',
];

/// Number of prefix letters reserved for `n` candidates.
#[must_use]
pub fn reserved_prefixes(n: usize) -> usize {
    if n <= ALPHABET.len() {
        return 0;
    }
    (n - ALPHABET.len()).div_ceil(ALPHABET.len() - 1).min(ALPHABET.len())
}

/// Assign labels to `ids` (nearest first). Candidates past `26 * 26` get none.
#[must_use]
pub fn generate_labels<T: Copy>(ids: &[T]) -> Vec<(String, T)> {
    let n = ids.len();
    if n <= ALPHABET.len() {
        return ids.iter().zip(ALPHABET).map(|(id, c)| (c.to_string(), *id)).collect();
    }

    let prefixes = reserved_prefixes(n);
    let singles = ALPHABET.len() - prefixes;
    let mut out = Vec::with_capacity(n);
    for (id, c) in ids.iter().zip(&ALPHABET[prefixes..]) {
        out.push((c.to_string(), *id));
    }
    for (k, id) in ids.iter().skip(singles).enumerate().take(prefixes * ALPHABET.len()) {
        let label: String = [ALPHABET[k / ALPHABET.len()], ALPHABET[k % ALPHABET.len()]].iter().collect();
        out.push((label, *id));
    }
    out
}

/// Order candidates by ascending distance from `reference`. Ties keep input order.
#[must_use]
pub fn sort_by_distance<T: Copy>(candidates: &[(T, Point)], reference: Point) -> Vec<T> {
    let mut scored: Vec<(f64, T)> = candidates.iter().map(|(id, pt)| (pt.distance(reference), *id)).collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));
    scored.into_iter().map(|(_, id)| id).collect()
}

/// Result of feeding one key to an active EasyMotion session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome<T> {
    /// The key started a two-letter label; session stays active.
    Buffered,
    /// A label matched; select the target and leave EasyMotion.
    Jump(T),
    /// No match; leave EasyMotion with the selection untouched.
    Exit,
}

/// An active EasyMotion session: the label table plus the pending prefix.
#[derive(Debug, Clone)]
pub struct EasyMotion<T> {
    labels: Vec<(String, T)>,
    buffer: Option<char>,
}

impl<T: Copy> EasyMotion<T> {
    /// Start a session over `ids`, nearest first.
    #[must_use]
    pub fn new(ids: &[T]) -> Self {
        Self { labels: generate_labels(ids), buffer: None }
    }

    #[must_use]
    pub fn labels(&self) -> &[(String, T)] {
        &self.labels
    }

    /// The prefix typed so far, if any.
    #[must_use]
    pub fn buffer(&self) -> Option<char> {
        self.buffer
    }

    /// Label assigned to `id`, if any.
    #[must_use]
    pub fn label_for(&self, id: T) -> Option<&str>
    where
        T: PartialEq,
    {
        self.labels.iter().find(|(_, t)| *t == id).map(|(l, _)| l.as_str())
    }

    /// Feed one key.
    pub fn handle_key(&mut self, key: char) -> KeyOutcome<T> {
        match self.buffer.take() {
            None => {
                if let Some(target) = self.lookup(&key.to_string()) {
                    return KeyOutcome::Jump(target);
                }
                let is_prefix = self.labels.iter().any(|(l, _)| l.len() == 2 && l.starts_with(key));
                if is_prefix {
                    self.buffer = Some(key);
                    KeyOutcome::Buffered
                } else {
                    KeyOutcome::Exit
                }
            }
            Some(prefix) => {
                let label: String = [prefix, key].iter().collect();
                match self.lookup(&label) {
                    Some(target) => KeyOutcome::Jump(target),
                    None => KeyOutcome::Exit,
                }
            }
        }
    }

    fn lookup(&self, label: &str) -> Option<T> {
        self.labels.iter().find(|(l, _)| l == label).map(|(_, id)| *id)
    }
}
