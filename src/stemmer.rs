// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Porter stemming algorithm
//!
//! Five rewrite steps:
//! 1. Plurals and -ed/-ing suffixes, terminal y → i
//! 2. Double suffixes: -ational → -ate, -tional → -tion, ...
//! 3. -icate → -ic, -ative → "", ...
//! 4. Remove -al, -ance, -ence, ... when the stem is long enough
//! 5. Remove a final -e and reduce -ll
//!
//! Operates on lowercase ASCII words; anything else is returned unchanged.

/// Stateless Porter stemmer
#[derive(Debug, Clone, Copy, Default)]
pub struct PorterStemmer;

const STEP2_SUFFIXES: &[(&str, &str)] = &[
    ("ational", "ate"),
    ("tional", "tion"),
    ("enci", "ence"),
    ("anci", "ance"),
    ("izer", "ize"),
    ("abli", "able"),
    ("alli", "al"),
    ("entli", "ent"),
    ("eli", "e"),
    ("ousli", "ous"),
    ("ization", "ize"),
    ("ation", "ate"),
    ("ator", "ate"),
    ("alism", "al"),
    ("iveness", "ive"),
    ("fulness", "ful"),
    ("ousness", "ous"),
    ("aliti", "al"),
    ("iviti", "ive"),
    ("biliti", "ble"),
];

const STEP3_SUFFIXES: &[(&str, &str)] = &[
    ("icate", "ic"),
    ("ative", ""),
    ("alize", "al"),
    ("iciti", "ic"),
    ("ical", "ic"),
    ("ful", ""),
    ("ness", ""),
];

const STEP4_SUFFIXES: &[&str] = &[
    "al", "ance", "ence", "er", "ic", "able", "ible", "ant", "ement", "ment", "ent", "ion", "ou",
    "ism", "ate", "iti", "ous", "ive", "ize",
];

impl PorterStemmer {
    pub fn new() -> Self {
        Self
    }

    /// Reduce `word` to its Porter stem
    pub fn stem(&self, word: &str) -> String {
        if word.len() <= 2 || !word.bytes().all(|b| b.is_ascii_lowercase()) {
            return word.to_string();
        }

        let mut w = word.as_bytes().to_vec();
        step1a(&mut w);
        step1b(&mut w);
        step1c(&mut w);
        step2(&mut w);
        step3(&mut w);
        step4(&mut w);
        step5(&mut w);

        // Only ASCII bytes are ever written back
        String::from_utf8(w).unwrap_or_else(|_| word.to_string())
    }

    /// Stem repeatedly until the result is its own stem
    ///
    /// A single pass is not a fixed point ("agreed" → "agre" → "agr").
    /// Terminates: no pass lengthens a word, and same-length rewrites only
    /// turn a final y into i or i into e.
    pub fn stem_stable(&self, word: &str) -> String {
        let mut current = self.stem(word);
        loop {
            let next = self.stem(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }
}

fn is_consonant(w: &[u8], i: usize) -> bool {
    match w[i] {
        b'a' | b'e' | b'i' | b'o' | b'u' => false,
        b'y' => i == 0 || !is_consonant(w, i - 1),
        _ => true,
    }
}

/// Number of vowel-consonant sequences, `m` in `[C](VC)^m[V]`
fn measure(w: &[u8]) -> usize {
    let n = w.len();
    let mut i = 0;
    let mut m = 0;

    while i < n && is_consonant(w, i) {
        i += 1;
    }

    loop {
        while i < n && !is_consonant(w, i) {
            i += 1;
        }
        if i >= n {
            break;
        }
        while i < n && is_consonant(w, i) {
            i += 1;
        }
        m += 1;
    }

    m
}

fn has_vowel(w: &[u8]) -> bool {
    (0..w.len()).any(|i| !is_consonant(w, i))
}

fn ends_double_consonant(w: &[u8]) -> bool {
    let len = w.len();
    len >= 2 && w[len - 1] == w[len - 2] && is_consonant(w, len - 1)
}

/// consonant-vowel-consonant ending where the last consonant is not w, x or y
fn ends_cvc(w: &[u8]) -> bool {
    let len = w.len();
    len >= 3
        && is_consonant(w, len - 3)
        && !is_consonant(w, len - 2)
        && is_consonant(w, len - 1)
        && !matches!(w[len - 1], b'w' | b'x' | b'y')
}

fn ends_with(w: &[u8], suffix: &str) -> bool {
    w.ends_with(suffix.as_bytes())
}

fn replace_suffix(w: &mut Vec<u8>, suffix_len: usize, replacement: &str) {
    w.truncate(w.len() - suffix_len);
    w.extend_from_slice(replacement.as_bytes());
}

fn step1a(w: &mut Vec<u8>) {
    if ends_with(w, "sses") || ends_with(w, "ies") {
        w.truncate(w.len() - 2);
    } else if ends_with(w, "ss") {
        // unchanged
    } else if ends_with(w, "s") {
        w.pop();
    }
}

fn step1b(w: &mut Vec<u8>) {
    if ends_with(w, "eed") {
        if measure(&w[..w.len() - 3]) > 0 {
            w.pop();
        }
        return;
    }

    let stripped = if ends_with(w, "ed") && has_vowel(&w[..w.len() - 2]) {
        w.truncate(w.len() - 2);
        true
    } else if ends_with(w, "ing") && has_vowel(&w[..w.len() - 3]) {
        w.truncate(w.len() - 3);
        true
    } else {
        false
    };

    if !stripped {
        return;
    }

    if ends_with(w, "at") || ends_with(w, "bl") || ends_with(w, "iz") {
        w.push(b'e');
    } else if ends_double_consonant(w) && !matches!(w[w.len() - 1], b'l' | b's' | b'z') {
        w.pop();
    } else if measure(w) == 1 && ends_cvc(w) {
        w.push(b'e');
    }
}

fn step1c(w: &mut [u8]) {
    let len = w.len();
    if ends_with(w, "y") && has_vowel(&w[..len - 1]) {
        w[len - 1] = b'i';
    }
}

/// Apply the first matching suffix rule when the remaining stem has `m > 0`
fn apply_rules(w: &mut Vec<u8>, rules: &[(&str, &str)]) {
    if let Some((suffix, replacement)) = rules.iter().find(|(suffix, _)| ends_with(w, suffix)) {
        if measure(&w[..w.len() - suffix.len()]) > 0 {
            replace_suffix(w, suffix.len(), replacement);
        }
    }
}

fn step2(w: &mut Vec<u8>) {
    apply_rules(w, STEP2_SUFFIXES);
}

fn step3(w: &mut Vec<u8>) {
    apply_rules(w, STEP3_SUFFIXES);
}

fn step4(w: &mut Vec<u8>) {
    let matched = STEP4_SUFFIXES.iter().find(|suffix| {
        if !ends_with(w, suffix) {
            return false;
        }
        if **suffix == "ion" {
            let stem = &w[..w.len() - 3];
            return matches!(stem.last(), Some(b's') | Some(b't'));
        }
        true
    });

    if let Some(suffix) = matched {
        let stem_len = w.len() - suffix.len();
        if measure(&w[..stem_len]) > 1 {
            w.truncate(stem_len);
        }
    }
}

fn step5(w: &mut Vec<u8>) {
    if ends_with(w, "e") {
        let stem = &w[..w.len() - 1];
        let m = measure(stem);
        if m > 1 || (m == 1 && !ends_cvc(stem)) {
            w.pop();
        }
    }

    if measure(w) > 1 && ends_double_consonant(w) && ends_with(w, "l") {
        w.pop();
    }
}
