//! Turns endpoint fragments into the text that travels along the chain.

use regex::Regex;
use std::sync::LazyLock;

/// Characters after which the next letter starts a new sentence.
const SENTENCE_BREAKS: [char; 5] = ['.', '?', '!', '\n', '\t'];

// General categories L (letters) and Nd (decimal digits). `char::is_alphabetic`
// and `char::is_numeric` also take letter numbers, fractions and marks.
static LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\p{L}$").expect("letter pattern"));
static DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\p{Nd}$").expect("digit pattern"));

fn is_letter(c: char) -> bool {
    LETTER.is_match(c.encode_utf8(&mut [0; 4]))
}

fn is_digit(c: char) -> bool {
    DIGIT.is_match(c.encode_utf8(&mut [0; 4]))
}

/// Concatenates the translated fragments of a response in order. Missing or
/// empty fragments contribute nothing.
pub fn join_segments<'a, I>(segments: I) -> String
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    segments
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect()
}

/// Trims `text`. With `full`, also lower-cases it and re-capitalises the first
/// letter of the text and of every sentence.
///
/// A digit ends the wait for a capital just like a letter does, so `"3 cats"`
/// stays lower case.
pub fn normalize(text: &str, full: bool) -> String {
    let text = text.trim();
    if !full {
        return text.to_owned();
    }

    let mut awaiting_capital = true;
    let mut output = String::with_capacity(text.len());
    for c in text.to_lowercase().chars() {
        if awaiting_capital && is_letter(c) {
            push_capital(&mut output, c);
            awaiting_capital = false;
        } else {
            output.push(c);
            if awaiting_capital && is_digit(c) {
                awaiting_capital = false;
            }
        }
        if SENTENCE_BREAKS.contains(&c) {
            awaiting_capital = true;
        }
    }
    output
}

// Letters whose upper case expands to several chars (e.g. 'ß') are left alone,
// otherwise a second pass would not reproduce the first.
fn push_capital(output: &mut String, c: char) {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => output.push(u),
        _ => output.push(c),
    }
}
