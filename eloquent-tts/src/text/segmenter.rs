//! Paragraph and clause segmentation
//!
//! Paragraphs are the non-blank lines of the input, whitespace included. Each
//! paragraph is scanned left to right for delimiter tokens, in priority order:
//!
//! | token | class |
//! |---|---|
//! | `…`, or a run of three or more `.` | Ellipsis |
//! | run of `.!?;` (only `;` => Comma) | SentenceEnd |
//! | `—` | Dash |
//! | `,` | Comma |
//! | `-` followed by whitespace | Dash |
//!
//! A clause is the text up to and including its delimiter. Trailing text
//! without a delimiter becomes a final clause of class `None`; trailing
//! whitespace after the last delimiter stays on that delimiter. Concatenating
//! `text()` over one paragraph's clauses reproduces the paragraph exactly.

use std::fmt;

/// Punctuation class of a clause's trailing delimiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PunctuationClass {
    /// `,` or `;`
    Comma,
    /// `.`, `!`, `?` (non-ellipsis)
    SentenceEnd,
    /// `...` or `…`
    Ellipsis,
    /// `—` or hyphen break
    Dash,
    /// No terminal punctuation
    None,
}

impl fmt::Display for PunctuationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PunctuationClass::Comma => "comma",
            PunctuationClass::SentenceEnd => "sentence_end",
            PunctuationClass::Ellipsis => "ellipsis",
            PunctuationClass::Dash => "dash",
            PunctuationClass::None => "none",
        };
        f.write_str(name)
    }
}

/// One clause as found in the text
#[derive(Debug, Clone, PartialEq)]
pub struct ClauseSpan<'a> {
    /// Position of this clause in the whole job
    pub index: usize,
    /// Paragraph index (blank paragraphs are not counted)
    pub paragraph: usize,
    /// Text before the delimiter
    pub body: &'a str,
    /// Trailing delimiter token (empty for class `None`), plus any whitespace
    /// that ends the paragraph
    pub delimiter: &'a str,
    pub class: PunctuationClass,
    /// Last clause of its paragraph
    pub is_paragraph_final: bool,
    /// Clause belongs to the last paragraph of the text
    pub is_last_paragraph: bool,
}

impl ClauseSpan<'_> {
    /// Clause text including its delimiter
    pub fn text(&self) -> String {
        format!("{}{}", self.body, self.delimiter)
    }

    /// Whether the clause has anything to pronounce
    pub fn is_speakable(&self) -> bool {
        self.body.chars().any(char::is_alphanumeric)
    }
}

/// Lazy clause iterator over one text
///
/// Single pass: the iterator is consumed by the dispatcher and cannot be
/// restarted.
#[derive(Debug)]
pub struct Segments<'a> {
    paragraphs: Vec<&'a str>,
    paragraph: usize,
    pos: usize,
    next_index: usize,
}

/// Split text into clauses
pub fn segment(text: &str) -> Segments<'_> {
    let paragraphs = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();

    Segments {
        paragraphs,
        paragraph: 0,
        pos: 0,
        next_index: 0,
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = ClauseSpan<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let paragraph = *self.paragraphs.get(self.paragraph)?;
            if self.pos >= paragraph.len() {
                self.paragraph += 1;
                self.pos = 0;
                continue;
            }

            let rest = &paragraph[self.pos..];
            let (body_len, mut delimiter_len, class) =
                find_delimiter(rest).unwrap_or((rest.len(), 0, PunctuationClass::None));
            let tail = &rest[body_len + delimiter_len..];
            if tail.trim().is_empty() {
                delimiter_len += tail.len();
            }

            let body = &rest[..body_len];
            let delimiter = &rest[body_len..body_len + delimiter_len];
            self.pos += body_len + delimiter_len;

            let span = ClauseSpan {
                index: self.next_index,
                paragraph: self.paragraph,
                body,
                delimiter,
                class,
                is_paragraph_final: self.pos >= paragraph.len(),
                is_last_paragraph: self.paragraph + 1 == self.paragraphs.len(),
            };
            self.next_index += 1;
            return Some(span);
        }
    }
}

/// First delimiter in `text`: (body length, delimiter length, class)
fn find_delimiter(text: &str) -> Option<(usize, usize, PunctuationClass)> {
    text.char_indices()
        .find_map(|(i, _)| match_delimiter(&text[i..]).map(|(len, class)| (i, len, class)))
}

/// Delimiter token at the start of `s`: (byte length, class)
fn match_delimiter(s: &str) -> Option<(usize, PunctuationClass)> {
    let first = s.chars().next()?;

    if first == '.' || first == '…' {
        let len = run_len(s, |c| c == '.' || c == '…');
        let token = &s[..len];
        if token.contains('…') || token.len() >= 3 {
            return Some((len, PunctuationClass::Ellipsis));
        }
    }

    if is_terminal(first) {
        let len = run_len(s, is_terminal);
        let class = if s[..len].chars().all(|c| c == ';') {
            PunctuationClass::Comma
        } else {
            PunctuationClass::SentenceEnd
        };
        return Some((len, class));
    }

    match first {
        '—' => Some((first.len_utf8(), PunctuationClass::Dash)),
        ',' => Some((1, PunctuationClass::Comma)),
        '-' if s[1..].starts_with(char::is_whitespace) => Some((1, PunctuationClass::Dash)),
        _ => None,
    }
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | ';')
}

fn run_len(s: &str, pred: impl Fn(char) -> bool) -> usize {
    s.char_indices()
        .find(|&(_, c)| !pred(c))
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}
