//! # Content Debloating
//!
//! Best-effort size reduction of submitted JavaScript before it is stored.
//!
//! [`debloat`] never fails: when the [`Minifier`] reports an error, or would
//! not make the text smaller, the original text is returned unchanged. The
//! minified output is not re-validated here.
//!
//! [`JsMinifier`] is deliberately conservative. It strips comments and
//! redundant whitespace but never rewrites tokens:
//!
//! - line breaks collapse to a single `\n` instead of disappearing, so
//!   automatic semicolon insertion sees the same program
//! - a single space survives wherever dropping it would glue two tokens
//!   together (`return x`, `a + +b`, `1 .toString()`)
//! - string, template and regular expression literals are copied verbatim,
//!   and a regex literal keeps the space before a following word so its
//!   flags never absorb an operator such as `instanceof`
//! - `/` after the closing parenthesis of an `if`, `while`, `for` or `with`
//!   head starts a regular expression
//!
//! Minifying its own output is a no-op.

use tracing::{debug, warn};

/// Errors reported by a [`Minifier`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MinifyError {
    #[error("unterminated string literal starting at offset {0}")]
    UnterminatedString(usize),

    #[error("unterminated template literal starting at offset {0}")]
    UnterminatedTemplate(usize),

    #[error("unterminated regular expression starting at offset {0}")]
    UnterminatedRegex(usize),

    #[error("unterminated block comment starting at offset {0}")]
    UnterminatedComment(usize),

    #[error("minifier failed: {0}")]
    Other(String),
}

/// A source-to-source minifier.
pub trait Minifier: Send + Sync {
    fn minify(&self, source: &str) -> Result<String, MinifyError>;
}

/// Minify `source`, falling back to the original text on any failure.
pub fn debloat(minifier: &dyn Minifier, source: &str) -> String {
    match minifier.minify(source) {
        Ok(minified) if minified.len() <= source.len() => {
            debug!(
                original = source.len(),
                minified = minified.len(),
                "Content debloated"
            );
            minified
        }
        Ok(minified) => {
            debug!(
                original = source.len(),
                minified = minified.len(),
                "Minified output larger than input, keeping original"
            );
            source.to_string()
        }
        Err(e) => {
            warn!(error = %e, size = source.len(), "Debloat failed, storing content unchanged");
            source.to_string()
        }
    }
}

/// Whitespace and comment stripping JavaScript minifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsMinifier;

impl Minifier for JsMinifier {
    fn minify(&self, source: &str) -> Result<String, MinifyError> {
        Scanner::new(source).run()
    }
}

/// Keywords after which a `/` starts a regular expression, not a division.
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "case",
    "do",
    "else",
    "in",
    "new",
    "delete",
    "void",
    "throw",
    "yield",
    "await",
];

/// Punctuation after which a `/` starts a regular expression.
const REGEX_PRECEDING_PUNCT: &str = "(,=:[!&|?{};+-*%<>~^";

/// Keywords whose parenthesised head is followed by a statement.
const CONTROL_KEYWORDS: &[&str] = &["if", "while", "for", "with"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gap {
    None,
    Space,
    Newline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Prev {
    Start,
    Word(String),
    Punct(char),
    /// `)` closing the head of a control statement
    ControlParen,
    Regex,
    Literal,
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    out: String,
    gap: Gap,
    prev: Prev,
    /// One entry per open `(`, true when it opened a control statement head
    parens: Vec<bool>,
}

impl Scanner {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            out: String::with_capacity(source.len()),
            gap: Gap::None,
            prev: Prev::Start,
            parens: Vec::new(),
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn run(mut self) -> Result<String, MinifyError> {
        if self.peek(0) == Some('#') && self.peek(1) == Some('!') {
            while let Some(c) = self.peek(0) {
                if c == '\n' {
                    break;
                }
                self.out.push(c);
                self.pos += 1;
            }
        }

        while let Some(c) = self.peek(0) {
            match c {
                '\n' | '\r' | '\u{2028}' | '\u{2029}' => {
                    self.gap = Gap::Newline;
                    self.pos += 1;
                }
                c if c.is_whitespace() || c == '\u{feff}' => {
                    self.soft_gap();
                    self.pos += 1;
                }
                '/' if self.peek(1) == Some('/') => self.skip_line_comment(),
                '/' if self.peek(1) == Some('*') => self.skip_block_comment()?,
                '/' if self.regex_allowed() => {
                    self.begin_token('/');
                    self.copy_regex()?;
                    self.prev = Prev::Regex;
                }
                '\'' | '"' => {
                    self.begin_token(c);
                    self.copy_string(c)?;
                    self.prev = Prev::Literal;
                }
                '`' => {
                    self.begin_token(c);
                    self.copy_template()?;
                    self.prev = Prev::Literal;
                }
                c if is_word_char(c) => {
                    self.begin_token(c);
                    let start = self.pos;
                    while self.peek(0).is_some_and(is_word_char) {
                        self.pos += 1;
                    }
                    let word: String = self.chars[start..self.pos].iter().collect();
                    self.out.push_str(&word);
                    self.prev = Prev::Word(word);
                }
                c => {
                    self.begin_token(c);
                    self.out.push(c);
                    self.pos += 1;
                    self.prev = self.punct(c);
                }
            }
        }

        Ok(self.out)
    }

    /// Track parentheses so a control statement head can be told apart
    /// from a parenthesised expression.
    fn punct(&mut self, c: char) -> Prev {
        match c {
            '(' => {
                let control = matches!(
                    &self.prev,
                    Prev::Word(word) if CONTROL_KEYWORDS.contains(&word.as_str())
                );
                self.parens.push(control);
                Prev::Punct(c)
            }
            ')' if self.parens.pop() == Some(true) => Prev::ControlParen,
            _ => Prev::Punct(c),
        }
    }

    fn soft_gap(&mut self) {
        if self.gap == Gap::None {
            self.gap = Gap::Space;
        }
    }

    /// Emit whatever separator the pending gap requires before `next`.
    fn begin_token(&mut self, next: char) {
        let gap = std::mem::replace(&mut self.gap, Gap::None);
        let Some(last) = self.out.chars().last() else {
            return;
        };
        let after_regex = self.prev == Prev::Regex && is_word_char(next);
        match gap {
            Gap::Newline => self.out.push('\n'),
            Gap::Space if after_regex || needs_space(last, next) => self.out.push(' '),
            _ => {}
        }
    }

    fn regex_allowed(&self) -> bool {
        match &self.prev {
            Prev::Start => true,
            Prev::Punct(c) => REGEX_PRECEDING_PUNCT.contains(*c),
            Prev::Word(word) => REGEX_PRECEDING_KEYWORDS.contains(&word.as_str()),
            Prev::ControlParen => true,
            Prev::Regex | Prev::Literal => false,
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek(0) {
            if matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}') {
                break;
            }
            self.pos += 1;
        }
        self.soft_gap();
    }

    fn skip_block_comment(&mut self) -> Result<(), MinifyError> {
        let start = self.pos;
        self.pos += 2;
        let mut saw_newline = false;
        loop {
            match self.peek(0) {
                None => return Err(MinifyError::UnterminatedComment(start)),
                Some('*') if self.peek(1) == Some('/') => {
                    self.pos += 2;
                    break;
                }
                Some(c) => {
                    saw_newline |= matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}');
                    self.pos += 1;
                }
            }
        }
        if saw_newline {
            self.gap = Gap::Newline;
        } else {
            self.soft_gap();
        }
        Ok(())
    }

    /// Copy one character verbatim, failing with `err` at end of input.
    fn copy_one(&mut self, err: MinifyError) -> Result<char, MinifyError> {
        let c = self.peek(0).ok_or(err)?;
        self.out.push(c);
        self.pos += 1;
        Ok(c)
    }

    fn copy_string(&mut self, quote: char) -> Result<(), MinifyError> {
        let start = self.pos;
        let unterminated = MinifyError::UnterminatedString(start);
        self.copy_one(unterminated.clone())?;
        loop {
            match self.peek(0) {
                Some('\\') => {
                    self.copy_one(unterminated.clone())?;
                    self.copy_one(unterminated.clone())?;
                }
                Some('\n' | '\r') | None => return Err(unterminated),
                Some(c) => {
                    self.copy_one(unterminated.clone())?;
                    if c == quote {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn copy_template(&mut self) -> Result<(), MinifyError> {
        let start = self.pos;
        let unterminated = MinifyError::UnterminatedTemplate(start);
        self.copy_one(unterminated.clone())?;
        loop {
            match self.copy_one(unterminated.clone())? {
                '\\' => {
                    self.copy_one(unterminated.clone())?;
                }
                '`' => return Ok(()),
                '$' if self.peek(0) == Some('{') => {
                    self.copy_one(unterminated.clone())?;
                    self.copy_template_expression(start)?;
                }
                _ => {}
            }
        }
    }

    /// Copy a `${ ... }` substitution up to and including its closing brace.
    fn copy_template_expression(&mut self, template_start: usize) -> Result<(), MinifyError> {
        let unterminated = MinifyError::UnterminatedTemplate(template_start);
        let mut depth = 0usize;
        loop {
            match self.peek(0) {
                None => return Err(unterminated),
                Some(q @ ('\'' | '"')) => self.copy_string(q)?,
                Some('`') => self.copy_template()?,
                Some('{') => {
                    depth += 1;
                    self.copy_one(unterminated.clone())?;
                }
                Some('}') => {
                    self.copy_one(unterminated.clone())?;
                    if depth == 0 {
                        return Ok(());
                    }
                    depth -= 1;
                }
                Some(_) => {
                    self.copy_one(unterminated.clone())?;
                }
            }
        }
    }

    fn copy_regex(&mut self) -> Result<(), MinifyError> {
        let start = self.pos;
        let unterminated = MinifyError::UnterminatedRegex(start);
        self.copy_one(unterminated.clone())?;
        let mut in_class = false;
        loop {
            match self.peek(0) {
                None | Some('\n' | '\r') => return Err(unterminated),
                Some('\\') => {
                    self.copy_one(unterminated.clone())?;
                    self.copy_one(unterminated.clone())?;
                }
                Some(c) => {
                    self.copy_one(unterminated.clone())?;
                    match c {
                        '[' => in_class = true,
                        ']' => in_class = false,
                        '/' if !in_class => return Ok(()),
                        _ => {}
                    }
                }
            }
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '$' | '\\') || !c.is_ascii()
}

/// Whether two adjacent tokens would merge without a space between them.
fn needs_space(last: char, next: char) -> bool {
    (is_word_char(last) && is_word_char(next))
        || (matches!(last, '+' | '-') && matches!(next, '+' | '-'))
        || (last == '/' && matches!(next, '/' | '*'))
        || (last.is_ascii_digit() && next == '.')
}
