//! Literal list tokenizer — splits a `param` string into literal tokens
//!
//! Handles: comma separators, `[ ... ]` array nesting, backslash escapes.
//! A comma separates tokens only when it is unescaped and outside any
//! brackets. Escapes are kept in the token text; the literal codec removes
//! them when it decodes a `string:` value.
//!
//! Guarantees:
//! - Deterministic: same input always produces same token stream
//! - Every token carries its 1-based position for error reporting

/// Position of a token within its literal list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// 1-based index of the token in the list
    pub position: usize,
    /// Character offset of the token start
    pub offset: usize,
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "#{} (offset {})", self.position, self.offset)
    }
}

/// Trimmed literal text with its source position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannedToken {
    pub text: String,
    pub span: Span,
}

/// Tokenizer for comma-joined literal lists
pub struct Tokenizer {
    input: Vec<char>,
    position: usize,
}

impl Tokenizer {
    pub fn new(text: &str) -> Self {
        Tokenizer {
            input: text.chars().collect(),
            position: 0,
        }
    }

    /// Split the whole input into tokens.
    ///
    /// An input that is empty or only whitespace yields no tokens. Any
    /// other input yields one token per separator plus one, so a trailing
    /// comma produces an empty token that the codec rejects.
    pub fn tokenize(&mut self) -> crate::Result<Vec<SpannedToken>> {
        let mut tokens = Vec::new();
        if self.input.iter().all(|c| c.is_whitespace()) {
            return Ok(tokens);
        }

        loop {
            let token = self.next_token(tokens.len() + 1)?;
            tokens.push(token);
            if self.is_at_end() {
                break;
            }
            // consume separator
            self.advance();
            if self.is_at_end() {
                // trailing separator leaves one empty token behind it
                tokens.push(SpannedToken {
                    text: String::new(),
                    span: Span {
                        position: tokens.len() + 1,
                        offset: self.position,
                    },
                });
                break;
            }
        }

        Ok(tokens)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.position += 1;
        }
        ch
    }

    /// Read up to the next top-level separator (not consumed).
    fn next_token(&mut self, position: usize) -> crate::Result<SpannedToken> {
        let offset = self.position;
        let mut text = String::new();
        let mut depth: usize = 0;
        // byte length of `text` through the last escaped char
        let mut escaped_end = 0;

        while let Some(ch) = self.peek() {
            match ch {
                ',' if depth == 0 => break,
                '\\' => {
                    self.advance();
                    text.push('\\');
                    match self.advance() {
                        Some(escaped) => {
                            text.push(escaped);
                            escaped_end = text.len();
                        }
                        None => {
                            return Err(crate::Error::LiteralDecode {
                                token: text.trim().to_string(),
                                position,
                                reason: "dangling escape at end of input".into(),
                            });
                        }
                    }
                    continue;
                }
                '[' => depth += 1,
                ']' => {
                    if depth == 0 {
                        return Err(crate::Error::LiteralDecode {
                            token: text.trim().to_string(),
                            position,
                            reason: "unbalanced ']'".into(),
                        });
                    }
                    depth -= 1;
                }
                _ => {}
            }
            text.push(ch);
            self.advance();
        }

        if depth != 0 {
            return Err(crate::Error::LiteralDecode {
                token: text.trim().to_string(),
                position,
                reason: "unclosed '['".into(),
            });
        }

        // escaped whitespace is part of the value
        let keep = escaped_end + text[escaped_end..].trim_end().len();
        text.truncate(keep);
        Ok(SpannedToken {
            text: text.trim_start().to_string(),
            span: Span { position, offset },
        })
    }
}

/// Convenience wrapper: tokenize a literal list
pub fn tokenize(text: &str) -> crate::Result<Vec<SpannedToken>> {
    Tokenizer::new(text).tokenize()
}
