//! Tokenizer for the expression language.

use iotfn_model::EvaluationError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    True,
    False,
    None,
    And,
    Or,
    Not,
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    Lt,
    LtEq,
    Gt,
    GtEq,
    EqEq,
    NotEq,
    Amp,
    Pipe,
    Caret,
    Tilde,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token in the source.
    pub position: usize,
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, EvaluationError> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    idx: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().collect(),
            idx: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.idx).map(|(_, c)| *c)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.idx + offset).map(|(_, c)| *c)
    }

    fn position(&self) -> usize {
        self.chars
            .get(self.idx)
            .map_or(self.source.len(), |(pos, _)| *pos)
    }

    fn run(mut self) -> Result<Vec<Token>, EvaluationError> {
        let mut tokens = Vec::new();
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.idx += 1;
                continue;
            }
            let position = self.position();
            let kind = if ch.is_ascii_digit()
                || (ch == '.' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()))
            {
                self.number()?
            } else if ch == '\'' || ch == '"' {
                self.string(ch)?
            } else if ch.is_alphabetic() || ch == '_' {
                self.word()
            } else {
                self.operator(ch)?
            };
            tokens.push(Token { kind, position });
        }
        tokens.push(Token {
            kind: TokenKind::Eof,
            position: self.source.len(),
        });
        Ok(tokens)
    }

    fn number(&mut self) -> Result<TokenKind, EvaluationError> {
        let start = self.position();
        let mut is_float = false;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.idx += 1;
        }
        if self.peek() == Some('.') {
            is_float = true;
            self.idx += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.idx += 1;
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let sign = usize::from(matches!(self.peek_at(1), Some('+' | '-')));
            if self.peek_at(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.idx += 1 + sign;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.idx += 1;
                }
            }
        }
        let text = &self.source[start..self.position()];
        let invalid = || EvaluationError::Syntax {
            position: start,
            message: format!("invalid number '{text}'"),
        };
        if is_float {
            text.parse::<f64>().map(TokenKind::Float).map_err(|_| invalid())
        } else {
            text.parse::<i64>().map(TokenKind::Int).map_err(|_| invalid())
        }
    }

    fn string(&mut self, quote: char) -> Result<TokenKind, EvaluationError> {
        let start = self.position();
        self.idx += 1;
        let mut value = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(EvaluationError::Syntax {
                        position: start,
                        message: "unterminated string literal".to_string(),
                    });
                }
                Some(c) if c == quote => {
                    self.idx += 1;
                    return Ok(TokenKind::Str(value));
                }
                Some('\\') => {
                    let escaped = self.peek_at(1).ok_or_else(|| EvaluationError::Syntax {
                        position: start,
                        message: "unterminated string literal".to_string(),
                    })?;
                    value.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    });
                    self.idx += 2;
                }
                Some(c) => {
                    value.push(c);
                    self.idx += 1;
                }
            }
        }
    }

    fn word(&mut self) -> TokenKind {
        let start = self.position();
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.idx += 1;
        }
        match &self.source[start..self.position()] {
            "True" | "true" => TokenKind::True,
            "False" | "false" => TokenKind::False,
            "None" => TokenKind::None,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            other => TokenKind::Ident(other.to_string()),
        }
    }

    fn operator(&mut self, ch: char) -> Result<TokenKind, EvaluationError> {
        let next = self.peek_at(1);
        let (kind, width) = match (ch, next) {
            ('*', Some('*')) => (TokenKind::DoubleStar, 2),
            ('/', Some('/')) => (TokenKind::DoubleSlash, 2),
            ('<', Some('=')) => (TokenKind::LtEq, 2),
            ('>', Some('=')) => (TokenKind::GtEq, 2),
            ('=', Some('=')) => (TokenKind::EqEq, 2),
            ('!', Some('=')) => (TokenKind::NotEq, 2),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', _) => (TokenKind::Minus, 1),
            ('*', _) => (TokenKind::Star, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('%', _) => (TokenKind::Percent, 1),
            ('<', _) => (TokenKind::Lt, 1),
            ('>', _) => (TokenKind::Gt, 1),
            ('&', _) => (TokenKind::Amp, 1),
            ('|', _) => (TokenKind::Pipe, 1),
            ('^', _) => (TokenKind::Caret, 1),
            ('~', _) => (TokenKind::Tilde, 1),
            ('(', _) => (TokenKind::LParen, 1),
            (')', _) => (TokenKind::RParen, 1),
            ('[', _) => (TokenKind::LBracket, 1),
            (']', _) => (TokenKind::RBracket, 1),
            (',', _) => (TokenKind::Comma, 1),
            ('.', _) => (TokenKind::Dot, 1),
            _ => {
                return Err(EvaluationError::Syntax {
                    position: self.position(),
                    message: format!("unexpected character '{ch}'"),
                });
            }
        };
        self.idx += width;
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1 2.5 1e3 .5"),
            vec![
                TokenKind::Int(1),
                TokenKind::Float(2.5),
                TokenKind::Float(1000.0),
                TokenKind::Float(0.5),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_column_reference_tokens() {
        assert_eq!(
            kinds("df['temp'] >= 3"),
            vec![
                TokenKind::Ident("df".to_string()),
                TokenKind::LBracket,
                TokenKind::Str("temp".to_string()),
                TokenKind::RBracket,
                TokenKind::GtEq,
                TokenKind::Int(3),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_two_char_operators() {
        assert_eq!(
            kinds("** // != =="),
            vec![
                TokenKind::DoubleStar,
                TokenKind::DoubleSlash,
                TokenKind::NotEq,
                TokenKind::EqEq,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#""it's" 'a\'b'"#),
            vec![
                TokenKind::Str("it's".to_string()),
                TokenKind::Str("a'b".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_errors_carry_position() {
        assert_eq!(
            tokenize("1 + $x").unwrap_err(),
            EvaluationError::Syntax {
                position: 4,
                message: "unexpected character '$'".to_string(),
            }
        );
        assert!(matches!(
            tokenize("'open").unwrap_err(),
            EvaluationError::Syntax { position: 0, .. }
        ));
    }

    #[test]
    fn test_single_equals_is_rejected() {
        assert!(tokenize("a = 1").is_err());
    }
}
