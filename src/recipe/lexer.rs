//! Hand-written recipe lexer.
//!
//! No parser-generator crate: just a `Vec<char>` walked by index. Comments
//! (`#` to end of line) and whitespace are insignificant and dropped here
//! rather than threaded through the parser.

use crate::error::EndfError;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    LBracket,
    RBracket,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Slash,
    Colon,
    Question,
    Plus,
    Minus,
    Star,
    Assign,
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
    Ident(String),
    Number(Num),
    StringLit(String),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Num {
    Int(i64),
    Float(f64),
}

pub fn lex(text: &str) -> Result<Vec<Token>, EndfError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0usize;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\r' | '\n' => i += 1,
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '{' => {
                tokens.push(Token::LBrace);
                i += 1;
            }
            '}' => {
                tokens.push(Token::RBrace);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            ':' => {
                tokens.push(Token::Colon);
                i += 1;
            }
            '?' => {
                tokens.push(Token::Question);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Eq);
                    i += 2;
                } else {
                    tokens.push(Token::Assign);
                    i += 1;
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ne);
                    i += 2;
                } else {
                    return Err(EndfError::Data);
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Le);
                    i += 2;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ge);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '"' => {
                let start = i + 1;
                let mut j = start;
                while j < chars.len() && chars[j] != '"' {
                    j += 1;
                }
                if j >= chars.len() {
                    return Err(EndfError::Data);
                }
                tokens.push(Token::StringLit(chars[start..j].iter().collect()));
                i = j + 1;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                let mut j = i;
                let mut is_float = false;
                while j < chars.len() && chars[j].is_ascii_digit() {
                    j += 1;
                }
                if chars.get(j) == Some(&'.') {
                    is_float = true;
                    j += 1;
                    while j < chars.len() && chars[j].is_ascii_digit() {
                        j += 1;
                    }
                }
                let text: String = chars[start..j].iter().collect();
                let num = if is_float {
                    Num::Float(text.parse().map_err(|_| EndfError::Data)?)
                } else {
                    Num::Int(text.parse().map_err(|_| EndfError::Data)?)
                };
                tokens.push(Token::Number(num));
                i = j;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                let mut j = i;
                while j < chars.len() && (chars[j].is_ascii_alphanumeric() || chars[j] == '_') {
                    j += 1;
                }
                tokens.push(Token::Ident(chars[start..j].iter().collect()));
                i = j;
            }
            _ => return Err(EndfError::Data),
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_record_line() {
        let tokens = lex("[MAT,1,MT/ ZA, AWR, 0, 0, 0, 0] HEAD").unwrap();
        assert_eq!(tokens.first(), Some(&Token::LBracket));
        assert!(tokens.contains(&Token::Ident("HEAD".to_string())));
        assert!(tokens.contains(&Token::Number(Num::Int(0))));
    }

    #[test]
    fn lexes_comparators_and_desired() {
        let tokens = lex("LI==1 and LTT?").unwrap();
        assert!(tokens.contains(&Token::Eq));
        assert!(tokens.contains(&Token::Question));
    }

    #[test]
    fn skips_comments() {
        let tokens = lex("1 # a trailing comment\n2").unwrap();
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn lexes_stop_message() {
        let tokens = lex("stop(\"bad data\")").unwrap();
        assert!(tokens.contains(&Token::StringLit("bad data".to_string())));
    }
}
