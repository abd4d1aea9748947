use crate::constraint::ConstraintError;

///
/// Token
///

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),

    // keywords
    And,
    Or,
    Not,
    In,
    True,
    False,
    None,

    // punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,

    // comparison
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

///
/// Spanned
/// Token plus its byte offset in the source expression.
///

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Spanned {
    pub(crate) token: Token,
    pub(crate) pos: usize,
}

/// Split an expression into tokens.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Spanned>, ConstraintError> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let single = match c {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            ',' => Some(Token::Comma),
            '.' if !next_is_digit(&chars, i) => Some(Token::Dot),
            _ => None,
        };
        if let Some(token) = single {
            tokens.push(Spanned { token, pos });
            i += 1;
            continue;
        }

        match c {
            '=' | '!' | '<' | '>' => {
                let followed_by_eq = chars.get(i + 1).is_some_and(|(_, n)| *n == '=');
                let token = match (c, followed_by_eq) {
                    ('=', true) => Token::Eq,
                    ('!', true) => Token::Ne,
                    ('<', true) => Token::Lte,
                    ('>', true) => Token::Gte,
                    ('<', false) => Token::Lt,
                    ('>', false) => Token::Gt,
                    _ => {
                        return Err(ConstraintError::syntax(
                            pos,
                            format!("unexpected character '{c}'"),
                        ));
                    }
                };
                tokens.push(Spanned { token, pos });
                i += if followed_by_eq { 2 } else { 1 };
            }

            '\'' | '"' => {
                let (text, next) = read_string(&chars, i, c)?;
                tokens.push(Spanned {
                    token: Token::Str(text),
                    pos,
                });
                i = next;
            }

            c if c.is_ascii_digit() || c == '.' => {
                let (token, next) = read_number(source, &chars, i)?;
                tokens.push(Spanned { token, pos });
                i = next;
            }

            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].1.is_ascii_alphanumeric() || chars[i].1 == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().map(|(_, ch)| *ch).collect();
                tokens.push(Spanned {
                    token: keyword_or_ident(word),
                    pos,
                });
            }

            _ => {
                return Err(ConstraintError::syntax(
                    pos,
                    format!("unexpected character '{c}'"),
                ));
            }
        }
    }

    Ok(tokens)
}

fn keyword_or_ident(word: String) -> Token {
    match word.as_str() {
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "in" => Token::In,
        "True" => Token::True,
        "False" => Token::False,
        "None" => Token::None,
        _ => Token::Ident(word),
    }
}

fn next_is_digit(chars: &[(usize, char)], i: usize) -> bool {
    chars.get(i + 1).is_some_and(|(_, c)| c.is_ascii_digit())
        && (i == 0 || !is_word_char(chars[i - 1].1))
}

const fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == ')' || c == ']'
}

// Quoted string with backslash escapes for the quote, backslash and \n.
fn read_string(
    chars: &[(usize, char)],
    start: usize,
    quote: char,
) -> Result<(String, usize), ConstraintError> {
    let mut text = String::new();
    let mut i = start + 1;

    while i < chars.len() {
        match chars[i].1 {
            c if c == quote => return Ok((text, i + 1)),
            '\\' => {
                let Some((_, escaped)) = chars.get(i + 1) else {
                    break;
                };
                text.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => *other,
                });
                i += 2;
            }
            c => {
                text.push(c);
                i += 1;
            }
        }
    }

    Err(ConstraintError::syntax(
        chars[start].0,
        "unterminated string literal",
    ))
}

fn read_number(
    source: &str,
    chars: &[(usize, char)],
    start: usize,
) -> Result<(Token, usize), ConstraintError> {
    let mut i = start;
    let mut seen_dot = false;

    while i < chars.len() {
        let c = chars[i].1;
        if c.is_ascii_digit() {
            i += 1;
        } else if c == '.' && !seen_dot && chars.get(i + 1).is_some_and(|(_, n)| n.is_ascii_digit())
        {
            seen_dot = true;
            i += 1;
        } else {
            break;
        }
    }

    let begin = chars[start].0;
    let end = chars.get(i).map_or(source.len(), |(pos, _)| *pos);
    let literal = &source[begin..end];

    let token = if seen_dot {
        literal.parse::<f64>().map(Token::Float).ok()
    } else {
        literal.parse::<i64>().map(Token::Int).ok()
    };

    token
        .map(|token| (token, i))
        .ok_or_else(|| ConstraintError::syntax(begin, format!("invalid number '{literal}'")))
}
