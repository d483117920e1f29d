use super::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Str(String),
    Bytes(Vec<u8>),
    Ident(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Dot,
    Comma,
    Colon,
    Question,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    Ne,
    AndAnd,
    OrOr,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

pub fn tokenize(source: &str) -> Result<Vec<Spanned>, ExprError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let pos = i;

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // String prefixes: r"..", b"..", br"..", rb".."
        if matches!(c, 'r' | 'R' | 'b' | 'B') {
            if let Some((raw, bytes, quote_at)) = string_prefix(&chars, i) {
                let (content, next) = read_string(&chars, quote_at, raw, bytes)?;
                let token = if bytes {
                    Token::Bytes(content)
                } else {
                    Token::Str(into_text(content, pos)?)
                };
                tokens.push(Spanned { token, pos });
                i = next;
                continue;
            }
        }

        if c == '"' || c == '\'' {
            let (content, next) = read_string(&chars, i, false, false)?;
            tokens.push(Spanned { token: Token::Str(into_text(content, pos)?), pos });
            i = next;
            continue;
        }

        if c.is_ascii_digit() {
            let start = i;
            let value = if c == '0' && matches!(chars.get(i + 1), Some('x') | Some('X')) {
                i += 2;
                let digits_start = i;
                while i < chars.len() && chars[i].is_ascii_hexdigit() {
                    i += 1;
                }
                let digits: String = chars[digits_start..i].iter().collect();
                i64::from_str_radix(&digits, 16)
            } else {
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                chars[start..i].iter().collect::<String>().parse::<i64>()
            };
            let value = value.map_err(|_| ExprError::Syntax {
                pos: start,
                message: "invalid integer literal".into(),
            })?;
            tokens.push(Spanned { token: Token::Int(value), pos });
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Spanned { token: Token::Ident(chars[start..i].iter().collect()), pos });
            continue;
        }

        let next = chars.get(i + 1).copied();
        let (token, width) = match (c, next) {
            ('&', Some('&')) => (Token::AndAnd, 2),
            ('|', Some('|')) => (Token::OrOr, 2),
            ('=', Some('=')) => (Token::EqEq, 2),
            ('!', Some('=')) => (Token::Ne, 2),
            ('<', Some('=')) => (Token::Le, 2),
            ('>', Some('=')) => (Token::Ge, 2),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('[', _) => (Token::LBracket, 1),
            (']', _) => (Token::RBracket, 1),
            ('{', _) => (Token::LBrace, 1),
            ('}', _) => (Token::RBrace, 1),
            ('.', _) => (Token::Dot, 1),
            (',', _) => (Token::Comma, 1),
            (':', _) => (Token::Colon, 1),
            ('?', _) => (Token::Question, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('%', _) => (Token::Percent, 1),
            ('!', _) => (Token::Bang, 1),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            _ => {
                return Err(ExprError::Syntax {
                    pos,
                    message: format!("unexpected character '{}'", c),
                })
            }
        };
        tokens.push(Spanned { token, pos });
        i += width;
    }

    tokens.push(Spanned { token: Token::Eof, pos: chars.len() });
    Ok(tokens)
}

/// Recognise `r"`, `b"`, `br"` and `rb"` (either quote, any case).
/// Returns (raw, bytes, index of the opening quote).
fn string_prefix(chars: &[char], i: usize) -> Option<(bool, bool, usize)> {
    let mut raw = false;
    let mut bytes = false;
    let mut j = i;
    while j < chars.len() && j < i + 2 {
        match chars[j] {
            'r' | 'R' if !raw => raw = true,
            'b' | 'B' if !bytes => bytes = true,
            '"' | '\'' => break,
            _ => return None,
        }
        j += 1;
    }
    match chars.get(j) {
        Some('"') | Some('\'') => Some((raw, bytes, j)),
        _ => None,
    }
}

/// Read a quoted literal starting at `start`. Content is collected as bytes:
/// in a bytes literal `\xHH` is one raw byte, elsewhere every escape yields a
/// character and is UTF-8 encoded.
fn read_string(
    chars: &[char],
    start: usize,
    raw: bool,
    bytes: bool,
) -> Result<(Vec<u8>, usize), ExprError> {
    let quote = chars[start];
    let mut out: Vec<u8> = Vec::new();
    let mut i = start + 1;

    while i < chars.len() {
        let c = chars[i];
        if c == quote {
            return Ok((out, i + 1));
        }
        if c == '\\' && !raw {
            let esc = chars.get(i + 1).copied().ok_or_else(|| ExprError::Syntax {
                pos: i,
                message: "unterminated escape sequence".into(),
            })?;
            i += 2;
            match esc {
                'n' => out.push(b'\n'),
                't' => out.push(b'\t'),
                'r' => out.push(b'\r'),
                '0' => out.push(0),
                '\\' => out.push(b'\\'),
                '"' => out.push(b'"'),
                '\'' => out.push(b'\''),
                'x' | 'u' => {
                    let len = if esc == 'x' { 2 } else { 4 };
                    let hex: String = chars.iter().skip(i).take(len).collect();
                    let invalid = || ExprError::Syntax {
                        pos: i,
                        message: format!("invalid \\{} escape", esc),
                    };
                    let code = u32::from_str_radix(&hex, 16)
                        .ok()
                        .filter(|_| hex.len() == len)
                        .ok_or_else(invalid)?;
                    if esc == 'x' && bytes {
                        out.push(code as u8);
                    } else {
                        push_char(&mut out, char::from_u32(code).ok_or_else(invalid)?);
                    }
                    i += len;
                }
                other => {
                    out.push(b'\\');
                    push_char(&mut out, other);
                }
            }
            continue;
        }
        push_char(&mut out, c);
        i += 1;
    }

    Err(ExprError::Syntax { pos: start, message: "unterminated string literal".into() })
}

fn push_char(out: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

fn into_text(content: Vec<u8>, pos: usize) -> Result<String, ExprError> {
    String::from_utf8(content).map_err(|_| ExprError::Syntax {
        pos,
        message: "string literal is not valid UTF-8".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_tokenize_comparison() {
        assert_eq!(
            kinds("response.status == 200"),
            vec![
                Token::Ident("response".into()),
                Token::Dot,
                Token::Ident("status".into()),
                Token::EqEq,
                Token::Int(200),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_string_kinds() {
        assert_eq!(
            kinds(r#"b"abc" r"\d+" 'x\ny'"#),
            vec![
                Token::Bytes(b"abc".to_vec()),
                Token::Str("\\d+".into()),
                Token::Str("x\ny".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_identifier_starting_with_prefix_letter() {
        assert_eq!(
            kinds("body"),
            vec![Token::Ident("body".into()), Token::Eof]
        );
    }

    #[test]
    fn test_hex_literal() {
        assert_eq!(kinds("0x1F"), vec![Token::Int(31), Token::Eof]);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("\"abc").unwrap_err();
        assert!(matches!(err, ExprError::Syntax { pos: 0, .. }));
    }

    #[test]
    fn test_unexpected_character() {
        assert!(tokenize("a # b").is_err());
    }

    #[test]
    fn test_bytes_hex_escape_is_raw_byte() {
        assert_eq!(kinds(r#"b"\xff\x00""#), vec![Token::Bytes(vec![0xff, 0x00]), Token::Eof]);
        assert_eq!(kinds(r#"b"\x89PNG""#), vec![Token::Bytes(b"\x89PNG".to_vec()), Token::Eof]);
    }

    #[test]
    fn test_string_hex_escape_is_character() {
        assert_eq!(kinds(r#""\xe9""#), vec![Token::Str("é".into()), Token::Eof]);
        assert_eq!(kinds(r#"b"é""#), vec![Token::Bytes("é".as_bytes().to_vec()), Token::Eof]);
    }
}
