//! Parser for declared configurations.
//!
//! Fixtures use a small subset of HCL:
//!
//! ```text
//! resource "okta_group" "test" {
//!   name = "testAcc_42"
//! }
//!
//! # comments start with '#' or '//'
//! resource "okta_group_rule" "test" {
//!   name              = "testAcc_42"
//!   group_assignments = ["${okta_group.test.id}", okta_group.other.id]
//!   expression_value  = "String.startsWith(user.login,\"a\")"
//! }
//! ```
//!
//! Values are quoted strings, bare references (`type.name.attr`), or lists
//! of either. Bare references are normalised to `${...}` interpolations and
//! resolved at apply time with [`interpolate`].

use crate::acceptance::state::ResourceAddress;
use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;

/// A syntax or structure error, with the 1-based line it was found on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// An attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    String(String),
    List(Vec<String>),
}

/// One `resource` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredResource {
    pub address: ResourceAddress,
    pub attributes: BTreeMap<String, ConfigValue>,
    pub line: usize,
}

impl DeclaredResource {
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.attributes.get(key)
    }
}

/// A parsed configuration, resources in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredConfig {
    pub resources: Vec<DeclaredResource>,
}

impl DeclaredConfig {
    /// Resources of one type, in declaration order.
    pub fn resources_of<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a DeclaredResource> + 'a {
        self.resources
            .iter()
            .filter(move |r| r.address.resource_type() == resource_type)
    }

    pub fn contains(&self, address: &ResourceAddress) -> bool {
        self.resources.iter().any(|r| &r.address == address)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    Equals,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(s) => format!("identifier '{}'", s),
            Token::Str(s) => format!("string \"{}\"", s),
            Token::Equals => "'='".to_string(),
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::Comma => "','".to_string(),
        }
    }
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_line(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn tokenize(mut self) -> Result<Vec<(Token, usize)>, ParseError> {
        let mut tokens = Vec::new();

        while let Some(&c) = self.chars.peek() {
            let line = self.line;
            match c {
                c if c.is_whitespace() => {
                    self.bump();
                }
                '#' => self.skip_line(),
                '/' => {
                    self.bump();
                    if self.chars.peek() != Some(&'/') {
                        return Err(ParseError::new(line, "unexpected '/'"));
                    }
                    self.skip_line();
                }
                '=' => {
                    self.bump();
                    tokens.push((Token::Equals, line));
                }
                '{' => {
                    self.bump();
                    tokens.push((Token::LBrace, line));
                }
                '}' => {
                    self.bump();
                    tokens.push((Token::RBrace, line));
                }
                '[' => {
                    self.bump();
                    tokens.push((Token::LBracket, line));
                }
                ']' => {
                    self.bump();
                    tokens.push((Token::RBracket, line));
                }
                ',' => {
                    self.bump();
                    tokens.push((Token::Comma, line));
                }
                '"' => {
                    self.bump();
                    let value = self.string(line)?;
                    tokens.push((Token::Str(value), line));
                }
                c if is_ident_char(c) => {
                    let mut ident = String::new();
                    while let Some(&c) = self.chars.peek() {
                        if !is_ident_char(c) {
                            break;
                        }
                        ident.push(c);
                        self.bump();
                    }
                    tokens.push((Token::Ident(ident), line));
                }
                other => {
                    return Err(ParseError::new(line, format!("unexpected character '{}'", other)));
                }
            }
        }

        Ok(tokens)
    }

    fn string(&mut self, start_line: usize) -> Result<String, ParseError> {
        let mut value = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(ParseError::new(start_line, "unterminated string"));
                }
                Some('"') => return Ok(value),
                Some('\\') => match self.bump() {
                    Some('"') => value.push('"'),
                    Some('\\') => value.push('\\'),
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(other) => {
                        return Err(ParseError::new(
                            self.line,
                            format!("unknown escape sequence '\\{}'", other),
                        ));
                    }
                    None => return Err(ParseError::new(start_line, "unterminated string")),
                },
                Some(c) => value.push(c),
            }
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.'
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(_, line)| *line)
            .unwrap_or(1)
    }

    fn next(&mut self) -> Result<(Token, usize), ParseError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| ParseError::new(self.line(), "unexpected end of input"))?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: Token) -> Result<usize, ParseError> {
        let (token, line) = self.next()?;
        if token == expected {
            Ok(line)
        } else {
            Err(ParseError::new(
                line,
                format!("expected {}, found {}", expected.describe(), token.describe()),
            ))
        }
    }

    fn expect_string(&mut self, what: &str) -> Result<String, ParseError> {
        match self.next()? {
            (Token::Str(s), _) => Ok(s),
            (other, line) => Err(ParseError::new(
                line,
                format!("expected {} string, found {}", what, other.describe()),
            )),
        }
    }

    fn config(&mut self) -> Result<DeclaredConfig, ParseError> {
        let mut config = DeclaredConfig::default();

        while self.peek().is_some() {
            let resource = self.resource()?;
            if config.contains(&resource.address) {
                return Err(ParseError::new(
                    resource.line,
                    format!("duplicate resource '{}'", resource.address),
                ));
            }
            config.resources.push(resource);
        }

        Ok(config)
    }

    fn resource(&mut self) -> Result<DeclaredResource, ParseError> {
        let line = match self.next()? {
            (Token::Ident(keyword), line) if keyword == "resource" => line,
            (other, line) => {
                return Err(ParseError::new(
                    line,
                    format!("expected 'resource' block, found {}", other.describe()),
                ));
            }
        };

        let resource_type = self.expect_string("resource type")?;
        let name = self.expect_string("resource name")?;
        self.expect(Token::LBrace)?;

        let mut attributes = BTreeMap::new();
        loop {
            match self.next()? {
                (Token::RBrace, _) => break,
                (Token::Ident(key), key_line) => {
                    self.expect(Token::Equals)?;
                    let value = self.value()?;
                    if attributes.insert(key.clone(), value).is_some() {
                        return Err(ParseError::new(
                            key_line,
                            format!("duplicate attribute '{}'", key),
                        ));
                    }
                }
                (other, line) => {
                    return Err(ParseError::new(
                        line,
                        format!("expected attribute or '}}', found {}", other.describe()),
                    ));
                }
            }
        }

        Ok(DeclaredResource {
            address: ResourceAddress::new(resource_type, name),
            attributes,
            line,
        })
    }

    fn value(&mut self) -> Result<ConfigValue, ParseError> {
        match self.next()? {
            (Token::LBracket, _) => {
                let mut items = Vec::new();
                loop {
                    if self.peek() == Some(&Token::RBracket) {
                        self.pos += 1;
                        break;
                    }
                    items.push(self.scalar()?);
                    match self.next()? {
                        (Token::Comma, _) => continue,
                        (Token::RBracket, _) => break,
                        (other, line) => {
                            return Err(ParseError::new(
                                line,
                                format!("expected ',' or ']', found {}", other.describe()),
                            ));
                        }
                    }
                }
                Ok(ConfigValue::List(items))
            }
            _ => {
                self.pos -= 1;
                self.scalar().map(ConfigValue::String)
            }
        }
    }

    fn scalar(&mut self) -> Result<String, ParseError> {
        match self.next()? {
            (Token::Str(s), _) => Ok(s),
            (Token::Ident(reference), _) if reference.contains('.') => {
                Ok(format!("${{{}}}", reference))
            }
            (Token::Ident(literal), _) => Ok(literal),
            (other, line) => Err(ParseError::new(
                line,
                format!("expected a value, found {}", other.describe()),
            )),
        }
    }
}

/// Parse configuration text.
pub fn parse_config(input: &str) -> Result<DeclaredConfig, ParseError> {
    let tokens = Lexer::new(input).tokenize()?;
    Parser { tokens, pos: 0 }.config()
}

/// Replace every `${reference}` in `input` using `resolve`.
///
/// `$${` is an escape and yields a literal `${`. Returns the first reference
/// that could not be resolved as the error.
pub fn interpolate<F>(input: &str, resolve: F) -> Result<String, String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        if rest[..start].ends_with('$') {
            output.push_str(&rest[..start - 1]);
            output.push_str("${");
            rest = &rest[start + 2..];
            continue;
        }
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or_else(|| after.to_string())?;
        let reference = after[..end].trim();
        let value = resolve(reference).ok_or_else(|| reference.to_string())?;
        output.push_str(&value);
        rest = &after[end + 1..];
    }

    output.push_str(rest);
    Ok(output)
}
