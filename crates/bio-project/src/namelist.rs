//! Fortran namelist reader.
//!
//! Handles the subset written by the solver's input decks:
//! ```text
//! &INPUT
//! nx = 192, ny = 96     ! comment
//! Lx = 25.d0
//! outputdir = "/scratch/run/"
//! /
//! ```

use std::iter::Peekable;
use std::path::Path;

use serde_json::{Map, Number, Value};

use crate::config::RunConfig;
use crate::{ProjectError, ProjectResult};

/// Source of a nested configuration mapping for a run.
pub trait ConfigParser {
    fn parse_file(&self, path: &Path) -> ProjectResult<RunConfig>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NamelistParser;

impl ConfigParser for NamelistParser {
    fn parse_file(&self, path: &Path) -> ProjectResult<RunConfig> {
        let text = std::fs::read_to_string(path)?;
        self.parse_str(&text, &path.display().to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Group(String),
    End,
    Eq,
    Comma,
    Word(String),
    Quoted(String),
}

impl NamelistParser {
    pub fn parse_str(&self, text: &str, source: &str) -> ProjectResult<RunConfig> {
        let tokens = tokenize(text, source)?;
        let mut config = RunConfig::new();
        let mut iter = tokens.into_iter().peekable();

        let mut group: Option<(String, Map<String, Value>)> = None;
        let mut pending: Option<(String, Vec<Value>)> = None;

        while let Some((line, token)) = iter.next() {
            match token {
                Token::Group(name) => {
                    if group.is_some() {
                        return Err(parse_error(source, line, "group opened before '/'"));
                    }
                    group = Some((name.to_ascii_lowercase(), Map::new()));
                }
                Token::End => {
                    let Some((name, mut map)) = group.take() else {
                        continue;
                    };
                    flush(&mut pending, &mut map);
                    for (key, value) in map {
                        config.insert(&name, &key, value);
                    }
                    config.ensure_group(&name);
                }
                Token::Word(word) if next_is_eq(&mut iter) => {
                    let Some((_, map)) = group.as_mut() else {
                        return Err(parse_error(source, line, "assignment outside a group"));
                    };
                    iter.next();
                    flush(&mut pending, map);
                    pending = Some((word.to_ascii_lowercase(), Vec::new()));
                }
                Token::Word(word) => {
                    if group.is_none() {
                        continue;
                    }
                    let Some((_, values)) = pending.as_mut() else {
                        return Err(parse_error(source, line, "value without a key"));
                    };
                    values.extend(parse_word(&word));
                }
                Token::Quoted(s) => {
                    if group.is_none() {
                        continue;
                    }
                    let Some((_, values)) = pending.as_mut() else {
                        return Err(parse_error(source, line, "value without a key"));
                    };
                    values.push(Value::String(s));
                }
                Token::Eq => {
                    if group.is_some() {
                        return Err(parse_error(source, line, "'=' without a key"));
                    }
                }
                Token::Comma => {}
            }
        }

        if group.is_some() {
            return Err(parse_error(source, text.lines().count(), "unterminated group"));
        }
        Ok(config)
    }
}

fn next_is_eq<I: Iterator<Item = (usize, Token)>>(iter: &mut Peekable<I>) -> bool {
    matches!(iter.peek(), Some((_, Token::Eq)))
}

fn flush(pending: &mut Option<(String, Vec<Value>)>, map: &mut Map<String, Value>) {
    if let Some((key, mut values)) = pending.take() {
        let value = match values.len() {
            0 => Value::Null,
            1 => values.remove(0),
            _ => Value::Array(values),
        };
        map.insert(key, value);
    }
}

fn parse_error(source: &str, line: usize, message: &str) -> ProjectError {
    ProjectError::Parse {
        file: source.to_string(),
        line,
        message: message.to_string(),
    }
}

fn tokenize(text: &str, source: &str) -> ProjectResult<Vec<(usize, Token)>> {
    let mut tokens = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let mut chars = raw.chars().peekable();
        let mut word = String::new();

        let push_word = |word: &mut String, tokens: &mut Vec<(usize, Token)>| {
            if !word.is_empty() {
                tokens.push((line, Token::Word(std::mem::take(word))));
            }
        };

        while let Some(c) = chars.next() {
            match c {
                '!' => break,
                '\'' | '"' => {
                    push_word(&mut word, &mut tokens);
                    let mut s = String::new();
                    let mut closed = false;
                    while let Some(q) = chars.next() {
                        if q == c {
                            // doubled quote is an escaped quote
                            if chars.peek() == Some(&c) {
                                chars.next();
                                s.push(c);
                                continue;
                            }
                            closed = true;
                            break;
                        }
                        s.push(q);
                    }
                    if !closed {
                        return Err(parse_error(source, line, "unterminated string"));
                    }
                    tokens.push((line, Token::Quoted(s)));
                }
                '&' | '$' if word.is_empty() => {
                    let mut name = String::new();
                    while let Some(&n) = chars.peek() {
                        if n.is_alphanumeric() || n == '_' {
                            name.push(n);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    if name.eq_ignore_ascii_case("end") {
                        tokens.push((line, Token::End));
                    } else {
                        tokens.push((line, Token::Group(name)));
                    }
                }
                '/' => {
                    push_word(&mut word, &mut tokens);
                    tokens.push((line, Token::End));
                }
                '=' => {
                    push_word(&mut word, &mut tokens);
                    tokens.push((line, Token::Eq));
                }
                ',' => {
                    push_word(&mut word, &mut tokens);
                    tokens.push((line, Token::Comma));
                }
                c if c.is_whitespace() => push_word(&mut word, &mut tokens),
                c => word.push(c),
            }
        }
        push_word(&mut word, &mut tokens);
    }
    Ok(tokens)
}

fn parse_word(word: &str) -> Vec<Value> {
    if let Some((count, rest)) = word.split_once('*') {
        if let Ok(n) = count.parse::<usize>() {
            let value = parse_scalar(rest);
            return vec![value; n];
        }
    }
    vec![parse_scalar(word)]
}

fn parse_scalar(word: &str) -> Value {
    let lower = word.to_ascii_lowercase();
    match lower.as_str() {
        ".true." | ".t." | "t" => return Value::Bool(true),
        ".false." | ".f." | "f" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(i) = lower.parse::<i64>() {
        return Value::Number(i.into());
    }
    let float = lower.replace('d', "e");
    if let Ok(x) = float.parse::<f64>() {
        if let Some(n) = Number::from_f64(x) {
            return Value::Number(n);
        }
    }
    Value::String(word.to_string())
}
