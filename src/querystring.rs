// SPDX-FileCopyrightText: (C) 2024 Graylog SDK Contributors
// SPDX-License-Identifier: MIT

//! Builder for Graylog (Lucene syntax) query strings.
//!
//! ```
//! use graylog_sdk::querystring::GraylogQuery;
//!
//! let query = GraylogQuery::new()
//!     .field("message", "API_REQUEST_FINISHED")
//!     .and()
//!     .range("process_time", '[', 0, 500, ']')
//!     .build();
//! assert_eq!(query, "message:\"API_REQUEST_FINISHED\" AND process_time:[0 TO 500]");
//! ```

use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Term(String),
    And,
    Or,
    Not,
    Open,
    Close,
}

impl Token {
    fn is_binary(&self) -> bool {
        matches!(self, Token::And | Token::Or)
    }

    fn is_operator(&self) -> bool {
        matches!(self, Token::And | Token::Or | Token::Not)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraylogQuery {
    tokens: Vec<Token>,
}

impl GraylogQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new query extending an existing one.
    pub fn from_query(query: &GraylogQuery) -> Self {
        query.clone()
    }

    /// Start from a raw, already formatted query string.
    pub fn raw(query: &str) -> Self {
        let mut tokens = vec![];
        if !query.trim().is_empty() {
            tokens.push(Token::Term(query.trim().to_string()));
        }
        Self { tokens }
    }

    fn push(mut self, token: Token) -> Self {
        self.tokens.push(token);
        self
    }

    /// A single unquoted term, reserved characters escaped.
    pub fn term(self, value: &str) -> Self {
        self.push(Token::Term(escape(value)))
    }

    /// A quoted phrase.
    pub fn phrase(self, value: &str) -> Self {
        self.push(Token::Term(quote(value)))
    }

    /// `name:"value"`
    pub fn field(self, name: &str, value: &str) -> Self {
        self.push(Token::Term(format!("{}:{}", name, quote(value))))
    }

    /// `name:value` for numbers and other values that must not be quoted.
    pub fn field_value<V: Display>(self, name: &str, value: V) -> Self {
        self.push(Token::Term(format!("{}:{}", name, value)))
    }

    /// `name:<op><value>`, for example `process_time:>=500`.
    pub fn field_op<V: Display>(self, name: &str, op: &str, value: V) -> Self {
        self.push(Token::Term(format!("{}:{}{}", name, op, value)))
    }

    /// `name:[from TO to]`; brackets are `[`/`]` for inclusive and
    /// `{`/`}` for exclusive bounds.
    pub fn range<A: Display, B: Display>(self, name: &str, open: char, from: A, to: B, close: char) -> Self {
        self.push(Token::Term(format!("{}:{}{} TO {}{}", name, open, from, to, close)))
    }

    /// `_exists_:name`
    pub fn exists(self, name: &str) -> Self {
        self.push(Token::Term(format!("_exists_:{}", name)))
    }

    pub fn and(self) -> Self {
        self.push(Token::And)
    }

    pub fn or(self) -> Self {
        self.push(Token::Or)
    }

    pub fn not(self) -> Self {
        self.push(Token::Not)
    }

    pub fn open_paren(self) -> Self {
        self.push(Token::Open)
    }

    pub fn close_paren(self) -> Self {
        self.push(Token::Close)
    }

    pub fn is_empty(&self) -> bool {
        !self.tokens.iter().any(|t| matches!(t, Token::Term(_)))
    }

    /// Render the query, dropping operators that have nothing to
    /// operate on.
    pub fn build(&self) -> String {
        let mut tokens = self.tokens.clone();
        loop {
            let before = tokens.len();
            let mut cleaned: Vec<Token> = Vec::with_capacity(tokens.len());
            for (i, token) in tokens.iter().enumerate() {
                let prev = cleaned.last();
                let next = tokens.get(i + 1);
                let dangling_left = token.is_binary()
                    && matches!(prev, None | Some(Token::Open) | Some(Token::And) | Some(Token::Or) | Some(Token::Not));
                let dangling_right =
                    token.is_operator() && matches!(next, None | Some(Token::Close));
                if dangling_left || dangling_right {
                    continue;
                }
                if *token == Token::Close && prev == Some(&Token::Open) {
                    cleaned.pop();
                    continue;
                }
                cleaned.push(token.clone());
            }
            tokens = cleaned;
            if tokens.len() == before {
                break;
            }
        }

        let mut out = String::new();
        for token in &tokens {
            let part = match token {
                Token::Term(term) => term.as_str(),
                Token::And => "AND",
                Token::Or => "OR",
                Token::Not => "NOT",
                Token::Open => "(",
                Token::Close => ")",
            };
            let glue = !out.is_empty() && !out.ends_with('(') && part != ")";
            if glue {
                out.push(' ');
            }
            out.push_str(part);
        }
        out
    }
}

impl Display for GraylogQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.build())
    }
}

const RESERVED: &[char] = &[
    '\\', '+', '-', '!', '(', ')', ':', '^', '[', ']', '"', '{', '}', '~', '*', '?', '|', '&', '/', ' ',
];

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if RESERVED.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}
