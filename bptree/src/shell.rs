//! Line-oriented command shell over a `BTree`.
//!
//! One command per line; the command word is case-insensitive:
//!
//! ```text
//! > PUT 1 hello world
//! OK
//! > GET 1
//! hello world
//! > DEL 1
//! Deleted
//! ```
//!
//! Tree errors are reported on the output and the loop continues.

use std::io::{BufRead, Write};

use crate::storage::{BTree, BTreeError, PageStore};

/// Commands understood by the shell, with their usage lines.
const COMMANDS: &[(&str, &str)] = &[
    ("GET", "Get value by key (Usage: GET <key>)"),
    ("PUT", "Insert or update key-value (Usage: PUT <key> <value>)"),
    ("DEL", "Delete key (Usage: DEL <key>)"),
    ("STATS", "Show tree statistics"),
    ("TREE", "Show tree structure"),
    ("VERIFY", "Check tree invariants"),
    ("help", "Show this help"),
    ("exit", "Exit program"),
];

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Get { key: u64 },
    Put { key: u64, value: String },
    Del { key: u64 },
    Stats,
    Tree,
    Verify,
    Help,
    Exit,
}

/// Error returned when a line is not a valid command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    UnknownCommand(String),
    InvalidKey(String),
    MissingValue,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownCommand(_) => write!(f, "Unknown command. Use 'help'"),
            Self::InvalidKey(_) => write!(f, "Invalid key format. Expected <uint64>"),
            Self::MissingValue => write!(f, "Invalid value format. Expected <string>"),
        }
    }
}

impl std::error::Error for ParseError {}

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, rest) = split_word(line);
        let command = match word.to_ascii_uppercase().as_str() {
            "GET" => Self::Get {
                key: parse_key(rest)?,
            },
            "DEL" => Self::Del {
                key: parse_key(rest)?,
            },
            "PUT" => {
                let (key, value) = split_word(rest);
                let key = parse_key(key)?;
                if value.is_empty() {
                    return Err(ParseError::MissingValue);
                }
                Self::Put {
                    key,
                    value: value.to_string(),
                }
            }
            "STATS" => Self::Stats,
            "TREE" => Self::Tree,
            "VERIFY" => Self::Verify,
            "HELP" => Self::Help,
            "EXIT" => Self::Exit,
            _ => return Err(ParseError::UnknownCommand(word.to_string())),
        };
        Ok(Some(command))
    }
}

fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    text.find(char::is_whitespace)
        .map_or((text, ""), |end| (&text[..end], text[end..].trim()))
}

fn parse_key(text: &str) -> Result<u64, ParseError> {
    let (word, _) = split_word(text);
    word.parse().map_err(|_| ParseError::InvalidKey(word.to_string()))
}

/// Result of executing a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Text to print (may span several lines).
    Output(String),
    /// Leave the shell loop.
    Exit,
}

/// Interactive shell owning an open tree.
pub struct Shell<S: PageStore> {
    tree: BTree<S>,
}

impl<S: PageStore> Shell<S> {
    #[must_use]
    pub const fn new(tree: BTree<S>) -> Self {
        Self { tree }
    }

    #[must_use]
    pub const fn tree(&self) -> &BTree<S> {
        &self.tree
    }

    #[must_use]
    pub fn into_tree(self) -> BTree<S> {
        self.tree
    }

    /// Run one command against the tree.
    pub fn execute(&mut self, command: &Command) -> Result<Reply, BTreeError> {
        let text = match command {
            Command::Get { key } => self.tree.get(*key)?.map_or_else(
                || "Not found".to_string(),
                |value| String::from_utf8_lossy(&value).into_owned(),
            ),
            Command::Put { key, value } => {
                self.tree.put(*key, value.as_bytes())?;
                "OK".to_string()
            }
            Command::Del { key } => {
                if self.tree.remove(*key)? {
                    "Deleted".to_string()
                } else {
                    "Key not found".to_string()
                }
            }
            Command::Stats => self.tree.stats().to_string(),
            Command::Tree => self.tree.dump_structure()?.trim_end().to_string(),
            Command::Verify => format!("OK: {}", self.tree.verify()?),
            Command::Help => help_text(),
            Command::Exit => return Ok(Reply::Exit),
        };
        Ok(Reply::Output(text))
    }

    /// Read commands from `input` until `exit` or end of input.
    ///
    /// Only I/O errors on `input`/`output` end the loop early.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> std::io::Result<()> {
        writeln!(output, "Database opened. Type 'help' for commands")?;
        let mut lines = input.lines();

        loop {
            write!(output, "> ")?;
            output.flush()?;
            let Some(line) = lines.next() else {
                writeln!(output)?;
                break;
            };
            let line = line?;

            let command = match Command::parse(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    writeln!(output, "{e}")?;
                    continue;
                }
            };

            match self.execute(&command) {
                Ok(Reply::Output(text)) => writeln!(output, "{text}")?,
                Ok(Reply::Exit) => break,
                Err(e) => {
                    let (word, _) = split_word(&line);
                    tracing::error!(command = word, "command failed: {e}");
                    writeln!(output, "Error executing command '{word}': {e}")?;
                }
            }
        }

        Ok(())
    }
}

fn help_text() -> String {
    let mut text = String::from("Available commands:");
    for (name, description) in COMMANDS {
        text.push_str("\n  ");
        text.push_str(name);
        text.push_str(": \t");
        text.push_str(description);
    }
    text
}
