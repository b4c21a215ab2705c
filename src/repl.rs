//! Command processor: the read-parse-dispatch-print loop.
//!
//! This layer owns all text handling and every user-facing message. It
//! validates statements before the engine sees them and maps engine
//! outcomes to fixed output lines; the engine itself never prints.

use std::io::{BufRead, Write};

use crate::btree::node::{
    COMMON_NODE_HEADER_SIZE, LEAF_NODE_CELL_SIZE, LEAF_NODE_HEADER_SIZE, LEAF_NODE_MAX_CELLS,
    LEAF_NODE_SPACE_FOR_CELLS,
};
use crate::btree::BTree;
use crate::common::{Error, Result};
use crate::row::{Row, EMAIL_MAX_LEN, ROW_SIZE, USERNAME_MAX_LEN};

/// Printed before every read.
pub const PROMPT: &str = "db > ";

/// Dot-prefixed controls outside the statement grammar.
enum MetaCommand {
    Exit,
    Btree,
    Constants,
}

impl MetaCommand {
    fn parse(input: &str) -> Option<Self> {
        match input {
            ".exit" => Some(MetaCommand::Exit),
            ".btree" => Some(MetaCommand::Btree),
            ".constants" => Some(MetaCommand::Constants),
            _ => None,
        }
    }
}

/// The two statement forms.
#[derive(Debug, PartialEq, Eq)]
pub enum Statement {
    Insert(Row),
    Select,
}

/// Everything that can stop a line before it reaches the engine. The
/// Display text is the exact user-facing message.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PrepareError {
    #[error("Syntax error. Could not parse statement.")]
    Syntax,
    #[error("ID must be positive.")]
    NonPositiveId,
    #[error("String is too long.")]
    StringTooLong,
    #[error("Unrecognized keyword at start of '{0}'.")]
    Unrecognized(String),
}

/// Parse one trimmed input line into a statement.
///
/// Validation order: keyword, argument count, id shape and sign, username
/// length, email length.
pub fn prepare(input: &str) -> std::result::Result<Statement, PrepareError> {
    let mut parts = input.split_whitespace();
    match parts.next() {
        Some("select") => {
            if parts.next().is_some() {
                return Err(PrepareError::Syntax);
            }
            Ok(Statement::Select)
        }
        Some("insert") => {
            let args: Vec<&str> = parts.collect();
            if args.len() != 3 {
                return Err(PrepareError::Syntax);
            }
            prepare_insert(args[0], args[1], args[2])
        }
        _ => Err(PrepareError::Unrecognized(input.to_string())),
    }
}

fn prepare_insert(
    id: &str,
    username: &str,
    email: &str,
) -> std::result::Result<Statement, PrepareError> {
    // parse through i64 so a leading minus sign is a sign error, not a
    // syntax error
    let id: i64 = id.parse().map_err(|_| PrepareError::Syntax)?;
    if id <= 0 {
        return Err(PrepareError::NonPositiveId);
    }
    let id = u32::try_from(id).map_err(|_| PrepareError::Syntax)?;

    if username.len() > USERNAME_MAX_LEN || email.len() > EMAIL_MAX_LEN {
        return Err(PrepareError::StringTooLong);
    }

    Ok(Statement::Insert(Row {
        id,
        username: username.to_string(),
        email: email.to_string(),
    }))
}

/// Drive the command loop until `.exit` or end of input, then close the
/// database. A fatal storage error aborts the loop but the closing flush is
/// still attempted before it propagates.
pub fn run<R: BufRead, W: Write>(mut input: R, mut out: W, mut table: BTree) -> Result<()> {
    let result = command_loop(&mut input, &mut out, &mut table);
    let closed = table.close();
    result.and(closed)
}

fn command_loop<R: BufRead, W: Write>(input: &mut R, out: &mut W, table: &mut BTree) -> Result<()> {
    let mut line = String::new();
    loop {
        write!(out, "{PROMPT}")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(()); // end of input
        }
        let text = line.trim();

        if text.starts_with('.') {
            match MetaCommand::parse(text) {
                Some(MetaCommand::Exit) => return Ok(()),
                Some(MetaCommand::Btree) => {
                    writeln!(out, "Tree:")?;
                    write!(out, "{}", table.render()?)?;
                }
                Some(MetaCommand::Constants) => print_constants(out)?,
                None => writeln!(out, "Unrecognized command '{text}'.")?,
            }
            continue;
        }

        match prepare(text) {
            Ok(statement) => execute(statement, table, out)?,
            Err(e) => writeln!(out, "{e}")?,
        }
    }
}

fn execute<W: Write>(statement: Statement, table: &mut BTree, out: &mut W) -> Result<()> {
    match statement {
        Statement::Insert(row) => match table.insert(&row) {
            Ok(()) => writeln!(out, "Executed.")?,
            Err(Error::DuplicateKey(_)) => writeln!(out, "Error: Duplicate key.")?,
            Err(Error::TableFull) => writeln!(out, "Error: Table full.")?,
            Err(fatal) => return Err(fatal),
        },
        Statement::Select => {
            for row in table.scan()? {
                writeln!(out, "{}", row?)?;
            }
            writeln!(out, "Executed.")?;
        }
    }
    Ok(())
}

fn print_constants<W: Write>(out: &mut W) -> Result<()> {
    writeln!(out, "Constants:")?;
    writeln!(out, "ROW_SIZE: {ROW_SIZE}")?;
    writeln!(out, "COMMON_NODE_HEADER_SIZE: {COMMON_NODE_HEADER_SIZE}")?;
    writeln!(out, "LEAF_NODE_HEADER_SIZE: {LEAF_NODE_HEADER_SIZE}")?;
    writeln!(out, "LEAF_NODE_CELL_SIZE: {LEAF_NODE_CELL_SIZE}")?;
    writeln!(out, "LEAF_NODE_SPACE_FOR_CELLS: {LEAF_NODE_SPACE_FOR_CELLS}")?;
    writeln!(out, "LEAF_NODE_MAX_CELLS: {LEAF_NODE_MAX_CELLS}")?;
    Ok(())
}
