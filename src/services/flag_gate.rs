use crate::error::{AppError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub const GO_VALUE: &str = "GO";

/// Reads the first line of the flag file, trimmed. An empty file reads as "".
pub fn read_flag(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| AppError::io(path, e))?;
    let mut line = String::new();
    BufReader::new(file)
        .read_line(&mut line)
        .map_err(|e| AppError::io(path, e))?;
    Ok(line.trim().to_string())
}

pub fn is_go(value: &str) -> bool {
    value == GO_VALUE
}
