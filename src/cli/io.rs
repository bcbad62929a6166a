//! JSON-line I/O for the CLI
//!
//! - Input: one JSON request per line; blank lines are skipped
//! - Output: one JSON response per line on stdout
//! - Logs never go to stdout

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use super::errors::CliResult;

/// Open the request source: a file when given, stdin otherwise
pub fn open_requests(path: Option<&Path>) -> CliResult<Box<dyn BufRead>> {
    Ok(match path {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    })
}

/// Non-blank request lines
pub fn read_requests<R: BufRead>(reader: R) -> impl Iterator<Item = CliResult<String>> {
    reader.lines().filter_map(|line| match line {
        Ok(line) if line.trim().is_empty() => None,
        Ok(line) => Some(Ok(line)),
        Err(e) => Some(Err(e.into())),
    })
}

/// Write one line of JSON and flush
pub fn write_json<W: Write>(out: &mut W, json_str: &str) -> CliResult<()> {
    writeln!(out, "{}", json_str)?;
    out.flush()?;
    Ok(())
}

/// Write an error response line to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });
    write_json(&mut io::stdout(), &response.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_requests_skips_blank_lines() {
        let input = Cursor::new("{\"op\":\"a\"}\n\n   \n{\"op\":\"b\"}\n");
        let lines: Vec<String> = read_requests(input).map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["{\"op\":\"a\"}", "{\"op\":\"b\"}"]);
    }

    #[test]
    fn test_write_json_appends_newline() {
        let mut out = Vec::new();
        write_json(&mut out, "{}").unwrap();
        assert_eq!(out, b"{}\n");
    }
}
