//! Reading worlds and patterns from their text format.
//!
//! Both files start with an edge length `N`, followed by `N` lines of `N`
//! characters each: `X` for alive and `O` for dead.

use crate::core_modules::cell::cell::Cell;
use crate::core_modules::grid::Grid;
use crate::core_modules::match_codec;
use crate::core_modules::pattern::Pattern;
use crate::error::{Result, SetlError};
use std::path::Path;

pub fn load_world(path: impl AsRef<Path>) -> Result<Grid> {
    parse_world(&read(path.as_ref())?)
}

pub fn load_pattern(path: impl AsRef<Path>) -> Result<Pattern> {
    parse_pattern(&read(path.as_ref())?)
}

/// Parses a world into a padded grid with a dead frame.
pub fn parse_world(text: &str) -> Result<Grid> {
    let (size, rows) = parse_square(text)?;
    let mut grid = Grid::padded(size)?;
    for (r, row) in rows.iter().enumerate() {
        for (c, &cell) in row.iter().enumerate() {
            grid.set(r + 1, c + 1, cell);
        }
    }
    Ok(grid)
}

/// Parses the North orientation of a search pattern.
pub fn parse_pattern(text: &str) -> Result<Pattern> {
    let (size, rows) = parse_square(text)?;
    if size == 0 {
        return Err(SetlError::parse(1, "pattern size must be at least 1"));
    }
    Pattern::new(size, rows.concat())
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| SetlError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_square(text: &str) -> Result<(usize, Vec<Vec<Cell>>)> {
    let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l.trim_end_matches('\r')));

    let (header_line, header) = lines
        .by_ref()
        .find(|(_, l)| !l.trim().is_empty())
        .ok_or_else(|| SetlError::parse(1, "missing size header"))?;
    let size: usize = header
        .trim()
        .parse()
        .map_err(|_| SetlError::parse(header_line, format!("invalid size {:?}", header.trim())))?;
    // Nothing larger can be reported, and the header is untrusted.
    match_codec::check_world_size(size)?;

    let mut rows = Vec::new();
    let mut last_line = header_line;
    for _ in 0..size {
        let (line_no, line) = lines
            .next()
            .ok_or_else(|| SetlError::parse(last_line + 1, format!("expected {size} rows, found {}", rows.len())))?;
        last_line = line_no;
        let chars: Vec<char> = line.chars().take(size).collect();
        if chars.len() < size {
            return Err(SetlError::parse(
                line_no,
                format!("row has {} cells, expected {size}", chars.len()),
            ));
        }
        let row = chars
            .into_iter()
            .enumerate()
            .map(|(col, c)| {
                Cell::from_char(c).ok_or_else(|| {
                    SetlError::parse(line_no, format!("unexpected {c:?} in column {}", col + 1))
                })
            })
            .collect::<Result<Vec<Cell>>>()?;
        rows.push(row);
    }
    Ok((size, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_gets_a_dead_frame() {
        let grid = parse_world("3\nXOO\nOXO\nOOX\n").unwrap();
        assert_eq!(grid.width(), 5);
        assert_eq!(grid.height(), 5);
        assert_eq!(grid.to_text(), "OOO\nXOO\nOXO\nOOX\nOOO\n");
        assert!(grid.row(0).iter().all(|c| !c.is_alive()));
        assert!((0..5).all(|r| !grid.get(r, 0).is_alive() && !grid.get(r, 4).is_alive()));
    }

    #[test]
    fn tolerates_crlf() {
        let pattern = parse_pattern("2\r\nXO\r\nOX\r\n").unwrap();
        assert_eq!(pattern.size(), 2);
        assert!(pattern.get(1, 1).is_alive());
    }

    #[test]
    fn reports_line_numbers() {
        let short = parse_world("3\nXOO\nOX\nOOX\n").unwrap_err();
        assert!(matches!(short, SetlError::Parse { line: 3, .. }));

        let bad_char = parse_world("2\nXO\nO?\n").unwrap_err();
        assert!(matches!(bad_char, SetlError::Parse { line: 3, .. }));

        let missing = parse_world("3\nXOO\n").unwrap_err();
        assert!(matches!(missing, SetlError::Parse { line: 3, .. }));

        let header = parse_world("three\n").unwrap_err();
        assert!(matches!(header, SetlError::Parse { line: 1, .. }));

        assert!(parse_pattern("0\n").is_err());
    }

    #[test]
    fn oversized_header_is_rejected_before_reading_rows() {
        let err = parse_world("20000\nXO\n").unwrap_err();
        assert!(matches!(err, SetlError::EncodingOverflow { value: 20_000, .. }));

        let huge = format!("{}\nXO\n", usize::MAX);
        assert!(matches!(parse_world(&huge), Err(SetlError::EncodingOverflow { .. })));
        assert!(parse_pattern(&huge).is_err());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_world("/definitely/not/here.txt").unwrap_err();
        assert!(matches!(err, SetlError::Io { .. }));
    }
}
