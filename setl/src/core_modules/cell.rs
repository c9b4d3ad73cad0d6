// THEORY:
// A `Cell` is the smallest unit of world state: a single square of the automaton
// that is either alive or dead. It is a "dumb" value type with no knowledge of
// its neighbours; neighbourhood logic lives in the grid.
//
// The text encoding (`X` alive, `O` dead) is the one used by world and pattern
// files, so conversion lives here rather than in the loader.

pub mod cell {
    /// Two-state automaton cell.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[repr(u8)]
    pub enum Cell {
        #[default]
        Dead = 0,
        Alive = 1,
    }

    impl Cell {
        pub const ALIVE_CHAR: char = 'X';
        pub const DEAD_CHAR: char = 'O';

        pub fn is_alive(self) -> bool {
            self == Cell::Alive
        }

        pub fn from_char(c: char) -> Option<Cell> {
            match c {
                Self::ALIVE_CHAR => Some(Cell::Alive),
                Self::DEAD_CHAR => Some(Cell::Dead),
                _ => None,
            }
        }

        pub fn to_char(self) -> char {
            match self {
                Cell::Alive => Self::ALIVE_CHAR,
                Cell::Dead => Self::DEAD_CHAR,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::cell::Cell;

    #[test]
    fn text_encoding_round_trips() {
        assert_eq!(Cell::from_char('X'), Some(Cell::Alive));
        assert_eq!(Cell::from_char('O'), Some(Cell::Dead));
        assert_eq!(Cell::from_char('.'), None);
        assert_eq!(Cell::Alive.to_char(), 'X');
        assert_eq!(Cell::default(), Cell::Dead);
    }
}
