use std::fmt;

/// A 1-based line and column in a source file.
///
/// Columns count bytes from the start of the line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    /// The line number, starting at 1.
    pub line: usize,
    /// The column number, starting at 1.
    pub column: usize,
}

/// Converts byte offsets into a source file to line and column numbers.
#[derive(Debug, Clone)]
pub struct LineResolver {
    lines: Vec<usize>,
}

impl LineResolver {
    /// Indexes the line breaks of `source_code`.
    pub fn new(source_code: &str) -> Self {
        let lines = source_code
            .match_indices('\n')
            .map(|(index, _)| index + 1)
            .collect();
        LineResolver { lines }
    }

    /// Gets the location of the byte at `offset`.
    pub fn resolve(&self, offset: usize) -> Location {
        let (line, column) = match self.lines.binary_search(&offset) {
            Ok(index) => (index + 1, 0),
            Err(0) => (0, offset),
            Err(index) => (index, offset - self.lines[index - 1]),
        };

        Location {
            line: line + 1,
            column: column + 1,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[test]
fn resolve_line_number() {
    let resolver = LineResolver::new("hello\nworld\nfoo");

    let resolve = |offset| {
        let location = resolver.resolve(offset);
        (location.line, location.column)
    };

    assert_eq!(resolve(0), (1, 1));
    assert_eq!(resolve(4), (1, 5));
    assert_eq!(resolve(5), (1, 6));
    assert_eq!(resolve(6), (2, 1));
    assert_eq!(resolve(7), (2, 2));
    assert_eq!(resolve(10), (2, 5));
    assert_eq!(resolve(11), (2, 6));
    assert_eq!(resolve(12), (3, 1));
    assert_eq!(resolve(13), (3, 2));
    assert_eq!(resolve(15), (3, 4));
}
