use crate::{SourceLocation, SourceSpan};

#[test]
fn advance_tracks_lines_and_columns() {
    let loc = SourceLocation::START.advanced("ab");
    assert_eq!((loc.line, loc.column, loc.offset), (1, 3, 2));

    let loc = SourceLocation::START.advanced("a\nbc");
    assert_eq!((loc.line, loc.column, loc.offset), (2, 3, 4));

    let loc = SourceLocation::START.advanced("\n\n");
    assert_eq!((loc.line, loc.column, loc.offset), (3, 1, 2));
}

#[test]
fn advance_counts_columns_in_chars_and_offsets_in_bytes() {
    let loc = SourceLocation::START.advanced("éé");
    assert_eq!((loc.line, loc.column, loc.offset), (1, 3, 4));
}

#[test]
fn span_cover() {
    let a = SourceSpan::new(
        SourceLocation::new(1, 1, 0),
        SourceLocation::new(1, 3, 2),
    );
    let b = SourceSpan::new(
        SourceLocation::new(1, 5, 4),
        SourceLocation::new(1, 8, 7),
    );
    let covered = a.cover(b);
    assert_eq!(covered.start.offset, 0);
    assert_eq!(covered.end.offset, 7);
    assert_eq!(covered.len(), 7);
}

#[test]
fn span_display() {
    let span = SourceSpan::new(
        SourceLocation::new(1, 1, 0),
        SourceLocation::new(1, 6, 5),
    );
    assert_eq!(span.to_string(), "1:1-1:6");
    assert!(!span.is_empty());
    assert!(SourceSpan::empty(SourceLocation::START).is_empty());
}
