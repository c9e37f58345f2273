use super::{Diagnostics, Severity};

#[test]
fn builder_collects_messages() {
    let mut diagnostics = Diagnostics::new();
    diagnostics.error("unexpected input", 4..7).emit();
    diagnostics
        .warning("unused rule", 10..14)
        .help("remove it or reference it")
        .emit();

    assert_eq!(diagnostics.len(), 2);
    assert!(diagnostics.has_errors());
    let first = diagnostics.iter().next().unwrap();
    assert_eq!(first.severity, Severity::Error);
    assert_eq!(first.range, 4..7);
}

#[test]
fn plain_format_without_source() {
    let mut diagnostics = Diagnostics::new();
    diagnostics.error("unexpected input", 4..7).emit();
    let rendered = diagnostics.printer().render();
    assert_eq!(rendered, "error[E0001] at 4..7: unexpected input");
}

#[test]
fn warnings_carry_no_code() {
    let mut diagnostics = Diagnostics::new();
    diagnostics.warning("unused rule", 0..4).emit();
    let rendered = diagnostics.printer().render();
    assert_eq!(rendered, "warning at 0..4: unused rule");
}

#[test]
fn render_with_source_shows_snippet() {
    let source = "List <- Item (',' Item)*";
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .error("undefined rule `Item`", 8..12)
        .help("expected a defined rule name")
        .emit();

    let rendered = diagnostics.printer().source(source).path("list.peg").render();
    assert!(rendered.contains("error[E0001]"), "got: {rendered}");
    assert!(rendered.contains("undefined rule `Item`"), "got: {rendered}");
    assert!(rendered.contains("list.peg"), "got: {rendered}");
    assert!(rendered.contains("^"), "got: {rendered}");
    assert!(rendered.contains("help"), "got: {rendered}");
}

#[test]
fn zero_width_ranges_render_one_caret() {
    let source = "abc";
    let mut diagnostics = Diagnostics::new();
    diagnostics.error("expected end of input", 3..3).emit();
    let rendered = diagnostics.printer().source(source).render();
    assert!(rendered.contains("error"), "got: {rendered}");
}

#[test]
fn related_info_renders_as_secondary() {
    let source = "A <- B\nB <- A";
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .error("rule cycle", 0..1)
        .related_to("second participant", 7..8)
        .emit();
    let rendered = diagnostics.printer().source(source).render();
    assert!(rendered.contains("second participant"), "got: {rendered}");
}

#[test]
fn extend_merges_collections() {
    let mut a = Diagnostics::new();
    a.error("first", 0..1).emit();
    let mut b = Diagnostics::new();
    b.error("second", 1..2).emit();
    a.extend(b);
    assert_eq!(a.len(), 2);
}
