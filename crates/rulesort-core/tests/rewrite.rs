//! End-to-end rewrites of synthetic DVI documents
//!
//! Run with: cargo test -p rulesort-core --test rewrite

mod common;

use common::{red_blue_page, Fixture, FixtureBuilder};
use pretty_assertions::assert_eq;
use rulesort_core::opcode::{
    DOWN4, EOP, NOP, POP, POST, POST_POST, PUSH, PUT_RULE, RIGHT4, XXX1,
};
use rulesort_core::segment::{COLOR_POP, DEFAULT_COLOR_PUSH};
use rulesort_core::{
    inspect, rewrite_bytes, ColorSpec, Document, DviLayout, Event, RewriteConfig, RewriteStats,
    Rewriter, RuleEntry, RuleSortError,
};

fn verified() -> RewriteConfig {
    RewriteConfig {
        verify_output: true,
        ..RewriteConfig::default()
    }
}

fn run(fixture: &Fixture) -> (Vec<u8>, RewriteStats) {
    rewrite_bytes(
        fixture.dvi.clone(),
        fixture.annotations.as_bytes(),
        verified(),
    )
    .expect("rewrite should succeed")
}

fn layout(bytes: &[u8]) -> DviLayout {
    inspect(&Document::new(bytes.to_vec())).expect("should be a walkable DVI")
}

/// Bytes of one rule segment as the builder emits them
fn segment(h: i32, v: i32, color: &str, height: i32, width: i32) -> Vec<u8> {
    let mut s = vec![PUSH];
    if h != 0 {
        s.push(RIGHT4);
        s.extend_from_slice(&h.to_be_bytes());
    }
    if v != 0 {
        s.push(DOWN4);
        s.extend_from_slice(&v.to_be_bytes());
    }
    let text = format!("color push {}", color);
    s.push(XXX1);
    s.push(text.len() as u8);
    s.extend_from_slice(text.as_bytes());
    s.push(PUT_RULE);
    s.extend_from_slice(&height.to_be_bytes());
    s.extend_from_slice(&width.to_be_bytes());
    s.extend_from_slice(COLOR_POP);
    s.push(POP);
    s
}

#[test]
fn test_red_blue_page_is_grouped_and_wrapped() {
    let fixture = red_blue_page();
    let (out, stats) = run(&fixture);

    let eop = layout(&fixture.dvi).pages[0].eop_offset;
    assert_eq!(&out[..eop], &fixture.dvi[..eop]);

    let mut group = vec![PUSH, RIGHT4];
    group.extend_from_slice(&(-40i32).to_be_bytes());
    group.push(DOWN4);
    group.extend_from_slice(&(-60i32).to_be_bytes());
    group.extend(segment(10, 20, "red", 100, 50));
    group.extend(segment(30, 5, "blue", 20, 200));
    group.push(POP);
    assert_eq!(&out[eop..eop + group.len()], group.as_slice());
    assert_eq!(out[eop + group.len()], EOP);
    assert_eq!(out[eop + group.len() + 1], POST);

    assert_eq!(stats.pages, 1);
    assert_eq!(stats.rules, 2);
    assert_eq!(stats.output_bytes, out.len());
    assert_eq!(stats.growth(), group.len() as isize);
}

#[test]
fn test_cursor_is_restored_after_group() {
    let fixture = red_blue_page();
    let (out, _) = run(&fixture);

    let page = &layout(&out).pages[0];
    assert_eq!(page.final_position, (40, 60));
    assert_eq!(page.max_depth, 2);

    let drawn: Vec<(Option<&str>, i32, i32)> = page.rules[2..]
        .iter()
        .map(|r| (r.color.as_deref(), r.h, r.v))
        .collect();
    assert_eq!(drawn, vec![(Some("red"), 10, 20), (Some("blue"), 30, 5)]);
}

#[test]
fn test_trailer_pointers_follow_moved_pages() {
    let fixture = FixtureBuilder::new()
        .begin_page()
        .move_to(5, 5)
        .rule("blue", 10, 10)
        .rule("red", 10, 10)
        .end_page()
        .begin_page()
        .noise()
        .move_to(0, 100)
        .rule("green", 3, 4)
        .end_page()
        .begin_page()
        .rule("blue", 1, 1)
        .end_page()
        .finish();
    let (out, stats) = run(&fixture);
    assert_eq!(stats.pages, 3);
    assert_eq!(stats.post_total_pages, 3);

    let layout = layout(&out);
    layout.validate().unwrap();
    let bops: Vec<usize> = layout.pages.iter().map(|p| p.bop_offset).collect();
    assert_eq!(bops[0], fixture.bops[0]);
    assert!(bops[1] > fixture.bops[1]);
    assert_eq!(layout.post_pointer, bops[2] as i32);
    assert_eq!(layout.post_post_pointer, layout.post_offset as i32);
    assert_eq!(out[layout.post_offset], POST);
    assert_eq!(out[layout.post_post_offset], POST_POST);
    assert_eq!(layout.pages[1].prev_pointer, bops[0] as i32);
    assert_eq!(layout.pages[2].prev_pointer, bops[1] as i32);
}

#[test]
fn test_font_table_is_untouched() {
    let fixture = red_blue_page();
    let (out, _) = run(&fixture);
    let before = layout(&fixture.dvi);
    let after = layout(&out);
    assert_eq!(after.font_defs, 2);
    assert_eq!(after.font_table, before.font_table);
    assert_eq!(after.total_pages, before.total_pages);
    assert_eq!(after.max_stack_depth, before.max_stack_depth);
    assert_eq!(after.padding, before.padding);
}

#[test]
fn test_line_markers_become_nops() {
    let fixture = FixtureBuilder::new()
        .begin_page()
        .marker('b')
        .move_to(1, 2)
        .rule("red", 5, 5)
        .marker('e')
        .end_page()
        .begin_page()
        .marker('b')
        .rule("blue", 5, 5)
        .marker('e')
        .end_page()
        .finish();
    let (out, stats) = run(&fixture);
    assert_eq!(stats.markers_redacted, 4);

    let source = layout(&fixture.dvi);
    let output = layout(&out);
    for (at, len) in &fixture.markers {
        let page = source
            .pages
            .iter()
            .position(|p| p.bop_offset < *at && *at < p.eop_offset)
            .unwrap();
        let shift = output.pages[page].bop_offset - source.pages[page].bop_offset;
        let redacted = &out[at + shift..at + shift + len];
        assert!(redacted.iter().all(|&b| b == NOP), "marker at {at}");
        assert_eq!(out[at + shift - 1], fixture.dvi[at - 1]);
    }
    for page in &output.pages {
        assert!(page.specials.iter().all(|(_, text)| !text.contains("sirule")));
    }
}

#[test]
fn test_rule_without_color_gets_gray() {
    let fixture = FixtureBuilder::new()
        .begin_page()
        .move_to(7, 9)
        .plain_rule(4, 4)
        .end_page()
        .finish();
    let (out, _) = run(&fixture);

    assert!(out
        .windows(DEFAULT_COLOR_PUSH.len())
        .any(|w| w == DEFAULT_COLOR_PUSH));
    let page = &layout(&out).pages[0];
    let grouped = page.rules.last().unwrap();
    assert_eq!(grouped.color.as_deref(), Some("gray 0"));
    assert_eq!((grouped.h, grouped.v), (7, 9));
}

#[test]
fn test_page_without_rules_still_balanced() {
    let fixture = FixtureBuilder::new()
        .begin_page()
        .noise()
        .move_to(3, 4)
        .end_page()
        .finish();
    let (out, stats) = run(&fixture);
    assert_eq!(stats.rules, 0);
    assert_eq!(layout(&out).pages[0].final_position, (3, 4));
}

#[test]
fn test_disabling_relink_keeps_source_pointers() {
    let fixture = FixtureBuilder::new()
        .begin_page()
        .rule("red", 1, 1)
        .end_page()
        .begin_page()
        .end_page()
        .finish();
    let config = RewriteConfig {
        relink_pages: false,
        ..RewriteConfig::default()
    };
    let (out, _) =
        rewrite_bytes(fixture.dvi.clone(), fixture.annotations.as_bytes(), config).unwrap();
    let output = layout(&out);
    assert_eq!(output.pages[1].prev_pointer, fixture.bops[0] as i32);
    assert_ne!(output.pages[1].bop_offset, fixture.bops[1]);
}

#[test]
fn test_unknown_line_is_fatal() {
    let fixture = red_blue_page();
    let annotations = format!("this is not an event\n{}", fixture.annotations);
    let err = rewrite_bytes(fixture.dvi, annotations.as_bytes(), verified()).unwrap_err();
    match err {
        RuleSortError::Grammar {
            line,
            expected_fields,
        } => {
            assert_eq!(line, "this is not an event");
            assert_eq!(expected_fields, 3);
        }
        other => panic!("expected grammar error, got {other:?}"),
    }
}

#[test]
fn test_segment_capacity_is_enforced() {
    let fixture = red_blue_page();
    let config = RewriteConfig {
        segment_capacity: 32,
        ..RewriteConfig::default()
    };
    let err = rewrite_bytes(fixture.dvi, fixture.annotations.as_bytes(), config).unwrap_err();
    assert!(matches!(
        err,
        RuleSortError::SegmentOverflow { capacity: 32, .. }
    ));
}

#[test]
fn test_out_of_sync_rule_is_fatal() {
    let fixture = red_blue_page();
    let bop = fixture.bops[0];
    let rule = |rule_offset: usize, height: i32| {
        Event::Rule(RuleEntry {
            h: 0,
            v: 0,
            color_offset: 0,
            color: ColorSpec::Gray(0.0),
            rule_offset,
            op: "setrule".into(),
            height,
            width: 50,
            pixels: (1, 1),
        })
    };

    let mut rewriter = Rewriter::new(
        Document::new(fixture.dvi.clone()),
        Vec::new(),
        RewriteConfig::default(),
    );
    let err = rewriter.handle(rule(bop, 100)).unwrap_err();
    assert!(matches!(
        err,
        RuleSortError::UnexpectedOpcode { offset, .. } if offset == bop
    ));

    // red rule: bop(45) right4(5) down4(5) xxx1 "color push red"(16)
    let red_rule = bop + 45 + 10 + 16;
    rewriter.handle(rule(red_rule, 100)).unwrap();
    let err = rewriter.handle(rule(red_rule, 99)).unwrap_err();
    assert!(matches!(
        err,
        RuleSortError::RuleMismatch {
            expected: (99, 50),
            found: (100, 50),
            ..
        }
    ));
}

#[test]
fn test_missing_page_end_is_fatal() {
    let fixture = red_blue_page();
    let annotations: String = fixture
        .annotations
        .lines()
        .filter(|l| !l.contains("eop"))
        .map(|l| format!("{l}\n"))
        .collect();
    let err = rewrite_bytes(fixture.dvi, annotations.as_bytes(), verified()).unwrap_err();
    assert!(matches!(err, RuleSortError::Layout(_)), "{err}");

    let fixture = FixtureBuilder::new().begin_page().end_page().finish();
    let annotations = fixture.annotations.lines().next().unwrap().to_string();
    let err = rewrite_bytes(fixture.dvi, annotations.as_bytes(), verified()).unwrap_err();
    assert!(matches!(
        err,
        RuleSortError::UnexpectedOpcode { offset: 0, .. }
    ));
}

#[test]
fn test_document_without_pages() {
    let fixture = FixtureBuilder::new().finish();
    let (out, stats) = rewrite_bytes(fixture.dvi.clone(), &b""[..], verified()).unwrap();
    assert_eq!(stats.pages, 0);
    assert_eq!(out, fixture.dvi);

    let output = layout(&out);
    assert!(output.pages.is_empty());
    assert_eq!(output.post_pointer, -1);
}
