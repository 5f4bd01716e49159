#![allow(clippy::expect_used)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::fmt::Write;
use xmlfrag::accessor::{FallbackTreeAccessor, FragmentAccessor, TreeAccessor};
use xmlfrag::parser::FragmentParser;
use xmlfrag::serial::serialize_fragment;
use xmlfrag::tree::ExpandedName;
use xmlfrag::XmlFragment;

// ---------------------------------------------------------------------------
// Fragment generators
// ---------------------------------------------------------------------------

/// Generates a small fragment with approximately 10 elements.
fn make_small_xml() -> String {
    let mut xml = String::from("<root>\n");
    for i in 0..10 {
        let _ = writeln!(xml, "  <item id=\"{i}\">Value {i}</item>");
    }
    xml.push_str("</root>\n");
    xml
}

/// Generates a medium fragment with approximately 100 elements.
fn make_medium_xml() -> String {
    let mut xml = String::from("<catalog>\n");
    for i in 0..100 {
        let _ = writeln!(
            xml,
            "  <book id=\"bk{i}\"><title>Title {i}</title>\
             <author>Author {i}</author>\
             <price>{}.99</price></book>",
            10 + i
        );
    }
    xml.push_str("</catalog>\n");
    xml
}

/// Generates a large fragment with approximately 1000 elements.
fn make_large_xml() -> String {
    let mut xml = String::from("<database>\n");
    for i in 0..1000 {
        let _ = writeln!(
            xml,
            "  <record id=\"{i}\"><name>Record {i}</name>\
             <value>{}</value><status>active</status></record>",
            i * 42
        );
    }
    xml.push_str("</database>\n");
    xml
}

/// Generates a fragment with many namespace declarations and prefixed
/// elements.
fn make_namespace_heavy_xml() -> String {
    let mut xml = String::from("<root");
    for i in 0..20 {
        let _ = write!(xml, " xmlns:ns{i}=\"http://example.com/ns{i}\"");
    }
    xml.push_str(">\n");
    for i in 0..100 {
        let ns = i % 20;
        let _ = writeln!(
            xml,
            "  <ns{ns}:item ns{ns}:id=\"{i}\">Content {i}</ns{ns}:item>"
        );
    }
    xml.push_str("</root>\n");
    xml
}

// ---------------------------------------------------------------------------
// Parsing benchmarks
// ---------------------------------------------------------------------------

fn bench_parse_small(c: &mut Criterion) {
    let xml = make_small_xml();
    c.bench_function("parse_small", |b| {
        b.iter(|| XmlFragment::parse_str(black_box(&xml)));
    });
}

fn bench_parse_medium(c: &mut Criterion) {
    let xml = make_medium_xml();
    c.bench_function("parse_medium", |b| {
        b.iter(|| XmlFragment::parse_str(black_box(&xml)));
    });
}

fn bench_parse_large(c: &mut Criterion) {
    let xml = make_large_xml();
    c.bench_function("parse_large", |b| {
        b.iter(|| XmlFragment::parse_str(black_box(&xml)));
    });
}

fn bench_parse_namespace_heavy(c: &mut Criterion) {
    let xml = make_namespace_heavy_xml();
    c.bench_function("parse_namespace_heavy", |b| {
        b.iter(|| XmlFragment::parse_str(black_box(&xml)));
    });
}

// ---------------------------------------------------------------------------
// Cursor and traversal benchmarks
// ---------------------------------------------------------------------------

fn bench_cursor_walk(c: &mut Criterion) {
    let xml = make_large_xml();
    let fragment = XmlFragment::parse_str(&xml).expect("failed to parse large XML");
    c.bench_function("cursor_walk", |b| {
        b.iter(|| {
            let mut frag = fragment.clone();
            frag.restart_fragment();
            let mut count: u64 = 0;
            assert!(frag.enter_element("database"));
            while frag.enter_any_element() {
                count += 1;
                while frag.skip_content() {}
                frag.leave_element();
            }
            black_box(count);
        });
    });
}

fn bench_accessor_walk(c: &mut Criterion) {
    let xml = make_large_xml();
    let fragment = XmlFragment::parse_str(&xml).expect("failed to parse large XML");
    c.bench_function("accessor_walk", |b| {
        b.iter(|| {
            let walker = FallbackTreeAccessor::new(FragmentAccessor::new(&fragment));
            let mut count: u64 = 0;
            let mut current = Some(walker.inner().root());
            while let Some(node) = current {
                count += 1;
                current = walker.get_next(node);
            }
            black_box(count);
        });
    });
}

fn bench_element_by_id(c: &mut Criterion) {
    let xml = make_large_xml();
    let fragment = XmlFragment::parse_str(&xml).expect("failed to parse large XML");
    c.bench_function("element_by_id", |b| {
        b.iter(|| {
            let mut walker = FallbackTreeAccessor::new(FragmentAccessor::new(&fragment));
            black_box(walker.element_by_id("999"));
        });
    });
}

// ---------------------------------------------------------------------------
// Building and serialization benchmarks
// ---------------------------------------------------------------------------

fn bench_build_fragment(c: &mut Criterion) {
    c.bench_function("build_fragment", |b| {
        b.iter(|| {
            let mut frag = XmlFragment::new();
            frag.open_element(ExpandedName::unqualified("root"));
            for i in 0..500 {
                frag.open_element(ExpandedName::unqualified("item"));
                frag.set_attribute_format(ExpandedName::unqualified("n"), format_args!("{i}"));
                frag.add_text("payload").expect("add_text failed");
                frag.close_element();
            }
            frag.close_element();
            black_box(frag);
        });
    });
}

fn bench_serialize_large(c: &mut Criterion) {
    let xml = make_large_xml();
    let fragment = XmlFragment::parse_str(&xml).expect("failed to parse large XML");
    c.bench_function("serialize_large", |b| {
        b.iter(|| serialize_fragment(black_box(&fragment)));
    });
}

// ---------------------------------------------------------------------------
// Push parser benchmark
// ---------------------------------------------------------------------------

fn bench_push_parser(c: &mut Criterion) {
    let xml = make_medium_xml();
    let bytes = xml.as_bytes();
    // Split into ~64-byte chunks to simulate incremental feeding.
    let chunks: Vec<&[u8]> = bytes.chunks(64).collect();
    c.bench_function("push_parser", |b| {
        b.iter(|| {
            let mut parser = FragmentParser::new();
            for chunk in &chunks {
                parser.feed(black_box(chunk));
            }
            parser.finish().expect("push parse failed")
        });
    });
}

// ---------------------------------------------------------------------------
// Criterion groups and main
// ---------------------------------------------------------------------------

criterion_group!(
    parsing,
    bench_parse_small,
    bench_parse_medium,
    bench_parse_large,
    bench_parse_namespace_heavy,
);

criterion_group!(traversal, bench_cursor_walk, bench_accessor_walk, bench_element_by_id);

criterion_group!(building, bench_build_fragment, bench_serialize_large);

criterion_group!(push, bench_push_parser);

criterion_main!(parsing, traversal, building, push);
