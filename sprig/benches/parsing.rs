use divan::{Bencher, black_box};
use sprig::{ParseOptions, parse, parse_json};

fn main() {
    divan::main();
}

const CATALOG: &str = include_str!("../tests/fixtures/file-sample.xml");
const HEROES: &str = include_str!("../tests/fixtures/file-sample-B.xml");
const PAGE: &str = include_str!("../tests/roundtrip-cases/page.html");

/// A few hundred kilobytes of markup built from the catalog fixture.
fn large_document() -> String {
    let body = CATALOG
        .split_once("<catalog>")
        .and_then(|(_, rest)| rest.rsplit_once("</catalog>"))
        .map(|(inner, _)| inner)
        .unwrap_or_default();
    let mut out = String::from("<catalog>");
    for _ in 0..400 {
        out.push_str(body);
    }
    out.push_str("</catalog>");
    out
}

#[divan::bench]
fn parse_small(bencher: Bencher) {
    bencher.bench_local(|| {
        let doc = parse(black_box(HEROES), &ParseOptions::default()).unwrap();
        black_box(doc);
    });
}

#[divan::bench]
fn parse_small_trimmed(bencher: Bencher) {
    let options = ParseOptions::new().trim();
    bencher.bench_local(|| {
        let doc = parse(black_box(HEROES), &options).unwrap();
        black_box(doc);
    });
}

#[divan::bench]
fn parse_lenient_html(bencher: Bencher) {
    let options = ParseOptions::new().lenient();
    bencher.bench_local(|| {
        let doc = parse(black_box(PAGE), &options).unwrap();
        black_box(doc);
    });
}

#[divan::bench]
fn parse_large(bencher: Bencher) {
    let input = large_document();
    bencher.bench_local(|| {
        let doc = parse(black_box(&input), &ParseOptions::default()).unwrap();
        black_box(doc);
    });
}

#[divan::bench]
fn find_all_glob(bencher: Bencher) {
    let input = large_document();
    let doc = parse(&input, &ParseOptions::new().trim()).unwrap();
    bencher.bench_local(|| {
        let found = doc.find_all(doc.root(), black_box(["b*", "id=*10*"])).unwrap();
        black_box(found);
    });
}

#[divan::bench]
fn serialize_large(bencher: Bencher) {
    let input = large_document();
    let doc = parse(&input, &ParseOptions::default()).unwrap();
    bencher.bench_local(|| black_box(doc.to_xml()));
}

#[divan::bench]
fn json_roundtrip(bencher: Bencher) {
    let doc = parse(HEROES, &ParseOptions::default()).unwrap();
    bencher.bench_local(|| {
        let json = doc.to_json().unwrap();
        black_box(parse_json(&json).unwrap());
    });
}
