//! Round-trip tests using datatest-stable.
//!
//! Every file in `tests/roundtrip-cases/` is parsed (strict for `.xml`,
//! lenient for `.html`), with and without trimming. The test verifies that
//! writing the tree, parsing the output and writing it again gives identical
//! markup, and that the JSON form rebuilds the same markup.

use sprig::{ParseOptions, parse, parse_json};
use std::path::Path;

fn check(source: &str, options: &ParseOptions) -> Result<(), String> {
    let doc = parse(source, options).map_err(|e| format!("parse failed ({options:?}): {e}"))?;
    let xml = doc.to_xml();

    let reparsed =
        parse(&xml, options).map_err(|e| format!("reparse failed ({options:?}): {e}\n{xml}"))?;
    let again = reparsed.to_xml();
    if again != xml {
        return Err(format!(
            "Markup roundtrip failed ({options:?})!\nFirst: {xml}\nSecond: {again}"
        ));
    }

    let json = doc
        .to_json()
        .map_err(|e| format!("to_json failed: {e}"))?;
    let from_json = parse_json(&json).map_err(|e| format!("parse_json failed: {e}\n{json}"))?;
    let via_json = from_json.to_xml();
    if via_json != xml {
        return Err(format!(
            "JSON roundtrip failed ({options:?})!\nExpected: {xml}\nGot: {via_json}"
        ));
    }
    Ok(())
}

fn run_roundtrip_test(path: &Path) -> datatest_stable::Result<()> {
    facet_testhelpers::setup();

    let source = std::fs::read_to_string(path)?;
    let strict = path.extension().is_some_and(|ext| ext == "xml");
    let base = ParseOptions::new().with_strict(strict);

    for options in [base, base.trim()] {
        check(&source, &options)?;
    }
    Ok(())
}

datatest_stable::harness! {
    { test = run_roundtrip_test, root = "tests/roundtrip-cases", pattern = r".*\.(xml|html)$" },
}
