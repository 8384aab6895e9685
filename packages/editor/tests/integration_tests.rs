//! Integration tests for the editor crate against multi-line source

use anyhow::Result;
use sculpt_editor::{
    apply, parse, ErrorKind, Mutation, MutationEngine, MutationError, Position, PropValue,
};

const CARD: &str = r#"import { Avatar } from "./avatar";

// Profile card
export default function Card() {
  const greeting = "Hello";
  return (
    <section className="card">
      <h1>Title</h1>
      <p>Body</p>
      <ul>
        <li>One</li>
        <li>Two</li>
      </ul>
    </section>
  );
}
"#;

fn delete(id: &str) -> Mutation {
    Mutation::Delete {
        node_id: id.to_string(),
    }
}

/// Bytes before `start` and after `end` must be untouched.
fn assert_local(before: &str, after: &str, start: usize, end: usize) {
    let prefix = before
        .bytes()
        .zip(after.bytes())
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = before
        .bytes()
        .rev()
        .zip(after.bytes().rev())
        .take_while(|(a, b)| a == b)
        .count();
    assert!(prefix >= start, "prefix {} < {}", prefix, start);
    assert!(suffix >= before.len() - end, "suffix {} < {}", suffix, before.len() - end);
}

#[test]
fn test_delete_own_line_takes_the_line() -> Result<()> {
    let outcome = apply(CARD, &delete("p-0.0"))?;
    assert_eq!(outcome.source, CARD.replace("      <p>Body</p>\n", ""));
    Ok(())
}

#[test]
fn test_insert_follows_sibling_layout() -> Result<()> {
    let outcome = apply(
        CARD,
        &Mutation::Insert {
            parent_id: "ul-0.0".to_string(),
            index: 2,
            fragment: "<li>Three</li>".to_string(),
        },
    )?;
    assert_eq!(
        outcome.source,
        CARD.replace("<li>Two</li>\n", "<li>Two</li>\n        <li>Three</li>\n")
    );
    Ok(())
}

#[test]
fn test_duplicate_own_line() -> Result<()> {
    let outcome = apply(
        CARD,
        &Mutation::Duplicate {
            node_id: "li-0.2.0".to_string(),
        },
    )?;
    assert_eq!(
        outcome.source,
        CARD.replace(
            "        <li>One</li>\n",
            "        <li>One</li>\n        <li>One</li>\n"
        )
    );
    Ok(())
}

#[test]
fn test_move_multi_line_node() -> Result<()> {
    let outcome = apply(
        CARD,
        &Mutation::Move {
            node_id: "ul-0.0".to_string(),
            target_id: "h1-0.0".to_string(),
            position: Position::Before,
        },
    )?;
    let expected = CARD.replace(
        r#"    <section className="card">
      <h1>Title</h1>
      <p>Body</p>
      <ul>
        <li>One</li>
        <li>Two</li>
      </ul>
"#,
        r#"    <section className="card">
      <ul>
        <li>One</li>
        <li>Two</li>
      </ul>
      <h1>Title</h1>
      <p>Body</p>
"#,
    );
    assert_eq!(outcome.source, expected);
    Ok(())
}

#[test]
fn test_move_noop_is_byte_identical() -> Result<()> {
    let outcome = apply(
        CARD,
        &Mutation::Move {
            node_id: "li-0.2.1".to_string(),
            target_id: "li-0.2.0".to_string(),
            position: Position::After,
        },
    )?;
    assert!(outcome.noop);
    assert_eq!(outcome.source, CARD);
    Ok(())
}

#[test]
fn test_set_prop_is_local() -> Result<()> {
    let root = parse(CARD).root.unwrap();
    let prop = &root.props["className"];
    let value_loc = prop.value_loc.unwrap();

    let outcome = apply(
        CARD,
        &Mutation::SetProp {
            node_id: "section-0".to_string(),
            prop_name: "className".to_string(),
            value: PropValue::String("card wide".to_string()),
        },
    )?;
    assert_eq!(
        outcome.source,
        CARD.replace(r#"className="card""#, r#"className="card wide""#)
    );
    assert_local(CARD, &outcome.source, value_loc.start, value_loc.end);
    Ok(())
}

#[test]
fn test_set_new_prop_and_delete_prop() -> Result<()> {
    let outcome = apply(
        CARD,
        &Mutation::SetProp {
            node_id: "h1-0.0".to_string(),
            prop_name: "id".to_string(),
            value: PropValue::String("title".to_string()),
        },
    )?;
    assert!(outcome.source.contains(r#"<h1 id="title">Title</h1>"#));

    let root = parse(CARD).root.unwrap();
    let loc = root.opening_tag_loc;
    let outcome = apply(
        CARD,
        &Mutation::DeleteProp {
            node_id: "section-0".to_string(),
            prop_name: "className".to_string(),
        },
    )?;
    assert!(outcome.source.contains("    <section>\n"));
    assert_local(CARD, &outcome.source, loc.start, loc.end);
    Ok(())
}

#[test]
fn test_set_text_is_local_and_keeps_ids() -> Result<()> {
    let before = parse(CARD).root.unwrap();
    let loc = before.find("p-0.0").unwrap().loc;

    let outcome = apply(
        CARD,
        &Mutation::SetText {
            node_id: "p-0.0".to_string(),
            text: "Changed".to_string(),
        },
    )?;
    assert_local(CARD, &outcome.source, loc.start, loc.end);

    let after = parse(&outcome.source).root.unwrap();
    assert_eq!(before.ids(), after.ids());
    Ok(())
}

#[test]
fn test_replace_reindents() -> Result<()> {
    let root = parse(CARD).root.unwrap();
    let loc = root.find("p-0.0").unwrap().loc;

    let outcome = apply(
        CARD,
        &Mutation::Replace {
            node_id: "p-0.0".to_string(),
            fragment: "<p>\n  New\n</p>".to_string(),
        },
    )?;
    assert_eq!(
        outcome.source,
        CARD.replace("<p>Body</p>", "<p>\n        New\n      </p>")
    );
    assert_local(CARD, &outcome.source, loc.start, loc.end);
    Ok(())
}

#[test]
fn test_delete_many_is_order_invariant() -> Result<()> {
    let ids = ["li-0.2.0", "h1-0.0", "li-0.2.1"];
    let forward = apply(
        CARD,
        &Mutation::DeleteMany {
            node_ids: ids.iter().map(|s| s.to_string()).collect(),
        },
    )?;
    let backward = apply(
        CARD,
        &Mutation::DeleteMany {
            node_ids: ids.iter().rev().map(|s| s.to_string()).collect(),
        },
    )?;
    assert_eq!(forward.source, backward.source);

    let mut sequential = CARD.to_string();
    for id in ["li-0.2.1", "li-0.2.0", "h1-0.0"] {
        sequential = apply(&sequential, &delete(id))?.source;
    }
    assert_eq!(forward.source, sequential);
    Ok(())
}

#[test]
fn test_delete_many_skips_covered_descendants() -> Result<()> {
    let outcome = apply(
        CARD,
        &Mutation::DeleteMany {
            node_ids: vec!["li-0.2.0".to_string(), "ul-0.0".to_string()],
        },
    )?;
    assert_eq!(outcome.source, apply(CARD, &delete("ul-0.0"))?.source);
    Ok(())
}

#[test]
fn test_insert_into_empty_multi_line_container() -> Result<()> {
    let source = "export default () => (\n  <div>\n    <main>\n    </main>\n  </div>\n);\n";
    let outcome = apply(
        source,
        &Mutation::Insert {
            parent_id: "main-0.0".to_string(),
            index: 0,
            fragment: "<p>Hi</p>".to_string(),
        },
    )?;
    assert_eq!(
        outcome.source,
        "export default () => (\n  <div>\n    <main>\n      <p>Hi</p>\n    </main>\n  </div>\n);\n"
    );

    let tabs = MutationEngine::new("\t").apply(
        source,
        &Mutation::Insert {
            parent_id: "main-0.0".to_string(),
            index: 0,
            fragment: "<p>Hi</p>".to_string(),
        },
    )?;
    assert!(tabs.source.contains("\n    \t<p>Hi</p>\n"));
    Ok(())
}

#[test]
fn test_insert_many_keeps_order() -> Result<()> {
    let outcome = apply(
        CARD,
        &Mutation::InsertMany {
            parent_id: "ul-0.0".to_string(),
            index: 0,
            fragments: vec!["<li>A</li>".to_string(), "<li>B</li>".to_string()],
        },
    )?;
    assert!(outcome.source.contains(
        "        <li>A</li>\n        <li>B</li>\n        <li>One</li>\n"
    ));
    Ok(())
}

#[test]
fn test_stale_id_fails_closed() {
    let edited = apply(CARD, &delete("h1-0.0")).unwrap().source;
    let reparsed = parse(&edited).root.unwrap();
    assert!(reparsed.find("h1-0.0").is_none());

    let err = apply(&edited, &delete("h1-0.0")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Reference);
}

#[test]
fn test_set_text_on_mixed_content_is_rejected() {
    let source = "export default () => <p>Body <b>bold</b></p>;";
    let err = apply(
        source,
        &Mutation::SetText {
            node_id: "p-0".to_string(),
            text: "x".to_string(),
        },
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Mutation);
}

const GREETING: &str = "export default () => <div><p>Hello</p></div>;";

fn texts_of(source: &str, id: &str) -> Vec<String> {
    let root = parse(source).root.unwrap();
    root.find(id)
        .unwrap()
        .children
        .iter()
        .map(|child| child.text.clone().unwrap_or_default())
        .collect()
}

#[test]
fn test_duplicate_text_stays_a_separate_node() -> Result<()> {
    let outcome = apply(
        GREETING,
        &Mutation::Duplicate {
            node_id: "text-0.0.0".to_string(),
        },
    )?;
    assert_eq!(
        outcome.source,
        "export default () => <div><p>Hello{\"Hello\"}</p></div>;"
    );
    assert_eq!(texts_of(&outcome.source, "p-0.0"), vec!["Hello", "Hello"]);
    Ok(())
}

#[test]
fn test_insert_text_beside_text_stays_a_separate_node() -> Result<()> {
    for index in [0, 1] {
        let outcome = apply(
            GREETING,
            &Mutation::Insert {
                parent_id: "p-0.0".to_string(),
                index,
                fragment: "World".to_string(),
            },
        )?;
        let texts = texts_of(&outcome.source, "p-0.0");
        assert_eq!(texts.len(), 2, "{}", outcome.source);
        assert_eq!(texts[index], "World");
        assert_eq!(texts[1 - index], "Hello");
    }
    Ok(())
}

#[test]
fn test_insert_text_beside_element_stays_plain() -> Result<()> {
    let source = "export default () => <div><p><b>x</b></p></div>;";
    let outcome = apply(
        source,
        &Mutation::Insert {
            parent_id: "p-0.0".to_string(),
            index: 1,
            fragment: "World".to_string(),
        },
    )?;
    assert_eq!(
        outcome.source,
        "export default () => <div><p><b>x</b>World</p></div>;"
    );
    Ok(())
}

#[test]
fn test_delete_many_stops_when_siblings_merge() {
    let source = "export default () => <div><p>a<b />c</p></div>;";
    let err = apply(
        source,
        &Mutation::DeleteMany {
            node_ids: vec!["text-0.0.0".to_string(), "b-0.0.0".to_string()],
        },
    )
    .unwrap_err();
    assert!(matches!(err, MutationError::InvalidEdit(_)), "{:?}", err);
}

#[test]
fn test_delete_many_mixed_text_and_elements() -> Result<()> {
    let source = "export default () => <div><p>a<b /><i /></p></div>;";
    let outcome = apply(
        source,
        &Mutation::DeleteMany {
            node_ids: vec!["text-0.0.0".to_string(), "b-0.0.0".to_string()],
        },
    )?;
    assert_eq!(outcome.source, "export default () => <div><p><i /></p></div>;");
    Ok(())
}

#[test]
fn test_expression_prop_cannot_close_the_attribute() {
    let err = apply(
        GREETING,
        &Mutation::SetProp {
            node_id: "div-0".to_string(),
            prop_name: "title".to_string(),
            value: PropValue::Expression("a} onClick={evil".to_string()),
        },
    )
    .unwrap_err();
    assert!(matches!(err, MutationError::InvalidStructure(_)), "{:?}", err);
}

#[test]
fn test_expression_prop_is_written_in_braces() -> Result<()> {
    let outcome = apply(
        GREETING,
        &Mutation::SetProp {
            node_id: "div-0".to_string(),
            prop_name: "title".to_string(),
            value: PropValue::Expression("count + 1".to_string()),
        },
    )?;
    assert_eq!(
        outcome.source,
        "export default () => <div title={count + 1}><p>Hello</p></div>;"
    );
    let root = parse(&outcome.source).root.unwrap();
    assert_eq!(root.props.len(), 1);
    Ok(())
}
