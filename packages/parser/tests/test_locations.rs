use sculpt_parser::{parse, Node, PropValue};

const CARD: &str = r#"import { Button } from "./button";

// Profile card shown on the dashboard
export default function ProfileCard({ user }) {
  const initials = user.name.slice(0, 2);
  return (
    <section className="card" data-active>
      {/* avatar */}
      <img src={user.avatar} alt="Avatar photo" />
      <h2 style={{ fontWeight: 600, margin: [0, 4] }}>Ünïcødé name</h2>
      <p>
        Joined {user.joined}
      </p>
      <Button variant='primary' size={2} onClick={() => alert("hi")}>
        {"Follow"}
      </Button>
      <>
        <span>{initials}</span>
      </>
    </section>
  );
}
"#;

fn all_nodes(root: &Node) -> Vec<&Node> {
    let mut nodes = Vec::new();
    root.walk(&mut |node| nodes.push(node));
    nodes
}

#[test]
fn test_every_node_slices_back_to_itself() {
    let result = parse(CARD);
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    let root = result.root.unwrap();

    for node in all_nodes(&root) {
        let slice = node.loc.slice(CARD);
        assert!(!slice.is_empty(), "empty loc for {}", node.id);
        if node.is_text {
            if node.is_text_slot(CARD) {
                assert!(slice.starts_with('{') && slice.ends_with('}'));
            } else {
                assert_eq!(Some(slice), node.text.as_deref());
            }
        } else {
            assert!(slice.starts_with('<'));
            assert!(slice.ends_with('>'));
            assert!(node.loc.contains(&node.opening_tag_loc));
            if let Some(children) = node.children_loc {
                assert!(node.loc.contains(&children));
                for child in &node.children {
                    assert!(children.contains(&child.loc));
                }
            }
        }
        for prop in node.props.values() {
            assert!(prop.loc.slice(CARD).starts_with(&prop.name) || prop.is_spread());
            if let Some(value_loc) = prop.value_loc {
                assert_eq!(value_loc.slice(CARD), prop.raw_value);
            }
        }
    }
}

#[test]
fn test_structure() {
    let root = parse(CARD).root.unwrap();
    assert_eq!(root.tag_name, "section");
    let tags: Vec<_> = root.children.iter().map(|c| c.tag_name.as_str()).collect();
    assert_eq!(tags, vec!["img", "h2", "p", "Button", ""]);

    assert_eq!(root.props["data-active"].value, PropValue::Boolean(true));
    assert_eq!(
        root.children[1].children[0].text.as_deref(),
        Some("Ünïcødé name")
    );
    assert_eq!(root.children[2].children[0].text.as_deref(), Some("Joined"));

    let button = &root.children[3];
    assert_eq!(button.props["variant"].value, PropValue::String("primary".to_string()));
    assert_eq!(button.props["size"].value, PropValue::Number(2.0));
    assert!(button.props["onClick"].is_expression);
    assert_eq!(button.children[0].text.as_deref(), Some("Follow"));
}

#[test]
fn test_source_is_carried() {
    let result = parse(CARD);
    assert_eq!(result.source, CARD);
}

#[test]
fn test_serializes_camel_case() {
    let root = parse("export default () => <div className=\"a\">x</div>").root.unwrap();
    let json = serde_json::to_value(&root).unwrap();
    assert_eq!(json["tagName"], "div");
    assert_eq!(json["props"]["className"]["value"]["type"], "string");
    assert_eq!(json["children"][0]["isText"], true);
}
