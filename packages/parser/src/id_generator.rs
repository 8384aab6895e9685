use crate::ast::{Node, TEXT_TAG};

/// Readable id prefix for a tag name.
pub fn id_prefix(tag_name: &str) -> String {
    if tag_name.is_empty() {
        return "fragment".to_string();
    }
    if tag_name == TEXT_TAG {
        return "text".to_string();
    }
    let prefix: String = tag_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let prefix = prefix.trim_matches('-');
    if prefix.is_empty() {
        "node".to_string()
    } else {
        prefix.to_string()
    }
}

/// Generate a node id from its id path and tag name, e.g. `span-0.1.0`.
pub fn generate_id(path: &[usize], tag_name: &str) -> String {
    let dotted = path
        .iter()
        .map(|index| index.to_string())
        .collect::<Vec<_>>()
        .join(".");
    format!("{}-{}", id_prefix(tag_name), dotted)
}

/// Stamp ids onto a freshly parsed tree.
///
/// A node's id path is its parent's positional path (root = `0`) followed
/// by its ordinal among siblings sharing the same prefix. Removing or
/// adding a node therefore only renames later siblings with the same
/// prefix and the subtrees of later siblings.
pub(crate) fn assign_ids(root: &mut Node) {
    root.id = generate_id(&[0], &root.tag_name);
    assign_children(root, &mut vec![0]);
}

fn assign_children(parent: &mut Node, position: &mut Vec<usize>) {
    let mut seen: Vec<(String, usize)> = Vec::new();
    for (index, child) in parent.children.iter_mut().enumerate() {
        let prefix = id_prefix(&child.tag_name);
        let ordinal = match seen.iter_mut().find(|(p, _)| *p == prefix) {
            Some((_, count)) => {
                *count += 1;
                *count - 1
            }
            None => {
                seen.push((prefix, 1));
                0
            }
        };

        position.push(ordinal);
        child.id = generate_id(position, &child.tag_name);
        position.pop();

        position.push(index);
        assign_children(child, position);
        position.pop();
    }
}
