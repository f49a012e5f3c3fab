//! Sequence numbers of candidate nodes.
//!
//! The store appends a unique, increasing numeric suffix to every sequential node. The
//! suffix starts after the last delimiter of the node name, so identities may contain
//! the delimiter themselves (`Speaker-pid-1276-0000000028`).

/// A child of the election root whose name carries no parsable sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display(fmt = "Malformed candidate node name: {}", name)]
pub struct MalformedNodeName {
    pub name: String,
}

impl std::error::Error for MalformedNodeName {}

pub fn parse_sequence_number(node: &str, delimiter: char) -> Result<u64, MalformedNodeName> {
    let malformed = || MalformedNodeName {
        name: node.to_string(),
    };

    let position = node.rfind(delimiter).ok_or_else(malformed)?;
    let suffix = &node[position + delimiter.len_utf8()..];

    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }

    suffix.parse::<u64>().map_err(|_| malformed())
}

/// Lowest sequence number among `children` and `own_sequence`. Foreign children are skipped.
pub fn lowest_sequence_number<S: AsRef<str>>(children: &[S], own_sequence: u64, delimiter: char) -> u64 {
    children
        .iter()
        .filter_map(|child| match parse_sequence_number(child.as_ref(), delimiter) {
            Ok(sequence) => Some(sequence),
            Err(err) => {
                debug!("Excluded from leadership computation: {}", err);
                None
            }
        })
        .fold(own_sequence, u64::min)
}

/// True when `own_node` is among the observed children and no child has a lower sequence number.
pub fn holds_lowest_sequence<S: AsRef<str>>(children: &[S], own_node: &str, delimiter: char) -> bool {
    let own_sequence = match parse_sequence_number(own_node, delimiter) {
        Ok(sequence) => sequence,
        Err(_) => return false,
    };

    let own_node_observed = children.iter().any(|child| child.as_ref() == own_node);

    own_node_observed && lowest_sequence_number(children, own_sequence, delimiter) == own_sequence
}
