/// A single `{name, value}` label pair, as used at the RPC layer.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

const PAIR_SEP: char = '=';
const LABEL_SEP: char = ',';

/// Flattens a set of labels into the canonical storage form: labels sorted by
/// `name` then `value`, joined as `name=value` pairs separated by `,`. This
/// canonical string is the identity used by equality tests in catalog
/// queries (e.g. the label-link deletion key), so sorting must be
/// deterministic and total.
pub fn flatten_labels(labels: &[Label]) -> String {
    let mut sorted: Vec<&Label> = labels.iter().collect();
    sorted.sort();
    sorted
        .into_iter()
        .map(|l| format!("{}{}{}", l.name, PAIR_SEP, l.value))
        .collect::<Vec<_>>()
        .join(&LABEL_SEP.to_string())
}

/// Explodes a canonical storage-form string back into its `Label` pairs. This
/// must round-trip exactly: `explode_labels(&flatten_labels(xs))` is `xs`
/// sorted, for any well-formed input.
pub fn explode_labels(flattened: &str) -> Vec<Label> {
    if flattened.is_empty() {
        return Vec::new();
    }
    flattened
        .split(LABEL_SEP)
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once(PAIR_SEP) {
            Some((name, value)) => Label::new(name, value),
            None => Label::new(pair, ""),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_sorts_and_joins() {
        let labels = vec![Label::new("env", "prod"), Label::new("app", "edge")];
        assert_eq!(flatten_labels(&labels), "app=edge,env=prod");
    }

    #[test]
    fn round_trip_is_exact_under_equality() {
        let labels = vec![Label::new("app", "edge"), Label::new("env", "prod")];
        let flattened = flatten_labels(&labels);
        let exploded = explode_labels(&flattened);
        assert_eq!(exploded, labels);
    }

    #[test]
    fn empty_label_set_round_trips() {
        assert_eq!(flatten_labels(&[]), "");
        assert!(explode_labels("").is_empty());
    }

    #[test]
    fn order_independent_input_produces_identical_canonical_form() {
        let a = vec![Label::new("b", "2"), Label::new("a", "1")];
        let b = vec![Label::new("a", "1"), Label::new("b", "2")];
        assert_eq!(flatten_labels(&a), flatten_labels(&b));
    }
}
