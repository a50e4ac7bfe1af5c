use crate::Triple;
use regex::Regex;
use std::sync::OnceLock;

const SOURCE_DELIMITER: &str = "-[";
const TARGET_DELIMITER: &str = "]->";
const NONE_TOKEN: &str = "NONE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    None,
    Triples {
        triples: Vec<Triple>,
        discarded: usize,
    },
}

fn non_word_runs() -> &'static Regex {
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    NON_WORD.get_or_init(|| Regex::new(r"\W+").expect("static regex is valid"))
}

/// Uppercases a relation label and collapses every run of non-word characters into `_`.
pub fn normalize_relation(label: &str) -> String {
    let upper = label.trim().to_uppercase();
    non_word_runs().replace_all(&upper, "_").into_owned()
}

/// Parses `Source -[RELATION]-> Target`; anything else yields `None`.
pub fn parse_triple_line(line: &str) -> Option<Triple> {
    let (source, rest) = split_exactly_once(line, SOURCE_DELIMITER)?;
    let (relation, target) = split_exactly_once(rest, TARGET_DELIMITER)?;

    let source = source.trim();
    let target = target.trim();
    let relation = normalize_relation(relation);

    if source.is_empty() || target.is_empty() || relation.is_empty() {
        return None;
    }

    Some(Triple {
        source: source.to_string(),
        relation,
        target: target.to_string(),
    })
}

fn split_exactly_once<'a>(text: &'a str, delimiter: &str) -> Option<(&'a str, &'a str)> {
    let (left, right) = text.split_once(delimiter)?;
    if right.contains(delimiter) {
        return None;
    }
    Some((left, right))
}

pub fn is_none_response(response: &str) -> bool {
    response.trim().eq_ignore_ascii_case(NONE_TOKEN)
}

pub fn parse_extraction(response: &str) -> Extraction {
    if is_none_response(response) {
        return Extraction::None;
    }

    let mut triples = Vec::new();
    let mut discarded = 0;

    for line in response.lines().filter(|line| !line.trim().is_empty()) {
        match parse_triple_line(line) {
            Some(triple) => triples.push(triple),
            None => discarded += 1,
        }
    }

    Extraction::Triples { triples, discarded }
}
