use std::cmp::Ordering;

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Number(u64),
    Text(&'a str),
}

fn segment(part: &str) -> Segment<'_> {
    let part = part.trim();
    if !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = part.parse() {
            return Segment::Number(n);
        }
    }
    Segment::Text(part)
}

impl Ord for Segment<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Segment::Number(a), Segment::Number(b)) => a.cmp(b),
            (Segment::Number(_), Segment::Text(_)) => Ordering::Less,
            (Segment::Text(_), Segment::Number(_)) => Ordering::Greater,
            (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Segment<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Order dotted WBS codes segment by segment.
///
/// Numeric segments compare as numbers and sort before text segments; text
/// segments compare lexicographically. A code sorts before any longer code
/// it is a prefix of. Blank codes sort last.
#[must_use]
pub fn compare_codes(a: &str, b: &str) -> Ordering {
    let (a, b) = (a.trim(), b.trim());
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }
    a.split('.').map(segment).cmp(b.split('.').map(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sorted(codes: &[&str]) -> Vec<String> {
        let mut codes: Vec<String> = codes.iter().map(|c| (*c).to_string()).collect();
        codes.sort_by(|a, b| compare_codes(a, b));
        codes
    }

    #[test]
    fn numeric_segments_sort_numerically() {
        assert_eq!(
            sorted(&["1.10", "1.2", "1.2.01.02", "1.2.01", "1"]),
            vec!["1", "1.2", "1.2.01", "1.2.01.02", "1.10"]
        );
    }

    #[test]
    fn text_segments_sort_after_numbers() {
        assert_eq!(
            sorted(&["2.B", "2.A", "2.3", "10"]),
            vec!["2.3", "2.A", "2.B", "10"]
        );
    }

    #[test]
    fn blank_codes_sort_last() {
        assert_eq!(sorted(&["", "3", " ", "1"]), vec!["1", "3", "", " "]);
    }
}
