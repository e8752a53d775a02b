use regex::RegexBuilder;

/// A run of text that either matched the search term or did not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub matched: bool,
}

impl Segment {
    fn plain(text: &str) -> Self {
        Self { text: text.to_string(), matched: false }
    }

    fn hit(text: &str) -> Self {
        Self { text: text.to_string(), matched: true }
    }
}

/// Split `text` into alternating unmatched and matched segments for every
/// case-insensitive occurrence of the literal `term`.
pub fn highlight(text: &str, term: &str) -> Vec<Segment> {
    if text.is_empty() {
        return Vec::new();
    }
    if term.trim().is_empty() {
        return vec![Segment::plain(text)];
    }
    let Ok(pattern) = RegexBuilder::new(&regex::escape(term))
        .case_insensitive(true)
        .build()
    else {
        return vec![Segment::plain(text)];
    };

    let mut segments = Vec::new();
    let mut last = 0;
    for m in pattern.find_iter(text) {
        if m.start() > last {
            segments.push(Segment::plain(&text[last..m.start()]));
        }
        segments.push(Segment::hit(m.as_str()));
        last = m.end();
    }
    if last < text.len() {
        segments.push(Segment::plain(&text[last..]));
    }
    segments
}

/// Render segments with matches wrapped in `<mark>`.
pub fn to_markup(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| {
            if s.matched {
                format!("<mark>{}</mark>", s.text)
            } else {
                s.text.clone()
            }
        })
        .collect()
}
