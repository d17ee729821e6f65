/*!
 * Quote and bracket pairing.
 *
 * A fixed table of opening/closing glyphs drives a stack-based nesting check and
 * the removal of a single balanced pair wrapping a whole text.
 */

/// Opening and closing glyph pairs, in table order
pub const BRACKET_PAIRS: &[(char, char)] = &[
    ('「', '」'),
    ('『', '』'),
    ('〝', '〟'),
    ('【', '】'),
    ('（', '）'),
    ('(', ')'),
    ('≪', '≫'),
    ('<', '>'),
    ('《', '》'),
    ('｟', '｠'),
    ('＜', '＞'),
    ('⦅', '⦆'),
    ('〈', '〉'),
];

pub fn closer_for(opener: char) -> Option<char> {
    BRACKET_PAIRS
        .iter()
        .find(|(open, _)| *open == opener)
        .map(|&(_, close)| close)
}

pub fn opener_for(closer: char) -> Option<char> {
    BRACKET_PAIRS
        .iter()
        .find(|(_, close)| *close == closer)
        .map(|&(open, _)| open)
}

pub fn is_opener(c: char) -> bool {
    closer_for(c).is_some()
}

pub fn is_closer(c: char) -> bool {
    opener_for(c).is_some()
}

/// Returns true when bracket nesting is broken: a closer that does not match the
/// innermost open bracket, a closer with nothing open, or brackets left open at the end
pub fn is_unbalanced(text: &str) -> bool {
    let mut stack: Vec<char> = Vec::new();
    for c in text.chars() {
        if let Some(close) = closer_for(c) {
            stack.push(close);
        } else if is_closer(c) {
            match stack.pop() {
                Some(expected) if expected == c => {}
                _ => return true,
            }
        }
    }
    !stack.is_empty()
}

/// Remove one bracket pair when the first character opens it and the last
/// character is the bracket that closes it. Returns the text unchanged otherwise.
pub fn strip_outer_pair(text: &str) -> &str {
    let mut chars = text.char_indices();
    let Some((_, first)) = chars.next() else {
        return text;
    };
    let Some(first_closer) = closer_for(first) else {
        return text;
    };

    let mut stack = vec![first_closer];
    for (idx, c) in chars {
        if let Some(close) = closer_for(c) {
            stack.push(close);
        } else if is_closer(c) {
            if stack.pop() != Some(c) {
                return text;
            }
            if stack.is_empty() {
                // The opening bracket closed here; only strip if this is the end
                let end = idx + c.len_utf8();
                return if end == text.len() {
                    &text[first.len_utf8()..idx]
                } else {
                    text
                };
            }
        }
    }
    text
}
