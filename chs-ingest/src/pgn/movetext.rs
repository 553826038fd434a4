//! Movetext tokenizer: reduces PGN movetext to bare move tokens

/// Game termination markers
const RESULT_TOKENS: [&str; 4] = ["1-0", "0-1", "1/2-1/2", "*"];

/// Extract move tokens from movetext
///
/// Removes brace and semicolon comments, `%` escape lines, variations in
/// parentheses (nested), NAGs (`$1`), move numbers (`12.`, `12...`) and the
/// result marker.
pub fn tokenize(movetext: &str) -> Vec<String> {
    strip_commentary(movetext)
        .split_whitespace()
        .filter_map(clean_token)
        .collect()
}

fn strip_commentary(movetext: &str) -> String {
    let mut out = String::with_capacity(movetext.len());
    let mut brace = false;
    let mut line_comment = false;
    let mut variation_depth = 0usize;
    let mut at_line_start = true;

    for c in movetext.chars() {
        if line_comment {
            if c == '\n' {
                line_comment = false;
                at_line_start = true;
                out.push(' ');
            }
            continue;
        }
        if brace {
            if c == '}' {
                brace = false;
                out.push(' ');
            }
            continue;
        }

        match c {
            '{' => brace = true,
            ';' => line_comment = true,
            '%' if at_line_start => line_comment = true,
            '(' => variation_depth += 1,
            ')' => {
                variation_depth = variation_depth.saturating_sub(1);
                out.push(' ');
            }
            _ if variation_depth > 0 => {}
            _ => out.push(c),
        }
        at_line_start = c == '\n';
    }

    out
}

fn clean_token(word: &str) -> Option<String> {
    if RESULT_TOKENS.contains(&word) || word.starts_with('$') {
        return None;
    }

    // `12.`, `12...`, or a number glued to the move (`12.e4`)
    let without_number = word.trim_start_matches(|c: char| c.is_ascii_digit());
    let token = if without_number.len() < word.len() && without_number.starts_with('.') {
        without_number.trim_start_matches('.')
    } else {
        word.trim_start_matches('.')
    };

    // Free-standing annotation glyphs (`!`, `?!`)
    if token.is_empty() || token.chars().all(|c| c == '!' || c == '?') {
        return None;
    }

    Some(token.to_string())
}
