//! Column alignment and continuation-line wrapping helpers shared by the
//! emitter's reformat and target-command rendering.

/// Pads `current` with tabs (assuming 8-column tab stops) until its visual
/// column reaches at least `goalcol`. Always emits at least one tab, so a
/// name that already reaches `goalcol` still gets a separating tab.
pub fn pad_to_column(current: &str, goalcol: usize) -> String {
    let mut col = visual_len(current);
    let mut tabs = String::new();
    loop {
        let next_stop = (col / 8 + 1) * 8;
        tabs.push('\t');
        col = next_stop;
        if col >= goalcol && !tabs.is_empty() {
            break;
        }
    }
    tabs
}

fn visual_len(s: &str) -> usize {
    s.chars().count()
}

/// Greedily packs `values` onto wrapped lines so that each line's
/// visual width (starting at `goalcol`) stays within `budget` columns,
/// unless `one_per_line` forces each value onto its own line.
///
/// Returns the values grouped into lines; the caller joins each line's
/// values with a single space and appends the continuation marker.
pub fn wrap_values(values: &[String], budget: usize, one_per_line: bool) -> Vec<Vec<String>> {
    if values.is_empty() {
        return vec![Vec::new()];
    }
    if one_per_line {
        return values.iter().map(|v| vec![v.clone()]).collect();
    }
    let mut lines: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_len = 0usize;
    for value in values {
        let added = if current.is_empty() {
            visual_len(value)
        } else {
            visual_len(value) + 1
        };
        if !current.is_empty() && current_len + added > budget {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        current_len += if current.is_empty() {
            visual_len(value)
        } else {
            visual_len(value) + 1
        };
        current.push(value.clone());
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Breaks a target command's words into wrap segments: a new segment
/// starts whenever the accumulated column count would exceed `budget`,
/// whenever a word is a wrap-trigger (checked by the caller-provided
/// predicate), or after every word when `after_each_token` holds.
pub fn wrap_command_words(
    words: &[String],
    budget: usize,
    after_each_token: bool,
    is_trigger: impl Fn(&str) -> bool,
) -> Vec<Vec<String>> {
    let mut segments: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_len = 0usize;
    for word in words {
        let trigger = is_trigger(word);
        let added = if current.is_empty() {
            visual_len(word)
        } else {
            visual_len(word) + 1
        };
        if !current.is_empty() && (current_len + added > budget || trigger) {
            segments.push(std::mem::take(&mut current));
            current_len = 0;
        }
        current_len += if current.is_empty() {
            visual_len(word)
        } else {
            visual_len(word) + 1
        };
        current.push(word.clone());
        if after_each_token {
            segments.push(std::mem::take(&mut current));
            current_len = 0;
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Counts command-complexity characters (`` ` ( ) [ ] ; ``), used to
/// decide whether a target command is left verbatim rather than wrapped.
pub fn command_complexity(text: &str) -> usize {
    text.chars()
        .filter(|c| matches!(c, '`' | '(' | ')' | '[' | ']' | ';'))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_to_column_reaches_goalcol_with_one_tab() {
        // "PORTNAME=" is 9 columns wide; the next tab stop is 16.
        assert_eq!(pad_to_column("PORTNAME=", 16), "\t");
    }

    #[test]
    fn pad_to_column_always_emits_at_least_one_tab() {
        // Already past goalcol: still pad by one more tab stop.
        assert_eq!(pad_to_column("A_VERY_LONG_VARIABLE_NAME=", 16), "\t");
    }

    #[test]
    fn wrap_values_respects_budget() {
        let values: Vec<String> = vec!["aaa".into(), "bbb".into(), "ccc".into()];
        let lines = wrap_values(&values, 7, false);
        assert_eq!(lines, vec![vec!["aaa".to_string(), "bbb".to_string()], vec!["ccc".to_string()]]);
    }

    #[test]
    fn wrap_values_one_per_line() {
        let values: Vec<String> = vec!["aaa".into(), "bbb".into()];
        let lines = wrap_values(&values, 100, true);
        assert_eq!(lines, vec![vec!["aaa".to_string()], vec!["bbb".to_string()]]);
    }

    #[test]
    fn wrap_command_words_breaks_on_trigger() {
        let words: Vec<String> = vec!["echo".into(), "hi".into(), "&&".into(), "echo".into(), "bye".into()];
        let segs = wrap_command_words(&words, 100, false, |w| w == "&&");
        assert_eq!(
            segs,
            vec![
                vec!["echo".to_string(), "hi".to_string(), "&&".to_string()],
                vec!["echo".to_string(), "bye".to_string()],
            ]
        );
    }

    #[test]
    fn command_complexity_counts_special_chars() {
        assert_eq!(command_complexity("echo `date` && (cd foo; ls)"), 5);
    }
}
