//! Indentation helpers for script bodies stored inside marker blocks

const INDENT_CHARS: [char; 2] = [' ', '\t'];

/// Strip the indentation shared by every non-empty line
///
/// Spaces and tabs are detected independently: when all non-empty lines start
/// with the same indent character, the smallest run of it is removed from each
/// line. Bodies mixing the two are left untouched. Empty lines never
/// constrain the result.
pub fn trim_consistent_indenting(lines: &mut [String]) {
    for indent in INDENT_CHARS {
        let mut non_empty = lines.iter().filter(|line| !line.is_empty()).peekable();
        if non_empty.peek().is_none() {
            return;
        }
        if !lines
            .iter()
            .filter(|line| !line.is_empty())
            .all(|line| line.starts_with(indent))
        {
            continue;
        }

        let depth = non_empty
            .map(|line| line.chars().take_while(|c| *c == indent).count())
            .min()
            .unwrap_or(0);

        for line in lines.iter_mut().filter(|line| !line.is_empty()) {
            line.drain(..depth * indent.len_utf8());
        }
        return;
    }
}

/// Prefix every non-empty line with `unit`
pub fn indent_lines<S: AsRef<str>>(lines: &[S], unit: &str) -> Vec<String> {
    lines
        .iter()
        .map(|line| {
            let line = line.as_ref();
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", unit, line)
            }
        })
        .collect()
}
