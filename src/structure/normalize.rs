/// Cleans raw extracted text before clause detection.
///
/// Line endings become `\n`, runs of spaces and tabs collapse to one space,
/// three or more consecutive newlines collapse to a single blank line, and the
/// document is trimmed. Total and idempotent.
pub fn normalize(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = String::with_capacity(unified.len());
    let mut in_blank_run = false;
    let mut newline_run = 0usize;

    for character in unified.chars() {
        match character {
            ' ' | '\t' => {
                newline_run = 0;
                if !in_blank_run {
                    out.push(' ');
                    in_blank_run = true;
                }
            }
            '\n' => {
                in_blank_run = false;
                newline_run += 1;
                if newline_run <= 2 {
                    out.push('\n');
                }
            }
            other => {
                in_blank_run = false;
                newline_run = 0;
                out.push(other);
            }
        }
    }

    out.trim().to_string()
}

/// Splits normalized text into `(line_number, trimmed_line)` pairs, skipping
/// blank lines. Line numbers are 1-based.
pub(crate) fn numbered_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
}
