pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0usize;

    for word in text.split_whitespace() {
        // Width in chars, not bytes; messages carry Å and ° regularly.
        let word_width = word.chars().count();
        if current.is_empty() {
            current.push_str(word);
            current_width = word_width;
        } else if current_width + 1 + word_width <= width {
            current.push(' ');
            current.push_str(word);
            current_width += 1 + word_width;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_width = word_width;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len == 0 {
        return String::new();
    }

    let keep: String = s.chars().take(max_len - 1).collect();
    format!("{keep}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_fits_on_one_line() {
        assert_eq!(wrap("reduce the blocksize", 40), vec!["reduce the blocksize"]);
    }

    #[test]
    fn wrap_breaks_between_words() {
        assert_eq!(
            wrap("force on atom 3 exceeds tolerance", 15),
            vec!["force on atom 3", "exceeds", "tolerance"]
        );
    }

    #[test]
    fn wrap_counts_chars_not_bytes() {
        // "eV/Å" is four chars but five bytes; it must still fit.
        assert_eq!(wrap("tol 1e-3 eV/Å", 13), vec!["tol 1e-3 eV/Å"]);
    }

    #[test]
    fn wrap_empty_input_yields_one_blank_line() {
        assert_eq!(wrap("", 10), vec![""]);
    }

    #[test]
    fn truncate_short_and_exact() {
        assert_eq!(truncate("OUTCAR", 10), "OUTCAR");
        assert_eq!(truncate("OUTCAR", 6), "OUTCAR");
    }

    #[test]
    fn truncate_long() {
        assert_eq!(truncate("pressure_vir.dat", 10), "pressure_…");
    }

    #[test]
    fn truncate_unicode() {
        assert_eq!(truncate("Å³/atom", 4), "Å³/…");
    }

    #[test]
    fn truncate_zero_width() {
        assert_eq!(truncate("x", 0), "");
    }
}
