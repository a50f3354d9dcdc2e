//! Text measurement and greedy word wrap for placed text and sticky notes

/// Measures rendered text width, in document units, at a given font size.
pub trait TextMeasure {
    fn width(&self, text: &str, font_size: f64) -> f64;
}

impl<F> TextMeasure for F
where
    F: Fn(&str, f64) -> f64,
{
    fn width(&self, text: &str, font_size: f64) -> f64 {
        self(text, font_size)
    }
}

/// Advance widths of the standard Helvetica font (1/1000 em).
#[derive(Debug, Clone, Copy, Default)]
pub struct HelveticaMetrics;

/// Glyph widths for ASCII 32..=126
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

const DEFAULT_GLYPH_WIDTH: u16 = 556;

impl HelveticaMetrics {
    fn glyph_width(c: char) -> u16 {
        match c as u32 {
            code @ 32..=126 => HELVETICA_WIDTHS[(code - 32) as usize],
            _ => DEFAULT_GLYPH_WIDTH,
        }
    }
}

impl TextMeasure for HelveticaMetrics {
    fn width(&self, text: &str, font_size: f64) -> f64 {
        let units: u32 = text.chars().map(|c| Self::glyph_width(c) as u32).sum();
        units as f64 * font_size / 1000.0
    }
}

/// Break `text` into lines no wider than `max_width`.
///
/// Words are separated by single spaces. A word is appended to the current
/// line while `line + word + " "` measures within `max_width`; otherwise the
/// current line is committed and the word starts the next one. A single word
/// wider than the limit still gets its own line. The last line is always
/// flushed. Returned lines carry no trailing space.
pub fn wrap_words(
    text: &str,
    font_size: f64,
    max_width: f64,
    measure: &dyn TextMeasure,
) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split(' ') {
        let candidate = format!("{}{} ", line, word);
        if measure.width(&candidate, font_size) > max_width && !line.is_empty() {
            lines.push(line.trim_end().to_string());
            line = format!("{} ", word);
        } else {
            line = candidate;
        }
    }
    lines.push(line.trim_end().to_string());

    lines
}

/// Encode text for a WinAnsi (CP1252) literal string.
///
/// Characters the encoding cannot represent become `?`.
pub fn win_ansi_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            code @ 0x20..=0x7E => code as u8,
            code @ 0xA0..=0xFF => code as u8,
            _ => match c {
                '€' => 0x80,
                '‚' => 0x82,
                '„' => 0x84,
                '…' => 0x85,
                '‘' => 0x91,
                '’' => 0x92,
                '“' => 0x93,
                '”' => 0x94,
                '•' => 0x95,
                '–' => 0x96,
                '—' => 0x97,
                '™' => 0x99,
                '\t' => b' ',
                _ => b'?',
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// 30 units per word, except a three-word run jumps to 120
    fn word_count_measure(text: &str, _size: f64) -> f64 {
        match text.split_whitespace().count() {
            0 => 0.0,
            1 => 30.0,
            2 => 60.0,
            _ => 120.0,
        }
    }

    #[test]
    fn test_wrap_two_words_per_line() {
        let lines = wrap_words("alpha beta gamma delta", 11.0, 110.0, &word_count_measure);
        assert_eq!(lines, vec!["alpha beta", "gamma delta"]);
    }

    #[test]
    fn test_wrap_trailing_single_word() {
        let lines = wrap_words("alpha beta gamma delta epsilon", 11.0, 110.0, &word_count_measure);
        assert_eq!(lines, vec!["alpha beta", "gamma delta", "epsilon"]);
    }

    #[test]
    fn test_wrap_short_text_single_line() {
        let lines = wrap_words("ok", 11.0, 110.0, &HelveticaMetrics);
        assert_eq!(lines, vec!["ok"]);
    }

    #[test]
    fn test_wrap_empty_text_has_no_lines() {
        assert!(wrap_words("", 11.0, 110.0, &HelveticaMetrics).is_empty());
    }

    #[test]
    fn test_overlong_word_gets_its_own_line() {
        let measure = |text: &str, _size: f64| text.len() as f64 * 10.0;
        let lines = wrap_words("a supercalifragilistic b", 11.0, 110.0, &measure);
        assert_eq!(lines, vec!["a", "supercalifragilistic", "b"]);
    }

    #[test]
    fn test_helvetica_widths() {
        let m = HelveticaMetrics;
        // "Q3" = 778 + 556 units
        assert!((m.width("Q3", 14.0) - 1334.0 * 14.0 / 1000.0).abs() < 1e-9);
        assert_eq!(m.width("", 14.0), 0.0);
        // Unknown glyphs fall back to the default width
        assert!((m.width("é", 10.0) - 5.56).abs() < 1e-9);
    }

    #[test]
    fn test_helvetica_wrap_within_note_width() {
        let m = HelveticaMetrics;
        let lines = wrap_words(
            "Revenue dipped in the third quarter after the pricing change",
            11.0,
            110.0,
            &m,
        );
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(m.width(line, 11.0) <= 110.0, "line too wide: {}", line);
        }
        assert_eq!(
            lines.join(" "),
            "Revenue dipped in the third quarter after the pricing change"
        );
    }

    #[test]
    fn test_win_ansi_encoding() {
        assert_eq!(win_ansi_bytes("Q3"), b"Q3".to_vec());
        assert_eq!(win_ansi_bytes("café"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(win_ansi_bytes("“ok”"), vec![0x93, b'o', b'k', 0x94]);
        assert_eq!(win_ansi_bytes("日本"), b"??".to_vec());
    }
}
