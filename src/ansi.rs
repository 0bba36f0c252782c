//! ANSI SGR decoding.
//!
//! [`parse`] scans a formatted line and feeds `(text, style)` segments to a
//! callback, left to right. Only SGR (`ESC [ ... m`) sequences affect style;
//! other well-formed CSI sequences are reported on an unknown-codes side
//! channel, and malformed sequences degrade to literal text.

/// The escape introducer byte.
const ESC: u8 = 0x1b;

/// The sixteen named terminal colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

impl NamedColor {
    fn from_index(index: u16, bright: bool) -> NamedColor {
        let dim = [
            NamedColor::Black,
            NamedColor::Red,
            NamedColor::Green,
            NamedColor::Yellow,
            NamedColor::Blue,
            NamedColor::Magenta,
            NamedColor::Cyan,
            NamedColor::White,
        ];
        let color = dim[index as usize & 7];
        if bright { color.brighten() } else { color }
    }

    /// The high-intensity variant of a dim color; bright colors map to
    /// themselves.
    pub fn brighten(self) -> NamedColor {
        match self {
            NamedColor::Black => NamedColor::BrightBlack,
            NamedColor::Red => NamedColor::BrightRed,
            NamedColor::Green => NamedColor::BrightGreen,
            NamedColor::Yellow => NamedColor::BrightYellow,
            NamedColor::Blue => NamedColor::BrightBlue,
            NamedColor::Magenta => NamedColor::BrightMagenta,
            NamedColor::Cyan => NamedColor::BrightCyan,
            NamedColor::White => NamedColor::BrightWhite,
            other => other,
        }
    }

    fn is_dim(self) -> bool {
        (self as usize) < 8
    }

    /// xterm default RGB values.
    pub fn to_rgb(self) -> (u8, u8, u8) {
        match self {
            NamedColor::Black => (0, 0, 0),
            NamedColor::Red => (205, 0, 0),
            NamedColor::Green => (0, 205, 0),
            NamedColor::Yellow => (205, 205, 0),
            NamedColor::Blue => (0, 0, 238),
            NamedColor::Magenta => (205, 0, 205),
            NamedColor::Cyan => (0, 205, 205),
            NamedColor::White => (229, 229, 229),
            NamedColor::BrightBlack => (127, 127, 127),
            NamedColor::BrightRed => (255, 0, 0),
            NamedColor::BrightGreen => (0, 255, 0),
            NamedColor::BrightYellow => (255, 255, 0),
            NamedColor::BrightBlue => (92, 92, 255),
            NamedColor::BrightMagenta => (255, 0, 255),
            NamedColor::BrightCyan => (0, 255, 255),
            NamedColor::BrightWhite => (255, 255, 255),
        }
    }
}

/// A decoded color: named 4-bit, 256-palette index, or truecolor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnsiColor {
    Named(NamedColor),
    Ansi256(u8),
    Rgb(u8, u8, u8),
}

impl AnsiColor {
    /// Resolve to an RGB triple a renderer can use directly.
    pub fn to_rgb(self) -> (u8, u8, u8) {
        match self {
            AnsiColor::Named(named) => named.to_rgb(),
            AnsiColor::Ansi256(index) => ansi256_to_rgb(index),
            AnsiColor::Rgb(r, g, b) => (r, g, b),
        }
    }
}

/// Standard xterm 256-color palette mapping.
fn ansi256_to_rgb(index: u8) -> (u8, u8, u8) {
    match index {
        0..=7 => NamedColor::from_index(index as u16, false).to_rgb(),
        8..=15 => NamedColor::from_index(index as u16 - 8, true).to_rgb(),
        16..=231 => {
            let n = index - 16;
            let component = |v: u8| if v == 0 { 0 } else { 55 + 40 * v };
            (component(n / 36), component((n / 6) % 6), component(n % 6))
        }
        232..=255 => {
            let gray = 8 + 10 * (index - 232);
            (gray, gray, gray)
        }
    }
}

/// One run of text sharing a single resolved style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyledSegment<'a> {
    pub text: &'a str,
    pub foreground: Option<AnsiColor>,
    pub background: Option<AnsiColor>,
}

/// Running SGR state during a scan.
#[derive(Debug, Clone, Copy, Default)]
struct Style {
    bold: bool,
    foreground: Option<AnsiColor>,
    background: Option<AnsiColor>,
}

impl Style {
    /// Bold combined with a dim named foreground selects the bright
    /// variant, per ANSI convention.
    fn effective_foreground(&self) -> Option<AnsiColor> {
        match self.foreground {
            Some(AnsiColor::Named(named)) if self.bold && named.is_dim() => {
                Some(AnsiColor::Named(named.brighten()))
            }
            other => other,
        }
    }
}

/// Decode `input` into styled segments, invoking `emit` for each in order.
///
/// Each call is independent; no style state carries over between calls.
pub fn parse<'a>(input: &'a str, emit: impl FnMut(StyledSegment<'a>)) {
    parse_with_unknown(input, emit, |_| {});
}

/// Like [`parse`], but also reports well-formed non-SGR CSI sequences
/// (cursor movement and the like) verbatim on the `unknown` channel.
pub fn parse_with_unknown<'a>(
    input: &'a str,
    mut emit: impl FnMut(StyledSegment<'a>),
    mut unknown: impl FnMut(&'a str),
) {
    let bytes = input.as_bytes();
    let mut style = Style::default();
    let mut text_start = 0;
    let mut pos = 0;

    let mut flush = |style: &Style, from: usize, to: usize| {
        if from < to {
            emit(StyledSegment {
                text: &input[from..to],
                foreground: style.effective_foreground(),
                background: style.background,
            });
        }
    };

    while pos < bytes.len() {
        if bytes[pos] != ESC {
            pos += 1;
            continue;
        }

        match scan_csi(bytes, pos) {
            CsiScan::Sgr { params_end, end } => {
                if let Some(params) = parse_params(&input[pos + 2..params_end]) {
                    flush(&style, text_start, pos);
                    apply_sgr(&mut style, &params);
                    pos = end;
                    text_start = pos;
                } else {
                    // Parameter overflow; keep the sequence as literal text.
                    pos += 1;
                }
            }
            CsiScan::Other { end } => {
                flush(&style, text_start, pos);
                unknown(&input[pos..end]);
                pos = end;
                text_start = pos;
            }
            CsiScan::Malformed => {
                // Bare ESC, non-numeric parameter byte, or missing
                // terminator: leave the bytes in the text run and rescan
                // from the next byte.
                pos += 1;
            }
        }
    }

    flush(&style, text_start, bytes.len());
}

enum CsiScan {
    /// `ESC [ params m`; parameters live in `pos + 2 .. params_end`.
    Sgr { params_end: usize, end: usize },
    /// A complete CSI sequence with a non-`m` final byte.
    Other { end: usize },
    Malformed,
}

/// Scan a CSI sequence starting at the ESC byte at `pos`.
fn scan_csi(bytes: &[u8], pos: usize) -> CsiScan {
    if pos + 1 >= bytes.len() || bytes[pos + 1] != b'[' {
        return CsiScan::Malformed;
    }

    let mut cursor = pos + 2;
    while cursor < bytes.len() && (bytes[cursor].is_ascii_digit() || bytes[cursor] == b';') {
        cursor += 1;
    }

    match bytes.get(cursor).copied() {
        Some(b'm') => CsiScan::Sgr { params_end: cursor, end: cursor + 1 },
        // Any other final byte completes the sequence but is not SGR.
        Some(terminator) if (0x40..=0x7e).contains(&terminator) => {
            CsiScan::Other { end: cursor + 1 }
        }
        _ => CsiScan::Malformed,
    }
}

/// Split the raw parameter text into numbers; empty parameters are zero.
/// Returns `None` on overflow, which demotes the sequence to literal text.
fn parse_params(raw: &str) -> Option<Vec<u16>> {
    raw.split(';')
        .map(|part| if part.is_empty() { Ok(0) } else { part.parse() })
        .collect::<Result<Vec<u16>, _>>()
        .ok()
}

fn apply_sgr(style: &mut Style, params: &[u16]) {
    let mut iter = params.iter().copied();
    while let Some(code) = iter.next() {
        match code {
            0 => *style = Style::default(),
            1 => style.bold = true,
            22 => style.bold = false,
            30..=37 => style.foreground = Some(AnsiColor::Named(NamedColor::from_index(code - 30, false))),
            90..=97 => style.foreground = Some(AnsiColor::Named(NamedColor::from_index(code - 90, true))),
            40..=47 => style.background = Some(AnsiColor::Named(NamedColor::from_index(code - 40, false))),
            100..=107 => style.background = Some(AnsiColor::Named(NamedColor::from_index(code - 100, true))),
            38 | 48 => {
                let color = match iter.next() {
                    Some(5) => iter.next().filter(|n| *n <= 255).map(|n| AnsiColor::Ansi256(n as u8)),
                    Some(2) => {
                        let (r, g, b) = (iter.next(), iter.next(), iter.next());
                        match (r, g, b) {
                            (Some(r), Some(g), Some(b)) if r <= 255 && g <= 255 && b <= 255 => {
                                Some(AnsiColor::Rgb(r as u8, g as u8, b as u8))
                            }
                            _ => None,
                        }
                    }
                    _ => None,
                };
                if let Some(color) = color {
                    if code == 38 {
                        style.foreground = Some(color);
                    } else {
                        style.background = Some(color);
                    }
                }
            }
            39 => style.foreground = None,
            49 => style.background = None,
            // Unsupported SGR attributes (italic, underline, ...) are
            // ignored; the style they would affect is not modeled.
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(input: &str) -> Vec<(String, Option<AnsiColor>, Option<AnsiColor>)> {
        let mut segments = Vec::new();
        parse(input, |segment| {
            segments.push((segment.text.to_string(), segment.foreground, segment.background));
        });
        segments
    }

    #[test]
    fn plain_text_is_one_segment() {
        let segments = collect("hello world");
        assert_eq!(segments, vec![("hello world".into(), None, None)]);
    }

    #[test]
    fn color_applies_to_following_text_only() {
        let segments = collect("one\u{1b}[31mtwo\u{1b}[0mthree");
        assert_eq!(
            segments,
            vec![
                ("one".into(), None, None),
                ("two".into(), Some(AnsiColor::Named(NamedColor::Red)), None),
                ("three".into(), None, None),
            ]
        );
    }

    #[test]
    fn bold_selects_bright_variant() {
        let segments = collect("\u{1b}[1m\u{1b}[33mwarn");
        assert_eq!(
            segments,
            vec![("warn".into(), Some(AnsiColor::Named(NamedColor::BrightYellow)), None)]
        );
    }

    #[test]
    fn bright_code_without_bold() {
        let segments = collect("\u{1b}[91mfail");
        assert_eq!(
            segments,
            vec![("fail".into(), Some(AnsiColor::Named(NamedColor::BrightRed)), None)]
        );
    }

    #[test]
    fn background_and_individual_resets() {
        let segments = collect("\u{1b}[31m\u{1b}[44ma\u{1b}[39mb\u{1b}[49mc");
        assert_eq!(
            segments,
            vec![
                (
                    "a".into(),
                    Some(AnsiColor::Named(NamedColor::Red)),
                    Some(AnsiColor::Named(NamedColor::Blue)),
                ),
                ("b".into(), None, Some(AnsiColor::Named(NamedColor::Blue))),
                ("c".into(), None, None),
            ]
        );
    }

    #[test]
    fn palette_256_and_truecolor() {
        let segments = collect("\u{1b}[38;5;196ma\u{1b}[48;2;1;2;3mb");
        assert_eq!(segments[0].1, Some(AnsiColor::Ansi256(196)));
        assert_eq!(segments[1].2, Some(AnsiColor::Rgb(1, 2, 3)));
    }

    #[test]
    fn combined_parameter_list() {
        let segments = collect("\u{1b}[1;33;41mx");
        assert_eq!(
            segments,
            vec![(
                "x".into(),
                Some(AnsiColor::Named(NamedColor::BrightYellow)),
                Some(AnsiColor::Named(NamedColor::Red)),
            )]
        );
    }

    #[test]
    fn empty_parameters_reset() {
        let segments = collect("\u{1b}[31ma\u{1b}[mb");
        assert_eq!(segments[1], ("b".into(), None, None));
    }

    #[test]
    fn malformed_sequences_stay_literal() {
        // Missing terminator at end of input.
        assert_eq!(collect("a\u{1b}[31"), vec![("a\u{1b}[31".into(), None, None)]);
        // Bare escape.
        assert_eq!(collect("a\u{1b}b"), vec![("a\u{1b}b".into(), None, None)]);
        // Non-numeric parameter bytes.
        assert_eq!(collect("\u{1b}[?25h"), vec![("\u{1b}[?25h".into(), None, None)]);
    }

    #[test]
    fn non_sgr_csi_goes_to_unknown_channel() {
        let mut segments = Vec::new();
        let mut unknown = Vec::new();
        parse_with_unknown(
            "a\u{1b}[2Jb",
            |segment| segments.push(segment.text.to_string()),
            |code| unknown.push(code.to_string()),
        );
        assert_eq!(segments, vec!["a", "b"]);
        assert_eq!(unknown, vec!["\u{1b}[2J"]);
    }

    #[test]
    fn unknown_codes_do_not_alter_style() {
        let segments = collect("\u{1b}[31ma\u{1b}[2Kb");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].1, Some(AnsiColor::Named(NamedColor::Red)));
    }

    #[test]
    fn round_trip_preserves_stripped_text() {
        let inputs = [
            "plain",
            "\u{1b}[32minfo\u{1b}[0m: App.Program[10]",
            "a\u{1b}[1m\u{1b}[38;5;11mb\u{1b}[49mc\u{1b}[md",
            "unicode \u{1b}[35mπ≈3.14159\u{1b}[0m done",
        ];
        for input in inputs {
            let mut concatenated = String::new();
            parse(input, |segment| concatenated.push_str(segment.text));

            let mut stripped = String::new();
            parse_with_unknown(input, |segment| stripped.push_str(segment.text), |_| {});
            assert_eq!(concatenated, stripped);

            // Segments must cover exactly the input minus escape sequences.
            let mut rebuilt = input.to_string();
            for code in ["\u{1b}[32m", "\u{1b}[0m", "\u{1b}[1m", "\u{1b}[38;5;11m", "\u{1b}[49m", "\u{1b}[m", "\u{1b}[35m"] {
                rebuilt = rebuilt.replace(code, "");
            }
            assert_eq!(concatenated, rebuilt);
        }
    }

    #[test]
    fn calls_are_independent() {
        let mut first = Vec::new();
        parse("\u{1b}[31mred", |segment| first.push(segment.foreground));
        let mut second = Vec::new();
        parse("plain", |segment| second.push(segment.foreground));
        assert_eq!(second, vec![None]);
    }

    #[test]
    fn ansi256_palette_to_rgb() {
        assert_eq!(AnsiColor::Ansi256(42).to_rgb(), (0, 215, 135));
        assert_eq!(AnsiColor::Ansi256(232).to_rgb(), (8, 8, 8));
        assert_eq!(AnsiColor::Ansi256(15).to_rgb(), (255, 255, 255));
        assert_eq!(AnsiColor::Ansi256(196).to_rgb(), (255, 0, 0));
    }
}
