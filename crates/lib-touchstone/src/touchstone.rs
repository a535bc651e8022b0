//! Touchstone S-parameter file parser.
//!
//! Supports:
//! - Touchstone 1.x format (.s1p, .s2p, .s4p, ...)
//! - All data formats: RI, MA, DB
//! - Frequency units: Hz, kHz, MHz, GHz
//! - Comments anywhere, multi-line data blocks for 3+ ports
//! - 2-port noise parameter blocks (skipped)
//!
//! Data ordering follows the format: a 2-port line is
//! `f S11 S21 S12 S22`; 3+ port networks are written row by row, wrapped
//! every four entries.

use crate::error::ParseError;
use lib_types::{
    sparams::{DataFormat, SParameters, TouchstoneVersion},
    units::{Hertz, Ohms},
};
use ndarray::Array2;
use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{char, line_ending, not_line_ending, space0, space1},
    combinator::{map, opt, value},
    multi::{many0, many1},
    number::complete::double,
    sequence::preceded,
    IResult, Parser,
};
use std::path::Path;

/// Largest port count tried when inferring it from the data layout.
const MAX_INFERRED_PORTS: usize = 32;

/// Parsed Touchstone file.
#[derive(Clone, Debug)]
pub struct TouchstoneFile {
    /// File version.
    pub version: TouchstoneVersion,

    /// Number of ports.
    pub num_ports: usize,

    /// Data format (RI, MA, DB).
    pub format: DataFormat,

    /// Reference impedance.
    pub z0: Ohms,

    /// Frequency multiplier (Hz, kHz, MHz, GHz).
    pub freq_mult: f64,

    /// Number of noise-parameter points that were skipped.
    pub noise_points: usize,

    /// Parsed S-parameters.
    pub sparams: SParameters,
}

impl TouchstoneFile {
    /// Get the S-parameters.
    pub fn into_sparams(self) -> SParameters {
        self.sparams
    }
}

/// Parse a Touchstone file from a string, inferring the port count from
/// the data layout.
pub fn parse_touchstone(content: &str) -> Result<TouchstoneFile, ParseError> {
    parse_with_hint(content, None)
}

/// Parse a Touchstone file from a string with a known port count.
pub fn parse_touchstone_with_ports(
    content: &str,
    num_ports: usize,
) -> Result<TouchstoneFile, ParseError> {
    if num_ports == 0 {
        return Err(ParseError::invalid_value("port count", "must be at least 1"));
    }
    parse_with_hint(content, Some(num_ports))
}

/// Parse a Touchstone file from a path.
///
/// The port count comes from the `.sNp` extension when present.
pub fn parse_touchstone_file(path: &Path) -> Result<TouchstoneFile, ParseError> {
    let content = std::fs::read_to_string(path)?;
    let hint = infer_ports_from_extension(path);

    tracing::debug!(path = %path.display(), ports = ?hint, "reading Touchstone file");

    parse_with_hint(&content, hint)
}

fn infer_ports_from_extension(path: &Path) -> Option<usize> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let digits = ext.strip_prefix('s')?.strip_suffix('p')?;
    digits.parse().ok().filter(|&n| n > 0)
}

fn parse_with_hint(content: &str, hint: Option<usize>) -> Result<TouchstoneFile, ParseError> {
    if let Some(keyword) = content
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with('['))
    {
        return Err(ParseError::UnsupportedVersion(keyword.to_string()));
    }

    let (rest, options) = header(content).map_err(|_| ParseError::Missing {
        kind: "line",
        name: "# option line".to_string(),
    })?;

    if options.param_type != 'S' {
        return Err(ParseError::invalid_value(
            "parameter type",
            format!("only S-parameters are supported, got {}", options.param_type),
        ));
    }

    let (rest, data_lines) = data_section(rest)?;
    if !rest.trim().is_empty() {
        let preview: String = rest.trim_start().chars().take(20).collect();
        return Err(ParseError::syntax(
            line_of(content, rest),
            format!("expected numeric data, found '{preview}'"),
        ));
    }

    let num_ports = match hint {
        Some(n) => n,
        None => infer_ports_from_data(&data_lines)?,
    };

    let (network_lines, noise_lines) = split_noise_block(&data_lines, num_ports);
    if !noise_lines.is_empty() {
        tracing::debug!(points = noise_lines.len(), "skipping noise parameters");
    }

    let sparams = build_sparams(&options, network_lines, num_ports)?;

    tracing::debug!(
        ports = num_ports,
        points = sparams.len(),
        z0 = options.z0.0,
        "parsed Touchstone data"
    );

    Ok(TouchstoneFile {
        version: TouchstoneVersion::V1,
        num_ports,
        format: options.format,
        z0: options.z0,
        freq_mult: options.freq_mult,
        noise_points: noise_lines.len(),
        sparams,
    })
}

/// 1-based line number of `rest` inside `content`.
fn line_of(content: &str, rest: &str) -> usize {
    let offset = content.len() - rest.len();
    let skipped = rest.len() - rest.trim_start().len();
    content[..offset + skipped].matches('\n').count() + 1
}

// ============================================================================
// Nom Parsers
// ============================================================================

/// Options from the # line.
#[derive(Clone, Debug)]
struct OptionsLine {
    freq_mult: f64,
    param_type: char,
    format: DataFormat,
    z0: Ohms,
}

impl Default for OptionsLine {
    fn default() -> Self {
        Self {
            freq_mult: 1e9,
            param_type: 'S',
            format: DataFormat::MA,
            z0: Ohms::Z0_50,
        }
    }
}

fn header(input: &str) -> IResult<&str, OptionsLine> {
    let (input, _) = many0(comment_or_blank_line).parse(input)?;
    parse_options_line(input)
}

fn parse_options_line(input: &str) -> IResult<&str, OptionsLine> {
    let (input, _) = space0(input)?;
    let (input, _) = char('#')(input)?;
    let (input, _) = space0(input)?;

    let mut options = OptionsLine::default();

    let (input, tokens) = many0(preceded(space0, parse_option_token)).parse(input)?;

    for token in tokens {
        match token {
            OptionToken::FreqUnit(mult) => options.freq_mult = mult,
            OptionToken::ParamType(t) => options.param_type = t,
            OptionToken::Format(f) => options.format = f,
            OptionToken::Z0(z) => options.z0 = z,
        }
    }

    let (input, _) = opt(preceded(space0, not_line_ending)).parse(input)?;
    let (input, _) = opt(line_ending).parse(input)?;

    Ok((input, options))
}

#[derive(Clone, Debug)]
enum OptionToken {
    FreqUnit(f64),
    ParamType(char),
    Format(DataFormat),
    Z0(Ohms),
}

fn parse_option_token(input: &str) -> IResult<&str, OptionToken> {
    alt((parse_freq_unit, parse_param_type, parse_format, parse_z0)).parse(input)
}

fn parse_freq_unit(input: &str) -> IResult<&str, OptionToken> {
    alt((
        value(OptionToken::FreqUnit(1.0), tag_no_case("HZ")),
        value(OptionToken::FreqUnit(1e3), tag_no_case("KHZ")),
        value(OptionToken::FreqUnit(1e6), tag_no_case("MHZ")),
        value(OptionToken::FreqUnit(1e9), tag_no_case("GHZ")),
    ))
    .parse(input)
}

fn parse_param_type(input: &str) -> IResult<&str, OptionToken> {
    alt((
        value(OptionToken::ParamType('S'), tag_no_case("S")),
        value(OptionToken::ParamType('Y'), tag_no_case("Y")),
        value(OptionToken::ParamType('Z'), tag_no_case("Z")),
        value(OptionToken::ParamType('H'), tag_no_case("H")),
        value(OptionToken::ParamType('G'), tag_no_case("G")),
    ))
    .parse(input)
}

fn parse_format(input: &str) -> IResult<&str, OptionToken> {
    alt((
        value(OptionToken::Format(DataFormat::RI), tag_no_case("RI")),
        value(OptionToken::Format(DataFormat::MA), tag_no_case("MA")),
        value(OptionToken::Format(DataFormat::DB), tag_no_case("DB")),
    ))
    .parse(input)
}

fn parse_z0(input: &str) -> IResult<&str, OptionToken> {
    let (input, _) = tag_no_case("R")(input)?;
    let (input, _) = space1(input)?;
    let (input, z0) = double(input)?;
    Ok((input, OptionToken::Z0(Ohms(z0))))
}

fn comment_or_blank_line(input: &str) -> IResult<&str, ()> {
    alt((
        map((space0, char('!'), not_line_ending, opt(line_ending)), |_| ()),
        map((space0, line_ending), |_| ()),
    ))
    .parse(input)
}

fn parse_data_line(input: &str) -> IResult<&str, Vec<f64>> {
    let (input, _) = space0(input)?;

    if input.starts_with('!') || input.starts_with('\n') || input.starts_with('\r') || input.is_empty() {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Tag,
        )));
    }

    let (input, values) = many1(preceded(space0, double)).parse(input)?;
    let (input, _) = opt(preceded(space0, preceded(char('!'), not_line_ending))).parse(input)?;
    let (input, _) = opt((space0, line_ending)).parse(input)?;

    Ok((input, values))
}

/// Numeric lines, with interleaved comments and blank lines dropped.
fn data_section(input: &str) -> IResult<&str, Vec<Vec<f64>>> {
    let (input, lines) = many0(alt((
        map(parse_data_line, Some),
        map(comment_or_blank_line, |_| None),
    )))
    .parse(input)?;
    Ok((input, lines.into_iter().flatten().collect()))
}

// ============================================================================
// Data block assembly
// ============================================================================

/// Infer the port count from the line layout of the data block.
///
/// 1- and 2-port files put each frequency point on one line (3 and 9
/// values). Larger networks write one matrix row per group of lines, at
/// most four entries per line, so a point spans `N·ceil(N/4)` lines and
/// its first line holds `1 + 2·min(N, 4)` values. A 4-port's first line
/// has 9 values like a 2-port's; the even-length continuation line tells
/// them apart.
fn infer_ports_from_data(data_lines: &[Vec<f64>]) -> Result<usize, ParseError> {
    let first = data_lines
        .first()
        .ok_or_else(|| ParseError::InvalidFormat("no data lines found".to_string()))?;

    let continued = data_lines.get(1).is_some_and(|line| line.len() % 2 == 0);
    match (first.len(), continued) {
        (3, false) => return Ok(1),
        (9, false) => return Ok(2),
        _ => {}
    }

    let total_values: usize = data_lines.iter().map(Vec::len).sum();
    (3..=MAX_INFERRED_PORTS)
        .find(|&n| {
            let values_per_freq = 1 + 2 * n * n;
            let lines_per_freq = n * n.div_ceil(4);
            first.len() == 1 + 2 * n.min(4)
                && total_values % values_per_freq == 0
                && data_lines.len() % lines_per_freq == 0
        })
        .ok_or_else(|| {
            ParseError::InvalidFormat(format!(
                "cannot infer port count from {} values on the first line",
                first.len()
            ))
        })
}

/// Split off a 2-port noise parameter block (5 values per line).
fn split_noise_block(data_lines: &[Vec<f64>], num_ports: usize) -> (&[Vec<f64>], &[Vec<f64>]) {
    if num_ports != 2 {
        return (data_lines, &[]);
    }
    let start = data_lines
        .iter()
        .position(|line| line.len() == 5)
        .unwrap_or(data_lines.len());
    data_lines.split_at(start)
}

fn build_sparams(
    options: &OptionsLine,
    data_lines: &[Vec<f64>],
    num_ports: usize,
) -> Result<SParameters, ParseError> {
    let mut sparams = SParameters::new(num_ports, options.z0);

    let all_values: Vec<f64> = data_lines.iter().flatten().copied().collect();
    let values_per_freq = 1 + 2 * num_ports * num_ports;

    if all_values.is_empty() {
        return Err(ParseError::InvalidFormat("no data lines found".to_string()));
    }
    if all_values.len() % values_per_freq != 0 {
        return Err(ParseError::InvalidFormat(format!(
            "{} values do not form whole {}-port points of {} values",
            all_values.len(),
            num_ports,
            values_per_freq
        )));
    }

    let mut previous: Option<f64> = None;
    for chunk in all_values.chunks_exact(values_per_freq) {
        let freq = chunk[0] * options.freq_mult;
        if let Some(prev) = previous {
            if freq <= prev {
                return Err(ParseError::invalid_value(
                    "frequency",
                    format!("{freq} Hz does not increase past {prev} Hz"),
                ));
            }
        }
        previous = Some(freq);

        let params = &chunk[1..];
        let mut matrix = Array2::zeros((num_ports, num_ports));

        for (k, pair) in params.chunks_exact(2).enumerate() {
            let (row, col) = if num_ports == 2 {
                // 2-port lines are column-major: S11 S21 S12 S22.
                (k % 2, k / 2)
            } else {
                (k / num_ports, k % num_ports)
            };
            matrix[[row, col]] = options.format.to_complex(pair[0], pair[1]);
        }

        sparams
            .try_add_point(Hertz(freq), matrix)
            .map_err(|msg| ParseError::InvalidFormat(msg.to_string()))?;
    }

    Ok(sparams)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_types::Complex64;

    const SAMPLE_S2P: &str = r#"! Sample 2-port S-parameter file
# GHz S RI R 50
! freq  S11_re S11_im S21_re S21_im S12_re S12_im S22_re S22_im
1.0  0.1 0.0  0.9 0.0  0.8 0.0  0.2 0.0
2.0  0.15 0.05  0.85 -0.1  0.75 -0.1  0.25 0.05
"#;

    fn four_port_text(points: usize) -> String {
        let mut text = String::from("# MHz S RI R 50\n");
        for p in 0..points {
            for row in 0..4 {
                if row == 0 {
                    text.push_str(&format!("{} ", 100.0 * (p + 1) as f64));
                } else {
                    text.push_str("    ");
                }
                for col in 0..4 {
                    let v = (row * 4 + col) as f64 / 100.0 + p as f64;
                    text.push_str(&format!("{v} 0.0 "));
                }
                text.push('\n');
            }
        }
        text
    }

    #[test]
    fn test_parse_sample_s2p() {
        let result = parse_touchstone(SAMPLE_S2P).unwrap();

        assert_eq!(result.num_ports, 2);
        assert_eq!(result.format, DataFormat::RI);
        assert_eq!(result.z0.0, 50.0);
        assert_eq!(result.sparams.len(), 2);

        let freqs = &result.sparams.frequencies;
        assert!((freqs[0].0 - 1e9).abs() < 1.0);
        assert!((freqs[1].0 - 2e9).abs() < 1.0);
    }

    #[test]
    fn test_two_port_column_order() {
        let sp = parse_touchstone(SAMPLE_S2P).unwrap().into_sparams();

        assert!((sp.s11()[0].re - 0.1).abs() < 1e-12);
        assert!((sp.s21()[0].re - 0.9).abs() < 1e-12);
        assert!((sp.s12()[0].re - 0.8).abs() < 1e-12);
        assert!((sp.s22()[0].re - 0.2).abs() < 1e-12);
        assert!((sp.s21()[1] - Complex64::new(0.85, -0.1)).norm() < 1e-12);
    }

    #[test]
    fn test_options_parsing() {
        let input = "# MHZ S DB R 75\n";
        let (_, options) = parse_options_line(input).unwrap();

        assert!((options.freq_mult - 1e6).abs() < 1.0);
        assert_eq!(options.param_type, 'S');
        assert_eq!(options.format, DataFormat::DB);
        assert!((options.z0.0 - 75.0).abs() < 1e-10);
    }

    #[test]
    fn test_defaults_and_magnitude_angle() {
        // Empty option line: GHz, S, MA, 50 ohm.
        let text = "#\n1 0.5 90\n2 0.25 -90\n";
        let file = parse_touchstone(text).unwrap();

        assert_eq!(file.num_ports, 1);
        assert_eq!(file.format, DataFormat::MA);
        assert!((file.sparams.frequencies[1].0 - 2e9).abs() < 1e-3);

        let s11 = file.sparams.s11();
        assert!((s11[0] - Complex64::new(0.0, 0.5)).norm() < 1e-12);
        assert!((s11[1] - Complex64::new(0.0, -0.25)).norm() < 1e-12);
    }

    #[test]
    fn test_db_format() {
        let text = "# Hz S DB\n1e9 -6.0206 0 -20 180 -20 180 -6.0206 0\n";
        let sp = parse_touchstone(text).unwrap().into_sparams();

        assert!((sp.s11()[0].re - 0.5).abs() < 1e-4);
        assert!((sp.s21()[0].re + 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_four_port_inferred_from_layout() {
        let file = parse_touchstone(&four_port_text(3)).unwrap();

        assert_eq!(file.num_ports, 4);
        assert_eq!(file.sparams.len(), 3);

        // Row-major: S_rc = (4r + c) / 100 + point.
        let m = &file.sparams.matrices[1];
        assert!((m[[0, 1]].re - 1.01).abs() < 1e-12);
        assert!((m[[1, 0]].re - 1.04).abs() < 1e-12);
        assert!((m[[3, 2]].re - 1.14).abs() < 1e-12);
    }

    #[test]
    fn test_explicit_port_count() {
        let file = parse_touchstone_with_ports(&four_port_text(1), 4).unwrap();
        assert_eq!(file.num_ports, 4);
        assert_eq!(file.sparams.len(), 1);

        assert!(matches!(
            parse_touchstone_with_ports(&four_port_text(1), 3),
            Err(ParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_comments_between_data_lines() {
        let text = "# GHz S RI R 50\n1 0.1 0 0.9 0 0.9 0 0.1 0 ! first\n! interlude\n\n2 0.1 0 0.8 0 0.8 0 0.1 0\n";
        let sp = parse_touchstone(text).unwrap().into_sparams();
        assert_eq!(sp.len(), 2);
    }

    #[test]
    fn test_noise_block_skipped() {
        let text = "# GHz S RI R 50\n\
                    1 0.1 0 0.9 0 0.9 0 0.1 0\n\
                    2 0.1 0 0.8 0 0.8 0 0.1 0\n\
                    ! noise parameters\n\
                    1 1.5 0.3 45 0.4\n\
                    2 1.8 0.35 60 0.45\n";
        let file = parse_touchstone(text).unwrap();

        assert_eq!(file.sparams.len(), 2);
        assert_eq!(file.noise_points, 2);
    }

    #[test]
    fn test_garbage_reports_line() {
        let text = "# GHz S RI R 50\n1 0.1 0 0.9 0 0.9 0 0.1 0\nnot a number\n";
        match parse_touchstone(text) {
            Err(ParseError::Syntax { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_rejected_files() {
        assert!(matches!(
            parse_touchstone("1 0.1 0\n"),
            Err(ParseError::Missing { .. })
        ));
        assert!(matches!(
            parse_touchstone("# GHz Y RI R 50\n1 0.1 0\n"),
            Err(ParseError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse_touchstone("[Version] 2.0\n# GHz S RI R 50\n"),
            Err(ParseError::UnsupportedVersion(_))
        ));
        assert!(matches!(
            parse_touchstone("# GHz S RI R 50\n2 0.1 0\n1 0.1 0\n"),
            Err(ParseError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse_touchstone_with_ports("# GHz S RI R 50\n1 0.1 0 0.9 0 0.9 0\n", 2),
            Err(ParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_extension_port_hint() {
        assert_eq!(infer_ports_from_extension(Path::new("thru.s2p")), Some(2));
        assert_eq!(infer_ports_from_extension(Path::new("CH.S4P")), Some(4));
        assert_eq!(infer_ports_from_extension(Path::new("data.ts")), None);
        assert_eq!(infer_ports_from_extension(Path::new("x.s")), None);
    }

    #[test]
    fn test_parse_from_path() {
        let path = std::env::temp_dir().join(format!("lib_touchstone_{}.s2p", std::process::id()));
        std::fs::write(&path, SAMPLE_S2P).unwrap();

        let file = parse_touchstone_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(file.num_ports, 2);
        assert_eq!(file.sparams.len(), 2);
    }
}
