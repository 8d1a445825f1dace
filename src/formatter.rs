//! Format-spec interpreter for field values.
//!
//! Implements the replacement-field spec mini-language:
//!
//! ```text
//! [[fill]align][sign][#][0][width][grouping][.precision][type]
//! align    := '<' | '>' | '^' | '='
//! sign     := '+' | '-' | ' '
//! grouping := ',' | '_'
//! type     := 's' | 'b' | 'c' | 'd' | 'o' | 'x' | 'X' | 'n'
//!           | 'e' | 'E' | 'f' | 'F' | 'g' | 'G' | '%'
//! ```
//!
//! Decimal values are formatted exactly (rounding half to even), never via
//! binary floating point.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::value::Value;

/// Why a value could not be formatted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("invalid format specifier '{0}'")]
    InvalidSpec(String),
    #[error("format specifier missing precision")]
    MissingPrecision,
    #[error("unknown format code '{code}' for value of type {type_name}")]
    UnknownCode { code: char, type_name: &'static str },
    #[error("sign not allowed in string format specifier")]
    SignNotAllowed,
    #[error("alternate form (#) not allowed in string format specifier")]
    AlternateNotAllowed,
    #[error("'=' alignment not allowed in string format specifier")]
    AlignNotAllowed,
    #[error("cannot specify '{0}' with 's'")]
    GroupingNotAllowed(char),
    #[error("precision not allowed in integer format specifier")]
    PrecisionNotAllowed,
    #[error("cannot specify ',' with '{0}'")]
    CommaNotAllowed(char),
    #[error("%c arg not in range(0x110000)")]
    CharOutOfRange,
    #[error("{0} too large in format specifier")]
    TooLarge(&'static str),
    #[error("value too large to format as a percentage")]
    Overflow,
}

/// Largest width or precision a spec may request.
pub const MAX_WIDTH: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
    Center,
    /// Padding goes between the sign and the digits.
    AfterSign,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Sign {
    #[default]
    Minus,
    Plus,
    Space,
}

/// A parsed format spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    pub fill: char,
    pub align: Option<Align>,
    pub sign: Option<Sign>,
    pub alternate: bool,
    pub zero_pad: bool,
    pub width: usize,
    pub grouping: Option<char>,
    pub precision: Option<usize>,
    pub kind: Option<char>,
}

impl FormatSpec {
    /// Parse a spec string such as `>10.2f`.
    ///
    /// # Errors
    ///
    /// Returns `FormatError` for malformed specs.
    pub fn parse(spec: &str) -> Result<Self, FormatError> {
        let chars: Vec<char> = spec.chars().collect();
        let mut i = 0;
        let mut out = Self {
            fill: ' ',
            align: None,
            sign: None,
            alternate: false,
            zero_pad: false,
            width: 0,
            grouping: None,
            precision: None,
            kind: None,
        };

        if let Some(align) = chars.get(1).copied().and_then(align_of) {
            out.fill = chars[0];
            out.align = Some(align);
            i = 2;
        } else if let Some(align) = chars.first().copied().and_then(align_of) {
            out.align = Some(align);
            i = 1;
        }

        out.sign = match chars.get(i) {
            Some('+') => Some(Sign::Plus),
            Some('-') => Some(Sign::Minus),
            Some(' ') => Some(Sign::Space),
            _ => None,
        };
        if out.sign.is_some() {
            i += 1;
        }
        if chars.get(i) == Some(&'#') {
            out.alternate = true;
            i += 1;
        }
        if chars.get(i) == Some(&'0') {
            out.zero_pad = true;
            i += 1;
        }

        let (width, next) = read_digits(&chars, i);
        out.width = width.unwrap_or(0);
        if out.width > MAX_WIDTH {
            return Err(FormatError::TooLarge("width"));
        }
        i = next;

        if let Some(&c @ (',' | '_')) = chars.get(i) {
            out.grouping = Some(c);
            i += 1;
        }

        if chars.get(i) == Some(&'.') {
            let (precision, next) = read_digits(&chars, i + 1);
            let precision = precision.ok_or(FormatError::MissingPrecision)?;
            if precision > MAX_WIDTH {
                return Err(FormatError::TooLarge("precision"));
            }
            out.precision = Some(precision);
            i = next;
        }

        match &chars[i..] {
            [] => {}
            [kind] => out.kind = Some(*kind),
            _ => return Err(FormatError::InvalidSpec(spec.to_string())),
        }

        if out.zero_pad && out.align.is_none() {
            out.fill = '0';
            out.align = Some(Align::AfterSign);
        }
        Ok(out)
    }
}

const fn align_of(c: char) -> Option<Align> {
    match c {
        '<' => Some(Align::Left),
        '>' => Some(Align::Right),
        '^' => Some(Align::Center),
        '=' => Some(Align::AfterSign),
        _ => None,
    }
}

fn read_digits(chars: &[char], start: usize) -> (Option<usize>, usize) {
    let mut end = start;
    while chars.get(end).is_some_and(char::is_ascii_digit) {
        end += 1;
    }
    if end == start {
        return (None, start);
    }
    let digits: String = chars[start..end].iter().collect();
    // Only overflow can fail here; saturate so the caller's bound rejects it.
    (Some(digits.parse().unwrap_or(usize::MAX)), end)
}

/// Format a value according to a spec string.
///
/// # Errors
///
/// Returns `FormatError` when the spec is malformed or does not apply to
/// the value's type.
pub fn format_value(value: &Value, spec: &str) -> Result<String, FormatError> {
    if spec.is_empty() {
        return Ok(value.to_string());
    }
    let spec = FormatSpec::parse(spec)?;
    match value {
        Value::Str(s) => format_str(s, &spec),
        Value::Bool(b) => format_int(i64::from(*b), &spec),
        Value::Int(i) => format_int(*i, &spec),
        Value::Decimal(d) => format_decimal(*d, &spec, None),
    }
}

fn format_str(s: &str, spec: &FormatSpec) -> Result<String, FormatError> {
    match spec.kind {
        None | Some('s') => {}
        Some(code) => {
            return Err(FormatError::UnknownCode {
                code,
                type_name: "str",
            });
        }
    }
    if spec.sign.is_some() {
        return Err(FormatError::SignNotAllowed);
    }
    if spec.alternate {
        return Err(FormatError::AlternateNotAllowed);
    }
    if spec.align == Some(Align::AfterSign) {
        return Err(FormatError::AlignNotAllowed);
    }
    if let Some(grouping) = spec.grouping {
        return Err(FormatError::GroupingNotAllowed(grouping));
    }
    let body: String = match spec.precision {
        Some(precision) => s.chars().take(precision).collect(),
        None => s.to_string(),
    };
    Ok(pad("", &body, spec, Align::Left))
}

fn format_int(i: i64, spec: &FormatSpec) -> Result<String, FormatError> {
    let kind = spec.kind.unwrap_or('d');
    if matches!(kind, 'e' | 'E' | 'f' | 'F' | 'g' | 'G' | '%') {
        return format_decimal(Decimal::from(i), spec, Some(6));
    }
    if spec.precision.is_some() {
        return Err(FormatError::PrecisionNotAllowed);
    }
    let magnitude = i.unsigned_abs();
    let (prefix, digits, group_size) = match kind {
        'd' | 'n' => ("", magnitude.to_string(), 3),
        'b' => ("0b", format!("{magnitude:b}"), 4),
        'o' => ("0o", format!("{magnitude:o}"), 4),
        'x' => ("0x", format!("{magnitude:x}"), 4),
        'X' => ("0X", format!("{magnitude:X}"), 4),
        'c' => {
            let c = u32::try_from(i)
                .ok()
                .and_then(char::from_u32)
                .ok_or(FormatError::CharOutOfRange)?;
            return Ok(pad("", &c.to_string(), spec, Align::Left));
        }
        code => {
            return Err(FormatError::UnknownCode {
                code,
                type_name: "int",
            });
        }
    };
    if spec.grouping == Some(',') && group_size == 4 {
        return Err(FormatError::CommaNotAllowed(kind));
    }
    let digits = match spec.grouping {
        Some(sep) => group_digits(&digits, sep, group_size),
        None => digits,
    };
    let prefix = if spec.alternate { prefix } else { "" };
    let sign = sign_str(i < 0, spec.sign);
    Ok(pad(&format!("{sign}{prefix}"), &digits, spec, Align::Right))
}

/// Format an exact decimal. `default_precision` applies when the spec
/// gives none; `None` keeps the value's own digits.
fn format_decimal(
    d: Decimal,
    spec: &FormatSpec,
    default_precision: Option<usize>,
) -> Result<String, FormatError> {
    let negative = d.is_sign_negative() && !d.is_zero();
    let magnitude = d.abs();
    let precision = spec.precision.or(default_precision);

    let body = match spec.kind {
        None if precision.is_none() => magnitude.to_string(),
        None | Some('g' | 'G' | 'n') => {
            let upper = spec.kind == Some('G');
            general(magnitude, precision.unwrap_or(6), spec.alternate, upper)
        }
        Some('f' | 'F') => fixed(magnitude, precision, spec.alternate),
        Some('e' | 'E') => {
            let upper = spec.kind == Some('E');
            scientific(magnitude, precision, spec.alternate, upper)
        }
        Some('%') => {
            let scaled = magnitude
                .checked_mul(Decimal::ONE_HUNDRED)
                .ok_or(FormatError::Overflow)?;
            format!("{}%", fixed(scaled, precision, spec.alternate))
        }
        Some(code) => {
            return Err(FormatError::UnknownCode {
                code,
                type_name: "decimal",
            });
        }
    };

    let body = match spec.grouping {
        Some(sep) => group_integer_part(&body, sep),
        None => body,
    };
    let sign = sign_str(negative, spec.sign);
    Ok(pad(sign, &body, spec, Align::Right))
}

fn round(d: Decimal, places: usize) -> Decimal {
    let places = u32::try_from(places).unwrap_or(u32::MAX).min(28);
    let mut rounded = d.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(places);
    rounded
}

fn fixed(d: Decimal, precision: Option<usize>, alternate: bool) -> String {
    let mut out = precision.map_or_else(|| d.to_string(), |p| round(d, p).to_string());
    if alternate && !out.contains('.') {
        out.push('.');
    }
    out
}

/// Significant digits of a non-negative decimal and the exponent of the
/// first one, so that `d == 0.DIGITS * 10^(exp + 1)`.
fn digits_and_exponent(d: Decimal) -> (String, i64) {
    let mantissa = d.mantissa().unsigned_abs().to_string();
    let scale = i64::from(d.scale());
    if d.is_zero() {
        return ("0".to_string(), 0);
    }
    let trimmed = mantissa.trim_end_matches('0');
    let trailing = i64::try_from(mantissa.len() - trimmed.len()).unwrap_or(0);
    let len = i64::try_from(trimmed.len()).unwrap_or(0);
    (trimmed.to_string(), len - 1 + trailing - scale)
}

/// Round a digit string to `n` digits, half to even. Returns the digits and
/// whether rounding carried into a new leading digit.
fn round_digits(digits: &str, n: usize) -> (String, bool) {
    if digits.len() <= n {
        return (format!("{digits:0<n$}"), false);
    }
    let (keep, rest) = digits.split_at(n);
    let first_dropped = rest.as_bytes()[0];
    let beyond_half = rest[1..].bytes().any(|b| b != b'0');
    let last_kept_odd = keep.bytes().last().is_some_and(|b| (b - b'0') % 2 == 1);
    let round_up =
        first_dropped > b'5' || (first_dropped == b'5' && (beyond_half || last_kept_odd));
    if !round_up {
        return (keep.to_string(), false);
    }
    let mut bytes = keep.as_bytes().to_vec();
    for b in bytes.iter_mut().rev() {
        if *b == b'9' {
            *b = b'0';
        } else {
            *b += 1;
            return (String::from_utf8_lossy(&bytes).into_owned(), false);
        }
    }
    bytes.insert(0, b'1');
    bytes.pop();
    (String::from_utf8_lossy(&bytes).into_owned(), true)
}

fn scientific(d: Decimal, precision: Option<usize>, alternate: bool, upper: bool) -> String {
    let (digits, mut exp) = digits_and_exponent(d);
    let precision = precision.unwrap_or(digits.len() - 1);
    let (rounded, carried) = round_digits(&digits, precision + 1);
    if carried {
        exp += 1;
    }
    let mut out = rounded[..1].to_string();
    if precision > 0 || alternate {
        out.push('.');
    }
    out.push_str(&rounded[1..]);
    out.push(if upper { 'E' } else { 'e' });
    out.push(if exp < 0 { '-' } else { '+' });
    out.push_str(&format!("{:02}", exp.unsigned_abs()));
    out
}

fn general(d: Decimal, precision: usize, alternate: bool, upper: bool) -> String {
    let precision = precision.max(1);
    if d.is_zero() {
        return if alternate {
            fixed(d, Some(precision - 1), true)
        } else {
            "0".to_string()
        };
    }
    let (digits, mut exp) = digits_and_exponent(d);
    let (_, carried) = round_digits(&digits, precision);
    if carried {
        exp += 1;
    }
    let p = i64::try_from(precision).unwrap_or(i64::MAX);
    let out = if (-4..p).contains(&exp) {
        let places = usize::try_from(p - 1 - exp).unwrap_or(0);
        fixed(d, Some(places), alternate)
    } else {
        scientific(d, Some(precision - 1), alternate, upper)
    };
    if alternate {
        out
    } else {
        strip_fraction_zeros(&out)
    }
}

/// Drop trailing zeros (and a bare point) from the fractional part,
/// leaving any exponent in place.
fn strip_fraction_zeros(s: &str) -> String {
    let (number, exponent) = s.find(['e', 'E']).map_or((s, ""), |i| s.split_at(i));
    if !number.contains('.') {
        return s.to_string();
    }
    let number = number.trim_end_matches('0').trim_end_matches('.');
    format!("{number}{exponent}")
}

fn group_digits(digits: &str, sep: char, size: usize) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / size);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % size == 0 {
            out.push(sep);
        }
        out.push(c);
    }
    out
}

fn group_integer_part(body: &str, sep: char) -> String {
    let end = body
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(body.len());
    let (int_part, rest) = body.split_at(end);
    format!("{}{rest}", group_digits(int_part, sep, 3))
}

const fn sign_str(negative: bool, sign: Option<Sign>) -> &'static str {
    match (negative, sign) {
        (true, _) => "-",
        (false, Some(Sign::Plus)) => "+",
        (false, Some(Sign::Space)) => " ",
        (false, _) => "",
    }
}

/// Pad `prefix + body` to the spec's width.
fn pad(prefix: &str, body: &str, spec: &FormatSpec, default_align: Align) -> String {
    let len = prefix.chars().count() + body.chars().count();
    let fill_len = spec.width.saturating_sub(len);
    let fill = |n: usize| spec.fill.to_string().repeat(n);
    match spec.align.unwrap_or(default_align) {
        Align::Left => format!("{prefix}{body}{}", fill(fill_len)),
        Align::Right => format!("{}{prefix}{body}", fill(fill_len)),
        Align::Center => {
            let left = fill_len / 2;
            format!("{}{prefix}{body}{}", fill(left), fill(fill_len - left))
        }
        Align::AfterSign => format!("{prefix}{}{body}", fill(fill_len)),
    }
}
