//! Binary-table (`XTENSION = 'BINTABLE'`) column formats and row codec.
//!
//! Each row of a binary table is a fixed-width record whose fields are laid out in
//! column order, big-endian, as described by the `TFORMn` keywords. Only scalar
//! columns (repeat count 1) and fixed-width character columns (`rA`) are handled;
//! that is all the light-curve simulator writes.
//!
//! | TFORM | Rust value                | width |
//! |-------|---------------------------|-------|
//! | `L`   | [`FitsValue::Logical`]    | 1     |
//! | `B`   | [`FitsValue::Int`]        | 1     |
//! | `I`   | [`FitsValue::Int`]        | 2     |
//! | `J`   | [`FitsValue::Int`]        | 4     |
//! | `K`   | [`FitsValue::Int`]        | 8     |
//! | `E`   | [`FitsValue::Float`]      | 4     |
//! | `D`   | [`FitsValue::Float`]      | 8     |
//! | `rA`  | [`FitsValue::Text`]       | r     |
use nom::{
    character::complete::{digit0, one_of},
    number::complete::{be_f32, be_f64, be_i16, be_i32, be_i64, be_u8},
    sequence::pair,
    IResult,
};

use super::{FitsError, FitsValue};

/// Storage format of a binary-table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnFormat {
    Logical,
    Byte,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    /// Fixed-width character field of the given byte width.
    Text(usize),
}

impl ColumnFormat {
    /// Number of bytes taken by one value in a row.
    pub fn width(&self) -> usize {
        match self {
            ColumnFormat::Logical | ColumnFormat::Byte => 1,
            ColumnFormat::Int16 => 2,
            ColumnFormat::Int32 | ColumnFormat::Float32 => 4,
            ColumnFormat::Int64 | ColumnFormat::Float64 => 8,
            ColumnFormat::Text(w) => *w,
        }
    }

    /// `TFORMn` keyword value for this format.
    pub fn tform(&self) -> String {
        match self {
            ColumnFormat::Logical => "L".into(),
            ColumnFormat::Byte => "B".into(),
            ColumnFormat::Int16 => "I".into(),
            ColumnFormat::Int32 => "J".into(),
            ColumnFormat::Int64 => "K".into(),
            ColumnFormat::Float32 => "E".into(),
            ColumnFormat::Float64 => "D".into(),
            ColumnFormat::Text(w) => format!("{w}A"),
        }
    }

    /// Parse a `TFORMn` value such as `"D"`, `"1J"` or `"12A"`.
    pub fn parse(tform: &str) -> Result<Self, FitsError> {
        let unsupported = || FitsError::UnsupportedFormat(tform.to_string());

        let parsed: IResult<&str, (&str, char)> =
            pair(digit0, one_of("LBIJKEDA"))(tform.trim());
        let (rest, (repeat, code)) = parsed.map_err(|_| unsupported())?;
        if !rest.trim().is_empty() {
            return Err(unsupported());
        }
        let repeat = if repeat.is_empty() {
            1
        } else {
            repeat.parse::<usize>().map_err(|_| unsupported())?
        };

        let format = match (code, repeat) {
            ('A', w) if w > 0 => ColumnFormat::Text(w),
            ('L', 1) => ColumnFormat::Logical,
            ('B', 1) => ColumnFormat::Byte,
            ('I', 1) => ColumnFormat::Int16,
            ('J', 1) => ColumnFormat::Int32,
            ('K', 1) => ColumnFormat::Int64,
            ('E', 1) => ColumnFormat::Float32,
            ('D', 1) => ColumnFormat::Float64,
            _ => return Err(unsupported()),
        };
        Ok(format)
    }

    /// Decode one value of this format from the head of `input`.
    pub(crate) fn decode<'a>(&self, input: &'a [u8]) -> IResult<&'a [u8], FitsValue> {
        match self {
            ColumnFormat::Logical => {
                let (rest, b) = be_u8(input)?;
                Ok((rest, FitsValue::Logical(b == b'T')))
            }
            ColumnFormat::Byte => {
                let (rest, b) = be_u8(input)?;
                Ok((rest, FitsValue::Int(b as i64)))
            }
            ColumnFormat::Int16 => {
                let (rest, v) = be_i16(input)?;
                Ok((rest, FitsValue::Int(v as i64)))
            }
            ColumnFormat::Int32 => {
                let (rest, v) = be_i32(input)?;
                Ok((rest, FitsValue::Int(v as i64)))
            }
            ColumnFormat::Int64 => {
                let (rest, v) = be_i64(input)?;
                Ok((rest, FitsValue::Int(v)))
            }
            ColumnFormat::Float32 => {
                let (rest, v) = be_f32(input)?;
                Ok((rest, FitsValue::Float(v as f64)))
            }
            ColumnFormat::Float64 => {
                let (rest, v) = be_f64(input)?;
                Ok((rest, FitsValue::Float(v)))
            }
            ColumnFormat::Text(w) => {
                let (rest, bytes) = nom::bytes::complete::take(*w)(input)?;
                let text = String::from_utf8_lossy(bytes)
                    .trim_end_matches([' ', '\0'])
                    .to_string();
                Ok((rest, FitsValue::Text(text)))
            }
        }
    }

    /// Append the big-endian encoding of `value` to `out`.
    ///
    /// Return
    /// ----------
    /// * `false` if `value` cannot be stored in this format (wrong kind, out of range,
    ///   text wider than the column).
    pub(crate) fn encode(&self, value: &FitsValue, out: &mut Vec<u8>) -> bool {
        match (self, value) {
            (ColumnFormat::Logical, FitsValue::Logical(b)) => {
                out.push(if *b { b'T' } else { b'F' });
            }
            (ColumnFormat::Byte, FitsValue::Int(i)) => match u8::try_from(*i) {
                Ok(v) => out.push(v),
                Err(_) => return false,
            },
            (ColumnFormat::Int16, FitsValue::Int(i)) => match i16::try_from(*i) {
                Ok(v) => out.extend_from_slice(&v.to_be_bytes()),
                Err(_) => return false,
            },
            (ColumnFormat::Int32, FitsValue::Int(i)) => match i32::try_from(*i) {
                Ok(v) => out.extend_from_slice(&v.to_be_bytes()),
                Err(_) => return false,
            },
            (ColumnFormat::Int64, FitsValue::Int(i)) => out.extend_from_slice(&i.to_be_bytes()),
            (ColumnFormat::Float32, FitsValue::Float(f)) => {
                out.extend_from_slice(&(*f as f32).to_be_bytes())
            }
            (ColumnFormat::Float32, FitsValue::Int(i)) => {
                out.extend_from_slice(&(*i as f32).to_be_bytes())
            }
            (ColumnFormat::Float64, FitsValue::Float(f)) => out.extend_from_slice(&f.to_be_bytes()),
            (ColumnFormat::Float64, FitsValue::Int(i)) => {
                out.extend_from_slice(&(*i as f64).to_be_bytes())
            }
            (ColumnFormat::Text(w), FitsValue::Text(s)) => {
                if s.len() > *w {
                    return false;
                }
                out.extend_from_slice(s.as_bytes());
                out.extend(std::iter::repeat(b' ').take(w - s.len()));
            }
            _ => return false,
        }
        true
    }
}

/// Name and storage format of one binary-table column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub format: ColumnFormat,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, format: ColumnFormat) -> Self {
        ColumnDescriptor {
            name: name.into(),
            format,
        }
    }
}

/// Decode `n_rows` fixed-width rows from `data`.
pub(crate) fn decode_rows(
    columns: &[ColumnDescriptor],
    row_width: usize,
    n_rows: usize,
    data: &[u8],
) -> Result<Vec<Vec<FitsValue>>, FitsError> {
    let needed = row_width
        .checked_mul(n_rows)
        .ok_or(FitsError::Truncated {
            needed: usize::MAX,
            available: data.len(),
        })?;
    if data.len() < needed {
        return Err(FitsError::Truncated {
            needed,
            available: data.len(),
        });
    }

    if row_width == 0 {
        return Ok(vec![Vec::new(); n_rows]);
    }

    let mut rows = Vec::with_capacity(n_rows);
    for raw_row in data[..needed].chunks_exact(row_width) {
        let mut rest = raw_row;
        let mut row = Vec::with_capacity(columns.len());
        for column in columns {
            let (r, value) = column.format.decode(rest).map_err(|_| FitsError::Truncated {
                needed: row_width,
                available: raw_row.len(),
            })?;
            rest = r;
            row.push(value);
        }
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod bintable_test {
    use super::*;

    #[test]
    fn test_parse_tform() {
        assert_eq!(ColumnFormat::parse("D").unwrap(), ColumnFormat::Float64);
        assert_eq!(ColumnFormat::parse("1J").unwrap(), ColumnFormat::Int32);
        assert_eq!(ColumnFormat::parse("12A").unwrap(), ColumnFormat::Text(12));
        assert_eq!(ColumnFormat::parse(" E ").unwrap(), ColumnFormat::Float32);
        assert_eq!(
            ColumnFormat::parse("3E"),
            Err(FitsError::UnsupportedFormat("3E".into()))
        );
        assert!(ColumnFormat::parse("1PE(20)").is_err());
        assert!(ColumnFormat::parse("Q").is_err());
    }

    #[test]
    fn test_encode_decode_row() {
        let columns = vec![
            ColumnDescriptor::new("A", ColumnFormat::Int32),
            ColumnDescriptor::new("B", ColumnFormat::Text(4)),
            ColumnDescriptor::new("C", ColumnFormat::Float64),
            ColumnDescriptor::new("D", ColumnFormat::Logical),
        ];
        let row = vec![
            FitsValue::Int(-3),
            FitsValue::Text("z".into()),
            FitsValue::Float(59000.25),
            FitsValue::Logical(true),
        ];

        let mut bytes = Vec::new();
        for (c, v) in columns.iter().zip(&row) {
            assert!(c.format.encode(v, &mut bytes));
        }
        assert_eq!(bytes.len(), 17);

        let rows = decode_rows(&columns, 17, 1, &bytes).unwrap();
        assert_eq!(rows, vec![row]);
    }

    #[test]
    fn test_decode_rows_rejects_oversized_layout() {
        let columns = vec![ColumnDescriptor::new("A", ColumnFormat::Float64)];
        assert_eq!(
            decode_rows(&columns, 8, usize::MAX / 4, &[0; 16]),
            Err(FitsError::Truncated {
                needed: usize::MAX,
                available: 16
            })
        );
        assert_eq!(
            decode_rows(&columns, 8, 3, &[0; 16]),
            Err(FitsError::Truncated {
                needed: 24,
                available: 16
            })
        );
    }

    #[test]
    fn test_encode_rejects_out_of_range() {
        let mut out = Vec::new();
        assert!(!ColumnFormat::Int16.encode(&FitsValue::Int(70_000), &mut out));
        assert!(!ColumnFormat::Text(2).encode(&FitsValue::Text("abc".into()), &mut out));
        assert!(!ColumnFormat::Int32.encode(&FitsValue::Float(1.0), &mut out));
        assert!(out.is_empty());
    }
}
