//! FITS header-unit parsing and formatting.
//!
//! A FITS header is a sequence of 80-byte ASCII *cards* grouped in 2880-byte blocks and
//! terminated by the `END` card. Only *valued* cards (`KEYWORD = value / comment`) are
//! retained; `COMMENT`, `HISTORY` and blank cards are skipped.
//!
//! Value grammar handled here (the subset written by the light-curve simulator):
//!
//! * logical: `T` / `F`
//! * integer: `42`, `-7`
//! * real: `1.5`, `2.0E-3`, `2.0D-3`
//! * character string: `'BINTABLE'` with `''` as an escaped quote, trailing blanks removed
//!
//! # See also
//! ------------
//! * [`super::bintable`] – Decoder for the binary-table data unit that follows this header.
use nom::{
    branch::alt,
    bytes::complete::{take, take_till},
    character::complete::{char, space0},
    combinator::map,
    IResult,
};

use super::FitsError;

/// Size in bytes of a FITS logical record
pub(crate) const BLOCK_SIZE: usize = 2880;

/// Size in bytes of a header card
pub(crate) const CARD_SIZE: usize = 80;

/// Largest `NAXIS` and `TFIELDS` value a FITS header may carry.
pub(crate) const MAX_KEYWORD_INDEX: i64 = 999;

/// Value carried by a header card.
#[derive(Debug, Clone, PartialEq)]
pub enum CardValue {
    Logical(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

/// Parsed header unit, cards kept in file order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Header {
    cards: Vec<(String, CardValue)>,
}

/// Round `len` up to the next multiple of [`BLOCK_SIZE`].
pub(crate) fn padded_len(len: usize) -> usize {
    len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}

fn quoted_string(input: &[u8]) -> IResult<&[u8], String> {
    let (mut rest, _) = char('\'')(input)?;
    let mut out = Vec::new();
    loop {
        let (r, chunk) = take_till(|c| c == b'\'')(rest)?;
        out.extend_from_slice(chunk);
        let (r, _) = char('\'')(r)?;
        // Two consecutive quotes encode a literal quote.
        match char::<&[u8], nom::error::Error<&[u8]>>('\'')(r) {
            Ok((r, _)) => {
                out.push(b'\'');
                rest = r;
            }
            Err(_) => {
                rest = r;
                break;
            }
        }
    }
    Ok((rest, String::from_utf8_lossy(&out).trim_end().to_string()))
}

enum RawValue {
    Quoted(String),
    Bare(String),
}

fn raw_value(input: &[u8]) -> IResult<&[u8], RawValue> {
    let (input, _) = space0(input)?;
    alt((
        map(quoted_string, RawValue::Quoted),
        map(take_till(|c| c == b'/'), |bytes: &[u8]| {
            RawValue::Bare(String::from_utf8_lossy(bytes).trim().to_string())
        }),
    ))(input)
}

fn parse_bare(keyword: &str, token: &str) -> Result<CardValue, FitsError> {
    match token {
        "T" => return Ok(CardValue::Logical(true)),
        "F" => return Ok(CardValue::Logical(false)),
        _ => {}
    }
    if let Ok(i) = token.parse::<i64>() {
        return Ok(CardValue::Integer(i));
    }
    token
        .replace(['D', 'd'], "E")
        .parse::<f64>()
        .map(CardValue::Real)
        .map_err(|_| FitsError::InvalidKeywordValue {
            keyword: keyword.to_string(),
            value: token.to_string(),
        })
}

/// Decode a single 80-byte card. Returns `None` for commentary cards.
fn parse_card(card: &[u8]) -> Result<Option<(String, CardValue)>, FitsError> {
    let keyword = String::from_utf8_lossy(&card[..8]).trim().to_string();
    if &card[8..10] != b"= " {
        return Ok(None);
    }

    let (_, value) = raw_value(&card[10..])
        .map_err(|_| FitsError::InvalidCard(String::from_utf8_lossy(card).to_string()))?;

    let value = match value {
        RawValue::Quoted(s) => CardValue::Text(s),
        RawValue::Bare(token) if token.is_empty() => return Ok(None),
        RawValue::Bare(token) => parse_bare(&keyword, &token)?,
    };
    Ok(Some((keyword, value)))
}

impl Header {
    /// Parse a header unit starting at `input`.
    ///
    /// Arguments
    /// -----------------
    /// * `input`: bytes starting at the first card of a header unit.
    ///
    /// Return
    /// ----------
    /// * The remaining input, positioned at the first byte after the padded header,
    ///   and the parsed [`Header`].
    /// * [`FitsError::Truncated`] if the input ends before an `END` card,
    ///   [`FitsError::InvalidCard`] / [`FitsError::InvalidKeywordValue`] on malformed cards.
    pub fn parse(input: &[u8]) -> Result<(&[u8], Header), FitsError> {
        let mut header = Header::default();
        let mut rest = input;
        let mut n_cards = 0usize;

        loop {
            let (r, card): (&[u8], &[u8]) = take::<usize, &[u8], nom::error::Error<&[u8]>>(
                CARD_SIZE,
            )(rest)
            .map_err(|_| FitsError::Truncated {
                needed: (n_cards + 1) * CARD_SIZE,
                available: input.len(),
            })?;
            rest = r;
            n_cards += 1;

            if card.starts_with(b"END") && card[3..].iter().all(|&b| b == b' ') {
                break;
            }
            if let Some(entry) = parse_card(card)? {
                header.cards.push(entry);
            }
        }

        let header_len = padded_len(n_cards * CARD_SIZE);
        if input.len() < header_len {
            return Err(FitsError::Truncated {
                needed: header_len,
                available: input.len(),
            });
        }
        Ok((&input[header_len..], header))
    }

    /// Append a valued card.
    pub fn push(&mut self, keyword: impl Into<String>, value: CardValue) {
        self.cards.push((keyword.into(), value));
    }

    /// Value of the first card named `keyword`.
    pub fn get(&self, keyword: &str) -> Option<&CardValue> {
        self.cards
            .iter()
            .find(|(k, _)| k == keyword)
            .map(|(_, v)| v)
    }

    pub fn integer(&self, keyword: &str) -> Result<i64, FitsError> {
        match self.get(keyword) {
            Some(CardValue::Integer(i)) => Ok(*i),
            Some(other) => Err(FitsError::InvalidKeywordValue {
                keyword: keyword.to_string(),
                value: format!("{other:?}"),
            }),
            None => Err(FitsError::MissingKeyword(keyword.to_string())),
        }
    }

    pub fn text(&self, keyword: &str) -> Result<&str, FitsError> {
        match self.get(keyword) {
            Some(CardValue::Text(s)) => Ok(s),
            Some(other) => Err(FitsError::InvalidKeywordValue {
                keyword: keyword.to_string(),
                value: format!("{other:?}"),
            }),
            None => Err(FitsError::MissingKeyword(keyword.to_string())),
        }
    }

    fn integer_or(&self, keyword: &str, default: i64) -> Result<i64, FitsError> {
        match self.get(keyword) {
            None => Ok(default),
            Some(_) => self.integer(keyword),
        }
    }

    fn usize_keyword(&self, keyword: &str, value: i64) -> Result<usize, FitsError> {
        usize::try_from(value).map_err(|_| FitsError::InvalidKeywordValue {
            keyword: keyword.to_string(),
            value: value.to_string(),
        })
    }

    /// Size in bytes of the data unit described by this header, without padding.
    ///
    /// `|BITPIX| / 8 × GCOUNT × (PCOUNT + NAXIS1 × … × NAXISn)`, or zero when `NAXIS = 0`.
    ///
    /// A product that does not fit in `usize` is an [`FitsError::InvalidKeywordValue`].
    pub fn data_len(&self) -> Result<usize, FitsError> {
        let naxis = self.integer("NAXIS")?;
        if naxis == 0 {
            return Ok(0);
        }
        if !(0..=MAX_KEYWORD_INDEX).contains(&naxis) {
            return Err(FitsError::InvalidKeywordValue {
                keyword: "NAXIS".into(),
                value: naxis.to_string(),
            });
        }
        let bitpix = self.integer("BITPIX")?;
        let mut n_elements = 1usize;
        for i in 1..=naxis {
            let key = format!("NAXIS{i}");
            let axis = self.integer(&key)?;
            n_elements = n_elements
                .checked_mul(self.usize_keyword(&key, axis)?)
                .ok_or_else(|| overflow(&key, axis))?;
        }
        let pcount_raw = self.integer_or("PCOUNT", 0)?;
        let gcount_raw = self.integer_or("GCOUNT", 1)?;
        let pcount = self.usize_keyword("PCOUNT", pcount_raw)?;
        let gcount = self.usize_keyword("GCOUNT", gcount_raw)?;
        let bytes_per_element = self.usize_keyword("BITPIX", bitpix.abs() / 8)?;
        pcount
            .checked_add(n_elements)
            .ok_or_else(|| overflow("PCOUNT", pcount_raw))?
            .checked_mul(gcount)
            .ok_or_else(|| overflow("GCOUNT", gcount_raw))?
            .checked_mul(bytes_per_element)
            .ok_or_else(|| overflow("BITPIX", bitpix))
    }

    /// Encode the header as padded 2880-byte blocks, `END` card included.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FitsError> {
        let mut out = Vec::with_capacity(BLOCK_SIZE);
        for (keyword, value) in &self.cards {
            out.extend_from_slice(format_card(keyword, value)?.as_bytes());
        }
        out.extend_from_slice(format!("{:<80}", "END").as_bytes());
        out.resize(padded_len(out.len()), b' ');
        Ok(out)
    }
}

fn overflow(keyword: &str, value: i64) -> FitsError {
    FitsError::InvalidKeywordValue {
        keyword: keyword.to_string(),
        value: format!("{value} (data size overflows)"),
    }
}

fn format_card(keyword: &str, value: &CardValue) -> Result<String, FitsError> {
    if keyword.len() > 8 {
        return Err(FitsError::CardTooLong(keyword.to_string()));
    }
    let value = match value {
        CardValue::Logical(b) => format!("{:>20}", if *b { "T" } else { "F" }),
        CardValue::Integer(i) => format!("{i:>20}"),
        CardValue::Real(f) => format!("{:>20}", format!("{f:?}").to_uppercase()),
        CardValue::Text(s) => format!("'{:<8}'", s.replace('\'', "''")),
    };
    let card = format!("{keyword:<8}= {value}");
    if card.len() > CARD_SIZE {
        return Err(FitsError::CardTooLong(keyword.to_string()));
    }
    Ok(format!("{card:<80}"))
}
