//! Stata `.dta` reader.
//!
//! Supports the legacy binary layout (releases 113, 114, 115) and the tagged
//! layout (releases 117, 118, 119), in either byte order. Only what a table
//! needs is decoded: variable names, types and the data block, plus the
//! `strL` pool for long strings. Value labels, formats and characteristics
//! are skipped.
//!
//! Stata missing-value codes (`.`, `.a` ... `.z`) decode to
//! [`CellValue::Missing`]. Strings are Latin-1 before release 118 and UTF-8
//! from 118 on.

use std::collections::HashMap;

use super::{CellValue, RawTable};

const TAGGED_MAGIC: &[u8] = b"<stata_dta>";

const BYTE_MAX: i8 = 100;
const INT_MAX: i16 = 32_740;
const LONG_MAX: i32 = 2_147_483_620;
const FLOAT_MAX_BITS: u32 = 0x7eff_ffff;
const DOUBLE_MAX_BITS: u64 = 0x7fdf_ffff_ffff_ffff;

/// Decoding faults in a `.dta` file.
#[derive(Debug, thiserror::Error)]
pub enum DtaError {
    #[error("truncated: needed {needed} byte(s) at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("section offset {0} lies outside the file")]
    BadOffset(u64),

    #[error("unsupported release {0}")]
    UnsupportedRelease(u16),

    #[error("invalid byte order marker {0:?}")]
    InvalidByteOrder(String),

    #[error("expected <{tag}> at offset {offset}")]
    MissingTag { tag: String, offset: usize },

    #[error("unknown type code {code} for variable {index}")]
    UnknownType { code: u16, index: usize },

    #[error("{nobs} row(s) of {row_width} byte(s) declared; {available} byte(s) remain")]
    RowCountExceedsData {
        nobs: u64,
        row_width: usize,
        available: usize,
    },
}

type Result<T> = std::result::Result<T, DtaError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Big,
    Little,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VarType {
    Str(usize),
    StrL,
    Byte,
    Int,
    Long,
    Float,
    Double,
}

impl VarType {
    fn from_legacy(code: u8, index: usize) -> Result<Self> {
        match code {
            1..=244 => Ok(Self::Str(code as usize)),
            251 => Ok(Self::Byte),
            252 => Ok(Self::Int),
            253 => Ok(Self::Long),
            254 => Ok(Self::Float),
            255 => Ok(Self::Double),
            _ => Err(DtaError::UnknownType {
                code: code as u16,
                index,
            }),
        }
    }

    fn from_tagged(code: u16, index: usize) -> Result<Self> {
        match code {
            1..=2045 => Ok(Self::Str(code as usize)),
            32768 => Ok(Self::StrL),
            65526 => Ok(Self::Double),
            65527 => Ok(Self::Float),
            65528 => Ok(Self::Long),
            65529 => Ok(Self::Int),
            65530 => Ok(Self::Byte),
            _ => Err(DtaError::UnknownType { code, index }),
        }
    }

    /// Bytes one value of this type occupies in the data block.
    fn width(self) -> usize {
        match self {
            Self::Str(width) => width,
            Self::StrL | Self::Double => 8,
            Self::Long | Self::Float => 4,
            Self::Int => 2,
            Self::Byte => 1,
        }
    }
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    order: ByteOrder,
}

macro_rules! read_number {
    ($name:ident, $ty:ty, $width:literal) => {
        fn $name(&mut self) -> Result<$ty> {
            let raw = self.array::<$width>()?;
            Ok(match self.order {
                ByteOrder::Big => <$ty>::from_be_bytes(raw),
                ByteOrder::Little => <$ty>::from_le_bytes(raw),
            })
        }
    };
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            order: ByteOrder::Little,
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(DtaError::Truncated {
                offset: self.pos,
                needed: n,
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        self.pos = usize::try_from(offset)
            .ok()
            .filter(|&p| p <= self.bytes.len())
            .ok_or(DtaError::BadOffset(offset))?;
        Ok(())
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    read_number!(u16, u16, 2);
    read_number!(u32, u32, 4);
    read_number!(u64, u64, 8);
    read_number!(i16, i16, 2);
    read_number!(i32, i32, 4);
    read_number!(f32, f32, 4);
    read_number!(f64, f64, 8);

    /// Unsigned integer stored in `raw.len()` bytes (at most 8).
    fn uint_of(&self, raw: &[u8]) -> u64 {
        let fold = |acc: u64, b: &u8| (acc << 8) | u64::from(*b);
        match self.order {
            ByteOrder::Big => raw.iter().fold(0, fold),
            ByteOrder::Little => raw.iter().rev().fold(0, fold),
        }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn peek(&self, tag: &[u8]) -> bool {
        self.bytes[self.pos..].starts_with(tag)
    }

    fn expect_tag(&mut self, tag: &str) -> Result<()> {
        let offset = self.pos;
        let wanted = format!("<{tag}>");
        if self.take(wanted.len()).ok() != Some(wanted.as_bytes()) {
            return Err(DtaError::MissingTag {
                tag: tag.to_string(),
                offset,
            });
        }
        Ok(())
    }
}

/// Per-file decoding parameters.
struct Layout {
    release: u16,
    names: Vec<String>,
    types: Vec<VarType>,
    nobs: u64,
}

impl Layout {
    /// Reject a header whose observation count cannot fit in what is left of
    /// the file. A zero-width row with observations is rejected outright.
    fn check_row_count(&self, available: usize) -> Result<()> {
        let row_width: usize = self.types.iter().map(|t| t.width()).sum();
        if self.nobs == 0 {
            return Ok(());
        }
        let fits = row_width > 0
            && usize::try_from(self.nobs)
                .ok()
                .and_then(|n| n.checked_mul(row_width))
                .is_some_and(|needed| needed <= available);
        if fits {
            Ok(())
        } else {
            Err(DtaError::RowCountExceedsData {
                nobs: self.nobs,
                row_width,
                available,
            })
        }
    }

    fn decode_text(&self, raw: &[u8]) -> String {
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        let raw = &raw[..end];
        if self.release >= 118 {
            String::from_utf8_lossy(raw).into_owned()
        } else {
            raw.iter().map(|&b| b as char).collect()
        }
    }
}

/// Decode a `.dta` file into a raw table.
pub fn read_dta(bytes: &[u8]) -> Result<RawTable> {
    if bytes.starts_with(TAGGED_MAGIC) {
        read_tagged(bytes)
    } else {
        read_legacy(bytes)
    }
}

fn read_legacy(bytes: &[u8]) -> Result<RawTable> {
    let mut r = ByteReader::new(bytes);
    let release = u16::from(r.u8()?);
    if !(113..=115).contains(&release) {
        return Err(DtaError::UnsupportedRelease(release));
    }
    r.order = match r.u8()? {
        1 => ByteOrder::Big,
        2 => ByteOrder::Little,
        other => return Err(DtaError::InvalidByteOrder(other.to_string())),
    };
    r.skip(2)?; // filetype, unused
    let nvar = r.u16()? as usize;
    let nobs = u64::from(r.u32()?);
    r.skip(81 + 18)?; // data label, timestamp

    let types = (0..nvar)
        .map(|i| r.u8().and_then(|code| VarType::from_legacy(code, i)))
        .collect::<Result<Vec<_>>>()?;

    let mut layout = Layout {
        release,
        names: Vec::with_capacity(nvar),
        types,
        nobs,
    };
    for _ in 0..nvar {
        let name = layout.decode_text(r.take(33)?);
        layout.names.push(name);
    }

    let fmt_width = if release == 113 { 12 } else { 49 };
    r.skip((nvar + 1) * 2)?; // sort order
    r.skip(nvar * fmt_width)?; // display formats
    r.skip(nvar * 33)?; // value label names
    r.skip(nvar * 81)?; // variable labels

    loop {
        let kind = r.u8()?;
        let len = r.u32()? as usize;
        if kind == 0 && len == 0 {
            break;
        }
        r.skip(len)?;
    }

    read_data(&mut r, &layout, &HashMap::new())
}

fn read_tagged(bytes: &[u8]) -> Result<RawTable> {
    let mut r = ByteReader::new(bytes);
    r.expect_tag("stata_dta")?;
    r.expect_tag("header")?;
    r.expect_tag("release")?;
    let raw_release = r.take(3)?;
    let release = std::str::from_utf8(raw_release)
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(0);
    if !(117..=119).contains(&release) {
        return Err(DtaError::UnsupportedRelease(release));
    }
    r.expect_tag("/release")?;

    r.expect_tag("byteorder")?;
    r.order = match r.take(3)? {
        b"MSF" => ByteOrder::Big,
        b"LSF" => ByteOrder::Little,
        other => {
            return Err(DtaError::InvalidByteOrder(
                String::from_utf8_lossy(other).into_owned(),
            ))
        }
    };
    r.expect_tag("/byteorder")?;

    r.expect_tag("K")?;
    let nvar = if release == 119 {
        r.u32()? as usize
    } else {
        r.u16()? as usize
    };
    r.expect_tag("/K")?;

    r.expect_tag("N")?;
    let nobs = if release == 117 {
        u64::from(r.u32()?)
    } else {
        r.u64()?
    };
    r.expect_tag("/N")?;

    r.expect_tag("label")?;
    let label_len = if release == 117 {
        r.u8()? as usize
    } else {
        r.u16()? as usize
    };
    r.skip(label_len)?;
    r.expect_tag("/label")?;

    r.expect_tag("timestamp")?;
    let stamp_len = r.u8()? as usize;
    r.skip(stamp_len)?;
    r.expect_tag("/timestamp")?;
    r.expect_tag("/header")?;

    r.expect_tag("map")?;
    let mut map = [0u64; 14];
    for slot in map.iter_mut() {
        *slot = r.u64()?;
    }

    r.seek(map[2])?;
    r.expect_tag("variable_types")?;
    let types = (0..nvar)
        .map(|i| r.u16().and_then(|code| VarType::from_tagged(code, i)))
        .collect::<Result<Vec<_>>>()?;

    let mut layout = Layout {
        release,
        names: Vec::with_capacity(nvar),
        types,
        nobs,
    };

    r.seek(map[3])?;
    r.expect_tag("varnames")?;
    let name_width = if release == 117 { 33 } else { 129 };
    for _ in 0..nvar {
        let name = layout.decode_text(r.take(name_width)?);
        layout.names.push(name);
    }

    let strls = if layout.types.contains(&VarType::StrL) {
        r.seek(map[10])?;
        read_strls(&mut r, &layout)?
    } else {
        HashMap::new()
    };

    r.seek(map[9])?;
    r.expect_tag("data")?;
    read_data(&mut r, &layout, &strls)
}

/// Parse the `<strls>` pool into `(v, o) -> text`.
fn read_strls(r: &mut ByteReader<'_>, layout: &Layout) -> Result<HashMap<(u64, u64), String>> {
    r.expect_tag("strls")?;
    let mut pool = HashMap::new();
    while r.peek(b"GSO") {
        r.skip(3)?;
        let v = u64::from(r.u32()?);
        let o = if layout.release == 117 {
            u64::from(r.u32()?)
        } else {
            r.u64()?
        };
        let kind = r.u8()?;
        let len = r.u32()? as usize;
        let data = r.take(len)?;
        // 130 = ASCII/UTF-8 with trailing NUL, 129 = binary
        let text = if kind == 130 {
            layout.decode_text(data)
        } else {
            String::from_utf8_lossy(data).into_owned()
        };
        pool.insert((v, o), text);
    }
    r.expect_tag("/strls")?;
    Ok(pool)
}

fn read_strl_ref(r: &mut ByteReader<'_>, release: u16) -> Result<(u64, u64)> {
    if release == 117 {
        return Ok((u64::from(r.u32()?), u64::from(r.u32()?)));
    }
    let raw = r.array::<8>()?;
    let v_len = if release == 119 { 3 } else { 2 };
    let (v, o) = raw.split_at(v_len);
    Ok((r.uint_of(v), r.uint_of(o)))
}

fn read_data(
    r: &mut ByteReader<'_>,
    layout: &Layout,
    strls: &HashMap<(u64, u64), String>,
) -> Result<RawTable> {
    layout.check_row_count(r.remaining())?;
    let mut table = RawTable::new(layout.names.clone());
    for _ in 0..layout.nobs {
        let mut row = Vec::with_capacity(layout.types.len());
        for ty in &layout.types {
            row.push(read_cell(r, *ty, layout, strls)?);
        }
        table.push_row(row);
    }
    Ok(table)
}

fn read_cell(
    r: &mut ByteReader<'_>,
    ty: VarType,
    layout: &Layout,
    strls: &HashMap<(u64, u64), String>,
) -> Result<CellValue> {
    let cell = match ty {
        VarType::Str(width) => text_cell(layout.decode_text(r.take(width)?)),
        VarType::StrL => match read_strl_ref(r, layout.release)? {
            (0, 0) => CellValue::Missing,
            key => strls
                .get(&key)
                .cloned()
                .map(text_cell)
                .unwrap_or(CellValue::Missing),
        },
        VarType::Byte => {
            let v = r.u8()? as i8;
            number_unless(f64::from(v), v > BYTE_MAX)
        }
        VarType::Int => {
            let v = r.i16()?;
            number_unless(f64::from(v), v > INT_MAX)
        }
        VarType::Long => {
            let v = r.i32()?;
            number_unless(f64::from(v), v > LONG_MAX)
        }
        VarType::Float => {
            let v = r.f32()?;
            number_unless(
                f64::from(v),
                v.is_nan() || v > f32::from_bits(FLOAT_MAX_BITS),
            )
        }
        VarType::Double => {
            let v = r.f64()?;
            number_unless(v, v.is_nan() || v > f64::from_bits(DOUBLE_MAX_BITS))
        }
    };
    Ok(cell)
}

fn number_unless(value: f64, missing: bool) -> CellValue {
    if missing {
        CellValue::Missing
    } else {
        CellValue::Number(value)
    }
}

fn text_cell(text: String) -> CellValue {
    if text.trim().is_empty() {
        CellValue::Missing
    } else {
        CellValue::Text(text)
    }
}
