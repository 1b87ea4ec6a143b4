//! Registry.pol (PReg) codec
//!
//! A Registry.pol file is the `PReg` signature, a little-endian `u32`
//! version, then a sequence of records:
//!
//! ```text
//! [key;value name;type;size;data]
//! ```
//!
//! Brackets and semicolons are UTF-16LE code units. Key and value name are
//! NUL-terminated UTF-16LE strings, type and size are little-endian `u32`,
//! and `size` bytes of data follow.

/// File signature
pub const PREG_SIGNATURE: &[u8; 4] = b"PReg";
/// Only supported format version
pub const PREG_VERSION: u32 = 1;

const REG_NONE: u32 = 0;
const REG_SZ: u32 = 1;
const REG_EXPAND_SZ: u32 = 2;
const REG_BINARY: u32 = 3;
const REG_DWORD: u32 = 4;
const REG_MULTI_SZ: u32 = 7;
const REG_QWORD: u32 = 11;

/// Failure to decode a Registry.pol document
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Signature or version is wrong
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Document ends inside a record
    #[error("truncated record at offset {0}")]
    Truncated(usize),

    /// A delimiter was expected
    #[error("expected {expected:?} at offset {offset}")]
    UnexpectedToken {
        /// Expected delimiter
        expected: char,
        /// Byte offset in the document
        offset: usize,
    },

    /// Data does not match its declared type
    #[error("invalid {kind} data at offset {offset}: {reason}")]
    InvalidData {
        /// Registry type name
        kind: &'static str,
        /// Byte offset in the document
        offset: usize,
        /// What is wrong
        reason: String,
    },
}

/// Typed data of a registry value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryData {
    /// REG_NONE
    None,
    /// REG_SZ or REG_EXPAND_SZ
    String(String),
    /// REG_MULTI_SZ
    MultiString(Vec<String>),
    /// REG_DWORD
    Dword(u32),
    /// REG_QWORD
    Qword(u64),
    /// REG_BINARY or any unknown type
    Binary(u32, Vec<u8>),
}

impl RegistryData {
    /// Render the data as an entry value
    pub fn render(&self) -> String {
        match self {
            RegistryData::None => String::new(),
            RegistryData::String(s) => s.clone(),
            RegistryData::MultiString(lines) => lines.join("\n"),
            RegistryData::Dword(v) => v.to_string(),
            RegistryData::Qword(v) => v.to_string(),
            RegistryData::Binary(_, bytes) => bytes.iter().map(|b| format!("{b:02x}")).collect(),
        }
    }

    fn reg_type(&self) -> u32 {
        match self {
            RegistryData::None => REG_NONE,
            RegistryData::String(_) => REG_SZ,
            RegistryData::MultiString(_) => REG_MULTI_SZ,
            RegistryData::Dword(_) => REG_DWORD,
            RegistryData::Qword(_) => REG_QWORD,
            RegistryData::Binary(kind, _) => *kind,
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        match self {
            RegistryData::None => Vec::new(),
            RegistryData::String(s) => utf16z(s),
            RegistryData::MultiString(lines) => {
                let mut out: Vec<u8> = lines.iter().flat_map(|l| utf16z(l)).collect();
                out.extend_from_slice(&[0, 0]);
                out
            }
            RegistryData::Dword(v) => v.to_le_bytes().to_vec(),
            RegistryData::Qword(v) => v.to_le_bytes().to_vec(),
            RegistryData::Binary(_, bytes) => bytes.clone(),
        }
    }
}

/// One `[key;value;type;size;data]` record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryRecord {
    /// Backslash-separated registry key
    pub key: String,
    /// Value name
    pub value_name: String,
    /// Typed data
    pub data: RegistryData,
}

impl RegistryRecord {
    /// Create a record
    pub fn new(key: impl Into<String>, value_name: impl Into<String>, data: RegistryData) -> Self {
        Self {
            key: key.into(),
            value_name: value_name.into(),
            data,
        }
    }
}

/// Decode a Registry.pol document
pub fn decode(bytes: &[u8]) -> Result<Vec<RegistryRecord>, RegistryError> {
    if bytes.len() < 8 || &bytes[..4] != PREG_SIGNATURE {
        return Err(RegistryError::InvalidHeader("missing PReg signature".to_string()));
    }
    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != PREG_VERSION {
        return Err(RegistryError::InvalidHeader(format!(
            "unsupported version {version}"
        )));
    }

    let mut reader = Reader { bytes, pos: 8 };
    let mut records = Vec::new();
    while !reader.at_end() {
        records.push(reader.record()?);
    }
    Ok(records)
}

/// Encode records as a Registry.pol document
pub fn encode(records: &[RegistryRecord]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + records.len() * 64);
    out.extend_from_slice(PREG_SIGNATURE);
    out.extend_from_slice(&PREG_VERSION.to_le_bytes());

    for record in records {
        let data = record.data.to_bytes();
        push_char(&mut out, '[');
        out.extend_from_slice(&utf16z(&record.key));
        push_char(&mut out, ';');
        out.extend_from_slice(&utf16z(&record.value_name));
        push_char(&mut out, ';');
        out.extend_from_slice(&record.data.reg_type().to_le_bytes());
        push_char(&mut out, ';');
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        push_char(&mut out, ';');
        out.extend_from_slice(&data);
        push_char(&mut out, ']');
    }
    out
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn record(&mut self) -> Result<RegistryRecord, RegistryError> {
        self.expect('[')?;
        let key = self.string_z()?;
        self.expect(';')?;
        let value_name = self.string_z()?;
        self.expect(';')?;
        let reg_type = self.u32()?;
        self.expect(';')?;
        let size = self.u32()? as usize;
        self.expect(';')?;
        let offset = self.pos;
        let raw = self.take(size)?;
        let data = parse_data(reg_type, raw, offset)?;
        self.expect(']')?;

        Ok(RegistryRecord {
            key,
            value_name,
            data,
        })
    }

    fn take(&mut self, len: usize) -> Result<&[u8], RegistryError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(RegistryError::Truncated(self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u16(&mut self) -> Result<u16, RegistryError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, RegistryError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn expect(&mut self, expected: char) -> Result<(), RegistryError> {
        let offset = self.pos;
        if self.u16()? != expected as u16 {
            return Err(RegistryError::UnexpectedToken { expected, offset });
        }
        Ok(())
    }

    fn string_z(&mut self) -> Result<String, RegistryError> {
        let offset = self.pos;
        let mut units = Vec::new();
        loop {
            match self.u16()? {
                0 => break,
                unit => units.push(unit),
            }
        }
        String::from_utf16(&units).map_err(|e| RegistryError::InvalidData {
            kind: "name",
            offset,
            reason: e.to_string(),
        })
    }
}

fn parse_data(reg_type: u32, raw: &[u8], offset: usize) -> Result<RegistryData, RegistryError> {
    let invalid = |kind: &'static str, reason: String| RegistryError::InvalidData {
        kind,
        offset,
        reason,
    };

    match reg_type {
        REG_NONE => Ok(RegistryData::None),
        REG_SZ | REG_EXPAND_SZ => {
            let units = utf16_units(raw).map_err(|r| invalid("REG_SZ", r))?;
            let end = units.iter().position(|u| *u == 0).unwrap_or(units.len());
            String::from_utf16(&units[..end])
                .map(RegistryData::String)
                .map_err(|e| invalid("REG_SZ", e.to_string()))
        }
        REG_MULTI_SZ => {
            let units = utf16_units(raw).map_err(|r| invalid("REG_MULTI_SZ", r))?;
            let mut lines = Vec::new();
            for chunk in units.split(|u| *u == 0).filter(|c| !c.is_empty()) {
                lines.push(
                    String::from_utf16(chunk).map_err(|e| invalid("REG_MULTI_SZ", e.to_string()))?,
                );
            }
            Ok(RegistryData::MultiString(lines))
        }
        REG_DWORD => {
            let b: [u8; 4] = raw
                .try_into()
                .map_err(|_| invalid("REG_DWORD", format!("{} bytes", raw.len())))?;
            Ok(RegistryData::Dword(u32::from_le_bytes(b)))
        }
        REG_QWORD => {
            let b: [u8; 8] = raw
                .try_into()
                .map_err(|_| invalid("REG_QWORD", format!("{} bytes", raw.len())))?;
            Ok(RegistryData::Qword(u64::from_le_bytes(b)))
        }
        REG_BINARY => Ok(RegistryData::Binary(REG_BINARY, raw.to_vec())),
        other => Ok(RegistryData::Binary(other, raw.to_vec())),
    }
}

fn utf16_units(raw: &[u8]) -> Result<Vec<u16>, String> {
    if raw.len() % 2 != 0 {
        return Err(format!("odd length {}", raw.len()));
    }
    Ok(raw
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

fn utf16z(s: &str) -> Vec<u8> {
    s.encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(u16::to_le_bytes)
        .collect()
}

fn push_char(out: &mut Vec<u8>, c: char) {
    out.extend_from_slice(&(c as u16).to_le_bytes());
}
