//! Saving and restoring processor instances.
//!
//! [`Session::save`] collects every active instance's `save_data` tag into
//! a [`SaveFile`], keyed by the type's full name so the file survives a
//! change in registration order. [`Session::restore`] places each saved
//! instance again and hands it its tag through `load_data`.
//!
//! # Binary layout
//!
//! All integers are little-endian. Strings and byte arrays carry a `u32`
//! length prefix.
//!
//! ```text
//! magic    [u8; 4]   b"TWRK"
//! version  u8
//! count    u32
//! entries  count x { type_name: str, x: i16, y: i16, tag }
//! tag      u32 count, then count x { key: str, kind: u8, value }
//! ```

use std::fmt;
use std::io::{self, Read, Write};

use log::{info, warn};
use tilework_core::{TagStore, TagValue, TilePos, TileQuery};
use tilework_slots::Placement;

use crate::session::Session;

/// Magic bytes at the start of every save file.
pub const MAGIC: [u8; 4] = *b"TWRK";

/// Current save file version.
pub const FORMAT_VERSION: u8 = 1;

/// Nesting limit for lists and compounds.
const MAX_TAG_DEPTH: usize = 64;

// ── Errors ──────────────────────────────────────────────────────

/// Errors reading or writing a save file.
#[derive(Debug)]
pub enum PersistError {
    /// The underlying reader or writer failed.
    Io(io::Error),
    /// The data does not start with `b"TWRK"`.
    InvalidMagic,
    /// The format version is not supported by this build.
    UnsupportedVersion {
        /// The version found in the file.
        found: u8,
    },
    /// The data could not be decoded.
    Malformed {
        /// What went wrong.
        detail: String,
    },
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidMagic => write!(f, "invalid magic bytes (expected b\"TWRK\")"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported save format version {found}")
            }
            Self::Malformed { detail } => write!(f, "malformed save file: {detail}"),
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PersistError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

fn malformed(detail: impl Into<String>) -> PersistError {
    PersistError::Malformed {
        detail: detail.into(),
    }
}

// ── Save file ───────────────────────────────────────────────────

/// One saved instance.
#[derive(Clone, Debug, PartialEq)]
pub struct SavedProcessor {
    /// The type's full name, `"mod:Name"`.
    pub type_name: String,
    /// Origin tile.
    pub position: TilePos,
    /// Output of `save_data`.
    pub tag: TagStore,
}

/// Every saved instance of a world, in slot order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SaveFile {
    /// Saved instances.
    pub entries: Vec<SavedProcessor>,
}

impl SaveFile {
    /// Encode to `w`.
    pub fn write_to(&self, w: &mut dyn Write) -> Result<(), PersistError> {
        w.write_all(&MAGIC)?;
        write_u8(w, FORMAT_VERSION)?;
        write_len(w, self.entries.len())?;
        for e in &self.entries {
            write_str(w, &e.type_name)?;
            write_i16(w, e.position.x)?;
            write_i16(w, e.position.y)?;
            write_tag(w, &e.tag)?;
        }
        Ok(())
    }

    /// Decode from `r`.
    pub fn read_from(r: &mut dyn Read) -> Result<Self, PersistError> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(PersistError::InvalidMagic);
        }
        let version = read_u8(r)?;
        if version != FORMAT_VERSION {
            return Err(PersistError::UnsupportedVersion { found: version });
        }
        let count = read_u32(r)?;
        let mut entries = Vec::new();
        for _ in 0..count {
            let type_name = read_str(r)?;
            let x = read_i16(r)?;
            let y = read_i16(r)?;
            let tag = read_tag(r, 0)?;
            entries.push(SavedProcessor {
                type_name,
                position: TilePos::new(x, y),
                tag,
            });
        }
        Ok(Self { entries })
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut buf);
        buf
    }
}

// ── Primitives ──────────────────────────────────────────────────

fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), PersistError> {
    w.write_all(&[v])?;
    Ok(())
}

fn write_i16(w: &mut dyn Write, v: i16) -> Result<(), PersistError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_len(w: &mut dyn Write, len: usize) -> Result<(), PersistError> {
    let len = u32::try_from(len).map_err(|_| malformed(format!("length {len} exceeds u32")))?;
    w.write_all(&len.to_le_bytes())?;
    Ok(())
}

fn write_str(w: &mut dyn Write, s: &str) -> Result<(), PersistError> {
    write_bytes(w, s.as_bytes())
}

fn write_bytes(w: &mut dyn Write, b: &[u8]) -> Result<(), PersistError> {
    write_len(w, b.len())?;
    w.write_all(b)?;
    Ok(())
}

fn read_array<const N: usize>(r: &mut dyn Read) -> Result<[u8; N], PersistError> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_u8(r: &mut dyn Read) -> Result<u8, PersistError> {
    Ok(read_array::<1>(r)?[0])
}

fn read_i16(r: &mut dyn Read) -> Result<i16, PersistError> {
    Ok(i16::from_le_bytes(read_array(r)?))
}

fn read_u32(r: &mut dyn Read) -> Result<u32, PersistError> {
    Ok(u32::from_le_bytes(read_array(r)?))
}

fn read_bytes(r: &mut dyn Read) -> Result<Vec<u8>, PersistError> {
    let len = read_u32(r)? as u64;
    let mut buf = Vec::new();
    let got = r.take(len).read_to_end(&mut buf)?;
    if (got as u64) < len {
        return Err(malformed(format!("expected {len} bytes, found {got}")));
    }
    Ok(buf)
}

fn read_str(r: &mut dyn Read) -> Result<String, PersistError> {
    String::from_utf8(read_bytes(r)?).map_err(|e| malformed(format!("invalid UTF-8 string: {e}")))
}

// ── Tags ────────────────────────────────────────────────────────

const KIND_BYTE: u8 = 1;
const KIND_BOOL: u8 = 2;
const KIND_INT: u8 = 3;
const KIND_LONG: u8 = 4;
const KIND_FLOAT: u8 = 5;
const KIND_DOUBLE: u8 = 6;
const KIND_STRING: u8 = 7;
const KIND_BYTES: u8 = 8;
const KIND_LIST: u8 = 9;
const KIND_COMPOUND: u8 = 10;

fn write_tag(w: &mut dyn Write, tag: &TagStore) -> Result<(), PersistError> {
    write_len(w, tag.len())?;
    for (key, value) in tag.iter() {
        write_str(w, key)?;
        write_value(w, value)?;
    }
    Ok(())
}

fn write_value(w: &mut dyn Write, value: &TagValue) -> Result<(), PersistError> {
    match value {
        TagValue::Byte(v) => {
            write_u8(w, KIND_BYTE)?;
            write_u8(w, *v)
        }
        TagValue::Bool(v) => {
            write_u8(w, KIND_BOOL)?;
            write_u8(w, u8::from(*v))
        }
        TagValue::Int(v) => {
            write_u8(w, KIND_INT)?;
            w.write_all(&v.to_le_bytes())?;
            Ok(())
        }
        TagValue::Long(v) => {
            write_u8(w, KIND_LONG)?;
            w.write_all(&v.to_le_bytes())?;
            Ok(())
        }
        TagValue::Float(v) => {
            write_u8(w, KIND_FLOAT)?;
            w.write_all(&v.to_le_bytes())?;
            Ok(())
        }
        TagValue::Double(v) => {
            write_u8(w, KIND_DOUBLE)?;
            w.write_all(&v.to_le_bytes())?;
            Ok(())
        }
        TagValue::String(s) => {
            write_u8(w, KIND_STRING)?;
            write_str(w, s)
        }
        TagValue::Bytes(b) => {
            write_u8(w, KIND_BYTES)?;
            write_bytes(w, b)
        }
        TagValue::List(items) => {
            write_u8(w, KIND_LIST)?;
            write_len(w, items.len())?;
            for item in items {
                write_value(w, item)?;
            }
            Ok(())
        }
        TagValue::Compound(tag) => {
            write_u8(w, KIND_COMPOUND)?;
            write_tag(w, tag)
        }
    }
}

fn read_tag(r: &mut dyn Read, depth: usize) -> Result<TagStore, PersistError> {
    if depth > MAX_TAG_DEPTH {
        return Err(malformed(format!("tag nesting exceeds {MAX_TAG_DEPTH}")));
    }
    let count = read_u32(r)?;
    let mut tag = TagStore::new();
    for _ in 0..count {
        let key = read_str(r)?;
        let value = read_value(r, depth)?;
        tag.set(key, value);
    }
    Ok(tag)
}

fn read_value(r: &mut dyn Read, depth: usize) -> Result<TagValue, PersistError> {
    let kind = read_u8(r)?;
    Ok(match kind {
        KIND_BYTE => TagValue::Byte(read_u8(r)?),
        KIND_BOOL => match read_u8(r)? {
            0 => TagValue::Bool(false),
            1 => TagValue::Bool(true),
            b => return Err(malformed(format!("invalid bool byte {b:#04x}"))),
        },
        KIND_INT => TagValue::Int(i32::from_le_bytes(read_array(r)?)),
        KIND_LONG => TagValue::Long(i64::from_le_bytes(read_array(r)?)),
        KIND_FLOAT => TagValue::Float(f32::from_le_bytes(read_array(r)?)),
        KIND_DOUBLE => TagValue::Double(f64::from_le_bytes(read_array(r)?)),
        KIND_STRING => TagValue::String(read_str(r)?),
        KIND_BYTES => TagValue::Bytes(read_bytes(r)?),
        KIND_LIST => {
            if depth >= MAX_TAG_DEPTH {
                return Err(malformed(format!("tag nesting exceeds {MAX_TAG_DEPTH}")));
            }
            let count = read_u32(r)?;
            let mut items = Vec::new();
            for _ in 0..count {
                items.push(read_value(r, depth + 1)?);
            }
            TagValue::List(items)
        }
        KIND_COMPOUND => TagValue::Compound(read_tag(r, depth + 1)?),
        other => return Err(malformed(format!("unknown tag kind {other}"))),
    })
}

// ── Session save / restore ──────────────────────────────────────

impl Session {
    /// Snapshot every active instance's persistent fields, in slot order.
    pub fn save(&self) -> SaveFile {
        let entries = self
            .table
            .iter_active()
            .filter_map(|s| {
                let entry = self.registry.entry(s.state.type_id).ok()?;
                Some(SavedProcessor {
                    type_name: entry.full_name(),
                    position: s.state.position,
                    tag: s.save(),
                })
            })
            .collect();
        SaveFile { entries }
    }

    /// Place every saved instance and feed it its tag.
    ///
    /// Entries naming an unknown type, or whose placement fails, are
    /// skipped with a warning. An instance whose `load_data` fails keeps
    /// its default fields. Returns the number of instances placed; a
    /// non-authoritative peer restores nothing.
    pub fn restore(&mut self, tiles: &dyn TileQuery, save: &SaveFile) -> usize {
        if !self.owns_membership("restore") {
            return 0;
        }
        let env = self.env(tiles);
        let mut restored = 0;
        for saved in &save.entries {
            let type_id = match self.registry.by_name(&saved.type_name) {
                Ok(entry) => entry.id(),
                Err(e) => {
                    warn!("skipped saved instance at {}: {e}", saved.position);
                    continue;
                }
            };
            let slot = match self.table.place(
                &self.registry,
                type_id,
                saved.position,
                None,
                env,
                &mut self.hooks,
            ) {
                Ok(Placement::Created(slot)) => slot,
                Ok(Placement::Existing(slot)) => {
                    warn!(
                        "saved {} at {} already present in slot {slot}",
                        saved.type_name, saved.position
                    );
                    continue;
                }
                Err(e) => {
                    warn!("could not restore {} at {}: {e}", saved.type_name, saved.position);
                    continue;
                }
            };
            if let Some(s) = self.table.get_mut(slot) {
                if let Err(e) = s.behavior.load_data(&mut s.state, &saved.tag) {
                    warn!("{} at {} kept defaults: {e}", saved.type_name, saved.position);
                }
            }
            if self.config.authority.replicates() {
                self.emit_clone(slot);
            }
            restored += 1;
        }
        info!(
            "restored {restored} of {} saved instances",
            save.entries.len()
        );
        restored
    }
}
