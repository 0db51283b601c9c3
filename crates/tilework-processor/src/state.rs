//! Per-instance state shared by every processor type.
//!
//! [`ProcessorState`] holds the fields the slot table manipulates:
//! identity, placement, lifecycle flags, and draw bookkeeping. The
//! type-specific half of an instance lives in its
//! [`TileProcessor`](crate::TileProcessor) behavior object.

use std::fmt;

use tilework_core::{
    PacketReader, PacketWriter, PixelPos, PixelRect, ProcessorTypeId, SlotId, SourceItem, TilePos,
    WireError, TILE_SIZE,
};

/// Default pixel slack around the viewport for on-screen detection.
pub const DEFAULT_DRAW_EXTEND: i32 = 160;

/// Default idle distance. Non-positive values disable idling.
pub const DEFAULT_IDLE_DISTANCE: i32 = -1;

/// Size in bytes of the clone header written by
/// [`ProcessorState::write_clone_header`].
pub const CLONE_HEADER_LEN: usize = 9;

/// Shared fields of one processor instance.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessorState {
    /// Registered type of the instance. Never changes after creation.
    pub type_id: ProcessorTypeId,
    /// Index in the owning slot table.
    pub slot: SlotId,
    /// Top-left tile of the structure.
    pub position: TilePos,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
    /// Live and eligible for update and draw.
    pub active: bool,
    /// One-time spawn hooks have run.
    pub spawned: bool,
    /// The cursor is over the hit box. Recomputed every draw pass.
    pub hovered: bool,
    /// Within the padded viewport. Recomputed every draw pass.
    pub on_screen: bool,
    /// Include this instance in join-sync snapshots.
    pub send_join_data: bool,
    /// Pixels of slack around the viewport when computing `on_screen`.
    pub draw_extend: i32,
    /// The item that placed the tile, if any.
    pub source_item: Option<SourceItem>,
    /// Skip `update` while the session's focus is farther than this many
    /// pixels from the instance's center. Non-positive disables it.
    pub idle_distance: i32,
    /// A hook failed or panicked; the instance is skipped until killed.
    pub faulted: bool,
}

impl ProcessorState {
    /// Fresh, inactive state for an instance of `type_id` at `slot`.
    pub fn new(type_id: ProcessorTypeId, slot: SlotId) -> Self {
        Self {
            type_id,
            slot,
            position: TilePos::default(),
            width: TILE_SIZE,
            height: TILE_SIZE,
            active: false,
            spawned: false,
            hovered: false,
            on_screen: false,
            send_join_data: true,
            draw_extend: DEFAULT_DRAW_EXTEND,
            source_item: None,
            idle_distance: DEFAULT_IDLE_DISTANCE,
            faulted: false,
        }
    }

    /// Top-left corner in world pixels.
    pub fn world_position(&self) -> PixelPos {
        PixelPos::of_tile(self.position)
    }

    /// Center of the hit box in world pixels.
    pub fn center(&self) -> PixelPos {
        let origin = self.world_position();
        PixelPos::new(
            origin.x + self.width as f32 / 2.0,
            origin.y + self.height as f32 / 2.0,
        )
    }

    /// Whether `focus` is beyond a positive [`idle_distance`](Self::idle_distance)
    /// from the center.
    pub fn is_idle(&self, focus: PixelPos) -> bool {
        if self.idle_distance <= 0 {
            return false;
        }
        let center = self.center();
        let (dx, dy) = (center.x - focus.x, center.y - focus.y);
        let limit = self.idle_distance as f32;
        dx * dx + dy * dy > limit * limit
    }

    /// `(width, height)` in pixels.
    pub fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    /// Size in whole tiles, never less than 1x1.
    pub fn size_in_tiles(&self) -> (i16, i16) {
        let w = (self.width / TILE_SIZE).max(1);
        let h = (self.height / TILE_SIZE).max(1);
        (
            i16::try_from(w).unwrap_or(i16::MAX),
            i16::try_from(h).unwrap_or(i16::MAX),
        )
    }

    /// Pixel rectangle covered by the structure.
    pub fn hit_box(&self) -> PixelRect {
        PixelRect::new(
            i32::from(self.position.x) * TILE_SIZE,
            i32::from(self.position.y) * TILE_SIZE,
            self.width,
            self.height,
        )
    }

    /// Whether `pos` lies on one of the structure's tiles.
    pub fn covers(&self, pos: TilePos) -> bool {
        let (w, h) = self.size_in_tiles();
        let dx = i32::from(pos.x) - i32::from(self.position.x);
        let dy = i32::from(pos.y) - i32::from(self.position.y);
        (0..i32::from(w)).contains(&dx) && (0..i32::from(h)).contains(&dy)
    }

    // ── Clone header ────────────────────────────────────────────

    /// Write the clone header: active (1 byte), slot (u32), position (2 x i16).
    pub fn write_clone_header(&self, w: &mut PacketWriter) {
        w.write_bool(self.active);
        w.write_u32(self.slot.0);
        w.write_tile_pos(self.position);
    }

    /// Read the clone header written by [`write_clone_header`](Self::write_clone_header).
    pub fn read_clone_header(&mut self, r: &mut PacketReader<'_>) -> Result<(), WireError> {
        let header = CloneHeader::read(r)?;
        self.active = header.active;
        self.slot = header.slot;
        self.position = header.position;
        Ok(())
    }
}

impl fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type {} / slot {} @ {}",
            self.type_id, self.slot, self.position
        )
    }
}

/// Decoded clone header, readable without knowing the payload's type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CloneHeader {
    /// Sender's `active` flag.
    pub active: bool,
    /// Sender's slot for the instance.
    pub slot: SlotId,
    /// Sender's position for the instance.
    pub position: TilePos,
}

impl CloneHeader {
    /// Read a header from the reader's current position.
    pub fn read(r: &mut PacketReader<'_>) -> Result<Self, WireError> {
        let active = r.read_bool()?;
        let slot = SlotId(r.read_u32()?);
        let position = r.read_tile_pos()?;
        Ok(Self {
            active,
            slot,
            position,
        })
    }

    /// Read the header at the start of a clone payload without consuming it.
    pub fn peek(payload: &[u8]) -> Result<Self, WireError> {
        Self::read(&mut PacketReader::new(payload))
    }
}
