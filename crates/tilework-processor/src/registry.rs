//! The processor type registry.
//!
//! Types are registered on a [`RegistryBuilder`] while mods load, then
//! sealed into an immutable [`TypeRegistry`]. The builder/registry split
//! makes "query before registration completes" unrepresentable: only a
//! sealed registry answers lookups.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use log::{debug, info, warn};
use tilework_core::{ProcessorTypeId, RegistryError, TileTypeId};

use crate::processor::TileProcessor;
use crate::state::ProcessorState;

type Factory = fn() -> Box<dyn TileProcessor>;

fn construct<P: TileProcessor + Default>() -> Box<dyn TileProcessor> {
    Box::new(P::default())
}

/// One registered processor type.
pub struct TypeEntry {
    id: ProcessorTypeId,
    name: String,
    mod_name: String,
    target_tile: Option<TileTypeId>,
    factory: Factory,
    prototype: Box<dyn TileProcessor>,
}

impl TypeEntry {
    /// Dense ID assigned at registration.
    pub fn id(&self) -> ProcessorTypeId {
        self.id
    }

    /// Short type name (last path segment of the Rust type).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning mod.
    pub fn mod_name(&self) -> &str {
        &self.mod_name
    }

    /// `"<mod>:<name>"`, used for diagnostics and save keys.
    pub fn full_name(&self) -> String {
        format!("{}:{}", self.mod_name, self.name)
    }

    /// The tile type instances follow, if any.
    pub fn target_tile(&self) -> Option<TileTypeId> {
        self.target_tile
    }

    /// Whether instances of this type may be placed at all.
    pub fn is_placeable(&self) -> bool {
        self.target_tile.is_some_and(|t| !t.is_sentinel())
    }

    /// A new behavior object: the prototype's duplicate, or a default.
    pub fn instantiate(&self) -> Box<dyn TileProcessor> {
        self.prototype
            .duplicate()
            .unwrap_or_else(|| (self.factory)())
    }

    /// The prototype that received `load_static_property`.
    pub fn prototype(&self) -> &dyn TileProcessor {
        self.prototype.as_ref()
    }
}

impl fmt::Debug for TypeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeEntry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("mod_name", &self.mod_name)
            .field("target_tile", &self.target_tile)
            .finish_non_exhaustive()
    }
}

/// Last path segment of a Rust type name, without generic arguments.
fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Collects registrations while mods load.
///
/// # Examples
///
/// ```
/// use tilework_core::TileTypeId;
/// use tilework_processor::{RegistryBuilder, TileProcessor};
///
/// #[derive(Default)]
/// struct Chest;
/// impl TileProcessor for Chest {
///     fn target_tile(&self) -> Option<TileTypeId> { Some(TileTypeId(21)) }
/// }
///
/// let mut builder = RegistryBuilder::new();
/// let id = builder.register::<Chest>("storage").unwrap();
/// let registry = builder.build();
/// assert_eq!(registry.entry(id).unwrap().full_name(), "storage:Chest");
/// assert_eq!(registry.resolve::<Chest>().unwrap().id(), id);
/// ```
#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<TypeEntry>,
    by_rust_type: HashMap<TypeId, ProcessorTypeId>,
}

impl RegistryBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register processor type `P` as owned by `mod_name`.
    ///
    /// IDs are dense and follow registration order.
    pub fn register<P: TileProcessor + Default>(
        &mut self,
        mod_name: &str,
    ) -> Result<ProcessorTypeId, RegistryError> {
        let name = short_type_name(std::any::type_name::<P>()).to_string();
        let full_name = format!("{mod_name}:{name}");
        let rust_type = TypeId::of::<P>();

        if self.by_rust_type.contains_key(&rust_type)
            || self.entries.iter().any(|e| e.full_name() == full_name)
        {
            return Err(RegistryError::DuplicateType { name: full_name });
        }
        let id = u32::try_from(self.entries.len())
            .map(ProcessorTypeId)
            .map_err(|_| RegistryError::TooManyTypes)?;

        let prototype: Box<dyn TileProcessor> = Box::new(P::default());
        let target_tile = prototype.target_tile();
        debug!("registered processor type {full_name} as {id} (target tile {target_tile:?})");

        self.by_rust_type.insert(rust_type, id);
        self.entries.push(TypeEntry {
            id,
            name,
            mod_name: mod_name.to_string(),
            target_tile,
            factory: construct::<P>,
            prototype,
        });
        Ok(id)
    }

    /// Number of types registered so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Seal the registry and run each type's `load`, then
    /// `load_static_property`.
    pub fn build(mut self) -> TypeRegistry {
        let mut by_tile: IndexMap<TileTypeId, ProcessorTypeId> = IndexMap::new();
        let mut by_name: HashMap<String, ProcessorTypeId> = HashMap::new();

        for entry in &mut self.entries {
            entry.prototype.load();
            entry.prototype.load_static_property();
            by_name.insert(entry.full_name(), entry.id);

            if !entry.is_placeable() {
                continue;
            }
            if let Some(tile) = entry.target_tile {
                if let Some(first) = by_tile.get(&tile) {
                    warn!(
                        "processor type {} also targets tile {tile}; type {first} keeps it",
                        entry.full_name()
                    );
                } else {
                    by_tile.insert(tile, entry.id);
                }
            }
        }

        let registry = TypeRegistry {
            entries: self.entries,
            by_rust_type: self.by_rust_type,
            by_name,
            by_tile,
        };
        info!(
            "processor registry sealed: {} types, fingerprint {:#018x}",
            registry.len(),
            registry.fingerprint()
        );
        registry
    }
}

/// The sealed, read-only type registry.
pub struct TypeRegistry {
    entries: Vec<TypeEntry>,
    by_rust_type: HashMap<TypeId, ProcessorTypeId>,
    by_name: HashMap<String, ProcessorTypeId>,
    by_tile: IndexMap<TileTypeId, ProcessorTypeId>,
}

impl TypeRegistry {
    /// The entry registered for Rust type `P`.
    pub fn resolve<P: TileProcessor>(&self) -> Result<&TypeEntry, RegistryError> {
        self.by_rust_type
            .get(&TypeId::of::<P>())
            .map(|id| &self.entries[id.0 as usize])
            .ok_or_else(|| RegistryError::UnknownType {
                name: std::any::type_name::<P>().to_string(),
            })
    }

    /// The entry with ID `id`.
    pub fn entry(&self, id: ProcessorTypeId) -> Result<&TypeEntry, RegistryError> {
        self.entries
            .get(id.0 as usize)
            .ok_or(RegistryError::UnknownTypeId { id })
    }

    /// The entry with full name `"<mod>:<name>"`.
    pub fn by_name(&self, full_name: &str) -> Result<&TypeEntry, RegistryError> {
        self.by_name
            .get(full_name)
            .map(|id| &self.entries[id.0 as usize])
            .ok_or_else(|| RegistryError::UnknownName {
                name: full_name.to_string(),
            })
    }

    /// The placeable type that follows `tile`, if any.
    pub fn for_tile(&self, tile: TileTypeId) -> Option<&TypeEntry> {
        self.by_tile
            .get(&tile)
            .map(|id| &self.entries[id.0 as usize])
    }

    /// A new behavior object for type `id`.
    pub fn instantiate(&self, id: ProcessorTypeId) -> Result<Box<dyn TileProcessor>, RegistryError> {
        Ok(self.entry(id)?.instantiate())
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no types are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ID order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeEntry> {
        self.entries.iter()
    }

    /// `"<full name> / <id> / <slot>"` for diagnostics.
    pub fn describe(&self, state: &ProcessorState) -> String {
        match self.entry(state.type_id) {
            Ok(e) => format!("{} / {} / {}", e.full_name(), state.type_id, state.slot),
            Err(_) => format!("<unknown> / {} / {}", state.type_id, state.slot),
        }
    }

    /// FNV-1a hash over the full names in ID order.
    ///
    /// Two peers with equal fingerprints assign the same IDs to the same
    /// types.
    pub fn fingerprint(&self) -> u64 {
        const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0100_0000_01b3;
        let mut hash = OFFSET;
        for entry in &self.entries {
            for byte in entry.full_name().bytes().chain(std::iter::once(0)) {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(PRIME);
            }
        }
        hash
    }
}

impl Drop for TypeRegistry {
    fn drop(&mut self) {
        for entry in &mut self.entries {
            entry.prototype.unload();
        }
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}
