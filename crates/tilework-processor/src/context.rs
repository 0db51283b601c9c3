//! Execution contexts passed to processor hooks.
//!
//! [`ProcessorContext`] gives an instance hook its own state, a read-only
//! view of the world, and the peer's [`Authority`]. Hooks ask for network
//! traffic through [`ProcessorContext::request_sync`] and
//! [`ProcessorContext::request_send_data`]; the session emits the
//! messages after the hook returns.

use tilework_core::{Authority, ProcessorTypeId, TickId, TileInfo, TileQuery};

use crate::state::ProcessorState;

/// Everything a hook may observe about the surrounding session.
#[derive(Clone, Copy)]
pub struct WorldEnv<'a> {
    /// Read-only tile world.
    pub tiles: &'a dyn TileQuery,
    /// This peer's role.
    pub authority: Authority,
    /// The tick being executed (or the last completed tick outside a step).
    pub tick: TickId,
}

impl<'a> WorldEnv<'a> {
    /// Bundle a world view with the peer role and current tick.
    pub fn new(tiles: &'a dyn TileQuery, authority: Authority, tick: TickId) -> Self {
        Self {
            tiles,
            authority,
            tick,
        }
    }
}

/// Network traffic a hook asked for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Requests {
    /// Emit a clone-sync for the instance.
    pub sync: bool,
    /// Emit a mod payload built by `send_data`.
    pub send_data: bool,
}

impl Requests {
    /// Whether nothing was requested.
    pub fn is_empty(&self) -> bool {
        !self.sync && !self.send_data
    }

    /// Union of two request sets.
    pub fn merge(&mut self, other: Requests) {
        self.sync |= other.sync;
        self.send_data |= other.send_data;
    }
}

/// Context for hooks that act on one instance.
pub struct ProcessorContext<'a> {
    state: &'a mut ProcessorState,
    env: WorldEnv<'a>,
    requests: Requests,
}

impl<'a> ProcessorContext<'a> {
    /// Construct a context over one instance's state.
    ///
    /// Typically called by the slot table, not by processors directly.
    pub fn new(state: &'a mut ProcessorState, env: WorldEnv<'a>) -> Self {
        Self {
            state,
            env,
            requests: Requests::default(),
        }
    }

    /// The instance's shared state.
    pub fn state(&self) -> &ProcessorState {
        self.state
    }

    /// Mutable access to the instance's shared state.
    pub fn state_mut(&mut self) -> &mut ProcessorState {
        self.state
    }

    /// Read-only tile world.
    pub fn tiles(&self) -> &dyn TileQuery {
        self.env.tiles
    }

    /// The tile under the instance's position.
    pub fn tile(&self) -> Option<TileInfo> {
        self.env.tiles.tile_at(self.state.position)
    }

    /// This peer's role.
    pub fn authority(&self) -> Authority {
        self.env.authority
    }

    /// Current tick.
    pub fn tick(&self) -> TickId {
        self.env.tick
    }

    /// Ask for a clone-sync of this instance after the hook returns.
    ///
    /// Ignored on peers that do not replicate.
    pub fn request_sync(&mut self) {
        self.requests.sync = true;
    }

    /// Ask for a mod payload built by `send_data` after the hook returns.
    pub fn request_send_data(&mut self) {
        self.requests.send_data = true;
    }

    /// Requests recorded so far.
    pub fn requests(&self) -> Requests {
        self.requests
    }
}

/// Context for the once-per-type `single_instance_update` hook.
#[derive(Clone, Copy)]
pub struct TypeContext<'a> {
    /// The type being updated.
    pub type_id: ProcessorTypeId,
    /// Active instances of the type at the start of the call.
    pub live_count: u32,
    /// Session view.
    pub env: WorldEnv<'a>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilework_core::{SlotId, TilePos, TileTypeId};

    struct OneTile;

    impl TileQuery for OneTile {
        fn tile_at(&self, pos: TilePos) -> Option<TileInfo> {
            (pos == TilePos::new(1, 1)).then(|| TileInfo::solid(TileTypeId(4)))
        }
    }

    #[test]
    fn requests_accumulate() {
        let mut state = ProcessorState::new(ProcessorTypeId(0), SlotId(0));
        state.position = TilePos::new(1, 1);
        let tiles = OneTile;
        let env = WorldEnv::new(&tiles, Authority::Server, TickId(3));
        let mut ctx = ProcessorContext::new(&mut state, env);
        assert!(ctx.requests().is_empty());
        ctx.request_sync();
        assert_eq!(ctx.tile(), Some(TileInfo::solid(TileTypeId(4))));
        assert_eq!(ctx.tick(), TickId(3));
        let mut all = ctx.requests();
        all.merge(Requests {
            sync: false,
            send_data: true,
        });
        assert!(all.sync && all.send_data);
    }
}
