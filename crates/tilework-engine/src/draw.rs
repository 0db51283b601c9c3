//! Draw pass over active instances.

use tilework_core::{DrawLayer, DrawTarget, PixelPos, PixelRect};

use crate::session::Session;

impl Session {
    /// Recompute `on_screen` and `hovered` for every active instance.
    ///
    /// An instance is on screen when its hit box, grown by its
    /// `draw_extend`, overlaps `viewport`.
    pub fn refresh_visibility(&mut self, viewport: PixelRect, cursor: Option<PixelPos>) {
        for slot in self.table.iter_active_mut() {
            let hit_box = slot.state.hit_box();
            slot.state.on_screen = hit_box.inflate(slot.state.draw_extend).intersects(&viewport);
            slot.state.hovered = cursor.is_some_and(|c| hit_box.contains(c));
        }
    }

    /// Run one layer's hook for every on-screen instance, in slot order.
    pub fn draw_layer(&self, layer: DrawLayer, target: &mut dyn DrawTarget) {
        target.begin_layer(layer);
        for slot in self.table.iter_active().filter(|s| s.state.on_screen) {
            let (state, p) = (&slot.state, &slot.behavior);
            match layer {
                DrawLayer::PreTile => p.pre_tile_draw(state, target),
                DrawLayer::Back => p.back_draw(state, target),
                DrawLayer::Main => p.draw(state, target),
                DrawLayer::Front => p.front_draw(state, target),
            }
        }
    }

    /// Refresh visibility, then draw every layer in paint order.
    pub fn draw(
        &mut self,
        viewport: PixelRect,
        cursor: Option<PixelPos>,
        target: &mut dyn DrawTarget,
    ) {
        self.refresh_visibility(viewport, cursor);
        for layer in DrawLayer::ORDER {
            self.draw_layer(layer, target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use tilework_core::{Authority, TilePos};
    use tilework_test_utils::{init_logging, sample_registry, MockDraw, MockTiles, BEACON_TILE};

    #[test]
    fn off_screen_instances_are_skipped_and_layers_ordered() {
        init_logging();
        let types = sample_registry();
        let mut s = Session::new(types.registry.clone(), SessionConfig::new(Authority::Server))
            .unwrap();
        let mut tiles = MockTiles::standard();
        let near = TilePos::new(0, 0);
        let far = TilePos::new(1000, 0);
        tiles.build(near, BEACON_TILE);
        tiles.build(far, BEACON_TILE);
        let near_slot = s.place(&tiles, types.beacon, near, None).unwrap().slot();
        s.place(&tiles, types.beacon, far, None).unwrap();

        let mut target = MockDraw::new();
        let viewport = PixelRect::new(0, 0, 800, 600);
        s.draw(viewport, Some(PixelPos::new(20.0, 4.0)), &mut target);

        assert_eq!(target.layers, DrawLayer::ORDER.to_vec());
        let expected: Vec<_> = DrawLayer::ORDER.iter().map(|&l| (l, near_slot)).collect();
        assert_eq!(target.calls, expected);
        let beacon = s.find(near).unwrap();
        assert!(beacon.state.hovered);
        assert!(!s.find(far).unwrap().state.on_screen);
    }

    #[test]
    fn draw_extend_keeps_edge_instances_visible() {
        init_logging();
        let types = sample_registry();
        let mut s = Session::new(types.registry.clone(), SessionConfig::default()).unwrap();
        let mut tiles = MockTiles::standard();
        // Hit box starts 64 px right of the viewport edge.
        let pos = TilePos::new(54, 0);
        tiles.build(pos, BEACON_TILE);
        s.place(&tiles, types.beacon, pos, None).unwrap();

        let viewport = PixelRect::new(0, 0, 800, 600);
        s.refresh_visibility(viewport, None);
        assert!(s.find(pos).unwrap().state.on_screen);
        assert!(!s.find(pos).unwrap().state.hovered);

        let slot = s.find(pos).unwrap().state.slot;
        s.table.get_mut(slot).unwrap().state.draw_extend = 0;
        s.refresh_visibility(viewport, None);
        assert!(!s.find(pos).unwrap().state.on_screen);
    }
}
