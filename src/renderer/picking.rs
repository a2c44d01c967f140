use super::*;

impl<D: Device> Renderer<D> {
    /// The topmost pickable object under `point`, in canvas coordinates.
    ///
    /// Pending scene edits are applied first, so a pick right after an edit sees it.
    pub fn pick(&mut self, point: [f32; 2]) -> Option<EntityId> {
        self.prepare_picking();
        self.picker
            .pick(&self.objects, &self.order, point, &self.camera.ortho_matrix())
    }

    /// Every pickable object under `point`, back to front.
    pub fn pick_all(&mut self, point: [f32; 2]) -> Vec<EntityId> {
        self.prepare_picking();
        self.picker
            .pick_all(&self.objects, &self.order, point, &self.camera.ortho_matrix())
    }

    fn prepare_picking(&mut self) {
        let events = self.flush_events();
        if self.refresh_order() {
            trace!(events, "draw order refreshed for picking");
        }
    }
}
