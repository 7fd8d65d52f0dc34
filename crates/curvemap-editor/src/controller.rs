use glam::Vec2;

use curvemap_core::{CurveModel, HandleKind, HandleRef, Point};

use crate::transform::ScreenTransform;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditorConfig {
    /// How close (in screen pixels) the pointer must be to a handle to grab it.
    ///
    /// By default this is set to `20.0`.
    pub hit_radius_px: f32,
    /// The fraction of the distance between a dragged handle and the pointer
    /// that is covered on each drag event. `1.0` makes the handle follow the
    /// pointer exactly.
    ///
    /// By default this is set to `0.9`.
    pub drag_damping: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            hit_radius_px: 20.0,
            drag_damping: 0.9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { position: Vec2, button: PointerButton },
    Drag { position: Vec2 },
    Up,
    DoubleClick { position: Vec2 },
}

/// The handle closest to a pointer position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandleHit {
    pub handle: HandleRef,
    /// The handle's position in model space.
    pub position: Point,
    /// Distance from the pointer in model units.
    pub model_distance: f32,
    /// Distance from the pointer in screen pixels.
    pub screen_distance: f32,
}

/// Turns pointer gestures into edits on a [`CurveModel`].
///
/// The controller only remembers which handle is being dragged. The model
/// and the screen transform are passed in on every call, so the same
/// controller can be used with a model that is swapped out or resized.
#[derive(Debug, Default, Clone)]
pub struct InteractionController {
    config: EditorConfig,
    selected: Option<HandleRef>,
}

impl InteractionController {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            selected: None,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// The handle currently being dragged, if any.
    pub fn selected(&self) -> Option<HandleRef> {
        self.selected
    }

    /// Find the relevant handle nearest to `screen_point`.
    ///
    /// Distances are compared in model space. Control handles that don't
    /// shape the curve are never returned. The first handle wins on a tie,
    /// in node order and then anchor, control 1, control 2.
    pub fn hit_test(
        &self,
        model: &CurveModel,
        transform: &ScreenTransform,
        screen_point: Vec2,
    ) -> Option<HandleHit> {
        let target = transform.to_model(screen_point);
        let last = model.len().checked_sub(1)?;

        let mut best: Option<HandleHit> = None;

        for (i, (&id, node)) in model.node_ids().iter().zip(model.nodes()).enumerate() {
            for kind in [HandleKind::Anchor, HandleKind::Control1, HandleKind::Control2] {
                if !node.handle_is_relevant(kind, i == last) {
                    continue;
                }

                let position = node.handle(kind);
                let model_distance = position.distance(target);

                if best.map_or(true, |b| model_distance < b.model_distance) {
                    best = Some(HandleHit {
                        handle: HandleRef::new(id, kind),
                        position,
                        model_distance,
                        screen_distance: 0.0,
                    });
                }
            }
        }

        best.map(|mut hit| {
            hit.screen_distance = transform.to_screen(hit.position).distance(screen_point);
            hit
        })
    }

    fn grab(
        &self,
        model: &CurveModel,
        transform: &ScreenTransform,
        screen_point: Vec2,
    ) -> Option<HandleHit> {
        self.hit_test(model, transform, screen_point)
            .filter(|hit| hit.screen_distance < self.config.hit_radius_px)
    }

    /// Primary selects the handle under the pointer. Secondary deletes the
    /// node owning the handle under the pointer (boundary nodes can't be
    /// deleted). Pressing away from every handle clears the selection.
    ///
    /// Returns `true` if the model changed.
    pub fn on_pointer_down(
        &mut self,
        model: &mut CurveModel,
        transform: &ScreenTransform,
        screen_point: Vec2,
        button: PointerButton,
    ) -> bool {
        let Some(hit) = self.grab(model, transform, screen_point) else {
            self.selected = None;
            return false;
        };

        match button {
            PointerButton::Primary => {
                self.selected = Some(hit.handle);
                false
            }
            PointerButton::Secondary => {
                if model.delete_node(hit.handle.node) {
                    self.selected = None;
                    true
                } else {
                    false
                }
            }
            PointerButton::Middle => false,
        }
    }

    /// Move the selected handle part of the way toward the pointer.
    ///
    /// Anchors can't pass their neighbours, they stop just short of them.
    /// A selection that no longer refers to a relevant handle is dropped.
    ///
    /// Returns `true` if the model changed.
    pub fn on_pointer_drag(
        &mut self,
        model: &mut CurveModel,
        transform: &ScreenTransform,
        screen_point: Vec2,
    ) -> bool {
        let Some(handle) = self.selected else {
            return false;
        };

        let current = match model.handle_position(handle) {
            Some(p) if model.handle_is_relevant(handle) => p,
            _ => {
                log::debug!("Dropping stale selection {:?}", handle);
                self.selected = None;
                return false;
            }
        };

        let target = transform.to_model(screen_point);
        if !target.is_finite() {
            return false;
        }

        let moved = model
            .bounds()
            .clamp(current + (target - current) * self.config.drag_damping);

        model.set_handle(handle, moved)
    }

    pub fn on_pointer_up(&mut self) {
        self.selected = None;
    }

    /// Double-clicking an anchor cycles its curve type. Anywhere else a new
    /// linear node is inserted under the pointer.
    ///
    /// Returns `true` if the model changed.
    pub fn on_double_click(
        &mut self,
        model: &mut CurveModel,
        transform: &ScreenTransform,
        screen_point: Vec2,
    ) -> bool {
        if let Some(hit) = self.grab(model, transform, screen_point) {
            if hit.handle.is_anchor() {
                return model.cycle_curve_type(hit.handle.node);
            }
        }

        model.insert_node(transform.to_model(screen_point)).is_some()
    }

    /// Dispatch a pointer event to the matching handler.
    pub fn handle_event(
        &mut self,
        model: &mut CurveModel,
        transform: &ScreenTransform,
        event: PointerEvent,
    ) -> bool {
        match event {
            PointerEvent::Down { position, button } => {
                self.on_pointer_down(model, transform, position, button)
            }
            PointerEvent::Drag { position } => self.on_pointer_drag(model, transform, position),
            PointerEvent::Up => {
                self.on_pointer_up();
                false
            }
            PointerEvent::DoubleClick { position } => {
                self.on_double_click(model, transform, position)
            }
        }
    }
}
