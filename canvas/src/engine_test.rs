use super::*;

const VW: f64 = 800.0;
const VH: f64 = 600.0;

fn engine() -> Engine {
    let mut engine = Engine::new();
    engine.set_viewport(VW, VH);
    engine
}

fn stroke_through(points: &[(f64, f64)]) -> Stroke {
    Stroke::new(
        "#d94b4b",
        points.iter().map(|&(x, y)| Sample::new(x, y, 0.5)).collect(),
        4.0,
    )
}

// --- Drawing ---

#[test]
fn pen_gesture_finalizes_a_staged_stroke_on_release() {
    let mut engine = engine();
    engine.set_tool(Tool::Pen);

    engine.pointer_down(1, Point::new(10.0, 10.0), 0.5);
    engine.pointer_move(1, Point::new(20.0, 15.0), 0.7);
    let effect = engine.pointer_up(1, Point::new(20.0, 15.0));

    assert_eq!(effect, Effect::DocChanged);
    assert_eq!(engine.state.strokes().len(), 1);
    let stroke = engine.state.strokes().values().next().unwrap();
    assert_eq!(stroke.points.len(), 2);
    assert!(engine.state.pending().strokes_to_save.contains_key(&stroke.id));
}

#[test]
fn pen_samples_are_recorded_in_world_coordinates() {
    let mut engine = engine();
    engine.viewport = Viewport { pan_x: -100.0, pan_y: -50.0, scale: 2.0 };
    engine.set_tool(Tool::Pen);

    engine.pointer_down(1, Point::new(10.0, 10.0), 0.5);
    engine.pointer_up(1, Point::new(10.0, 10.0));

    let stroke = engine.state.strokes().values().next().unwrap();
    assert!((stroke.points[0].x - 55.0).abs() < 1e-9);
    assert!((stroke.points[0].y - 30.0).abs() < 1e-9);
}

#[test]
fn pointer_cancel_discards_buffered_samples() {
    let mut engine = engine();
    engine.set_tool(Tool::Pen);

    engine.pointer_down(1, Point::new(10.0, 10.0), 0.5);
    engine.pointer_move(1, Point::new(20.0, 20.0), 0.5);
    engine.pointer_cancel(1);

    assert!(engine.state.strokes().is_empty());
    assert!(engine.state.pending().is_empty());
    assert!(matches!(engine.gesture, Gesture::Idle));
}

// --- Panning and pinching ---

#[test]
fn pan_gesture_follows_the_pointer_within_the_clamp() {
    let mut engine = engine();
    engine.set_tool(Tool::Pan);

    engine.pointer_down(1, Point::new(400.0, 300.0), 0.5);
    let effect = engine.pointer_move(1, Point::new(350.0, 280.0), 0.5);

    assert_eq!(effect, Effect::ViewChanged);
    assert!((engine.viewport.pan_x - (-50.0)).abs() < 1e-9);
    assert!((engine.viewport.pan_y - (-20.0)).abs() < 1e-9);
}

#[test]
fn pan_gesture_cannot_drag_past_the_origin() {
    let mut engine = engine();
    engine.set_tool(Tool::Pan);

    engine.pointer_down(1, Point::new(400.0, 300.0), 0.5);
    engine.pointer_move(1, Point::new(700.0, 500.0), 0.5);

    assert!((engine.viewport.pan_x - 0.0).abs() < f64::EPSILON);
    assert!((engine.viewport.pan_y - 0.0).abs() < f64::EPSILON);
}

#[test]
fn pinch_keeps_the_world_point_under_the_midpoint() {
    let mut engine = engine();
    engine.viewport = Viewport { pan_x: -1500.0, pan_y: -1200.0, scale: 1.0 };

    engine.pointer_down(1, Point::new(300.0, 300.0), 0.5);
    engine.pointer_down(2, Point::new(500.0, 300.0), 0.5);

    let screen_mid = Point::new(400.0, 300.0);
    let world_mid = engine.viewport.screen_to_world(screen_mid);

    for spread in [250.0, 320.0, 410.0] {
        engine.pointer_move(2, Point::new(300.0 + spread, 300.0), 0.5);
        let back = engine.viewport.world_to_screen(world_mid);
        assert!((back.x - screen_mid.x).abs() < 1e-9);
        assert!((back.y - screen_mid.y).abs() < 1e-9);
    }
}

#[test]
fn pinch_ratio_is_damped() {
    let mut engine = engine();
    engine.viewport = Viewport { pan_x: -1500.0, pan_y: -1200.0, scale: 1.0 };

    engine.pointer_down(1, Point::new(300.0, 300.0), 0.5);
    engine.pointer_down(2, Point::new(500.0, 300.0), 0.5);
    // Spread 200 -> 300: raw factor 1.5, damped 1 + 0.5 * 0.6.
    engine.pointer_move(2, Point::new(600.0, 300.0), 0.5);

    assert!((engine.viewport.scale - 1.3).abs() < 1e-9);
}

#[test]
fn pinch_scale_clamps_under_extreme_spread() {
    let mut engine = engine();
    engine.viewport = Viewport { pan_x: -1500.0, pan_y: -1200.0, scale: 1.0 };

    engine.pointer_down(1, Point::new(300.0, 300.0), 0.5);
    engine.pointer_down(2, Point::new(500.0, 300.0), 0.5);
    engine.pointer_move(2, Point::new(4000.0, 300.0), 0.5);
    assert!((engine.viewport.scale - crate::consts::MAX_SCALE).abs() < f64::EPSILON);
}

#[test]
fn pinch_in_clamps_at_the_minimum_scale() {
    let mut engine = engine();
    engine.viewport = Viewport { pan_x: -600.0, pan_y: -500.0, scale: 0.4 };

    engine.pointer_down(1, Point::new(300.0, 300.0), 0.5);
    engine.pointer_down(2, Point::new(500.0, 300.0), 0.5);
    engine.pointer_move(2, Point::new(302.0, 300.0), 0.5);
    assert!((engine.viewport.scale - crate::consts::MIN_SCALE).abs() < f64::EPSILON);
}

#[test]
fn losing_one_pinch_pointer_degrades_to_a_pan() {
    let mut engine = engine();
    engine.viewport = Viewport { pan_x: -1500.0, pan_y: -1200.0, scale: 1.0 };

    engine.pointer_down(1, Point::new(300.0, 300.0), 0.5);
    engine.pointer_down(2, Point::new(500.0, 300.0), 0.5);
    engine.pointer_up(2, Point::new(500.0, 300.0));
    assert!(matches!(engine.gesture, Gesture::Panning { .. }));

    let pan_before = engine.viewport.pan_x;
    engine.pointer_move(1, Point::new(280.0, 300.0), 0.5);
    assert!((engine.viewport.pan_x - (pan_before - 20.0)).abs() < 1e-9);
}

#[test]
fn a_second_pointer_aborts_a_drawing_gesture() {
    let mut engine = engine();
    engine.set_tool(Tool::Pen);

    engine.pointer_down(1, Point::new(10.0, 10.0), 0.5);
    engine.pointer_down(2, Point::new(50.0, 10.0), 0.5);
    assert!(matches!(engine.gesture, Gesture::Pinching { .. }));

    engine.pointer_up(2, Point::new(50.0, 10.0));
    engine.pointer_up(1, Point::new(10.0, 10.0));
    assert!(engine.state.strokes().is_empty());
}

// --- Erasing ---

#[test]
fn eraser_removes_strokes_under_the_pointer() {
    let mut engine = engine();
    let stroke = stroke_through(&[(101.0, 101.0), (200.0, 200.0)]);
    let id = stroke.id;
    engine.state.create_stroke(stroke);
    let cached = engine.state.stroke(&id).unwrap().clone();
    engine.cache.get_or_build(&cached);

    engine.set_tool(Tool::Eraser);
    let effect = engine.pointer_down(1, Point::new(100.0, 100.0), 0.5);

    assert_eq!(effect, Effect::DocChanged);
    assert!(engine.state.stroke(&id).is_none());
    assert!(engine.state.pending().strokes_to_delete.contains(&id));
    assert!(!engine.cache.contains(&id));
}

// --- Selection ---

#[test]
fn rubber_band_selects_strokes_and_boxes_inside() {
    let mut engine = engine();
    let near = stroke_through(&[(10.0, 10.0)]);
    let far = stroke_through(&[(500.0, 500.0)]);
    let near_id = near.id;
    engine.state.create_stroke(near);
    engine.state.create_stroke(far);
    let box_id = engine.state.create_box_at(50.0, 50.0);

    engine.pointer_down(1, Point::new(0.0, 0.0), 0.5);
    engine.pointer_move(1, Point::new(100.0, 100.0), 0.5);
    engine.pointer_up(1, Point::new(100.0, 100.0));

    assert_eq!(engine.selection.strokes.len(), 1);
    assert!(engine.selection.strokes.contains(&near_id));
    assert!(engine.selection.boxes.contains(&box_id));
}

#[test]
fn dragging_a_selection_stages_final_positions_on_release() {
    let mut engine = engine();
    let stroke = stroke_through(&[(10.0, 10.0)]);
    let stroke_id = stroke.id;
    engine.state.create_stroke(stroke);
    let box_id = engine.state.create_box_at(40.0, 40.0);
    let cached = engine.state.stroke(&stroke_id).unwrap().clone();
    engine.cache.get_or_build(&cached);
    engine.selection.strokes.insert(stroke_id);
    engine.selection.boxes.insert(box_id);

    engine.pointer_down(1, Point::new(10.0, 10.0), 0.5);
    let effect = engine.pointer_move(1, Point::new(30.0, 25.0), 0.5);
    assert_eq!(effect, Effect::DocChanged);
    assert!(!engine.cache.contains(&stroke_id));

    engine.pointer_up(1, Point::new(30.0, 25.0));
    let moved = &engine.state.pending().strokes_to_save[&stroke_id];
    assert!((moved.points[0].x - 30.0).abs() < 1e-9);
    assert!((moved.points[0].y - 25.0).abs() < 1e-9);
    let moved_box = &engine.state.pending().boxes_to_save[&box_id];
    assert!((moved_box.x - 60.0).abs() < 1e-9);
    assert!((moved_box.y - 55.0).abs() < 1e-9);
}

// --- Text boxes ---

#[test]
fn text_tool_creates_a_box_and_reverts_to_mouse() {
    let mut engine = engine();
    engine.set_tool(Tool::Text);

    let effect = engine.pointer_down(1, Point::new(120.0, 80.0), 0.5);
    let Effect::EditText(id) = effect else {
        panic!("expected an edit-text effect, got {effect:?}");
    };

    assert_eq!(engine.tool, Tool::Mouse);
    let text_box = engine.state.text_box(&id).unwrap();
    assert!((text_box.x - 120.0).abs() < 1e-9);
    assert!((text_box.y - 80.0).abs() < 1e-9);
    assert!(engine.state.pending().boxes_to_save.contains_key(&id));
}

#[test]
fn box_creation_is_a_save_arming_effect() {
    let mut engine = engine();
    engine.set_tool(Tool::Text);

    // The box is staged on creation, so the effect must start the
    // debounce window even if the editor is never touched.
    let effect = engine.pointer_down(1, Point::new(40.0, 40.0), 0.5);
    assert!(matches!(effect, Effect::EditText(_)));
    assert!(effect.arms_autosave());

    assert!(Effect::DocChanged.arms_autosave());
    assert!(!Effect::ViewChanged.arms_autosave());
    assert!(!Effect::None.arms_autosave());
}

#[test]
fn resize_gesture_applies_anchor_math_and_stages_each_move() {
    let mut engine = engine();
    let id = engine.state.create_box_at(100.0, 100.0);

    engine.begin_box_resize(1, id, ResizeAnchor::W, Point::new(100.0, 120.0), 40.0);
    engine.pointer_move(1, Point::new(120.0, 120.0), 0.5);
    engine.pointer_up(1, Point::new(120.0, 120.0));

    let text_box = engine.state.text_box(&id).unwrap();
    assert!((text_box.x - 120.0).abs() < 1e-9);
    assert!((text_box.width - 80.0).abs() < 1e-9);
    assert!(engine.state.pending().boxes_to_save.contains_key(&id));
}

#[test]
fn context_menu_delete_stages_the_box_deletion() {
    let mut engine = engine();
    let id = engine.state.create_box_at(10.0, 10.0);
    engine.selection.boxes.insert(id);

    let effect = engine.delete_box(id);
    assert_eq!(effect, Effect::DocChanged);
    assert!(engine.state.text_box(&id).is_none());
    assert!(engine.state.pending().boxes_to_delete.contains(&id));
    assert!(engine.selection.boxes.is_empty());
}

// --- Keyboard ---

#[test]
fn ctrl_plus_and_minus_step_the_zoom() {
    let mut engine = engine();
    engine.viewport = Viewport { pan_x: -1500.0, pan_y: -1200.0, scale: 1.0 };
    let mods = Modifiers { ctrl: true, ..Modifiers::default() };

    assert_eq!(engine.key_down("+", mods), Effect::ViewChanged);
    assert!((engine.viewport.scale - 1.1).abs() < 1e-9);
    assert_eq!(engine.key_down("-", mods), Effect::ViewChanged);
    assert!((engine.viewport.scale - 1.0).abs() < 1e-9);
}

#[test]
fn zoom_keys_without_the_primary_modifier_do_nothing() {
    let mut engine = engine();
    assert_eq!(engine.key_down("+", Modifiers::default()), Effect::None);
}

// --- Remote path ---

#[test]
fn apply_remote_refreshes_the_cache_and_never_arms_a_save() {
    let mut engine = engine();
    let stale = stroke_through(&[(10.0, 10.0)]);
    let id = stale.id;
    engine.load_snapshot(NoteSnapshot {
        id: Uuid::new_v4(),
        name: "shared".into(),
        background: None,
        thumbnail: None,
        strokes: vec![stale.clone()],
        text_boxes: vec![],
    });
    engine.cache.get_or_build(&stale);

    let mut moved = stale;
    moved.translate(50.0, 0.0);
    let mut change_set = ChangeSet::new();
    change_set.stage_stroke(moved);
    let doomed = Uuid::new_v4();
    change_set.delete_stroke(doomed);

    let effect = engine.apply_remote(&change_set);
    assert_eq!(effect, Effect::ViewChanged);
    assert!(!engine.cache.contains(&id));
    assert!(engine.state.pending().is_empty());
}

#[test]
fn remote_deletion_prunes_the_cache_and_the_selection() {
    let mut engine = engine();
    let stroke = stroke_through(&[(10.0, 10.0)]);
    let id = stroke.id;
    engine.load_snapshot(NoteSnapshot {
        id: Uuid::new_v4(),
        name: "shared".into(),
        background: None,
        thumbnail: None,
        strokes: vec![stroke.clone()],
        text_boxes: vec![],
    });
    engine.cache.get_or_build(&stroke);
    engine.selection.strokes.insert(id);

    let mut change_set = ChangeSet::new();
    change_set.delete_stroke(id);
    engine.apply_remote(&change_set);

    assert!(engine.state.stroke(&id).is_none());
    assert!(!engine.cache.contains(&id));
    assert!(engine.selection.strokes.is_empty());
}
