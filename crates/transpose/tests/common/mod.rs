#![allow(dead_code)]

use std::rc::Rc;

use transpose::{
    EasingFunction, FrameEngine, MemoryNode, Props, RouteContent, Style, StyleSpec, StyleTarget,
    SwitchGroup, TransitionDefinition, Transposed, view,
};

/// Linear opacity fade, `duration_ms` both ways.
pub fn fade(duration_ms: f32) -> Transposed {
    let transition = TransitionDefinition::tween()
        .with_duration(duration_ms)
        .with_easing(EasingFunction::Linear);
    Transposed::new(
        StyleSpec::new(Style::new().with("opacity", 1.0)).with_transition(transition.clone()),
        StyleSpec::new(Style::new().with("opacity", 0.0)).with_transition(transition),
    )
}

/// A stage rendering `marker` plus one faded panel bound to `node`.
pub fn faded_stage(marker: &'static str, node: Rc<MemoryNode>, duration_ms: f32) -> RouteContent {
    view(move |scope| {
        scope.marker(marker);
        scope.animated("panel", Some(node.clone()), Rc::new(fade(duration_ms)), Props::Null)
    })
}

/// A stage that only renders `marker`.
pub fn text(marker: &'static str) -> RouteContent {
    view(move |scope| {
        scope.marker(marker);
        Ok(())
    })
}

pub fn opacity(node: &MemoryNode) -> Option<String> {
    node.read("opacity").map(|v| v.to_string())
}

pub fn opacity_value(node: &MemoryNode) -> f64 {
    node.read("opacity").and_then(|v| v.as_number()).unwrap_or(f64::NAN)
}

/// Drive the engine frame by frame for `ms`, polling the stage after every
/// frame. Returns the routes torn down along the way.
pub fn run_for(engine: &FrameEngine, switch: &mut SwitchGroup, ms: f32) -> Vec<String> {
    let mut destroyed = Vec::new();
    let mut spent = 0.0;
    while spent < ms {
        engine.tick(engine.frame_ms());
        spent += engine.frame_ms();
        destroyed.extend(switch.poll_leaving());
    }
    destroyed
}

/// Run until the engine is idle and no leave is pending.
pub fn settle(engine: &FrameEngine, switch: &mut SwitchGroup) -> Vec<String> {
    let mut destroyed = switch.poll_leaving();
    let mut spent = 0.0;
    while (!engine.is_idle() || switch.group().has_pending_leaves()) && spent < 5_000.0 {
        engine.tick(engine.frame_ms());
        spent += engine.frame_ms();
        destroyed.extend(switch.poll_leaving());
    }
    destroyed
}
