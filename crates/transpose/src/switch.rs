//! Stage switching.
//!
//! A [`SwitchGroup`] holds a fixed list of [`StageEntry`]s and shows exactly
//! one of them at a time, feeding the matching entry's content to a
//! [`Group`] with the stage id as route path.

use std::fmt;
use std::rc::Rc;

use tracing::debug;
use transpose_config::StageSettings;

use crate::engine::EngineRef;
use crate::error::{Result, TransitionError};
use crate::group::{Group, GroupOptions, RouteContent};

/// Callback that asks the owner of a switch group to change stage.
pub type StageSetter = Rc<dyn Fn(&str)>;

/// Produces route content on demand.
pub type RenderFn = Rc<dyn Fn() -> RouteContent>;

/// One selectable stage.
#[derive(Clone)]
pub struct StageEntry {
    pub stage: String,
    pub component: Option<RouteContent>,
    pub render: Option<RenderFn>,
}

impl StageEntry {
    pub fn component(stage: impl Into<String>, component: RouteContent) -> Self {
        Self {
            stage: stage.into(),
            component: Some(component),
            render: None,
        }
    }

    pub fn render(stage: impl Into<String>, render: impl Fn() -> RouteContent + 'static) -> Self {
        Self {
            stage: stage.into(),
            component: None,
            render: Some(Rc::new(render)),
        }
    }

    /// Entry with nothing to show; selecting it is an error.
    pub fn empty(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            component: None,
            render: None,
        }
    }
}

impl fmt::Debug for StageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageEntry")
            .field("stage", &self.stage)
            .field("component", &self.component.is_some())
            .field("render", &self.render.is_some())
            .finish()
    }
}

/// Pick the content for `stage`. A component takes precedence over a
/// render function.
pub fn resolve_stage(entries: &[StageEntry], stage: &str) -> Result<RouteContent> {
    let entry = entries
        .iter()
        .find(|entry| entry.stage == stage)
        .ok_or_else(|| TransitionError::StageNotFound(stage.to_string()))?;

    if let Some(component) = &entry.component {
        return Ok(component.clone());
    }
    match &entry.render {
        Some(render) => Ok(render()),
        None => Err(TransitionError::MissingRenderer(stage.to_string())),
    }
}

/// Shows one stage out of a fixed set, with transitions between them.
pub struct SwitchGroup {
    entries: Vec<StageEntry>,
    stage: String,
    group: Group,
}

impl SwitchGroup {
    pub fn new(entries: Vec<StageEntry>, stage: &str, engine: EngineRef) -> Result<Self> {
        Self::with_options(entries, stage, engine, GroupOptions::default())
    }

    /// Expose `setter` to mounted content through
    /// [`TransitionContext::stage_setter`](crate::context::TransitionContext::stage_setter).
    pub fn with_stage_setter(
        entries: Vec<StageEntry>,
        stage: &str,
        engine: EngineRef,
        setter: StageSetter,
    ) -> Result<Self> {
        let options = GroupOptions {
            stage_setter: Some(setter),
            ..GroupOptions::default()
        };
        Self::with_options(entries, stage, engine, options)
    }

    /// Apply loaded stage settings on top of `options`.
    pub fn with_settings(
        entries: Vec<StageEntry>,
        stage: &str,
        engine: EngineRef,
        settings: &StageSettings,
        options: GroupOptions,
    ) -> Result<Self> {
        let options = GroupOptions {
            animate_first: options.animate_first || settings.animate_first,
            ..options
        };
        Self::with_options(entries, stage, engine, options)
    }

    pub fn with_options(
        entries: Vec<StageEntry>,
        stage: &str,
        engine: EngineRef,
        options: GroupOptions,
    ) -> Result<Self> {
        let content = resolve_stage(&entries, stage)?;
        let group = Group::with_options(stage, content, engine, options)?;
        Ok(Self {
            entries,
            stage: stage.to_string(),
            group,
        })
    }

    /// Switch to `stage`. Selecting the current stage again is a no-op.
    pub fn set_stage(&mut self, stage: &str) -> Result<()> {
        if stage == self.stage {
            return Ok(());
        }

        let content = resolve_stage(&self.entries, stage)?;
        self.group.on_route_change(stage, content)?;
        debug!(from = %self.stage, to = stage, "stage switched");
        self.stage = stage.to_string();
        Ok(())
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    pub fn group_mut(&mut self) -> &mut Group {
        &mut self.group
    }

    /// See [`Group::poll_leaving`].
    pub fn poll_leaving(&mut self) -> Vec<String> {
        self.group.poll_leaving()
    }

    pub fn is_mounted(&self, stage: &str) -> bool {
        self.group.is_mounted(stage)
    }

    pub fn has_marker(&self, text: &str) -> bool {
        self.group.has_marker(text)
    }
}

impl fmt::Debug for SwitchGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwitchGroup")
            .field("stage", &self.stage)
            .field("entries", &self.entries)
            .field("group", &self.group)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Props;
    use crate::element::Transposed;
    use crate::engine::FrameEngine;
    use crate::group::view;
    use crate::node::{MemoryNode, StyleTarget};
    use crate::style::Style;

    fn text(label: &'static str) -> RouteContent {
        view(move |scope| {
            scope.marker(label);
            Ok(())
        })
    }

    #[test]
    fn test_component_wins_over_render() {
        let entry = StageEntry {
            stage: "a".into(),
            component: Some(text("component")),
            render: Some(Rc::new(|| text("render"))),
        };
        let switch = SwitchGroup::new(vec![entry], "a", Rc::new(FrameEngine::new())).unwrap();
        assert!(switch.has_marker("component"));
        assert!(!switch.has_marker("render"));
    }

    #[test]
    fn test_unknown_stage() {
        let entries = vec![StageEntry::component("a", text("A"))];
        let err = resolve_stage(&entries, "b").err().unwrap();
        assert_eq!(err, TransitionError::StageNotFound("b".into()));
        assert_eq!(err.to_string(), "could not find element with stage 'b'");
    }

    #[test]
    fn test_entry_without_renderer() {
        let entries = vec![StageEntry::empty("a")];
        let err = SwitchGroup::new(entries, "a", Rc::new(FrameEngine::new())).unwrap_err();
        assert_eq!(err, TransitionError::MissingRenderer("a".into()));
    }

    #[test]
    fn test_failed_switch_keeps_current_stage() {
        let entries = vec![StageEntry::component("a", text("A")), StageEntry::empty("b")];
        let mut switch = SwitchGroup::new(entries, "a", Rc::new(FrameEngine::new())).unwrap();

        assert!(switch.set_stage("b").is_err());
        assert!(switch.set_stage("c").is_err());
        assert_eq!(switch.stage(), "a");
        assert!(switch.has_marker("A"));
    }

    #[test]
    fn test_settings_enable_animate_first() {
        let node = Rc::new(MemoryNode::new("card"));
        let target = node.clone();
        let content = view(move |scope| {
            let fade = Transposed::new(
                Style::new().with("opacity", 1.0),
                Style::new().with("opacity", 0.0),
            );
            scope.animated("card", Some(target.clone()), Rc::new(fade), Props::Null)
        });
        let settings = StageSettings { animate_first: true };

        let _switch = SwitchGroup::with_settings(
            vec![StageEntry::component("a", content)],
            "a",
            Rc::new(FrameEngine::new()),
            &settings,
            GroupOptions::default(),
        )
        .unwrap();
        assert_eq!(node.read("opacity").and_then(|v| v.as_number()), Some(0.0));
    }
}
