use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use asl_layout::animation::{AnimationManager, FrameHandle, FrameScheduler, Positions};
use asl_layout::config::LayoutConfig;
use asl_layout::ir::Direction;
use asl_layout::{DiagramSession, parse_definition};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiagramOptions {
    direction: Option<String>,
    expanded: Option<Vec<String>>,
    duration_ms: Option<f64>,
    layout: Option<LayoutConfig>,
}

#[derive(Debug, Serialize)]
struct FramePayload<'a> {
    progress: f32,
    positions: &'a Positions,
}

fn parse_options(options_json: Option<&str>) -> Result<DiagramOptions, String> {
    match options_json {
        Some(raw) => serde_json::from_str(raw).map_err(|error| error.to_string()),
        None => Ok(DiagramOptions::default()),
    }
}

fn build_session(definition_json: &str, options: &DiagramOptions) -> Result<DiagramSession, String> {
    let definition = parse_definition(definition_json).map_err(|error| error.to_string())?;
    let mut config = options.layout.clone().unwrap_or_default();
    if let Some(token) = options.direction.as_deref() {
        config.direction =
            Direction::from_token(token).ok_or_else(|| format!("unknown direction `{token}`"))?;
    }
    let mut session = DiagramSession::new(definition, config);
    for id in options.expanded.iter().flatten() {
        session.expand(id).map_err(|error| error.to_string())?;
    }
    Ok(session)
}

fn layout_json(definition_json: &str, options_json: Option<&str>) -> Result<String, String> {
    let options = parse_options(options_json)?;
    let session = build_session(definition_json, &options)?;
    serde_json::to_string(&session.layout()).map_err(|error| error.to_string())
}

/// One-shot layout. Returns the `{nodes, edges, width, height}` JSON.
#[wasm_bindgen]
pub fn layout_definition(definition_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    layout_json(definition_json, options_json.as_deref()).map_err(|error| JsValue::from_str(&error))
}

/// Frames come from the host's `requestAnimationFrame`; this only tracks
/// which frame the animation is waiting for.
#[derive(Debug, Default)]
struct HostScheduler {
    now: f64,
    next_handle: u64,
    pending: Option<FrameHandle>,
}

impl FrameScheduler for HostScheduler {
    fn now(&self) -> f64 {
        self.now
    }

    fn request_frame(&mut self) -> FrameHandle {
        self.next_handle += 1;
        let handle = FrameHandle(self.next_handle);
        self.pending = Some(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
    }
}

type LatestFrame = Rc<RefCell<Option<(f32, Positions)>>>;

/// A live diagram for interactive hosts: toggle groups, then call `frame`
/// from `requestAnimationFrame` until it returns `undefined`.
#[wasm_bindgen]
pub struct WasmDiagram {
    session: DiagramSession,
    animator: AnimationManager<HostScheduler>,
    latest: LatestFrame,
    duration_ms: f64,
}

impl WasmDiagram {
    fn create(definition_json: &str, options_json: Option<&str>) -> Result<WasmDiagram, String> {
        let options = parse_options(options_json)?;
        let session = build_session(definition_json, &options)?;
        Ok(WasmDiagram {
            session,
            animator: AnimationManager::new(HostScheduler::default()),
            latest: Rc::new(RefCell::new(None)),
            duration_ms: options.duration_ms.unwrap_or(300.0),
        })
    }

    fn toggle_at(&mut self, id: &str, now: f64) -> Result<(), String> {
        let transition = self.session.toggle_group(id).map_err(|error| error.to_string())?;
        self.animator.scheduler_mut().now = now;
        let sink = Rc::clone(&self.latest);
        self.animator.start_animation(
            &transition.from,
            &transition.to,
            self.duration_ms,
            move |progress, positions| {
                *sink.borrow_mut() = Some((progress, positions.clone()));
            },
        );
        Ok(())
    }

    fn step(&mut self, timestamp: f64) -> Option<String> {
        let handle = self.animator.scheduler_mut().pending.take()?;
        self.animator.scheduler_mut().now = timestamp;
        self.animator.on_frame(handle, timestamp);
        let (progress, positions) = self.latest.borrow_mut().take()?;
        serde_json::to_string(&FramePayload {
            progress,
            positions: &positions,
        })
        .ok()
    }
}

#[wasm_bindgen]
impl WasmDiagram {
    #[wasm_bindgen(constructor)]
    pub fn new(definition_json: &str, options_json: Option<String>) -> Result<WasmDiagram, JsValue> {
        Self::create(definition_json, options_json.as_deref()).map_err(|error| JsValue::from_str(&error))
    }

    /// Current layout JSON.
    pub fn layout(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.session.layout()).map_err(|error| JsValue::from_str(&error.to_string()))
    }

    /// Ids of the groups currently expanded.
    pub fn expanded(&self) -> Vec<String> {
        let expanded: &HashSet<String> = self.session.expanded();
        let mut ids: Vec<String> = expanded.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Expands or collapses `id` and starts animating from `now` (ms).
    pub fn toggle(&mut self, id: &str, now: f64) -> Result<(), JsValue> {
        self.toggle_at(id, now).map_err(|error| JsValue::from_str(&error))
    }

    /// `{progress, positions}` JSON for this frame, or `undefined` once idle.
    pub fn frame(&mut self, timestamp: f64) -> Option<String> {
        self.step(timestamp)
    }

    #[wasm_bindgen(js_name = setDirection)]
    pub fn set_direction(&mut self, token: &str) -> Result<(), JsValue> {
        let direction = Direction::from_token(token)
            .ok_or_else(|| JsValue::from_str(&format!("unknown direction `{token}`")))?;
        self.animator.stop_animation();
        self.session.set_direction(direction);
        Ok(())
    }
}
