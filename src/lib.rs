#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod geom;
pub mod rig;

use std::collections::BTreeMap;
use std::fmt;

use geom::{Point3, Transform, Vec3};
use rig::{
    AnimCurve, AnimatedNode, CounterTwistSolver, FlexiNode, Keyframe, NodeKind, PointTrack,
    PoseKey, SceneTime, TimeContext, evaluate_all,
};
use serde::Serialize;
use wasm_bindgen::JsError;
use wasm_bindgen::prelude::*;

cfg_if::cfg_if! {
    if #[cfg(all(feature = "console_error_panic_hook", target_arch = "wasm32"))] {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            console_error_panic_hook::set_once();
            init_logger();
        }
    } else {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            init_logger();
        }
    }
}

#[cfg(feature = "debug_logs")]
fn init_logger() {
    use log::LevelFilter;
    use wasm_bindgen_console_logger::DEFAULT_LOGGER;
    if log::set_logger(&DEFAULT_LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

#[cfg(not(feature = "debug_logs"))]
fn init_logger() {}

#[cfg(all(feature = "parallel", target_arch = "wasm32"))]
#[wasm_bindgen]
pub async fn initialize_parallel(worker_count: Option<u32>) -> Result<(), JsError> {
    let threads = worker_count
        .map(|count| count.max(1) as usize)
        .or_else(|| {
            std::thread::available_parallelism()
                .map(|value| value.get())
                .ok()
        })
        .unwrap_or(1);

    wasm_bindgen_rayon::init_thread_pool(threads)
        .await
        .map_err(|err| JsError::new(&format!("could not start the rayon thread pool: {err}")))
}

#[macro_export]
macro_rules! debug_log {
    ($($t:tt)*) => {{
        #[cfg(feature = "debug_logs")]
        {
            #[cfg(target_arch = "wasm32")]
            {
                ::web_sys::console::log_1(&::wasm_bindgen::JsValue::from_str(&format!($($t)*)));
            }
            #[cfg(not(target_arch = "wasm32"))]
            {
                println!("{}", format!($($t)*));
            }
        }
    }};
}

/// Output channels of one node, host layout.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeOutputs {
    /// Row-major 4x4 matrices, translation in the last row.
    frames: Vec<[[f64; 4]; 4]>,
    positions: Vec<Point3>,
    rotations: Vec<Vec3>,
    scales: Vec<Vec3>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StabilityReport {
    normal_stability: f64,
    counter_twist_stability: f64,
}

#[derive(Debug, Serialize)]
struct NodeError {
    id: usize,
    message: String,
}

/// Public entry point for consumers.
#[wasm_bindgen]
pub struct RigEngine {
    initialized: bool,
    nodes: BTreeMap<usize, FlexiNode>,
    counter_twist: BTreeMap<usize, AnimCurve>,
    tracks: BTreeMap<usize, PointTrack>,
    time: SceneTime,
    next_id: usize,
}

impl Default for RigEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl RigEngine {
    #[wasm_bindgen(constructor)]
    #[must_use]
    pub fn new() -> RigEngine {
        RigEngine {
            initialized: true,
            nodes: BTreeMap::new(),
            counter_twist: BTreeMap::new(),
            tracks: BTreeMap::new(),
            time: SceneTime::default(),
            next_id: 0,
        }
    }

    #[wasm_bindgen]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Add a node from a descriptor object tagged with `kind`; returns its id.
    #[wasm_bindgen]
    pub fn add_node(&mut self, descriptor: JsValue) -> Result<usize, JsValue> {
        let kind: NodeKind = serde_wasm_bindgen::from_value(descriptor).map_err(to_js_error)?;
        let id = self.insert(kind);
        debug_log!("added node {id}");
        Ok(id)
    }

    /// Replace a node's configuration.
    #[wasm_bindgen]
    pub fn set_node(&mut self, id: usize, descriptor: JsValue) -> Result<(), JsValue> {
        let kind: NodeKind = serde_wasm_bindgen::from_value(descriptor).map_err(to_js_error)?;
        self.node_mut(id)?.set_kind(kind);
        Ok(())
    }

    #[wasm_bindgen]
    pub fn remove_node(&mut self, id: usize) -> Result<(), JsValue> {
        self.counter_twist.remove(&id);
        self.tracks.remove(&id);
        self.nodes
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| js_error(&format!("unknown node {id}")))
    }

    /// Replace the control points (or chain points) of a node.
    #[wasm_bindgen]
    pub fn set_points(&mut self, id: usize, points: JsValue) -> Result<(), JsValue> {
        let points: Vec<Point3> = serde_wasm_bindgen::from_value(points).map_err(to_js_error)?;
        self.node_mut(id)?.set_points(points);
        Ok(())
    }

    /// Key the node's control points (or chain points) at `time`.
    #[wasm_bindgen]
    pub fn set_point_key(&mut self, id: usize, time: f64, points: JsValue) -> Result<(), JsValue> {
        let points: Vec<Point3> = serde_wasm_bindgen::from_value(points).map_err(to_js_error)?;
        self.insert_point_key(id, time, points)
    }

    #[wasm_bindgen]
    pub fn clear_point_keys(&mut self, id: usize) -> Result<(), JsValue> {
        self.node(id)?;
        self.tracks.remove(&id);
        Ok(())
    }

    #[wasm_bindgen]
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time.time()
    }

    /// Move the scene clock and pose every node for it: keyed points and solved counter twist.
    #[wasm_bindgen]
    pub fn set_time(&mut self, time: f64) {
        self.time.set_time(time);
        let ids: Vec<usize> = self.nodes.keys().copied().collect();
        for id in ids {
            self.apply_time(id);
        }
    }

    /// Evaluate every stale node; returns the nodes that failed.
    #[wasm_bindgen]
    pub fn evaluate(&mut self) -> Result<JsValue, JsValue> {
        let ids: Vec<usize> = self.nodes.keys().copied().collect();
        let mut nodes: Vec<FlexiNode> = std::mem::take(&mut self.nodes).into_values().collect();
        let results = evaluate_all(&mut nodes);

        let errors: Vec<NodeError> = ids
            .iter()
            .zip(&results)
            .filter_map(|(&id, result)| {
                result.as_ref().err().map(|err| NodeError {
                    id,
                    message: err.to_string(),
                })
            })
            .collect();
        self.nodes = ids.into_iter().zip(nodes).collect();

        serde_wasm_bindgen::to_value(&errors).map_err(|err| JsError::new(&err.to_string()).into())
    }

    /// Frames, positions, rotations and scales; in world space when `world` holds a row-major
    /// 4x4 matrix.
    #[wasm_bindgen]
    pub fn get_outputs(&self, id: usize, world: Option<Vec<f64>>) -> Result<JsValue, JsValue> {
        let node = self.node(id)?;
        let outputs = match world {
            Some(values) => {
                let world = transform_from_rows(&values)?;
                NodeOutputs {
                    frames: node
                        .world_frames(&world)
                        .map_err(to_js_error)?
                        .iter()
                        .map(Transform::to_row_major)
                        .collect(),
                    positions: node.world_positions(&world).map_err(to_js_error)?,
                    rotations: node.world_rotations(&world).map_err(to_js_error)?,
                    scales: node.world_scales(&world).map_err(to_js_error)?,
                }
            }
            None => NodeOutputs {
                frames: node
                    .local_frames()
                    .map_err(to_js_error)?
                    .iter()
                    .map(Transform::to_row_major)
                    .collect(),
                positions: node.local_positions().map_err(to_js_error)?,
                rotations: node.local_rotations().map_err(to_js_error)?,
                scales: node.local_scales().map_err(to_js_error)?,
            },
        };
        serde_wasm_bindgen::to_value(&outputs).map_err(|err| JsError::new(&err.to_string()).into())
    }

    #[wasm_bindgen]
    pub fn get_draw_data(&mut self, id: usize) -> Result<JsValue, JsValue> {
        let data = self.node_mut(id)?.draw_data().map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(&data).map_err(|err| JsError::new(&err.to_string()).into())
    }

    #[wasm_bindgen]
    pub fn get_stability(&self, id: usize) -> Result<JsValue, JsValue> {
        let node = self.node(id)?;
        let report = StabilityReport {
            normal_stability: node.normal_stability().map_err(to_js_error)?,
            counter_twist_stability: node.counter_twist_stability().map_err(to_js_error)?,
        };
        serde_wasm_bindgen::to_value(&report).map_err(|err| JsError::new(&err.to_string()).into())
    }

    /// Solve counter twist for a node over `[start, end]`, following its point keys, and keep
    /// the keys for `set_time`.
    #[wasm_bindgen]
    pub fn solve_counter_twist(
        &mut self,
        id: usize,
        start: f64,
        end: f64,
        step: f64,
    ) -> Result<JsValue, JsValue> {
        let keys = self.solve_keys(id, start, end, step)?;
        serde_wasm_bindgen::to_value(&keys).map_err(|err| JsError::new(&err.to_string()).into())
    }
}

impl RigEngine {
    /// Register a node and return its id.
    pub fn insert(&mut self, kind: NodeKind) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(id, FlexiNode::new(kind));
        id
    }

    pub fn insert_point_key(
        &mut self,
        id: usize,
        time: f64,
        points: Vec<Point3>,
    ) -> Result<(), JsValue> {
        self.node(id)?;
        if !time.is_finite() {
            return Err(js_error(&format!("key time {time} is not finite")));
        }
        self.tracks
            .entry(id)
            .or_default()
            .set_key(PoseKey { time, points });
        self.apply_time(id);
        Ok(())
    }

    /// Run the solver with the node driven by its point track. The node is posed and
    /// re-evaluated at the restored scene time afterwards, whether the solve succeeded or not.
    pub fn solve_keys(
        &mut self,
        id: usize,
        start: f64,
        end: f64,
        step: f64,
    ) -> Result<Vec<Keyframe>, JsValue> {
        let node = self
            .nodes
            .remove(&id)
            .ok_or_else(|| js_error(&format!("unknown node {id}")))?;
        let track = self.tracks.get(&id).cloned().unwrap_or_default();
        let mut provider = AnimatedNode::new(node, move |time, node| {
            if let Some(points) = track.sample(time) {
                node.set_points(points);
            }
        });
        let mut curve = self.counter_twist.get(&id).cloned().unwrap_or_default();
        let solved = CounterTwistSolver::new(start, end, step).solve(
            &mut provider,
            &mut self.time,
            &mut curve,
        );
        self.nodes.insert(id, provider.node);

        let keys = match solved {
            Ok(keys) => {
                self.counter_twist.insert(id, curve);
                Ok(keys)
            }
            Err(err) => Err(to_js_error(err)),
        };
        self.apply_time(id);
        if let Err(err) = self.node_mut(id)?.evaluate() {
            log::warn!("node {id} failed to evaluate after the counter-twist solve: {err}");
        }
        keys
    }

    /// Pose one node for the current scene time.
    fn apply_time(&mut self, id: usize) {
        let time = self.time.time();
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        if let Some(points) = self.tracks.get(&id).and_then(|track| track.sample(time)) {
            node.set_points(points);
        }
        if let Some(curve) = self.counter_twist.get(&id) {
            let value = curve.value_at(time);
            node.update(|kind| kind.rig_mut().twist.counter_twist = value);
        }
    }

    fn node(&self, id: usize) -> Result<&FlexiNode, JsValue> {
        self.nodes
            .get(&id)
            .ok_or_else(|| js_error(&format!("unknown node {id}")))
    }

    fn node_mut(&mut self, id: usize) -> Result<&mut FlexiNode, JsValue> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| js_error(&format!("unknown node {id}")))
    }
}

fn transform_from_rows(values: &[f64]) -> Result<Transform, JsValue> {
    if values.len() != 16 || values.iter().any(|v| !v.is_finite()) {
        return Err(js_error("world matrix must hold 16 finite values"));
    }
    let mut rows = [[0.0; 4]; 4];
    for (r, row) in rows.iter_mut().enumerate() {
        row.copy_from_slice(&values[r * 4..r * 4 + 4]);
    }
    Ok(Transform::from_row_major(rows))
}

fn to_js_error<E: fmt::Display>(error: E) -> JsValue {
    js_error(&error.to_string())
}

fn js_error(message: &str) -> JsValue {
    #[cfg(target_arch = "wasm32")]
    {
        JsError::new(message).into()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = message;
        JsValue::NULL
    }
}
