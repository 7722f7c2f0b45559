//! Audio backend trait: a semantic-level abstraction over audio server operations.
//!
//! `AudioBackend` captures what the engine *means* to do (create a synth, free a
//! node, glide a parameter) independently of how it's done (OSC messages to
//! SuperCollider). The transition engine is tested entirely against the
//! recording implementation.
//!
//! Layers:
//! - `OscClientLike` (osc_client.rs) — transport: how to send/receive OSC packets
//! - `AudioBackend` (this file) — semantic: what operations the engine performs

use std::fmt;
use std::path::Path;

/// Result type for backend operations.
pub type BackendResult<T = ()> = Result<T, BackendError>;

/// Error from a backend operation.
#[derive(Debug, Clone)]
pub struct BackendError(pub String);

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(e: std::io::Error) -> Self {
        BackendError(e.to_string())
    }
}

impl From<String> for BackendError {
    fn from(s: String) -> Self {
        BackendError(s)
    }
}

/// Semantic-level audio backend trait.
///
/// Implementations translate these operations into server commands (OSC for
/// SuperCollider) or record them for tests. `set_params` is atomic: all pairs
/// land in one server message, which is what lets a value and its lag-time
/// companion change together without a one-message-wide glitch window.
pub trait AudioBackend: Send {
    /// Create a group node for execution ordering.
    fn create_group(&self, group_id: i32, add_action: i32, target: i32) -> BackendResult;

    /// Create a synth in a specific group with named parameters.
    fn create_synth(
        &self,
        def_name: &str,
        node_id: i32,
        group_id: i32,
        params: &[(String, f32)],
    ) -> BackendResult;

    /// Free (remove) a node from the server.
    fn free_node(&self, node_id: i32) -> BackendResult;

    /// Pause or resume a node without freeing it.
    fn run_node(&self, node_id: i32, on: bool) -> BackendResult;

    /// Set a single parameter on a node.
    fn set_param(&self, node_id: i32, param: &str, value: f32) -> BackendResult;

    /// Set multiple parameters on a node in one message.
    fn set_params(&self, node_id: i32, params: &[(&str, f32)]) -> BackendResult;

    /// Read a sound file into a buffer at the given buffer number.
    fn load_buffer(&self, bufnum: i32, path: &Path) -> BackendResult;

    /// Free a buffer.
    fn free_buffer(&self, bufnum: i32) -> BackendResult;

    /// Load every compiled synthdef in a directory.
    fn load_synthdef_dir(&self, dir: &Path) -> BackendResult;

    /// Ask the server for a status report (replies land on the monitor).
    fn request_status(&self) -> BackendResult;

    /// Send a raw message (escape hatch for operations not covered by typed methods).
    fn send_raw(&self, addr: &str, args: Vec<RawArg>) -> BackendResult;
}

/// A loosely-typed argument for `send_raw`, so backends don't depend on `rosc`.
#[derive(Debug, Clone, PartialEq)]
pub enum RawArg {
    Int(i32),
    Float(f32),
    Str(String),
}

// ─── SuperCollider backend ──────────────────────────────────────────

use super::osc_client::OscClientLike;

/// Backend implementation that delegates to an `OscClientLike` transport.
pub struct ScBackend {
    client: Box<dyn OscClientLike>,
}

impl ScBackend {
    pub fn new(client: Box<dyn OscClientLike>) -> Self {
        Self { client }
    }

    /// Access the underlying transport for operations outside the trait
    /// (synthdef directory loads, server notifications).
    pub fn osc_client(&self) -> &dyn OscClientLike {
        self.client.as_ref()
    }
}

impl AudioBackend for ScBackend {
    fn create_group(&self, group_id: i32, add_action: i32, target: i32) -> BackendResult {
        self.client
            .create_group(group_id, add_action, target)
            .map_err(BackendError::from)
    }

    fn create_synth(
        &self,
        def_name: &str,
        node_id: i32,
        group_id: i32,
        params: &[(String, f32)],
    ) -> BackendResult {
        self.client
            .create_synth_in_group(def_name, node_id, group_id, params)
            .map_err(BackendError::from)
    }

    fn free_node(&self, node_id: i32) -> BackendResult {
        self.client.free_node(node_id).map_err(BackendError::from)
    }

    fn run_node(&self, node_id: i32, on: bool) -> BackendResult {
        self.client
            .run_node(node_id, on)
            .map_err(BackendError::from)
    }

    fn set_param(&self, node_id: i32, param: &str, value: f32) -> BackendResult {
        self.client
            .set_param(node_id, param, value)
            .map_err(BackendError::from)
    }

    fn set_params(&self, node_id: i32, params: &[(&str, f32)]) -> BackendResult {
        self.client
            .set_params(node_id, params)
            .map_err(BackendError::from)
    }

    fn load_buffer(&self, bufnum: i32, path: &Path) -> BackendResult {
        let path_str = path.to_string_lossy();
        self.client
            .load_buffer(bufnum, &path_str)
            .map_err(BackendError::from)
    }

    fn free_buffer(&self, bufnum: i32) -> BackendResult {
        self.client.free_buffer(bufnum).map_err(BackendError::from)
    }

    fn load_synthdef_dir(&self, dir: &Path) -> BackendResult {
        let dir_str = dir.to_string_lossy();
        self.client
            .load_synthdef_dir(&dir_str)
            .map_err(BackendError::from)
    }

    fn request_status(&self) -> BackendResult {
        self.client.request_status().map_err(BackendError::from)
    }

    fn send_raw(&self, addr: &str, args: Vec<RawArg>) -> BackendResult {
        let osc_args: Vec<rosc::OscType> = args
            .into_iter()
            .map(|a| match a {
                RawArg::Int(v) => rosc::OscType::Int(v),
                RawArg::Float(v) => rosc::OscType::Float(v),
                RawArg::Str(v) => rosc::OscType::String(v),
            })
            .collect();
        self.client
            .send_message(addr, osc_args)
            .map_err(BackendError::from)
    }
}

// ─── Test backend ───────────────────────────────────────────────────

use std::sync::{Arc, Mutex};

/// An operation recorded by `TestBackend` for assertion in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum TestOp {
    CreateGroup {
        group_id: i32,
        add_action: i32,
        target: i32,
    },
    CreateSynth {
        def_name: String,
        node_id: i32,
        group_id: i32,
        params: Vec<(String, f32)>,
    },
    FreeNode(i32),
    RunNode {
        node_id: i32,
        on: bool,
    },
    SetParam {
        node_id: i32,
        param: String,
        value: f32,
    },
    SetParams {
        node_id: i32,
        params: Vec<(String, f32)>,
    },
    LoadBuffer {
        bufnum: i32,
        path: String,
    },
    FreeBuffer(i32),
    LoadSynthDefDir(String),
    RequestStatus,
    SendRaw {
        addr: String,
        args: Vec<RawArg>,
    },
}

/// A test backend that records all operations into a vector for assertions.
/// All operations succeed. `Mutex` gives interior mutability so tests can
/// share the backend with the engine through an `Arc`.
pub struct TestBackend {
    ops: Mutex<Vec<TestOp>>,
}

impl TestBackend {
    pub fn new() -> Self {
        Self {
            ops: Mutex::new(Vec::new()),
        }
    }

    /// Return all recorded operations.
    pub fn operations(&self) -> Vec<TestOp> {
        self.ops.lock().unwrap().clone()
    }

    /// Clear recorded operations.
    pub fn clear(&self) {
        self.ops.lock().unwrap().clear();
    }

    /// Count operations matching a predicate.
    pub fn count<F: Fn(&TestOp) -> bool>(&self, f: F) -> usize {
        self.ops.lock().unwrap().iter().filter(|op| f(op)).count()
    }

    /// Find the first operation matching a predicate.
    pub fn find<F: Fn(&TestOp) -> bool>(&self, f: F) -> Option<TestOp> {
        self.ops.lock().unwrap().iter().find(|op| f(op)).cloned()
    }

    /// Return all CreateSynth operations.
    pub fn synths_created(&self) -> Vec<TestOp> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter(|op| matches!(op, TestOp::CreateSynth { .. }))
            .cloned()
            .collect()
    }

    /// Return all FreeNode operations.
    pub fn nodes_freed(&self) -> Vec<i32> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter_map(|op| match op {
                TestOp::FreeNode(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// The last value written to `param` on `node_id`, through either
    /// `SetParam` or `SetParams`. This is what the server would hold.
    pub fn last_param(&self, node_id: i32, param: &str) -> Option<f32> {
        let ops = self.ops.lock().unwrap();
        let mut last = None;
        for op in ops.iter() {
            match op {
                TestOp::SetParam { node_id: n, param: p, value } if *n == node_id && p == param => {
                    last = Some(*value);
                }
                TestOp::SetParams { node_id: n, params } if *n == node_id => {
                    for (p, v) in params {
                        if p == param {
                            last = Some(*v);
                        }
                    }
                }
                _ => {}
            }
        }
        last
    }
}

impl AudioBackend for TestBackend {
    fn create_group(&self, group_id: i32, add_action: i32, target: i32) -> BackendResult {
        self.ops.lock().unwrap().push(TestOp::CreateGroup {
            group_id,
            add_action,
            target,
        });
        Ok(())
    }

    fn create_synth(
        &self,
        def_name: &str,
        node_id: i32,
        group_id: i32,
        params: &[(String, f32)],
    ) -> BackendResult {
        self.ops.lock().unwrap().push(TestOp::CreateSynth {
            def_name: def_name.to_string(),
            node_id,
            group_id,
            params: params.to_vec(),
        });
        Ok(())
    }

    fn free_node(&self, node_id: i32) -> BackendResult {
        self.ops.lock().unwrap().push(TestOp::FreeNode(node_id));
        Ok(())
    }

    fn run_node(&self, node_id: i32, on: bool) -> BackendResult {
        self.ops.lock().unwrap().push(TestOp::RunNode { node_id, on });
        Ok(())
    }

    fn set_param(&self, node_id: i32, param: &str, value: f32) -> BackendResult {
        self.ops.lock().unwrap().push(TestOp::SetParam {
            node_id,
            param: param.to_string(),
            value,
        });
        Ok(())
    }

    fn set_params(&self, node_id: i32, params: &[(&str, f32)]) -> BackendResult {
        self.ops.lock().unwrap().push(TestOp::SetParams {
            node_id,
            params: params.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        });
        Ok(())
    }

    fn load_buffer(&self, bufnum: i32, path: &Path) -> BackendResult {
        self.ops.lock().unwrap().push(TestOp::LoadBuffer {
            bufnum,
            path: path.to_string_lossy().to_string(),
        });
        Ok(())
    }

    fn free_buffer(&self, bufnum: i32) -> BackendResult {
        self.ops.lock().unwrap().push(TestOp::FreeBuffer(bufnum));
        Ok(())
    }

    fn load_synthdef_dir(&self, dir: &Path) -> BackendResult {
        self.ops
            .lock()
            .unwrap()
            .push(TestOp::LoadSynthDefDir(dir.to_string_lossy().to_string()));
        Ok(())
    }

    fn request_status(&self) -> BackendResult {
        self.ops.lock().unwrap().push(TestOp::RequestStatus);
        Ok(())
    }

    fn send_raw(&self, addr: &str, args: Vec<RawArg>) -> BackendResult {
        self.ops.lock().unwrap().push(TestOp::SendRaw {
            addr: addr.to_string(),
            args,
        });
        Ok(())
    }
}

impl Default for TestBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Tests hand the engine `Box::new(Arc<TestBackend>)` and keep a clone of the
/// `Arc` for assertions.
impl AudioBackend for Arc<TestBackend> {
    fn create_group(&self, group_id: i32, add_action: i32, target: i32) -> BackendResult {
        self.as_ref().create_group(group_id, add_action, target)
    }

    fn create_synth(
        &self,
        def_name: &str,
        node_id: i32,
        group_id: i32,
        params: &[(String, f32)],
    ) -> BackendResult {
        self.as_ref().create_synth(def_name, node_id, group_id, params)
    }

    fn free_node(&self, node_id: i32) -> BackendResult {
        self.as_ref().free_node(node_id)
    }

    fn run_node(&self, node_id: i32, on: bool) -> BackendResult {
        self.as_ref().run_node(node_id, on)
    }

    fn set_param(&self, node_id: i32, param: &str, value: f32) -> BackendResult {
        self.as_ref().set_param(node_id, param, value)
    }

    fn set_params(&self, node_id: i32, params: &[(&str, f32)]) -> BackendResult {
        self.as_ref().set_params(node_id, params)
    }

    fn load_buffer(&self, bufnum: i32, path: &Path) -> BackendResult {
        self.as_ref().load_buffer(bufnum, path)
    }

    fn free_buffer(&self, bufnum: i32) -> BackendResult {
        self.as_ref().free_buffer(bufnum)
    }

    fn load_synthdef_dir(&self, dir: &Path) -> BackendResult {
        self.as_ref().load_synthdef_dir(dir)
    }

    fn request_status(&self) -> BackendResult {
        self.as_ref().request_status()
    }

    fn send_raw(&self, addr: &str, args: Vec<RawArg>) -> BackendResult {
        self.as_ref().send_raw(addr, args)
    }
}

// ─── Null backend ───────────────────────────────────────────────────

/// A no-op backend that silently succeeds; the engine's default before any
/// server connection exists.
pub struct NullBackend;

impl AudioBackend for NullBackend {
    fn create_group(&self, _: i32, _: i32, _: i32) -> BackendResult {
        Ok(())
    }

    fn create_synth(&self, _: &str, _: i32, _: i32, _: &[(String, f32)]) -> BackendResult {
        Ok(())
    }

    fn free_node(&self, _: i32) -> BackendResult {
        Ok(())
    }

    fn run_node(&self, _: i32, _: bool) -> BackendResult {
        Ok(())
    }

    fn set_param(&self, _: i32, _: &str, _: f32) -> BackendResult {
        Ok(())
    }

    fn set_params(&self, _: i32, _: &[(&str, f32)]) -> BackendResult {
        Ok(())
    }

    fn load_buffer(&self, _: i32, _: &Path) -> BackendResult {
        Ok(())
    }

    fn free_buffer(&self, _: i32) -> BackendResult {
        Ok(())
    }

    fn load_synthdef_dir(&self, _: &Path) -> BackendResult {
        Ok(())
    }

    fn request_status(&self) -> BackendResult {
        Ok(())
    }

    fn send_raw(&self, _: &str, _: Vec<RawArg>) -> BackendResult {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_param_sees_both_set_forms() {
        let backend = TestBackend::new();
        backend.set_param(10, "wet", 0.3).unwrap();
        backend.set_params(10, &[("wet", 0.5), ("wet_lag", 1.0)]).unwrap();
        backend.set_param(11, "wet", 0.9).unwrap();
        assert_eq!(backend.last_param(10, "wet"), Some(0.5));
        assert_eq!(backend.last_param(10, "wet_lag"), Some(1.0));
        assert_eq!(backend.last_param(10, "dry"), None);
        assert_eq!(backend.last_param(11, "wet"), Some(0.9));
    }

    #[test]
    fn test_shared_arc_records_through_clone() {
        let backend = Arc::new(TestBackend::new());
        let boxed: Box<dyn AudioBackend> = Box::new(backend.clone());
        boxed.free_node(42).unwrap();
        assert_eq!(backend.nodes_freed(), vec![42]);
    }

    #[test]
    fn test_null_backend_accepts_everything() {
        let backend: Box<dyn AudioBackend> = Box::new(NullBackend);
        assert!(backend.create_group(1, 1, 0).is_ok());
        assert!(backend.set_params(10, &[("wet", 0.5), ("wet_lag", 1.0)]).is_ok());
        assert!(backend.send_raw("/quit", vec![]).is_ok());
    }
}
