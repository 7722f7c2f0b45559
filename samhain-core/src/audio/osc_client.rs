use std::net::UdpSocket;
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rosc::{OscMessage, OscPacket, OscType};

/// Shared server health data, readable from the app thread while the receive
/// thread writes it.
#[derive(Clone, Default)]
pub struct ServerMonitor {
    /// (average, peak) CPU from /status.reply
    cpu: Arc<RwLock<(f32, f32)>>,
    /// Live synth count from /status.reply
    num_synths: Arc<RwLock<i32>>,
    /// OSC round-trip latency in milliseconds
    latency_ms: Arc<RwLock<f32>>,
    /// Timestamp when /status was last sent (for latency measurement)
    status_sent_at: Arc<RwLock<Option<Instant>>>,
}

impl ServerMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cpu(&self) -> (f32, f32) {
        self.cpu.read().map(|v| *v).unwrap_or((0.0, 0.0))
    }

    pub fn num_synths(&self) -> i32 {
        self.num_synths.read().map(|v| *v).unwrap_or(0)
    }

    pub fn latency_ms(&self) -> f32 {
        self.latency_ms.read().map(|v| *v).unwrap_or(0.0)
    }

    /// Mark the time /status was sent, for latency measurement.
    pub fn mark_status_sent(&self) {
        if let Ok(mut ts) = self.status_sent_at.write() {
            *ts = Some(Instant::now());
        }
    }
}

/// Transport seam: what the SuperCollider backend needs from an OSC client.
/// The real client sends UDP; tests can substitute a recorder.
pub trait OscClientLike: Send {
    fn send_message(&self, addr: &str, args: Vec<OscType>) -> std::io::Result<()>;
    fn create_group(&self, group_id: i32, add_action: i32, target: i32) -> std::io::Result<()>;
    fn create_synth_in_group(
        &self,
        synth_def: &str,
        node_id: i32,
        group_id: i32,
        params: &[(String, f32)],
    ) -> std::io::Result<()>;
    fn free_node(&self, node_id: i32) -> std::io::Result<()>;
    fn run_node(&self, node_id: i32, on: bool) -> std::io::Result<()>;
    fn set_param(&self, node_id: i32, param: &str, value: f32) -> std::io::Result<()>;
    fn set_params(&self, node_id: i32, params: &[(&str, f32)]) -> std::io::Result<()>;
    fn load_buffer(&self, bufnum: i32, path: &str) -> std::io::Result<()>;
    fn free_buffer(&self, bufnum: i32) -> std::io::Result<()>;
    fn load_synthdef_dir(&self, dir: &str) -> std::io::Result<()>;
    fn request_status(&self) -> std::io::Result<()>;
}

pub struct OscClient {
    socket: UdpSocket,
    server_addr: String,
    monitor: ServerMonitor,
    _recv_thread: Option<JoinHandle<()>>,
}

fn handle_osc_packet(packet: &OscPacket, monitor: &ServerMonitor) {
    match packet {
        OscPacket::Message(msg) => {
            if msg.addr == "/status.reply" && msg.args.len() >= 7 {
                // /status.reply: [unused, ugens, synths, groups, synthdefs, avg_cpu, peak_cpu]
                let synths = match msg.args.get(2) {
                    Some(OscType::Int(v)) => *v,
                    _ => 0,
                };
                let avg_cpu = match msg.args.get(5) {
                    Some(OscType::Float(v)) => *v,
                    _ => 0.0,
                };
                let peak_cpu = match msg.args.get(6) {
                    Some(OscType::Float(v)) => *v,
                    _ => 0.0,
                };
                if let Ok(mut cpu) = monitor.cpu.write() {
                    *cpu = (avg_cpu, peak_cpu);
                }
                if let Ok(mut n) = monitor.num_synths.write() {
                    *n = synths;
                }
                if let Ok(mut ts) = monitor.status_sent_at.write() {
                    if let Some(sent) = ts.take() {
                        let latency = sent.elapsed().as_secs_f32() * 1000.0;
                        if let Ok(mut lat) = monitor.latency_ms.write() {
                            *lat = latency;
                        }
                    }
                }
            } else if msg.addr == "/fail" {
                log::warn!("scsynth: {:?}", msg.args);
            } else if msg.addr == "/done" {
                log::debug!("scsynth done: {:?}", msg.args);
            }
        }
        OscPacket::Bundle(bundle) => {
            for p in &bundle.content {
                handle_osc_packet(p, monitor);
            }
        }
    }
}

impl OscClient {
    pub fn new(server_addr: &str) -> std::io::Result<Self> {
        Self::new_with_monitor(server_addr, ServerMonitor::new())
    }

    pub fn new_with_monitor(server_addr: &str, monitor: ServerMonitor) -> std::io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;

        let recv_socket = socket.try_clone()?;
        recv_socket.set_read_timeout(Some(Duration::from_millis(50)))?;
        let recv_monitor = monitor.clone();

        let handle = thread::spawn(move || {
            let mut buf = [0u8; 4096];
            loop {
                match recv_socket.recv(&mut buf) {
                    Ok(n) => {
                        if let Ok((_, packet)) = rosc::decoder::decode_udp(&buf[..n]) {
                            handle_osc_packet(&packet, &recv_monitor);
                        }
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            socket,
            server_addr: server_addr.to_string(),
            monitor,
            _recv_thread: Some(handle),
        })
    }

    pub fn monitor(&self) -> ServerMonitor {
        self.monitor.clone()
    }
}

impl OscClientLike for OscClient {
    fn send_message(&self, addr: &str, args: Vec<OscType>) -> std::io::Result<()> {
        let msg = OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args,
        });
        let buf = rosc::encoder::encode(&msg)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        self.socket.send_to(&buf, &self.server_addr)?;
        Ok(())
    }

    /// /g_new group_id add_action target
    fn create_group(&self, group_id: i32, add_action: i32, target: i32) -> std::io::Result<()> {
        self.send_message(
            "/g_new",
            vec![
                OscType::Int(group_id),
                OscType::Int(add_action),
                OscType::Int(target),
            ],
        )
    }

    /// /s_new synthdef node_id addToTail(1) group [param value ...]
    fn create_synth_in_group(
        &self,
        synth_def: &str,
        node_id: i32,
        group_id: i32,
        params: &[(String, f32)],
    ) -> std::io::Result<()> {
        let mut args: Vec<OscType> = vec![
            OscType::String(synth_def.to_string()),
            OscType::Int(node_id),
            OscType::Int(1), // addToTail
            OscType::Int(group_id),
        ];
        for (name, value) in params {
            args.push(OscType::String(name.clone()));
            args.push(OscType::Float(*value));
        }
        self.send_message("/s_new", args)
    }

    fn free_node(&self, node_id: i32) -> std::io::Result<()> {
        self.send_message("/n_free", vec![OscType::Int(node_id)])
    }

    /// /n_run node_id on — pause or resume without freeing
    fn run_node(&self, node_id: i32, on: bool) -> std::io::Result<()> {
        self.send_message(
            "/n_run",
            vec![OscType::Int(node_id), OscType::Int(if on { 1 } else { 0 })],
        )
    }

    fn set_param(&self, node_id: i32, param: &str, value: f32) -> std::io::Result<()> {
        self.send_message(
            "/n_set",
            vec![
                OscType::Int(node_id),
                OscType::String(param.to_string()),
                OscType::Float(value),
            ],
        )
    }

    /// One /n_set with every pair; scsynth applies them in the same control
    /// block, which is what keeps a value and its lag companion in step.
    fn set_params(&self, node_id: i32, params: &[(&str, f32)]) -> std::io::Result<()> {
        let mut args: Vec<OscType> = vec![OscType::Int(node_id)];
        for (name, value) in params {
            args.push(OscType::String(name.to_string()));
            args.push(OscType::Float(*value));
        }
        self.send_message("/n_set", args)
    }

    /// /b_allocRead bufnum path startFrame numFrames(0 = whole file)
    fn load_buffer(&self, bufnum: i32, path: &str) -> std::io::Result<()> {
        self.send_message(
            "/b_allocRead",
            vec![
                OscType::Int(bufnum),
                OscType::String(path.to_string()),
                OscType::Int(0),
                OscType::Int(0),
            ],
        )
    }

    fn free_buffer(&self, bufnum: i32) -> std::io::Result<()> {
        self.send_message("/b_free", vec![OscType::Int(bufnum)])
    }

    /// /d_loadDir dir — load every compiled synthdef in a directory
    fn load_synthdef_dir(&self, dir: &str) -> std::io::Result<()> {
        self.send_message("/d_loadDir", vec![OscType::String(dir.to_string())])
    }

    fn request_status(&self) -> std::io::Result<()> {
        self.monitor.mark_status_sent();
        self.send_message("/status", vec![])
    }
}
