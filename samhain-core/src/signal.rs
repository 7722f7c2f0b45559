//! TCP line-protocol listener for external mood signals.
//!
//! A game (or the bundled simulator) connects and writes one signal per
//! line. Lines are trimmed and forwarded to an mpsc channel; the
//! application routes them through `AudioHandle::send_signal`. The reader
//! threads use short socket timeouts so the stop flag is observed promptly.

use std::io::{BufRead, BufReader};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub struct SignalListener {
    addr: String,
    stop: Arc<AtomicBool>,
    accept_thread: Option<JoinHandle<()>>,
}

impl SignalListener {
    /// Bind `listen_addr` and start accepting connections. Each connection
    /// gets its own reader thread feeding `tx`.
    pub fn start(listen_addr: &str, tx: Sender<String>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(listen_addr)?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?.to_string();
        let stop = Arc::new(AtomicBool::new(false));

        let accept_stop = stop.clone();
        let accept_thread = thread::spawn(move || loop {
            if accept_stop.load(Ordering::Relaxed) {
                break;
            }
            match listener.accept() {
                Ok((stream, peer)) => {
                    log::info!("Signal connection from {}", peer);
                    let conn_tx = tx.clone();
                    let conn_stop = accept_stop.clone();
                    thread::spawn(move || read_lines(stream, conn_tx, conn_stop));
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(50));
                }
                Err(e) => {
                    log::warn!("Signal listener accept failed: {}", e);
                    break;
                }
            }
        });

        log::info!("Signal listener on {}", addr);
        Ok(Self {
            addr,
            stop,
            accept_thread: Some(accept_thread),
        })
    }

    /// Actual bound address (useful when binding port 0).
    pub fn local_addr(&self) -> &str {
        &self.addr
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.accept_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SignalListener {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_lines(stream: TcpStream, tx: Sender<String>, stop: Arc<AtomicBool>) {
    if stream
        .set_read_timeout(Some(Duration::from_millis(50)))
        .is_err()
    {
        return;
    }
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    loop {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                let trimmed = line.trim();
                if !trimmed.is_empty() && tx.send(trimmed.to_string()).is_err() {
                    break;
                }
                line.clear();
            }
            // Timeout: keep any partial line and poll the stop flag
            Err(ref e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(_) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::mpsc;

    #[test]
    fn delivers_trimmed_nonempty_lines() {
        let (tx, rx) = mpsc::channel();
        let listener = SignalListener::start("127.0.0.1:0", tx).unwrap();

        let mut stream = TcpStream::connect(listener.local_addr()).unwrap();
        stream.write_all(b"epic\n  lofi  \n\nreset\n").unwrap();

        let timeout = Duration::from_secs(2);
        assert_eq!(rx.recv_timeout(timeout).unwrap(), "epic");
        assert_eq!(rx.recv_timeout(timeout).unwrap(), "lofi");
        assert_eq!(rx.recv_timeout(timeout).unwrap(), "reset");
    }

    #[test]
    fn serves_multiple_clients() {
        let (tx, rx) = mpsc::channel();
        let listener = SignalListener::start("127.0.0.1:0", tx).unwrap();

        let mut a = TcpStream::connect(listener.local_addr()).unwrap();
        let mut b = TcpStream::connect(listener.local_addr()).unwrap();
        a.write_all(b"anxiety\n").unwrap();
        b.write_all(b"heroic\n").unwrap();

        let timeout = Duration::from_secs(2);
        let mut got = vec![
            rx.recv_timeout(timeout).unwrap(),
            rx.recv_timeout(timeout).unwrap(),
        ];
        got.sort();
        assert_eq!(got, vec!["anxiety".to_string(), "heroic".to_string()]);
    }

    #[test]
    fn stop_joins_accept_thread() {
        let (tx, _rx) = mpsc::channel();
        let mut listener = SignalListener::start("127.0.0.1:0", tx).unwrap();
        listener.stop();
        assert!(listener.accept_thread.is_none());
    }
}
