//! rotctld 行协议服务端
//!
//! 每个连接一个线程，所有连接共享同一台模拟转台。
//! 监听 socket 为非阻塞模式，连接读超时 200ms，以便及时响应停止标志。

use crate::model::SimulatedRotator;
use rotbridge_protocol::{HamlibErrorCode, HamlibStatus, Position, ProtocolError, RotctldCommand};
use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const ACCEPT_IDLE: Duration = Duration::from_millis(50);
const CONNECTION_READ_TIMEOUT: Duration = Duration::from_millis(200);

/// 模拟器参数
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// `_` 命令返回的型号
    pub model: String,
    /// 角速度（度/秒）
    pub slew_rate: f64,
}

/// 转台状态 + 上次推进时间
struct SimState {
    rotator: SimulatedRotator,
    last_update: Instant,
}

impl SimState {
    /// 按真实时间推进到当前时刻
    fn sync(&mut self) -> &mut SimulatedRotator {
        let now = Instant::now();
        self.rotator.advance(now.duration_since(self.last_update));
        self.last_update = now;
        &mut self.rotator
    }
}

/// 模拟 rotctld
pub struct RotctldServer {
    listener: TcpListener,
    state: Arc<Mutex<SimState>>,
    model: Arc<str>,
    running: Arc<AtomicBool>,
}

impl RotctldServer {
    pub fn bind(addr: SocketAddr, config: SimConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener,
            state: Arc::new(Mutex::new(SimState {
                rotator: SimulatedRotator::new(config.slew_rate),
                last_update: Instant::now(),
            })),
            model: Arc::from(config.model),
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// 运行标志（置 false 后 `serve` 返回）
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// 接受连接直到运行标志被清除
    pub fn serve(&self) -> io::Result<()> {
        while self.running.load(Ordering::Acquire) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    info!("Client connected: {}", peer);
                    let state = self.state.clone();
                    let model = self.model.clone();
                    let running = self.running.clone();
                    thread::Builder::new()
                        .name(format!("rotctld-{}", peer))
                        .spawn(move || {
                            if let Err(e) = handle_connection(stream, &state, &model, &running) {
                                warn!("Connection {} ended with error: {}", peer, e);
                            }
                            info!("Client disconnected: {}", peer);
                        })?;
                },
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(ACCEPT_IDLE),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

fn handle_connection(
    stream: TcpStream,
    state: &Mutex<SimState>,
    model: &str,
    running: &AtomicBool,
) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(CONNECTION_READ_TIMEOUT))?;
    let mut writer = stream.try_clone()?;
    let mut reader = BufReader::new(stream);
    let mut line = String::new();

    while running.load(Ordering::Acquire) {
        match reader.read_line(&mut line) {
            Ok(0) => return Ok(()),
            Ok(_) => {},
            // 未读完的半行保留在 line 中
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                continue;
            },
            Err(e) => return Err(e),
        }

        let reply = respond(&line, state, model);
        line.clear();
        match reply {
            Some(reply) => writer.write_all(reply.as_bytes())?,
            None => return Ok(()),
        }
    }
    Ok(())
}

/// 生成一条命令的应答；`None` 表示客户端请求断开
fn respond(line: &str, state: &Mutex<SimState>, model: &str) -> Option<String> {
    let trimmed = line.trim();
    debug!("<- {:?}", trimmed);
    if trimmed.is_empty() {
        return Some(String::new());
    }
    if matches!(trimmed, "q" | "Q") {
        return None;
    }

    let reply = match RotctldCommand::parse_line(trimmed) {
        Ok(RotctldCommand::Identify) => format!("{}\n", model),
        Ok(RotctldCommand::SetPosition(target)) => {
            if !in_range(&target) {
                warn!("Refusing out-of-range target {}", target);
                HamlibStatus::from_code(HamlibErrorCode::InvalidParameter).to_line()
            } else {
                with_rotator(state, |rotator| {
                    info!("Slewing from {} to {}", rotator.position(), target);
                    rotator.set_target(target);
                })
            }
        },
        Ok(RotctldCommand::GetPosition) => match lock(state) {
            Some(mut guard) => {
                let rotator = guard.sync();
                if rotator.is_moving() {
                    debug!("Slewing toward {}", rotator.target());
                }
                let position = rotator.position();
                format!("{:.6}\n{:.6}\n", position.azimuth, position.elevation)
            },
            None => HamlibStatus::from_code(HamlibErrorCode::Internal).to_line(),
        },
        Ok(RotctldCommand::Stop) => with_rotator(state, |rotator| {
            info!("Stop at {}", rotator.position());
            rotator.stop();
        }),
        Err(ProtocolError::UnknownCommand(name)) => {
            warn!("Unsupported command: {}", name);
            HamlibStatus::from_code(HamlibErrorCode::NotImplemented).to_line()
        },
        Err(e) => {
            warn!("Bad command {:?}: {}", trimmed, e);
            HamlibStatus::from_code(HamlibErrorCode::InvalidParameter).to_line()
        },
    };
    debug!("-> {:?}", reply);
    Some(reply)
}

fn in_range(target: &Position) -> bool {
    (0.0..=360.0).contains(&target.azimuth) && (0.0..=90.0).contains(&target.elevation)
}

fn lock(state: &Mutex<SimState>) -> Option<std::sync::MutexGuard<'_, SimState>> {
    match state.lock() {
        Ok(guard) => Some(guard),
        Err(_) => {
            error!("Rotator state lock poisoned");
            None
        },
    }
}

/// 推进模型后执行设置类操作，返回 `RPRT` 状态行
fn with_rotator<F>(state: &Mutex<SimState>, op: F) -> String
where
    F: FnOnce(&mut SimulatedRotator),
{
    match lock(state) {
        Some(mut guard) => {
            op(guard.sync());
            HamlibStatus::OK.to_line()
        },
        None => HamlibStatus::from_code(HamlibErrorCode::Internal).to_line(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotbridge_client::{MoveMode, MoveOutcome, RotatorClient, SessionConfig};
    use std::io::Read;

    struct Running {
        addr: SocketAddr,
        running: Arc<AtomicBool>,
        thread: Option<thread::JoinHandle<io::Result<()>>>,
    }

    impl Drop for Running {
        fn drop(&mut self) {
            self.running.store(false, Ordering::Release);
            if let Some(thread) = self.thread.take() {
                let _ = thread.join();
            }
        }
    }

    fn start(slew_rate: f64) -> Running {
        let server = RotctldServer::bind(
            "127.0.0.1:0".parse().unwrap(),
            SimConfig {
                model: "Test rotator".into(),
                slew_rate,
            },
        )
        .unwrap();
        let addr = server.local_addr().unwrap();
        let running = server.running_flag();
        let thread = thread::spawn(move || server.serve());
        Running {
            addr,
            running,
            thread: Some(thread),
        }
    }

    fn exchange(stream: &mut TcpStream, command: &str) -> String {
        stream.write_all(command.as_bytes()).unwrap();
        thread::sleep(Duration::from_millis(50));
        let mut buf = [0u8; 256];
        let n = stream.read(&mut buf).unwrap();
        String::from_utf8_lossy(&buf[..n]).into_owned()
    }

    #[test]
    fn test_raw_protocol() {
        let sim = start(0.0);
        let mut stream = TcpStream::connect(sim.addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

        assert_eq!(exchange(&mut stream, "_\n"), "Test rotator\n");
        assert_eq!(exchange(&mut stream, "P 120.0 30.0\n"), "RPRT 0\n");
        assert_eq!(exchange(&mut stream, "p\n"), "120.000000\n30.000000\n");
        assert_eq!(exchange(&mut stream, "S\n"), "RPRT 0\n");
        assert_eq!(exchange(&mut stream, "P 10 95\n"), "RPRT -1\n");
        assert_eq!(exchange(&mut stream, "P ten 5\n"), "RPRT -1\n");
        assert_eq!(exchange(&mut stream, "M 1 2\n"), "RPRT -4\n");
    }

    #[test]
    fn test_quit_closes_connection() {
        let sim = start(0.0);
        let mut stream = TcpStream::connect(sim.addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        stream.write_all(b"q\n").unwrap();

        let mut buf = [0u8; 16];
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_client_blocking_move() {
        let sim = start(0.0);
        let config = SessionConfig::new("127.0.0.1", sim.addr.port())
            .with_poll_interval(Duration::from_millis(50))
            .with_movement_timeout(Duration::from_secs(5));
        let mut client = RotatorClient::connect(&config).unwrap();
        assert_eq!(client.model(), "Test rotator");

        let outcome = client.command_position(-90.0, 45.0, MoveMode::Blocking);
        assert_eq!(outcome, MoveOutcome::Arrived(Position::new(270.0, 45.0)));
        assert_eq!(client.query_position(), Some(Position::new(270.0, 45.0)));
    }

    #[test]
    fn test_client_sees_slew_in_progress() {
        let sim = start(1.0);
        let config = SessionConfig::new("127.0.0.1", sim.addr.port());
        let mut client = RotatorClient::connect(&config).unwrap();

        let outcome = client.command_position(180.0, 80.0, MoveMode::NonBlocking);
        assert_eq!(outcome, MoveOutcome::Accepted);
        let position = client.query_position().unwrap();
        assert!(position.azimuth < 10.0, "got {}", position);
    }
}
