//! Windows network table sampling.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};
use windows::core::PWSTR;
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::NetworkManagement::IpHelper::{
    FreeMibTable, GetExtendedTcpTable, GetIfTable2, MIB_IF_TABLE2, MIB_TCPTABLE_OWNER_PID,
    TCP_TABLE_OWNER_PID_ALL,
};
use windows::Win32::Networking::WinSock::AF_INET;
use windows::Win32::System::Threading::{
    OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
    PROCESS_QUERY_LIMITED_INFORMATION,
};

use crate::telemetry::push::PUSH_INTERVAL;
use crate::telemetry::sample::{
    hide_from_active, protocol_for_port, ActiveConnection, ConnKey, ListeningPort, RateTracker,
    SeenConnections, TelemetryFrame, TelemetryState, TrafficLogEntry,
};

// MIB_TCP_STATE values
const STATE_LISTEN: u32 = 2;
const STATE_SYN_SENT: u32 = 3;
const STATE_ESTABLISHED: u32 = 5;

// IF_TYPE_SOFTWARE_LOOPBACK
const IF_LOOPBACK: u32 = 24;

#[derive(Debug, Clone)]
struct TcpRow {
    local_ip: Ipv4Addr,
    local_port: u16,
    remote_ip: Ipv4Addr,
    remote_port: u16,
    state: u32,
    pid: u32,
}

/// Starts the sampling thread. `own_pid` identifies the engine itself so
/// its loopback control-plane chatter never shows up in the feed.
pub fn spawn_collector(
    state: Arc<TelemetryState>,
    own_pid: u32,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name("telemetry-collect".into())
        .spawn(move || collect_loop(state, own_pid))
}

fn collect_loop(state: Arc<TelemetryState>, own_pid: u32) {
    debug!("telemetry collector started");
    let mut rates = RateTracker::default();
    let mut seen = SeenConnections::default();
    let mut last_sample = Instant::now();

    loop {
        std::thread::sleep(PUSH_INTERVAL);
        let elapsed = last_sample.elapsed();
        last_sample = Instant::now();

        let (total_sent, total_recv) = interface_totals();
        let (upload_bps, download_bps) = rates.update(total_sent, total_recv, elapsed);

        let rows = tcp_rows();
        let mut names: HashMap<u32, String> = HashMap::new();
        let mut name_of = |pid: u32| -> String {
            names
                .entry(pid)
                .or_insert_with(|| process_name(pid))
                .clone()
        };

        let listening: Vec<&TcpRow> = rows.iter().filter(|r| r.state == STATE_LISTEN).collect();
        let listening_local_ports: Vec<u16> = listening.iter().map(|r| r.local_port).collect();

        let mut frame = TelemetryFrame {
            upload_bps,
            download_bps,
            total_sent,
            total_recv,
            ..Default::default()
        };
        let mut log_entries = Vec::new();

        for row in listening.iter() {
            frame.listening_ports.push(ListeningPort {
                port: row.local_port,
                socket_type: "SOCK_STREAM".into(),
                protocol: protocol_for_port(row.local_port).into(),
                process: name_of(row.pid),
            });
        }

        for row in rows.iter() {
            if row.state != STATE_ESTABLISHED && row.state != STATE_SYN_SENT {
                continue;
            }
            if row.pid == own_pid
                && (row.local_ip.is_loopback() || row.remote_ip.is_loopback())
            {
                continue;
            }
            let process = name_of(row.pid);

            if seen.note(conn_key(row)) {
                let incoming = listening_local_ports.contains(&row.local_port);
                let attempt = row.state == STATE_SYN_SENT;
                let (direction, protocol, ip_port) = if incoming {
                    (
                        if attempt { "AT-IN" } else { "INCOMING" },
                        protocol_for_port(row.local_port),
                        format!("{}:{}>{}", row.remote_ip, row.remote_port, row.local_port),
                    )
                } else {
                    (
                        if attempt { "AT-OUT" } else { "OUTGOING" },
                        protocol_for_port(row.remote_port),
                        format!("{}:{}", row.remote_ip, row.remote_port),
                    )
                };
                log_entries.push(TrafficLogEntry {
                    timestamp: wall_clock(),
                    direction: direction.into(),
                    ip_port,
                    protocol: protocol.into(),
                    process: process.clone(),
                });
            }

            if row.state == STATE_ESTABLISHED {
                let protocol = protocol_for_port(row.remote_port);
                if hide_from_active(&process, protocol) {
                    continue;
                }
                frame.active_connections.push(ActiveConnection {
                    ip: row.remote_ip.to_string(),
                    port: row.remote_port,
                    socket_type: "SOCK_STREAM".into(),
                    protocol: protocol.into(),
                    process,
                });
            }
        }

        if seen.needs_reseed() {
            seen.reseed(
                rows.iter()
                    .filter(|r| r.state == STATE_ESTABLISHED || r.state == STATE_SYN_SENT)
                    .map(conn_key),
            );
        }

        state.publish(frame, log_entries);
    }
}

fn conn_key(row: &TcpRow) -> ConnKey {
    (
        format!("{}:{}", row.local_ip, row.local_port),
        format!("{}:{}", row.remote_ip, row.remote_port),
        row.pid,
        row.state,
    )
}

/// Sums byte counters across physical interfaces.
fn interface_totals() -> (u64, u64) {
    let mut table: *mut MIB_IF_TABLE2 = std::ptr::null_mut();
    let status = unsafe { GetIfTable2(&mut table) };
    if status.is_err() || table.is_null() {
        warn!("GetIfTable2 failed");
        return (0, 0);
    }
    let mut sent = 0u64;
    let mut recv = 0u64;
    unsafe {
        let rows = std::slice::from_raw_parts((*table).Table.as_ptr(), (*table).NumEntries as usize);
        for row in rows {
            if row.Type != IF_LOOPBACK {
                sent += row.OutOctets;
                recv += row.InOctets;
            }
        }
        FreeMibTable(table.cast());
    }
    (sent, recv)
}

/// Snapshot of the IPv4 TCP table with owning pids.
fn tcp_rows() -> Vec<TcpRow> {
    let mut size = 0u32;
    unsafe {
        GetExtendedTcpTable(
            None,
            &mut size,
            false,
            AF_INET.0 as u32,
            TCP_TABLE_OWNER_PID_ALL,
            0,
        );
    }
    if size == 0 {
        return Vec::new();
    }
    let mut buf = vec![0u8; size as usize];
    let rc = unsafe {
        GetExtendedTcpTable(
            Some(buf.as_mut_ptr().cast()),
            &mut size,
            false,
            AF_INET.0 as u32,
            TCP_TABLE_OWNER_PID_ALL,
            0,
        )
    };
    if rc != 0 {
        warn!(rc, "GetExtendedTcpTable failed");
        return Vec::new();
    }

    let table = buf.as_ptr() as *const MIB_TCPTABLE_OWNER_PID;
    let count = unsafe { (*table).dwNumEntries } as usize;
    let raw = unsafe { std::slice::from_raw_parts((*table).table.as_ptr(), count) };
    raw.iter()
        .map(|r| TcpRow {
            local_ip: Ipv4Addr::from(r.dwLocalAddr.to_le_bytes()),
            local_port: u16::from_be(r.dwLocalPort as u16),
            remote_ip: Ipv4Addr::from(r.dwRemoteAddr.to_le_bytes()),
            remote_port: u16::from_be(r.dwRemotePort as u16),
            state: r.dwState,
            pid: r.dwOwningPid,
        })
        .collect()
}

fn process_name(pid: u32) -> String {
    if pid == 0 || pid == 4 {
        return "System".into();
    }
    let handle: HANDLE =
        match unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) } {
            Ok(h) => h,
            Err(_) => return "Access Denied".into(),
        };
    let mut buf = [0u16; 512];
    let mut len = buf.len() as u32;
    let result = unsafe {
        QueryFullProcessImageNameW(handle, PROCESS_NAME_WIN32, PWSTR(buf.as_mut_ptr()), &mut len)
    };
    unsafe {
        let _ = CloseHandle(handle);
    }
    match result {
        Ok(()) => {
            let full = String::from_utf16_lossy(&buf[..len as usize]);
            full.rsplit(['\\', '/'])
                .next()
                .unwrap_or("N/A")
                .to_string()
        }
        Err(_) => "N/A".into(),
    }
}

/// HH:MM:SS.mmm wall clock, UTC.
fn wall_clock() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO);
    let secs_of_day = now.as_secs() % 86_400;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        secs_of_day / 3600,
        (secs_of_day % 3600) / 60,
        secs_of_day % 60,
        now.subsec_millis()
    )
}
