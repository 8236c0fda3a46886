//! Seqpacket echo
//!
//! Runs an fd-based endpoint over one end of an AF_UNIX seqpacket
//! socketpair. The other end plays the device: it sends a mix of IPv4,
//! IPv6 and junk frames and reads back whatever the stack side echoes.
//! The stack side is a queue dispatcher drained by a sleeping consumer
//! that writes every packet straight back through the endpoint.
//!
//! Usage:
//!     cargo build --release -p seqpacket-echo
//!     ./target/release/seqpacket-echo [frames] [max_size]
//!
//! Environment:
//!     LINKIO_LOG_LEVEL=info       dispatch loop start/stop
//!     LINKIO_BUF_TIERS=256,65536  custom receive tiers
//!     LINKIO_QUEUE_CAPACITY=64    smaller queue, more drops

use linkio::{
    kerror, kinfo, EndpointConfig, FnClose, LinkEndpoint, LinkError, LinkResult, LinkStack,
    NetworkProtocol,
};
use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Device side gives up after this long without an echo
const IDLE_TIMEOUT_MS: i32 = 500;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let frames: usize = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(10_000);
    let max_size: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(1500).max(64);

    if let Err(e) = run(frames, max_size) {
        eprintln!("seqpacket-echo: {}", e);
        std::process::exit(1);
    }
}

fn socketpair() -> LinkResult<(OwnedFd, OwnedFd)> {
    let mut fds = [0 as libc::c_int; 2];
    let ret = unsafe {
        libc::socketpair(
            libc::AF_UNIX,
            libc::SOCK_SEQPACKET | libc::SOCK_CLOEXEC,
            0,
            fds.as_mut_ptr(),
        )
    };
    if ret != 0 {
        let errno = std::io::Error::last_os_error().raw_os_error().unwrap_or(libc::EIO);
        return Err(LinkError::Os(errno));
    }
    Ok(unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) })
}

/// Frame `i` of the test pattern; every tenth has no valid IP version
fn frame(i: usize, max_size: usize) -> Vec<u8> {
    let len = 20 + (i * 131) % (max_size - 20);
    let mut f = vec![(i & 0xff) as u8; len];
    f[0] = match i % 10 {
        9 => 0x10,
        n if n % 3 == 0 => 0x60,
        _ => 0x45,
    };
    f
}

fn send_frames(fd: RawFd, frames: usize, max_size: usize) -> usize {
    let mut sent = 0;
    for i in 0..frames {
        let f = frame(i, max_size);
        let n = unsafe { libc::write(fd, f.as_ptr() as *const libc::c_void, f.len()) };
        if n < 0 {
            kerror!("device write failed: {}", std::io::Error::last_os_error());
            break;
        }
        sent += 1;
    }
    sent
}

/// Read echoes until the device has been idle for `IDLE_TIMEOUT_MS`
fn read_echoes(fd: RawFd, max_size: usize) -> (usize, usize) {
    let mut buf = vec![0u8; max_size];
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let (mut count, mut bytes) = (0, 0);

    loop {
        let ready = unsafe { libc::poll(&mut pfd, 1, IDLE_TIMEOUT_MS) };
        if ready <= 0 {
            break;
        }
        let n = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        if n <= 0 {
            break;
        }
        count += 1;
        bytes += n as usize;
    }
    (count, bytes)
}

fn run(frames: usize, max_size: usize) -> LinkResult<()> {
    let config = EndpointConfig::from_env();
    config.print();
    let stack = LinkStack::new(config)?;

    let (device, host) = socketpair()?;

    let closed = FnClose(|err: Option<LinkError>| match err {
        None => kinfo!("endpoint closed cleanly"),
        Some(e) => kerror!("endpoint failed: {}", e),
    });
    let (id, ep) = stack.open(host.as_raw_fd(), Some(Box::new(closed)))?;

    let (dispatcher, mut rx) = stack.packet_queue();
    ep.attach(Arc::new(dispatcher))?;
    println!("{} attached on fd {}", id, host.as_raw_fd());

    let start = Instant::now();

    // Stack side: echo every received packet
    let echo_ep = Arc::clone(&ep);
    let echoer = thread::spawn(move || {
        let (mut v4, mut v6) = (0usize, 0usize);
        while let Some(packet) = rx.recv() {
            match packet.protocol {
                NetworkProtocol::IPV4 => v4 += 1,
                NetworkProtocol::IPV6 => v6 += 1,
                _ => {}
            }
            if let Err(e) = echo_ep.write_packet(packet.data.as_slice(), None, packet.protocol) {
                kerror!("{}: echo failed: {}", packet.endpoint, e);
                break;
            }
        }
        (v4, v6, rx.dropped())
    });

    // Device side
    let device_fd = device.as_raw_fd();
    let writer = thread::spawn(move || send_frames(device_fd, frames, max_size));
    let (echoed, echoed_bytes) = read_echoes(device_fd, max_size);
    let sent = writer.join().unwrap_or(0);
    let elapsed = start.elapsed();

    // Stop the dispatch loop; the queue disconnects once it exits
    unsafe { libc::shutdown(host.as_raw_fd(), libc::SHUT_RDWR) };
    let terminal = ep.join();
    let (v4, v6, queue_dropped) = echoer.join().unwrap_or((0, 0, 0));

    let stats = ep.stats();
    println!();
    println!("=== seqpacket-echo ===");
    println!("frames sent:       {}", sent);
    println!("delivered:         {} ({} IPv4, {} IPv6)", stats.rx_packets, v4, v6);
    println!("discarded:         {}", stats.rx_discarded);
    println!("queue drops:       {}", queue_dropped);
    println!("echoed:            {} ({} bytes)", echoed, echoed_bytes);
    println!("echo drops:        {}", stats.tx_dropped);
    println!("terminal error:    {:?}", terminal);
    println!(
        "elapsed:           {:.2?} (excluding {} ms idle wait)",
        elapsed.saturating_sub(Duration::from_millis(IDLE_TIMEOUT_MS as u64)),
        IDLE_TIMEOUT_MS
    );

    stack.remove(id)?;
    Ok(())
}
