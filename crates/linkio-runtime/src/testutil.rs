//! Shared test fixtures

use std::os::unix::io::{FromRawFd, OwnedFd};

/// Connected AF_UNIX seqpacket pair: boundary-preserving like a TUN fd
pub fn seqpacket_pair() -> (OwnedFd, OwnedFd) {
    let mut fds = [0 as libc::c_int; 2];
    let ret = unsafe {
        libc::socketpair(
            libc::AF_UNIX,
            libc::SOCK_SEQPACKET | libc::SOCK_CLOEXEC,
            0,
            fds.as_mut_ptr(),
        )
    };
    assert_eq!(ret, 0, "socketpair failed");
    unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) }
}

/// Shrink the send buffer so tests can fill it quickly
pub fn set_small_sndbuf(fd: libc::c_int) {
    let size: libc::c_int = 4096;
    unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_SNDBUF,
            &size as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        );
    }
}

/// IPv4-looking frame of `len` bytes (first byte 0x45), tail filled with `fill`
pub fn ipv4_frame(len: usize, fill: u8) -> Vec<u8> {
    let mut f = vec![fill; len];
    if let Some(b) = f.first_mut() {
        *b = 0x45;
    }
    f
}

/// IPv6-looking frame of `len` bytes (first byte 0x60)
pub fn ipv6_frame(len: usize, fill: u8) -> Vec<u8> {
    let mut f = vec![fill; len];
    if let Some(b) = f.first_mut() {
        *b = 0x60;
    }
    f
}
