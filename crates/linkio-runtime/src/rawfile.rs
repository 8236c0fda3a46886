//! Raw descriptor I/O
//!
//! Thin wrappers over readv/write/writev/poll for boundary-preserving
//! descriptors (TUN devices, datagram and seqpacket sockets). One call
//! moves exactly one frame.
//!
//! Descriptors are expected to be in non-blocking mode (`set_nonblocking`).
//! Reads become blocking by polling on EAGAIN; writes never wait.

use linkio_core::error::{LinkError, LinkResult};
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use std::os::unix::io::RawFd;
use std::time::Duration;

/// Map an errno onto the link error taxonomy
///
/// EBADF is the "descriptor closed" condition, EAGAIN (== EWOULDBLOCK)
/// the transient "not ready" condition.
pub fn errno_to_error(errno: Errno) -> LinkError {
    match errno {
        Errno::EBADF => LinkError::Closed,
        Errno::EAGAIN => LinkError::WouldBlock,
        e => LinkError::Os(e as i32),
    }
}

#[inline]
fn last_error() -> LinkError {
    errno_to_error(Errno::last())
}

/// Put `fd` into O_NONBLOCK mode
pub fn set_nonblocking(fd: RawFd) -> LinkResult<()> {
    let flags = fcntl(fd, FcntlArg::F_GETFL).map_err(errno_to_error)?;
    let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
    fcntl(fd, FcntlArg::F_SETFL(flags)).map_err(errno_to_error)?;
    Ok(())
}

/// Write one frame. Never waits; EAGAIN surfaces as `WouldBlock`.
pub fn non_blocking_write(fd: RawFd, buf: &[u8]) -> LinkResult<usize> {
    let ret = unsafe { libc::write(fd, buf.as_ptr() as *const libc::c_void, buf.len()) };
    if ret < 0 {
        return Err(last_error());
    }
    Ok(ret as usize)
}

/// Write one frame made of two segments with a single writev
pub fn non_blocking_write2(fd: RawFd, first: &[u8], second: &[u8]) -> LinkResult<usize> {
    if second.is_empty() {
        return non_blocking_write(fd, first);
    }

    let iovecs = [
        libc::iovec {
            iov_base: first.as_ptr() as *mut libc::c_void,
            iov_len: first.len(),
        },
        libc::iovec {
            iov_base: second.as_ptr() as *mut libc::c_void,
            iov_len: second.len(),
        },
    ];

    // Safety: both iovecs point into live borrowed slices; writev only reads.
    let ret = unsafe { libc::writev(fd, iovecs.as_ptr(), iovecs.len() as libc::c_int) };
    if ret < 0 {
        return Err(last_error());
    }
    Ok(ret as usize)
}

/// Read one frame into `iovecs`, waiting until one is available
///
/// Returns the frame length; 0 means the peer closed its end. EINTR is
/// retried, EAGAIN waits in poll(). Each poll() is bounded by
/// `poll_timeout` so that a descriptor closed by its owner is noticed
/// (the next readv fails with EBADF, reported as `LinkError::Closed`).
///
/// # Safety
///
/// Every iovec must describe writable memory that stays valid for the
/// duration of the call.
pub unsafe fn blocking_readv(
    fd: RawFd,
    iovecs: &[libc::iovec],
    poll_timeout: Option<Duration>,
) -> LinkResult<usize> {
    loop {
        let n = libc::readv(fd, iovecs.as_ptr(), iovecs.len() as libc::c_int);
        if n >= 0 {
            return Ok(n as usize);
        }

        match Errno::last() {
            Errno::EINTR => continue,
            Errno::EAGAIN => blocking_poll(fd, libc::POLLIN, poll_timeout)?,
            e => return Err(errno_to_error(e)),
        }
    }
}

/// Wait until `fd` reports one of `events`, an error/hangup, or the
/// timeout expires
///
/// Returns Ok in all those cases; the caller retries its syscall and
/// learns the real outcome there. POLLNVAL (fd not open) is `Closed`.
pub fn blocking_poll(fd: RawFd, events: libc::c_short, timeout: Option<Duration>) -> LinkResult<()> {
    let timeout_ms = match timeout {
        Some(d) => d.as_millis().min(libc::c_int::MAX as u128) as libc::c_int,
        None => -1,
    };
    let mut pfd = libc::pollfd {
        fd,
        events,
        revents: 0,
    };

    loop {
        let ret = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        if ret < 0 {
            match Errno::last() {
                Errno::EINTR => continue,
                e => return Err(errno_to_error(e)),
            }
        }
        if pfd.revents & libc::POLLNVAL != 0 {
            return Err(LinkError::Closed);
        }
        return Ok(());
    }
}
