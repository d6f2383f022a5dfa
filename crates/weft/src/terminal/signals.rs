//! SIGWINCH delivery via the self-pipe trick.
//!
//! The signal handler only writes one byte to a pipe; a watcher thread
//! blocks on the read end and notifies the event loop, which re-queries the
//! terminal size on its next iteration.

use std::{
    io, thread,
    sync::atomic::{AtomicI32, Ordering},
};

static PIPE_WR: AtomicI32 = AtomicI32::new(-1);

extern "C" fn on_sigwinch(_: libc::c_int) {
    let fd = PIPE_WR.load(Ordering::Relaxed);
    if fd >= 0 {
        // Async-signal-safe; the byte's value is irrelevant.
        unsafe {
            libc::write(fd, b"w".as_ptr().cast(), 1);
        }
    }
}

/// Install the SIGWINCH handler and spawn the watcher thread. `notify` is
/// invoked on the watcher thread for every resize.
pub(crate) fn watch_resize(notify: impl Fn() + Send + 'static) -> io::Result<()> {
    let mut fds = [0i32; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    let (rd, wr) = (fds[0], fds[1]);
    PIPE_WR.store(wr, Ordering::Relaxed);

    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = on_sigwinch as usize;
        sa.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&mut sa.sa_mask);
        if libc::sigaction(libc::SIGWINCH, &sa, std::ptr::null_mut()) != 0 {
            return Err(io::Error::last_os_error());
        }
    }

    thread::Builder::new()
        .name("weft-winch".into())
        .spawn(move || {
            let mut buf = [0u8; 64];
            loop {
                let n = unsafe { libc::read(rd, buf.as_mut_ptr().cast(), buf.len()) };
                if n <= 0 {
                    break;
                }
                notify();
            }
        })?;
    Ok(())
}
