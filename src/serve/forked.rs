use std::collections::HashSet;
use std::io;
use std::net::TcpListener;
use std::os::unix::io::AsRawFd;
use std::time::Duration;

use libc::{self, pid_t};

use crate::server::Handler;
use super::{GopherServer, ServerError, handle_connection};

/// How often exited children are reaped while no client connects
const REAP_INTERVAL: Duration = Duration::from_millis(500);


/// Child processes of the forking server that have not been reaped yet
///
/// Owned by the parent's accept loop. Children get their own copy on fork
/// and never look at it.
#[derive(Debug, Default)]
pub struct Children {
    pids: HashSet<pid_t>,
}

impl Children {
    pub fn new() -> Children {
        Children::default()
    }

    pub fn add(&mut self, pid: pid_t) {
        self.pids.insert(pid);
    }

    /// Number of children not reaped yet
    pub fn active(&self) -> usize {
        self.pids.len()
    }

    /// Reaps every child that has already exited, without blocking
    pub fn reap(&mut self) {
        let pids = self.pids.iter().cloned().collect::<Vec<_>>();
        for pid in pids {
            let mut status = 0;
            match unsafe { libc::waitpid(pid, &mut status, libc::WNOHANG) } {
                0 => {}
                -1 if io::Error::last_os_error().raw_os_error()
                        == Some(libc::EINTR) => {}
                _ => {
                    // exited, or not our child anymore (ECHILD)
                    self.pids.remove(&pid);
                }
            }
        }
    }

    /// Blocks until any child exits
    pub fn wait_any(&mut self) -> io::Result<()> {
        let mut status = 0;
        loop {
            let pid = unsafe { libc::waitpid(-1, &mut status, 0) };
            if pid > 0 {
                self.pids.remove(&pid);
                return Ok(());
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EINTR) => continue,
                Some(libc::ECHILD) => {
                    self.pids.clear();
                    return Ok(());
                }
                _ => return Err(err),
            }
        }
    }

    /// Blocks until `listener` has a connection to accept
    ///
    /// Children that exit in the meantime are reaped every `interval`, so
    /// an idle server doesn't keep zombies around.
    pub fn wait_for_connection(&mut self, listener: &TcpListener,
        interval: Duration)
        -> io::Result<()>
    {
        let timeout = interval.as_millis().min(libc::c_int::max_value() as u128)
            as libc::c_int;
        loop {
            let mut fd = libc::pollfd {
                fd: listener.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            };
            match unsafe { libc::poll(&mut fd, 1, timeout) } {
                -1 => {
                    let err = io::Error::last_os_error();
                    if err.raw_os_error() != Some(libc::EINTR) {
                        return Err(err);
                    }
                }
                0 => self.reap(),
                _ => return Ok(()),
            }
        }
    }

    /// Reaps children, blocking while there are at least `max` of them
    pub fn collect(&mut self, max: usize) -> io::Result<()> {
        while self.active() >= max.max(1) {
            self.wait_any()?;
        }
        self.reap();
        Ok(())
    }
}

pub fn serve<H>(server: &GopherServer<H>) -> Result<(), ServerError>
    where H: Handler + Send + Sync + 'static
{
    let max_children = server.context.config().max_children;
    let mut children = Children::new();
    loop {
        children.collect(max_children)?;
        children.wait_for_connection(&server.listener, REAP_INTERVAL)?;
        let (sock, peer) = match server.accept()? {
            Some(pair) => pair,
            None => break,
        };
        match unsafe { libc::fork() } {
            -1 => {
                error!("Can't fork for {}: {}", peer,
                       io::Error::last_os_error());
            }
            0 => {
                handle_connection(sock, peer, &server.context,
                                  server.tls.as_ref());
                // never unwind or return into the parent's accept loop
                unsafe { libc::_exit(0) }
            }
            pid => {
                debug!("Forked child {} for {}", pid, peer);
                children.add(pid);
            }
        }
    }
    if children.active() > 0 {
        info!("Waiting for {} children to finish", children.active());
    }
    while children.active() > 0 {
        children.wait_any()?;
    }
    Ok(())
}
