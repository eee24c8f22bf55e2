use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use crate::server::Handler;
use super::{GopherServer, ServerError, handle_connection};


/// Number of connection threads still running
struct Workers {
    count: Mutex<usize>,
    done: Condvar,
}

/// Held by a connection thread, released when the thread ends (or when it
/// fails to start)
struct Running(Arc<Workers>);

impl Workers {
    fn lock(&self) -> MutexGuard<usize> {
        // the counter is always consistent, even if a holder panicked
        self.count.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn start(workers: &Arc<Workers>) -> Running {
        *workers.lock() += 1;
        Running(workers.clone())
    }

    /// Waits for all threads to finish, but not longer than `timeout`
    ///
    /// Returns the number of threads still running.
    fn wait(&self, timeout: Duration) -> usize {
        let guard = self.lock();
        let (guard, _) = self.done
            .wait_timeout_while(guard, timeout, |count| *count > 0)
            .unwrap_or_else(|e| e.into_inner());
        *guard
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        *self.0.lock() -= 1;
        self.0.done.notify_all();
    }
}

pub fn serve<H>(server: &GopherServer<H>) -> Result<(), ServerError>
    where H: Handler + Send + Sync + 'static
{
    let workers = Arc::new(Workers {
        count: Mutex::new(0),
        done: Condvar::new(),
    });
    while let Some((sock, peer)) = server.accept()? {
        let running = Workers::start(&workers);
        let context = server.context.clone();
        let tls = server.tls.clone();
        let spawned = thread::Builder::new()
            .name(format!("gopher {}", peer))
            .spawn(move || {
                let _running = running;
                handle_connection(sock, peer, &context, tls.as_ref());
            });
        if let Err(e) = spawned {
            error!("Can't start thread for {}: {}", peer, e);
        }
    }
    let left = workers.wait(server.context.config().join_timeout);
    if left > 0 {
        warn!("{} connections still running at shutdown", left);
    }
    Ok(())
}
