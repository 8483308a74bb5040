use may::coroutine::JoinHandle;
use may_minihttp::HttpService;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;

/// Wrapper around may_minihttp's HTTP server
pub struct HttpServer<T>(pub T);

/// Handle to a running HTTP server
pub struct ServerHandle {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ServerHandle {
    /// Address the server is bound to
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Poll the listening socket until it accepts connections (~1s at most).
    pub fn wait_ready(&self) -> io::Result<()> {
        for _ in 0..200 {
            if TcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"))
    }

    /// Cancel the server coroutine and wait for it to finish
    pub fn stop(self) {
        // SAFETY: cancelling the accept coroutine is how may_minihttp servers shut down;
        // the handle is owned here and not used afterwards.
        unsafe {
            self.handle.coroutine().cancel();
        }
        let _ = self.handle.join();
    }

    /// Block until the server coroutine exits
    pub fn join(self) -> std::thread::Result<()> {
        self.handle.join()
    }
}

impl<T: HttpService + Clone + Send + Sync + 'static> HttpServer<T> {
    /// Bind `addr` and start serving.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid address"))?;
        let handle = may_minihttp::HttpServer(self.0).start(addr)?;
        Ok(ServerHandle { addr, handle })
    }
}
