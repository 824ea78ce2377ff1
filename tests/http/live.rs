use core::time::Duration;
use dotenvy::dotenv;
use librequests::network::application::http::{Config, Session};
use librequests::network::error::Error;
use librequests::network::{Close, Connect, Connection, Read, Write};
use std::env;
use std::io::{ErrorKind, Read as StdRead, Write as StdWrite};
use std::net::{Shutdown, TcpStream};

struct NetConnection {
    stream: TcpStream,
}

fn kind(e: std::io::Error) -> Error {
    match e.kind() {
        ErrorKind::WouldBlock => Error::WouldBlock,
        ErrorKind::TimedOut => Error::Timeout,
        ErrorKind::ConnectionRefused => Error::ConnectionRefused,
        ErrorKind::OutOfMemory => Error::OutOfMemory,
        _ => Error::ReadError,
    }
}

impl Read for NetConnection {
    type Error = Error;
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.stream.read(buf).map_err(kind)
    }
}

impl Write for NetConnection {
    type Error = Error;
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.stream.write(buf).map_err(|_| Error::WriteError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.stream.flush().map_err(|_| Error::WriteError)
    }
}

impl Close for NetConnection {
    type Error = Error;
    fn close(self) -> Result<(), Self::Error> {
        self.stream.shutdown(Shutdown::Both).map_err(|_| Error::NotOpen)
    }
}

impl Connection for NetConnection {}

struct NetConnector;

impl Connect for NetConnector {
    type Connection = NetConnection;
    type Error = Error;

    fn connect(
        &mut self,
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> Result<NetConnection, Error> {
        let stream = TcpStream::connect((host, port)).map_err(kind)?;
        stream.set_read_timeout(timeout).map_err(kind)?;
        Ok(NetConnection { stream })
    }
}

#[test]
#[ignore = "needs network access"]
fn test_http_get() {
    dotenv().ok();
    let base = env::var("TEST_HTTP_URL").unwrap_or("http://httpbin.org".to_string());
    let mut session = Session::new(NetConnector, Config::default());

    let mut response = session.get(&format!("{base}/get")).unwrap();
    assert_eq!(response.status_code(), 200);
    assert!(response.text().unwrap().contains("librequests"));

    let mut response = session.get(&format!("{base}/redirect/2")).unwrap();
    assert_eq!(response.status_code(), 200);
    response.close().unwrap();

    let chunks = session
        .get(&format!("{base}/stream-bytes/300?chunk_size=64"))
        .unwrap()
        .iter_content(100)
        .map(|chunk| chunk.unwrap().len())
        .collect::<Vec<_>>();
    assert_eq!(chunks, [100, 100, 100]);
}
