use crate::mock::{MockConnection, chunked};
use librequests::network::application::http::{Error, Response};
use librequests::network::error::Error as NetError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
Set-Cookie: session=1\r\n\
X-Request-Id: 0123456789abcdef0123456789abcdef0123456789abcdef\r\n\
set-cookie: theme=dark\r\n\
Content-Length: 11\r\n\
\r\n\
hello world";

#[derive(Debug, PartialEq)]
struct Parsed {
    status: u16,
    reason: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

fn parse(bytes: &[u8], step: usize) -> Parsed {
    let (connection, _log) = MockConnection::standalone(bytes, step);
    let mut response = Response::new(connection).unwrap();
    let body = response.content().unwrap().to_vec();
    Parsed {
        status: response.status_code(),
        reason: response.reason().to_string(),
        headers: response
            .headers()
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
        body,
    }
}

#[test]
fn parses_status_headers_and_body() {
    let parsed = parse(RESPONSE, 0);
    assert_eq!(parsed.status, 200);
    assert_eq!(parsed.reason, "OK");
    assert_eq!(parsed.body, b"hello world");
    assert!(
        parsed
            .headers
            .contains(&("set-cookie".to_string(), "session=1, theme=dark".to_string()))
    );
    assert!(
        parsed
            .headers
            .contains(&("content-type".to_string(), "text/plain; charset=utf-8".to_string()))
    );
}

#[test]
fn one_byte_reads_parse_like_one_shot() {
    assert_eq!(parse(RESPONSE, 1), parse(RESPONSE, 0));
}

#[test]
fn random_fragmentation_parses_like_one_shot() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..50 {
        let mut body = vec![0u8; rng.gen_range(0..300)];
        rng.fill(&mut body[..]);
        let bytes = chunked(&body, rng.gen_range(1..=40));

        let whole = parse(&bytes, 0);
        assert_eq!(whole.body, body);
        for step in [1, 2, rng.gen_range(3..=64)] {
            assert_eq!(parse(&bytes, step), whole);
        }
    }
}

#[test]
fn reason_phrase_may_contain_spaces() {
    let parsed = parse(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n", 1);
    assert_eq!(parsed.status, 404);
    assert_eq!(parsed.reason, "Not Found");
}

#[test]
fn header_whitespace_is_trimmed() {
    let parsed = parse(b"HTTP/1.1 200 OK\r\nX-Pad:    spaced   \r\nContent-Length:0\r\n\r\n", 0);
    assert!(parsed.headers.contains(&("x-pad".to_string(), "spaced".to_string())));
}

#[test]
fn body_without_framing_runs_until_close() {
    let (connection, log) = MockConnection::standalone(b"HTTP/1.0 200 OK\r\n\r\nall of it", 4);
    let mut response = Response::new(connection).unwrap();
    assert_eq!(response.content().unwrap(), b"all of it");
    assert_eq!(log.borrow().closed, [0]);
}

#[test]
fn chunked_framing_wins_over_content_length() {
    let bytes = b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n";
    assert_eq!(parse(bytes, 0).body, b"hello");
}

#[test]
fn bodyless_statuses_ignore_content_length() {
    let (connection, log) =
        MockConnection::standalone(b"HTTP/1.1 204 No Content\r\nContent-Length: 5\r\n\r\n", 0);
    let mut response = Response::new(connection).unwrap();
    assert_eq!(log.borrow().closed, [0]);
    assert_eq!(response.content().unwrap(), b"");
}

#[test]
fn empty_stream_is_an_empty_response() {
    let (connection, log) = MockConnection::standalone(b"", 0);
    assert_eq!(Response::new(connection).unwrap_err(), Error::EmptyResponse);
    assert_eq!(log.borrow().closed, [0]);
}

#[test]
fn non_numeric_status_is_rejected() {
    let (connection, log) = MockConnection::standalone(b"HTTP/1.1 abc OK\r\n\r\n", 0);
    assert_eq!(Response::new(connection).unwrap_err(), Error::InvalidStatus);
    assert_eq!(log.borrow().closed, [0]);
}

#[test]
fn malformed_headers_are_rejected() {
    let (connection, _) = MockConnection::standalone(b"HTTP/1.1 200 OK\r\nno colon\r\n\r\n", 0);
    assert_eq!(Response::new(connection).unwrap_err(), Error::InvalidHeader);

    let (connection, _) =
        MockConnection::standalone(b"HTTP/1.1 200 OK\r\nContent-Length: ten\r\n\r\n", 0);
    assert_eq!(Response::new(connection).unwrap_err(), Error::InvalidHeader);
}

#[test]
fn bad_chunk_size_fails_the_read() {
    let (connection, log) = MockConnection::standalone(
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\nhello\r\n0\r\n\r\n",
        0,
    );
    let mut response = Response::new(connection).unwrap();
    assert_eq!(response.content().unwrap_err(), Error::InvalidChunk);
    assert_eq!(log.borrow().closed, [0]);
    assert_eq!(response.read_into(&mut [0u8; 4]).unwrap_err(), Error::Closed);
}

#[test]
fn truncated_body_is_a_transport_error() {
    let (connection, log) =
        MockConnection::standalone(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nshort", 0);
    let mut response = Response::new(connection).unwrap();
    assert_eq!(
        response.content().unwrap_err(),
        Error::Transport(NetError::ConnectionClosed)
    );
    assert_eq!(log.borrow().closed, [0]);
}

#[test]
fn trailers_arrive_after_the_body() {
    let bytes = chunked(b"payload", 3);
    let (connection, _) = MockConnection::standalone(&bytes, 0);
    let mut response = Response::new(connection).unwrap();
    assert_eq!(response.headers().get("x-trailer"), None);

    let mut buf = [0u8; 4];
    assert_eq!(response.read_into(&mut buf).unwrap(), 3);
    assert_eq!(response.headers().get("x-trailer"), None);

    assert_eq!(response.content().unwrap(), b"load");
    assert_eq!(response.headers().get("x-trailer"), Some("done"));
}

#[test]
fn close_drains_and_releases_once() {
    let bytes = chunked(&[7u8; 100], 9);
    let (connection, log) = MockConnection::standalone(&bytes, 5);
    let mut response = Response::new(connection).unwrap();
    response.close().unwrap();
    response.close().unwrap();
    assert_eq!(response.headers().get("x-trailer"), Some("done"));
    assert_eq!(response.read_into(&mut [0u8; 8]).unwrap_err(), Error::Closed);
    drop(response);
    assert_eq!(log.borrow().closed, [0]);
}
