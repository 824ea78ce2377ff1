use crate::mock::{MockConnection, chunked, ok};
use librequests::network::Read;
use librequests::network::application::http::{Error, Response};
use serde::Deserialize;

fn parse(bytes: impl AsRef<[u8]>) -> Response<MockConnection> {
    let (connection, _log) = MockConnection::standalone(bytes, 0);
    Response::new(connection).unwrap()
}

fn with_headers(headers: &str, body: &[u8]) -> Vec<u8> {
    let mut bytes = format!(
        "HTTP/1.1 200 OK\r\n{}Content-Length: {}\r\n\r\n",
        headers,
        body.len()
    )
    .into_bytes();
    bytes.extend_from_slice(body);
    bytes
}

#[derive(Debug, Deserialize, PartialEq)]
struct Status<'a> {
    state: &'a str,
    uptime: u32,
}

const STATUS_JSON: &[u8] = br#"{"state":"idle","uptime":42}"#;

#[test]
fn repeated_access_returns_the_cached_value() {
    let mut response = parse(with_headers("", b"cached"));
    let first = response.content().unwrap().to_vec();
    assert_eq!(response.content().unwrap(), first.as_slice());

    let mut response = parse(with_headers("", b"cached"));
    let first = response.text().unwrap().to_string();
    assert_eq!(response.text().unwrap(), first);
}

#[test]
fn mixing_accessors_is_misuse() {
    let mut response = parse(with_headers("", STATUS_JSON));
    response.content().unwrap();
    assert_eq!(response.text().unwrap_err(), Error::ContentConsumed);
    assert_eq!(response.json::<Status>().unwrap_err(), Error::ContentConsumed);

    let mut response = parse(with_headers("", STATUS_JSON));
    response.text().unwrap();
    assert_eq!(response.content().unwrap_err(), Error::ContentConsumed);
    assert_eq!(response.json::<Status>().unwrap_err(), Error::ContentConsumed);

    let mut response = parse(with_headers("", STATUS_JSON));
    response.json::<Status>().unwrap();
    assert_eq!(response.content().unwrap_err(), Error::ContentConsumed);
    assert_eq!(response.text().unwrap_err(), Error::ContentConsumed);
}

#[test]
fn json_borrows_from_the_cached_body() {
    let mut response = parse(with_headers("Content-Type: application/json\r\n", STATUS_JSON));
    {
        let status: Status = response.json().unwrap();
        assert_eq!(status, Status { state: "idle", uptime: 42 });
    }
    let again: Status = response.json().unwrap();
    assert_eq!(again.uptime, 42);
}

#[test]
fn invalid_json_is_reported() {
    let mut response = parse(with_headers("", b"{not json"));
    assert_eq!(response.json::<Status>().unwrap_err(), Error::Json);
}

#[test]
fn gzip_bodies_are_only_available_raw() {
    let bytes = with_headers("Content-Encoding: gzip\r\n", &[0x1f, 0x8b, 0x08, 0x00]);
    let mut response = parse(&bytes);
    assert_eq!(response.text().unwrap_err(), Error::GzipUnsupported);
    assert_eq!(response.json::<Status>().unwrap_err(), Error::GzipUnsupported);
    assert_eq!(response.content().unwrap(), [0x1f, 0x8b, 0x08, 0x00]);
}

#[test]
fn text_honours_the_declared_charset() {
    let mut response = parse(with_headers(
        "Content-Type: text/plain; charset=ISO-8859-1\r\n",
        &[b'c', b'a', b'f', 0xe9],
    ));
    assert_eq!(response.text().unwrap(), "caf\u{e9}");
}

#[test]
fn charset_override_wins() {
    let mut response = parse(with_headers("Content-Type: text/plain\r\n", &[0xb5]));
    response.set_charset("latin1");
    assert_eq!(response.text().unwrap(), "\u{b5}");
}

#[test]
fn undecodable_text_leaves_raw_bytes() {
    let mut response = parse(with_headers(
        "Content-Type: text/plain; charset=us-ascii\r\n",
        &[b'o', 0xff],
    ));
    assert_eq!(response.text().unwrap_err(), Error::InvalidText);
    assert_eq!(response.text().unwrap_err(), Error::InvalidText);
    assert_eq!(response.content().unwrap(), [b'o', 0xff]);
    assert_eq!(response.json::<Status>().unwrap_err(), Error::ContentConsumed);
}

#[test]
fn iter_content_yields_full_pieces_then_the_rest() {
    let body: Vec<u8> = (0..100u8).collect();
    let (connection, log) = MockConnection::standalone(chunked(&body, 7), 3);
    let mut response = Response::new(connection).unwrap();

    let pieces: Vec<Vec<u8>> = response.iter_content(33).map(Result::unwrap).collect();
    let sizes: Vec<usize> = pieces.iter().map(Vec::len).collect();
    assert_eq!(sizes, [33, 33, 33, 1]);
    assert_eq!(pieces.concat(), body);
    assert_eq!(log.borrow().closed, [0]);
    assert_eq!(response.headers().get("x-trailer"), Some("done"));
}

#[test]
fn chunked_bodies_round_trip() {
    let body: Vec<u8> = (0..200u32).map(|i| (i * 7 % 251) as u8).collect();
    for split in [1, 33, body.len()] {
        let bytes = chunked(&body, split);

        let mut response = parse(&bytes);
        assert_eq!(response.content().unwrap(), body.as_slice(), "split {split}");

        let mut response = parse(&bytes);
        let streamed: Vec<u8> = response
            .iter_content(16)
            .flat_map(Result::unwrap)
            .collect();
        assert_eq!(streamed, body, "split {split}");
    }
}

#[test]
fn iter_content_after_content_is_misuse() {
    let mut response = parse(with_headers("", b"abc"));
    response.content().unwrap();
    let mut chunks = response.iter_content(2);
    assert_eq!(chunks.next().unwrap().unwrap_err(), Error::ContentConsumed);
    assert!(chunks.next().is_none());
}

#[test]
fn iter_content_on_a_closed_response_fails_once() {
    let mut response = parse(with_headers("", b"abc"));
    response.close().unwrap();
    let mut chunks = response.iter_content(2);
    assert_eq!(chunks.next().unwrap().unwrap_err(), Error::Closed);
    assert!(chunks.next().is_none());
}

#[test]
fn raw_streams_the_body() {
    let mut response = parse(chunked(b"streamed body", 4));
    let mut raw = response.raw();
    let mut out = Vec::new();
    let mut buf = [0u8; 5];
    loop {
        match raw.read(&mut buf).unwrap() {
            0 => break,
            n => out.extend_from_slice(&buf[..n]),
        }
    }
    assert_eq!(out, b"streamed body");
}

#[test]
fn exhausted_iter_content_closes_the_response() {
    let mut response = parse(ok("hello world"));
    assert_eq!(response.iter_content(4).count(), 3);
    assert_eq!(response.content().unwrap_err(), Error::Closed);
    assert_eq!(response.text().unwrap_err(), Error::Closed);
    assert_eq!(response.read_into(&mut [0u8; 4]).unwrap_err(), Error::Closed);
}

#[test]
fn reading_to_the_end_closes_the_response() {
    let mut response = parse(chunked(b"abc", 2));
    let mut buf = [0u8; 8];
    while response.read_into(&mut buf).unwrap() > 0 {}
    assert_eq!(response.headers().get("x-trailer"), Some("done"));
    assert_eq!(response.read_into(&mut buf).unwrap_err(), Error::Closed);
    assert_eq!(response.content().unwrap_err(), Error::Closed);
}

#[test]
fn empty_bodies_still_read_as_empty_content() {
    let mut response = parse(ok(""));
    assert_eq!(response.content().unwrap(), b"");
    assert_eq!(response.content().unwrap(), b"");

    let mut response = parse("HTTP/1.1 204 No Content\r\n\r\n");
    assert_eq!(response.text().unwrap(), "");
}
