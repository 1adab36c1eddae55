//! End-to-end behaviour over real TCP connections: response framing,
//! keep-alive, connection teardown, file streaming and the error bodies.

mod common;

use std::io::Write;

use gantry::{JsonBodyParser, Request, RequestLogger, Response, Server, ServerHandle};

fn demo_server() -> ServerHandle {
    common::init_tracing();
    let mut server = Server::new();
    server.set_workers(2);
    server.use_middleware(RequestLogger);
    server.use_middleware(JsonBodyParser);
    server.get("/", |_req: &mut Request, res: &mut Response| {
        res.send("Hello");
    });
    server.get("/users/:id", |req: &mut Request, res: &mut Response| {
        let id = req.path_param("id").unwrap_or_default().to_string();
        if let Some(lang) = req.query_param("lang") {
            let lang = lang.to_string();
            res.set_header("X-Lang", lang);
        }
        res.send(id);
    });
    server.post("/echo", |req: &mut Request, res: &mut Response| {
        match req.body["n"].as_f64() {
            Ok(n) => {
                res.send(n.to_string());
            }
            Err(err) => {
                res.status(422).send(err.to_string());
            }
        }
    });
    server.get("/panic", |_req: &mut Request, _res: &mut Response| {
        panic!("handler blew up");
    });
    let handle = server.start("127.0.0.1:0").unwrap();
    handle.wait_ready().unwrap();
    handle
}

#[test]
fn plain_text_response_is_framed_and_kept_alive() {
    let handle = demo_server();
    let res = common::roundtrip(handle.addr(), b"GET / HTTP/1.1\r\nHost: x\r\n\r\n");
    assert_eq!(res.status, 200);
    assert_eq!(res.reason, "OK");
    assert_eq!(res.header("Content-Length"), Some("5"));
    assert_eq!(res.header("Content-Type"), Some("text/plain; charset=UTF-8"));
    assert_eq!(res.header("Connection"), Some("keep-alive"));
    assert_eq!(res.body_text(), "Hello");
    handle.stop();
}

#[test]
fn path_and_query_parameters_reach_the_handler() {
    let handle = demo_server();
    let res = common::roundtrip(handle.addr(), b"GET /users/42?lang=en HTTP/1.1\r\nHost: x\r\n\r\n");
    assert_eq!(res.status, 200);
    assert_eq!(res.body_text(), "42");
    assert_eq!(res.header("X-Lang"), Some("en"));
    handle.stop();
}

#[test]
fn unregistered_route_is_404() {
    let handle = demo_server();
    let res = common::roundtrip(handle.addr(), b"DELETE /x HTTP/1.1\r\nHost: x\r\n\r\n");
    assert_eq!(res.status, 404);
    assert_eq!(res.body_text(), "Not found");
    handle.stop();
}

#[test]
fn json_body_round_trips_through_the_middleware() {
    let handle = demo_server();
    let raw = b"POST /echo HTTP/1.1\r\nHost: x\r\nContent-Type: application/json\r\nContent-Length: 7\r\n\r\n{\"n\":7}";
    let res = common::roundtrip(handle.addr(), raw);
    assert_eq!(res.status, 200);
    assert_eq!(res.body_text(), "7");
    handle.stop();
}

#[test]
fn invalid_json_body_is_rejected_by_the_middleware() {
    let handle = demo_server();
    let raw = b"POST /echo HTTP/1.1\r\nHost: x\r\nContent-Type: application/json\r\nContent-Length: 7\r\n\r\n{\"n\":7,";
    let res = common::roundtrip(handle.addr(), raw);
    assert_eq!(res.status, 400);
    assert_eq!(res.body_text(), "Bad Request");
    handle.stop();
}

#[test]
fn keep_alive_serves_sequential_requests_on_one_connection() {
    let handle = demo_server();
    let mut stream = common::connect(handle.addr());

    stream.write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
    let first = common::read_response(&mut stream);
    assert_eq!(first.body_text(), "Hello");

    stream.write_all(b"GET /users/9 HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
    let second = common::read_response(&mut stream);
    assert_eq!(second.body_text(), "9");
    handle.stop();
}

#[test]
fn connection_close_tears_the_socket_down_after_the_response() {
    let handle = demo_server();
    let mut stream = common::connect(handle.addr());
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n")
        .unwrap();
    let res = common::read_response(&mut stream);
    assert_eq!(res.body_text(), "Hello");
    common::assert_closed(&mut stream);
    handle.stop();
}

#[test]
fn request_body_split_across_writes_is_reassembled() {
    let handle = demo_server();
    let mut stream = common::connect(handle.addr());
    stream
        .write_all(b"POST /echo HTTP/1.1\r\nHost: x\r\nContent-Type: application/json\r\nContent-Length: 7\r\n\r\n{\"n\"")
        .unwrap();
    stream.flush().unwrap();
    std::thread::sleep(std::time::Duration::from_millis(50));
    stream.write_all(b":42}").unwrap();
    let res = common::read_response(&mut stream);
    assert_eq!(res.status, 200);
    assert_eq!(res.body_text(), "42");
    handle.stop();
}

#[test]
fn malformed_request_line_gets_the_json_error_body_and_a_close() {
    let handle = demo_server();
    let mut stream = common::connect(handle.addr());
    stream.write_all(b"NONSENSE\r\n\r\n").unwrap();
    let res = common::read_response(&mut stream);
    assert_eq!(res.status, 400);
    assert_eq!(res.body_text(), r#"{"message":"Bad Request"}"#);
    common::assert_closed(&mut stream);
    handle.stop();
}

#[test]
fn chunked_requests_are_answered_with_501_and_closed() {
    let handle = demo_server();
    let mut stream = common::connect(handle.addr());
    stream
        .write_all(b"POST /echo HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: chunked\r\n\r\n")
        .unwrap();
    let res = common::read_response(&mut stream);
    assert_eq!(res.status, 501);
    assert_eq!(res.body_text(), r#"{"message":"Not Implemented"}"#);
    common::assert_closed(&mut stream);
    handle.stop();
}

#[test]
fn oversized_headers_are_rejected_and_closed() {
    common::init_tracing();
    let mut server = Server::new();
    server.set_max_header_size(256);
    server.get("/", |_req: &mut Request, res: &mut Response| {
        res.send("ok");
    });
    let handle = server.start("127.0.0.1:0").unwrap();
    handle.wait_ready().unwrap();

    let mut stream = common::connect(handle.addr());
    let mut raw = b"GET / HTTP/1.1\r\nX-Pad: ".to_vec();
    raw.extend(std::iter::repeat(b'a').take(512));
    stream.write_all(&raw).unwrap();
    let res = common::read_response(&mut stream);
    assert_eq!(res.status, 400);
    assert_eq!(res.body_text(), "Header size exceeded");
    common::assert_closed(&mut stream);
    handle.stop();
}

#[test]
fn handler_panic_is_contained_as_500_and_the_worker_survives() {
    let handle = demo_server();
    let res = common::roundtrip(handle.addr(), b"GET /panic HTTP/1.1\r\nHost: x\r\n\r\n");
    assert_eq!(res.status, 500);
    assert_eq!(res.body_text(), "Internal Server Error");

    // same server keeps answering
    let res = common::roundtrip(handle.addr(), b"GET / HTTP/1.1\r\nHost: x\r\n\r\n");
    assert_eq!(res.status, 200);
    handle.stop();
}

#[test]
fn file_response_streams_the_file_with_its_mime_type() {
    common::init_tracing();
    let dir = std::env::temp_dir().join(format!("gantry-file-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let file_path = dir.join("report.txt");
    let content = "line one\nline two\n".repeat(100);
    std::fs::write(&file_path, &content).unwrap();

    let mut server = Server::new();
    let served = file_path.clone();
    server.get("/report", move |_req: &mut Request, res: &mut Response| {
        res.send_file(served.clone());
    });
    let missing = dir.join("absent.txt");
    server.get("/missing", move |_req: &mut Request, res: &mut Response| {
        res.send_file(missing.clone());
    });
    let download = file_path.clone();
    server.get("/download", move |_req: &mut Request, res: &mut Response| {
        res.download(download.clone());
    });
    let handle = server.start("127.0.0.1:0").unwrap();
    handle.wait_ready().unwrap();

    let res = common::roundtrip(handle.addr(), b"GET /report HTTP/1.1\r\nHost: x\r\n\r\n");
    assert_eq!(res.status, 200);
    assert_eq!(res.header("Content-Type"), Some("text/plain"));
    assert_eq!(
        res.header("Content-Disposition"),
        Some("inline; filename=\"report.txt\"")
    );
    assert_eq!(res.header("Content-Length"), Some(content.len().to_string().as_str()));
    assert_eq!(res.body_text(), content);

    let res = common::roundtrip(handle.addr(), b"GET /download HTTP/1.1\r\nHost: x\r\n\r\n");
    assert_eq!(
        res.header("Content-Disposition"),
        Some("attachment; filename=\"report.txt\"")
    );

    let res = common::roundtrip(handle.addr(), b"GET /missing HTTP/1.1\r\nHost: x\r\n\r\n");
    assert_eq!(res.status, 404);
    assert_eq!(res.body_text(), "File Not Found");

    handle.stop();
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn content_length_always_matches_the_body() {
    let handle = demo_server();
    for raw in [
        &b"GET / HTTP/1.1\r\nHost: x\r\n\r\n"[..],
        &b"GET /users/abc HTTP/1.1\r\nHost: x\r\n\r\n"[..],
        &b"DELETE /none HTTP/1.1\r\nHost: x\r\n\r\n"[..],
    ] {
        let res = common::roundtrip(handle.addr(), raw);
        let announced: usize = res.header("Content-Length").unwrap().parse().unwrap();
        assert_eq!(announced, res.body.len());
    }
    handle.stop();
}

#[test]
fn concurrent_connections_do_not_interleave_responses() {
    let handle = demo_server();
    let addr = handle.addr();
    let threads: Vec<_> = (0..8)
        .map(|i| {
            std::thread::spawn(move || {
                let path = format!("GET /users/{i} HTTP/1.1\r\nHost: x\r\n\r\n");
                for _ in 0..20 {
                    let res = common::roundtrip(addr, path.as_bytes());
                    assert_eq!(res.status, 200);
                    assert_eq!(res.body_text(), i.to_string());
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }
    handle.stop();
}
