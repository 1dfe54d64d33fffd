//! `GrpcTransport` against an in-process `PinotQueryBroker` server

use std::collections::HashMap;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use pinot_core::{GrpcConfig, PinotError, Request};
use pinot_transport::grpc::proto::{BrokerRequest, BrokerResponse, SUBMIT_PATH};
use pinot_transport::{ClientTransport, GrpcTransport};
use tokio::net::TcpListener;
use tonic::codec::ProstCodec;
use tonic::codegen::{http, Body, BoxFuture, Service, StdError};
use tonic::server::{Grpc, NamedService, ServerStreamingService};
use tonic::transport::Server;
use tonic::{Code, Status};

/// How the fake broker answers a `Submit` call
#[derive(Clone)]
enum Reply {
    Blocks(Vec<BrokerResponse>),
    FailBeforeStream(String),
    FailAfterMetadata(String),
    Stall(Duration),
}

#[derive(Clone)]
struct FakeBroker {
    reply: Arc<Reply>,
    requests: Arc<Mutex<Vec<BrokerRequest>>>,
}

impl NamedService for FakeBroker {
    const NAME: &'static str = "org.apache.pinot.common.proto.PinotQueryBroker";
}

struct SubmitSvc(FakeBroker);

impl ServerStreamingService<BrokerRequest> for SubmitSvc {
    type Response = BrokerResponse;
    type ResponseStream = BoxStream<'static, Result<BrokerResponse, Status>>;
    type Future = BoxFuture<tonic::Response<Self::ResponseStream>, Status>;

    fn call(&mut self, request: tonic::Request<BrokerRequest>) -> Self::Future {
        let broker = self.0.clone();
        Box::pin(async move {
            broker.requests.lock().push(request.into_inner());
            let stream = match broker.reply.as_ref() {
                Reply::Blocks(blocks) => stream::iter(blocks.clone().into_iter().map(Ok)).boxed(),
                Reply::FailBeforeStream(message) => return Err(Status::internal(message.clone())),
                Reply::FailAfterMetadata(message) => stream::iter(vec![
                    Ok(metadata_block()),
                    Err(Status::unavailable(message.clone())),
                ])
                .boxed(),
                Reply::Stall(delay) => {
                    tokio::time::sleep(*delay).await;
                    stream::empty().boxed()
                }
            };
            Ok(tonic::Response::new(stream))
        })
    }
}

impl<B> Service<http::Request<B>> for FakeBroker
where
    B: Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    type Response = http::Response<tonic::body::BoxBody>;
    type Error = std::convert::Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        if req.uri().path() != SUBMIT_PATH {
            return Box::pin(async move {
                let mut response = http::Response::new(tonic::body::empty_body());
                let headers = response.headers_mut();
                headers.insert(
                    "grpc-status",
                    http::HeaderValue::from(Code::Unimplemented as i32),
                );
                headers.insert(
                    http::header::CONTENT_TYPE,
                    http::HeaderValue::from_static("application/grpc"),
                );
                Ok(response)
            });
        }

        let svc = SubmitSvc(self.clone());
        Box::pin(async move {
            let codec = ProstCodec::<BrokerResponse, BrokerRequest>::default();
            let mut grpc = Grpc::new(codec);
            Ok(grpc.server_streaming(svc, req).await)
        })
    }
}

/// Serve `reply` on an ephemeral port; returns the broker address and the
/// requests it receives
async fn start_broker(reply: Reply) -> (String, Arc<Mutex<Vec<BrokerRequest>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let incoming = stream::unfold(listener, |listener| async move {
        let accepted = listener.accept().await.map(|(socket, _)| socket);
        Some((accepted, listener))
    });

    let requests = Arc::new(Mutex::new(Vec::new()));
    let broker = FakeBroker {
        reply: Arc::new(reply),
        requests: requests.clone(),
    };
    tokio::spawn(
        Server::builder()
            .add_service(broker)
            .serve_with_incoming(Box::pin(incoming)),
    );
    (format!("grpc://{}", address), requests)
}

fn sized(bytes: &[u8]) -> Vec<u8> {
    let mut out = (bytes.len() as i32).to_be_bytes().to_vec();
    out.extend_from_slice(bytes);
    out
}

fn block(metadata: &[(&str, &str)], payload: Vec<u8>) -> BrokerResponse {
    let metadata: HashMap<String, String> = metadata
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    BrokerResponse::new(metadata, payload)
}

fn metadata_block() -> BrokerResponse {
    block(&[], br#"{"exceptions":[],"numServersQueried":1,"numDocsScanned":2}"#.to_vec())
}

fn long_schema_block(column: &str) -> BrokerResponse {
    let mut payload = 1i32.to_be_bytes().to_vec();
    payload.extend(sized(column.as_bytes()));
    payload.extend(sized(b"LONG"));
    block(&[], payload)
}

fn json_rows_block(rows: &[&str]) -> BrokerResponse {
    let payload: Vec<u8> = rows.iter().flat_map(|r| sized(r.as_bytes())).collect();
    let row_size = rows.len().to_string();
    block(
        &[
            ("rowSize", row_size.as_str()),
            ("encoding", "JSON"),
            ("compression", "NONE"),
        ],
        payload,
    )
}

#[tokio::test]
async fn test_streamed_blocks_become_one_table() {
    let (address, requests) = start_broker(Reply::Blocks(vec![
        metadata_block(),
        long_schema_block("cnt"),
        json_rows_block(&["[97889]", "[42]"]),
    ]))
    .await;

    let transport = GrpcTransport::new(GrpcConfig::new());
    let resp = transport
        .execute(&address, &Request::sql("select count(*) from baseballStats"))
        .await
        .unwrap();

    assert_eq!(resp.num_servers_queried, 1);
    assert_eq!(resp.num_docs_scanned, 2);
    let table = resp.result_table.unwrap();
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.column_count(), 1);
    assert_eq!(table.column_name(0), Some("cnt"));
    assert_eq!(table.get_long(0, 0), 97889);
    assert_eq!(table.get_long(1, 0), 42);

    let requests = requests.lock();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].sql, "select count(*) from baseballStats");
    assert_eq!(requests[0].metadata["encoding"], "JSON");
    assert_eq!(requests[0].metadata["compression"], "ZSTD");
    assert_eq!(requests[0].metadata["blockRowSize"], "10000");
}

#[tokio::test]
async fn test_error_status_is_transport_error() {
    let (address, _) = start_broker(Reply::FailBeforeStream("broker overloaded".into())).await;

    let err = GrpcTransport::new(GrpcConfig::new())
        .execute(&address, &Request::sql("select 1"))
        .await
        .unwrap_err();
    assert!(matches!(err, PinotError::Transport(_)));
    assert!(err.to_string().contains("broker overloaded"));
}

#[tokio::test]
async fn test_error_status_mid_stream_aborts() {
    let (address, _) = start_broker(Reply::FailAfterMetadata("segment lost".into())).await;

    let err = GrpcTransport::new(GrpcConfig::new())
        .execute(&address, &Request::sql("select 1"))
        .await
        .unwrap_err();
    assert!(matches!(err, PinotError::Transport(_)));
    assert!(err.to_string().contains("segment lost"));
}

#[tokio::test]
async fn test_slow_broker_times_out() {
    let (address, _) = start_broker(Reply::Stall(Duration::from_secs(5))).await;

    let config = GrpcConfig::new().with_timeout(Duration::from_millis(200));
    let started = tokio::time::Instant::now();
    let err = GrpcTransport::new(config)
        .execute(&address, &Request::sql("select 1"))
        .await
        .unwrap_err();
    assert!(matches!(err, PinotError::Transport(_)));
    assert!(started.elapsed() < Duration::from_secs(4));
}
