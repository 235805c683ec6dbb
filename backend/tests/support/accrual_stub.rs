//! Local stand-in for the accrual service.
//!
//! Serves `GET /api/orders/{number}` on an ephemeral port with scripted
//! replies and records every number it was asked about. Orders without a
//! scripted reply answer 204.

use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::Mutex;

use actix_web::dev::ServerHandle;
use actix_web::http::StatusCode;
use actix_web::{App, HttpResponse, HttpServer, get, web};
use url::Url;

/// Scripted response for one order number.
#[derive(Debug, Clone)]
pub enum StubReply {
    /// 200 with a raw JSON body.
    Json(String),
    /// 429 with the service's plain-text limit message.
    TooManyRequests {
        /// Requests per minute quoted in the body.
        limit: u32,
        /// `Retry-After` header value in seconds.
        retry_after: Option<u64>,
    },
    /// Arbitrary status and body.
    Status(u16, String),
}

impl StubReply {
    /// 200 reply in the service's wire format.
    pub fn processed(number: &str, accrual: f64) -> Self {
        Self::Json(format!(
            r#"{{"order":"{number}","status":"PROCESSED","accrual":{accrual}}}"#
        ))
    }

    /// 200 reply for a status that carries no accrual.
    pub fn status(number: &str, status: &str) -> Self {
        Self::Json(format!(r#"{{"order":"{number}","status":"{status}"}}"#))
    }

    fn respond(&self) -> HttpResponse {
        match self {
            Self::Json(body) => HttpResponse::Ok()
                .content_type("application/json")
                .body(body.clone()),
            Self::TooManyRequests { limit, retry_after } => {
                let mut response = HttpResponse::TooManyRequests();
                if let Some(seconds) = retry_after {
                    response.insert_header(("Retry-After", seconds.to_string()));
                }
                response
                    .content_type("text/plain")
                    .body(format!("No more than {limit} requests per minute allowed"))
            }
            Self::Status(code, body) => {
                let status =
                    StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                HttpResponse::build(status).body(body.clone())
            }
        }
    }
}

struct StubState {
    replies: HashMap<String, StubReply>,
    requests: Mutex<Vec<String>>,
}

#[get("/api/orders/{number}")]
async fn lookup(state: web::Data<StubState>, number: web::Path<String>) -> HttpResponse {
    let number = number.into_inner();
    state
        .requests
        .lock()
        .expect("requests mutex")
        .push(number.clone());
    state
        .replies
        .get(&number)
        .map_or_else(|| HttpResponse::NoContent().finish(), StubReply::respond)
}

/// Running stub service; stop it with [`AccrualStub::stop`].
pub struct AccrualStub {
    base_url: Url,
    handle: ServerHandle,
    state: web::Data<StubState>,
}

impl AccrualStub {
    /// Bind on `127.0.0.1:0` and spawn the server on the current runtime.
    pub fn start(replies: impl IntoIterator<Item = (String, StubReply)>) -> Self {
        let state = web::Data::new(StubState {
            replies: replies.into_iter().collect(),
            requests: Mutex::new(Vec::new()),
        });
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub listener");
        let addr = listener.local_addr().expect("stub address");
        let server_state = state.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(server_state.clone())
                .service(lookup)
        })
        .workers(1)
        .disable_signals()
        .listen(listener)
        .expect("listen on stub socket")
        .run();
        let handle = server.handle();
        actix_rt::spawn(server);

        Self {
            base_url: Url::parse(&format!("http://{addr}")).expect("stub URL"),
            handle,
            state,
        }
    }

    /// Base URL to hand to the HTTP client.
    pub fn base_url(&self) -> Url {
        self.base_url.clone()
    }

    /// Order numbers requested so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.state.requests.lock().expect("requests mutex").clone()
    }

    /// Stop the server.
    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}
