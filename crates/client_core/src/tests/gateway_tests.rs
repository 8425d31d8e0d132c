use super::*;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, patch},
    Json, Router,
};
use serde_json::json;
use shared::{
    domain::{BillId, BillStatus},
    error::ErrorCode,
};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct ServerState {
    list_status: Option<StatusCode>,
    auth_headers: Arc<Mutex<Vec<String>>>,
    uploads: Arc<Mutex<Vec<(ReceiptUploadQuery, Vec<u8>, String)>>>,
    updates: Arc<Mutex<Vec<(String, BillRecord)>>>,
}

async fn record_auth(state: &ServerState, headers: &HeaderMap) {
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        state.auth_headers.lock().await.push(value.to_string());
    }
}

async fn handle_list(
    State(state): State<ServerState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ApiError>)> {
    record_auth(&state, &headers).await;
    if let Some(status) = state.list_status {
        return Err((
            status,
            Json(ApiError::new(
                ErrorCode::from_status(status.as_u16()),
                "bills unavailable",
            )),
        ));
    }
    Ok(Json(json!([
        {
            "id": "47qAXb6fIm2zOKkLzMro",
            "email": "a@a",
            "type": "Hôtel et logement",
            "name": "encore",
            "amount": 400,
            "date": "2004-04-04",
            "vat": "80",
            "pct": 20,
            "commentary": "séminaire billed",
            "fileUrl": "https://test.storage.tld/preview.jpg",
            "fileName": "preview.jpg",
            "status": "pending"
        },
        {
            "id": "BeKy5Mo4jkmdfPGYpTxZ",
            "email": "a@a",
            "type": "Transports",
            "name": "test1",
            "amount": 100,
            "date": "2001-01-01",
            "vat": "",
            "pct": 20,
            "fileUrl": "https://test.storage.tld/1592770761.jpeg",
            "fileName": "1592770761.jpeg",
            "status": "refused"
        }
    ])))
}

async fn handle_create(
    State(state): State<ServerState>,
    Query(query): Query<ReceiptUploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<UploadedFile> {
    record_auth(&state, &headers).await;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let file_url = format!("https://localhost:3456/images/{}", query.file_name);
    state
        .uploads
        .lock()
        .await
        .push((query, body.to_vec(), content_type));
    Json(UploadedFile {
        file_url,
        key: shared::domain::FileKey("1234".into()),
    })
}

async fn handle_update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(bill): Json<BillRecord>,
) -> Json<BillRecord> {
    state.updates.lock().await.push((id, bill.clone()));
    Json(bill)
}

async fn spawn_bills_server(state: ServerState) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new()
        .route("/bills", get(handle_list).post(handle_create))
        .route("/bills/:id", patch(handle_update))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn draft(id: Option<&str>) -> BillRecord {
    BillRecord {
        id: id.map(|id| BillId(id.to_string())),
        email: "employee@test.tld".into(),
        expense_type: "Transports".into(),
        name: "test".into(),
        amount: 123,
        date: "2022-01-01".into(),
        vat: Some(24.6),
        pct: 20,
        commentary: Some("Le commentaire".into()),
        file_url: Some("https://localhost:3456/images/test.jpeg".into()),
        file_name: Some("test.jpeg".into()),
        status: BillStatus::Pending,
    }
}

#[tokio::test]
async fn list_decodes_stored_bills_and_sends_token() {
    let state = ServerState::default();
    let server_url = spawn_bills_server(state.clone()).await;
    let gateway = HttpBillsGateway::new(&format!("{server_url}/"))
        .expect("gateway")
        .with_token(Some("jwt-token".into()));

    let bills = gateway.list().await.expect("list");

    assert_eq!(bills.len(), 2);
    assert_eq!(bills[0].vat, Some(80.0));
    assert_eq!(bills[1].vat, None);
    assert_eq!(bills[1].status, BillStatus::Refused);
    assert_eq!(
        state.auth_headers.lock().await.clone(),
        vec!["Bearer jwt-token".to_string()]
    );
}

#[tokio::test]
async fn list_maps_http_status_to_error_banner_text() {
    for status in [StatusCode::NOT_FOUND, StatusCode::INTERNAL_SERVER_ERROR] {
        let server_url = spawn_bills_server(ServerState {
            list_status: Some(status),
            ..ServerState::default()
        })
        .await;
        let gateway = HttpBillsGateway::new(&server_url).expect("gateway");

        let err = gateway.list().await.expect_err("must fail");

        assert_eq!(err.to_string(), format!("Erreur {}", status.as_u16()));
        match err {
            GatewayError::Status { status: code, detail } => {
                assert_eq!(code, status.as_u16());
                assert_eq!(
                    detail.map(|detail| detail.message).as_deref(),
                    Some("bills unavailable")
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

#[tokio::test]
async fn create_posts_raw_receipt_with_metadata() {
    let state = ServerState::default();
    let server_url = spawn_bills_server(state.clone()).await;
    let gateway = HttpBillsGateway::with_timeout(&server_url, Duration::from_secs(5))
        .expect("gateway");

    let uploaded = gateway
        .create(ReceiptUpload {
            file_name: "test.jpeg".into(),
            mime_type: Some("image/jpeg".into()),
            bytes: b"jpeg-bytes".to_vec(),
            email: "employee@test.tld".into(),
        })
        .await
        .expect("create");

    assert_eq!(uploaded.file_url, "https://localhost:3456/images/test.jpeg");
    assert_eq!(uploaded.key.as_str(), "1234");
    let uploads = state.uploads.lock().await;
    let (query, body, content_type) = &uploads[0];
    assert_eq!(query.file_name, "test.jpeg");
    assert_eq!(query.email, "employee@test.tld");
    assert_eq!(body.as_slice(), b"jpeg-bytes");
    assert_eq!(content_type, "image/jpeg");
    assert!(state.auth_headers.lock().await.is_empty());
}

#[tokio::test]
async fn update_patches_bill_by_id() {
    let state = ServerState::default();
    let server_url = spawn_bills_server(state.clone()).await;
    let gateway = HttpBillsGateway::new(&server_url).expect("gateway");

    let saved = gateway.update(draft(Some("1234"))).await.expect("update");

    assert_eq!(saved, draft(Some("1234")));
    let updates = state.updates.lock().await;
    assert_eq!(updates[0].0, "1234");
    assert_eq!(updates[0].1.status, BillStatus::Pending);
}

#[tokio::test]
async fn update_requires_bill_id() {
    let gateway = HttpBillsGateway::new("http://127.0.0.1:9").expect("gateway");

    let err = gateway.update(draft(None)).await.expect_err("must fail");

    assert!(matches!(err, GatewayError::MissingBillId));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let gateway = HttpBillsGateway::new(&format!("http://{addr}")).expect("gateway");

    let err = gateway.list().await.expect_err("must fail");

    assert!(matches!(err, GatewayError::Transport(_)), "{err:?}");
    assert!(err.code().is_none());
}

#[test]
fn rejects_malformed_api_urls() {
    assert!(matches!(
        HttpBillsGateway::new("not a url"),
        Err(GatewayError::InvalidUrl { .. })
    ));
    assert!(matches!(
        HttpBillsGateway::new("ftp://localhost:5678"),
        Err(GatewayError::InvalidUrl { .. })
    ));
}

#[tokio::test]
async fn missing_gateway_is_unavailable() {
    assert!(matches!(
        MissingBillsGateway.list().await,
        Err(GatewayError::Unavailable)
    ));
}
