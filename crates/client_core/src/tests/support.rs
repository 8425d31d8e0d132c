use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use shared::{
    domain::{BillId, BillRecord, BillStatus, FileKey, Session},
    protocol::UploadedFile,
};
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::{
    error::GatewayError,
    gateway::{BillsGateway, ReceiptUpload},
    router::Router,
    view::TextRenderer,
};

pub const EMPLOYEE_EMAIL: &str = "employee@test.tld";

type CreateGate = oneshot::Receiver<Result<UploadedFile, GatewayError>>;

pub struct TestBillsGateway {
    pub bills: Vec<BillRecord>,
    pub list_status: Option<u16>,
    pub create_status: Option<u16>,
    pub update_status: Option<u16>,
    pub list_calls: Arc<Mutex<u32>>,
    pub create_calls: Arc<Mutex<Vec<ReceiptUpload>>>,
    pub update_calls: Arc<Mutex<Vec<BillRecord>>>,
    create_gates: Mutex<VecDeque<CreateGate>>,
    create_started: Option<mpsc::UnboundedSender<String>>,
    list_gate: Mutex<Option<oneshot::Receiver<()>>>,
    list_started: Option<mpsc::UnboundedSender<()>>,
    update_gate: Mutex<Option<oneshot::Receiver<()>>>,
    update_started: Option<mpsc::UnboundedSender<String>>,
}

impl TestBillsGateway {
    pub fn ok(bills: Vec<BillRecord>) -> Self {
        Self {
            bills,
            list_status: None,
            create_status: None,
            update_status: None,
            list_calls: Arc::new(Mutex::new(0)),
            create_calls: Arc::new(Mutex::new(Vec::new())),
            update_calls: Arc::new(Mutex::new(Vec::new())),
            create_gates: Mutex::new(VecDeque::new()),
            create_started: None,
            list_gate: Mutex::new(None),
            list_started: None,
            update_gate: Mutex::new(None),
            update_started: None,
        }
    }

    pub fn failing_list(status: u16) -> Self {
        let mut gateway = Self::ok(Vec::new());
        gateway.list_status = Some(status);
        gateway
    }

    pub fn with_create_status(mut self, status: u16) -> Self {
        self.create_status = Some(status);
        self
    }

    pub fn with_update_status(mut self, status: u16) -> Self {
        self.update_status = Some(status);
        self
    }

    /// Each `create` call waits on the next gate; its start is announced on
    /// the returned receiver with the uploaded file name.
    pub fn with_create_gates(
        mut self,
        gates: Vec<CreateGate>,
    ) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.create_gates = Mutex::new(gates.into());
        self.create_started = Some(tx);
        (self, rx)
    }

    /// The first `list` call holds until `gate` fires.
    pub fn with_list_gate(
        mut self,
        gate: oneshot::Receiver<()>,
    ) -> (Self, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.list_gate = Mutex::new(Some(gate));
        self.list_started = Some(tx);
        (self, rx)
    }

    /// The first `update` call holds until `gate` fires; the bill name is
    /// announced when it starts.
    pub fn with_update_gate(
        mut self,
        gate: oneshot::Receiver<()>,
    ) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.update_gate = Mutex::new(Some(gate));
        self.update_started = Some(tx);
        (self, rx)
    }
}

#[async_trait]
impl BillsGateway for TestBillsGateway {
    async fn list(&self) -> Result<Vec<BillRecord>, GatewayError> {
        *self.list_calls.lock().await += 1;
        let gate = self.list_gate.lock().await.take();
        if let Some(gate) = gate {
            if let Some(started) = &self.list_started {
                let _ = started.send(());
            }
            let _ = gate.await;
        }
        if let Some(status) = self.list_status {
            return Err(GatewayError::status(status));
        }
        Ok(self.bills.clone())
    }

    async fn create(&self, receipt: ReceiptUpload) -> Result<UploadedFile, GatewayError> {
        let file_name = receipt.file_name.clone();
        self.create_calls.lock().await.push(receipt);

        let gate = self.create_gates.lock().await.pop_front();
        if let Some(gate) = gate {
            if let Some(started) = &self.create_started {
                let _ = started.send(file_name);
            }
            return gate
                .await
                .unwrap_or_else(|_| Err(GatewayError::Transport("gate dropped".into())));
        }

        if let Some(status) = self.create_status {
            return Err(GatewayError::status(status));
        }
        Ok(UploadedFile {
            file_url: format!("https://localhost:3456/images/{file_name}"),
            key: FileKey("1234".into()),
        })
    }

    async fn update(&self, bill: BillRecord) -> Result<BillRecord, GatewayError> {
        self.update_calls.lock().await.push(bill.clone());
        let gate = self.update_gate.lock().await.take();
        if let Some(gate) = gate {
            if let Some(started) = &self.update_started {
                let _ = started.send(bill.name.clone());
            }
            let _ = gate.await;
        }
        if let Some(status) = self.update_status {
            return Err(GatewayError::status(status));
        }
        Ok(bill)
    }
}

pub fn uploaded(file_url: &str, key: &str) -> Result<UploadedFile, GatewayError> {
    Ok(UploadedFile {
        file_url: file_url.to_string(),
        key: FileKey(key.to_string()),
    })
}

pub fn employee() -> Session {
    Session::employee(EMPLOYEE_EMAIL)
}

pub fn router_for(session: Option<Session>, gateway: Arc<TestBillsGateway>) -> Arc<Router> {
    Router::new(session, gateway, Arc::new(TextRenderer))
}

#[allow(clippy::too_many_arguments)]
fn bill(
    id: &str,
    expense_type: &str,
    name: &str,
    amount: i64,
    date: &str,
    vat: Option<f64>,
    status: BillStatus,
    file_name: &str,
) -> BillRecord {
    BillRecord {
        id: Some(BillId(id.to_string())),
        email: "a@a".to_string(),
        expense_type: expense_type.to_string(),
        name: name.to_string(),
        amount,
        date: date.to_string(),
        vat,
        pct: 20,
        commentary: None,
        file_url: Some(format!("https://test.storage.tld/{file_name}")),
        file_name: Some(file_name.to_string()),
        status,
    }
}

/// Four stored bills, deliberately not in date order.
pub fn fixture_bills() -> Vec<BillRecord> {
    vec![
        bill(
            "47qAXb6fIm2zOKkLzMro",
            "Hôtel et logement",
            "encore",
            400,
            "2004-04-04",
            Some(80.0),
            BillStatus::Pending,
            "preview-facture-free-201801-pdf-1.jpg",
        ),
        bill(
            "BeKy5Mo4jkmdfPGYpTxZ",
            "Transports",
            "test1",
            100,
            "2001-01-01",
            None,
            BillStatus::Refused,
            "1592770761.jpeg",
        ),
        bill(
            "UIUZtnPQvnbFnB0ozvJh",
            "Services en ligne",
            "test3",
            300,
            "2003-03-03",
            Some(60.0),
            BillStatus::Accepted,
            "facture-client-php-exportee.png",
        ),
        bill(
            "qcCK3SzECmaZAGRrHjaC",
            "Restaurants et bars",
            "test2",
            200,
            "2002-02-02",
            Some(40.0),
            BillStatus::Refused,
            "preview-facture-free-201801-pdf-1.jpg",
        ),
    ]
}
