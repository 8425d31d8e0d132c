use std::sync::Arc;

use shared::domain::{BillId, BillRecord, BillStatus, Session};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::{
    document::{MountToken, SharedDocument},
    error::SubmitBlocked,
    gateway::{BillsGateway, ReceiptUpload},
    router::{Navigator, Route},
    view::{NewBillView, ViewRenderer},
};

pub const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
pub const INVALID_FILE_MESSAGE: &str = r#"Le format du fichier doit être "jpeg", "jpg" ou "png""#;
pub const DEFAULT_PCT: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
    Empty,
    FileSelected,
    Uploading,
    Uploaded,
    FileRejected,
    UploadFailed,
    Submitting,
    SubmitFailed,
    Done,
}

/// File chosen in the `file` input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            mime_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn has_allowed_extension(&self) -> bool {
        has_allowed_extension(&self.name)
    }
}

pub fn has_allowed_extension(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

/// Raw values of the new-bill form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewBillForm {
    pub expense_type: String,
    pub expense_name: String,
    pub amount: String,
    pub date: String,
    pub vat: String,
    pub pct: String,
    pub commentary: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub file_url: String,
    pub file_id: BillId,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Submitted(BillRecord),
    Failed(String),
    Blocked(SubmitBlocked),
}

struct FormState {
    phase: FormPhase,
    issued_generation: u64,
    // newest generation that finished, failed or was rejected
    completed_generation: u64,
    staged_file: Option<String>,
    receipt: Option<Receipt>,
    validation_message: Option<String>,
    form_error: Option<String>,
}

impl FormState {
    fn view(&self) -> NewBillView {
        NewBillView {
            staged_file: self.staged_file.clone(),
            validation_message: self.validation_message.clone(),
            form_error: self.form_error.clone(),
        }
    }
}

/// Snapshot of the form for hosts and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSnapshot {
    pub phase: FormPhase,
    pub receipt: Option<Receipt>,
    pub validation_message: Option<String>,
    pub form_error: Option<String>,
}

pub struct NewBillController {
    session: Session,
    gateway: Arc<dyn BillsGateway>,
    renderer: Arc<dyn ViewRenderer>,
    document: SharedDocument,
    navigator: Arc<dyn Navigator>,
    token: MountToken,
    state: Mutex<FormState>,
    // highest upload generation that has resolved (or was superseded by a rejection)
    settled: watch::Sender<u64>,
}

impl NewBillController {
    pub fn new(
        session: Session,
        gateway: Arc<dyn BillsGateway>,
        renderer: Arc<dyn ViewRenderer>,
        document: SharedDocument,
        navigator: Arc<dyn Navigator>,
        token: MountToken,
    ) -> Self {
        let (settled, _) = watch::channel(0);
        Self {
            session,
            gateway,
            renderer,
            document,
            navigator,
            token,
            state: Mutex::new(FormState {
                phase: FormPhase::Empty,
                issued_generation: 0,
                completed_generation: 0,
                staged_file: None,
                receipt: None,
                validation_message: None,
                form_error: None,
            }),
            settled,
        }
    }

    pub async fn snapshot(&self) -> FormSnapshot {
        let state = self.state.lock().await;
        FormSnapshot {
            phase: state.phase,
            receipt: state.receipt.clone(),
            validation_message: state.validation_message.clone(),
            form_error: state.form_error.clone(),
        }
    }

    pub async fn phase(&self) -> FormPhase {
        self.state.lock().await.phase
    }

    async fn is_mounted(&self) -> bool {
        self.document.lock().await.is_mounted(self.token)
    }

    async fn render(&self, view: NewBillView) {
        let markup = self.renderer.new_bill_page(&view);
        self.document.lock().await.render(self.token, markup);
    }

    fn settle(&self, generation: u64) {
        self.settled
            .send_modify(|settled| *settled = (*settled).max(generation));
    }

    pub async fn handle_change_file(&self, file: SelectedFile) -> FormPhase {
        if !self.is_mounted().await {
            debug!("new bill: file change ignored on an unmounted form");
            return self.phase().await;
        }

        if !file.has_allowed_extension() {
            warn!("new bill: rejected receipt '{}'", file.name);
            let (generation, view) = {
                let mut state = self.state.lock().await;
                state.issued_generation += 1;
                state.completed_generation = state.issued_generation;
                state.phase = FormPhase::FileRejected;
                state.staged_file = None;
                state.validation_message = Some(INVALID_FILE_MESSAGE.to_string());
                state.form_error = None;
                (state.issued_generation, state.view())
            };
            self.settle(generation);
            self.render(view).await;
            return FormPhase::FileRejected;
        }

        let (generation, view) = {
            let mut state = self.state.lock().await;
            state.issued_generation += 1;
            state.phase = FormPhase::FileSelected;
            state.staged_file = Some(file.name.clone());
            state.validation_message = None;
            state.form_error = None;
            (state.issued_generation, state.view())
        };
        self.render(view).await;

        {
            let mut state = self.state.lock().await;
            if generation == state.issued_generation {
                state.phase = FormPhase::Uploading;
            }
        }
        let file_name = file.name;
        let result = self
            .gateway
            .create(ReceiptUpload {
                file_name: file_name.clone(),
                mime_type: file.mime_type,
                bytes: file.bytes,
                email: self.session.email.clone(),
            })
            .await;

        if !self.is_mounted().await {
            debug!("new bill: upload result dropped for an unmounted form");
            self.settle(generation);
            return self.phase().await;
        }

        let (phase, view) = {
            let mut state = self.state.lock().await;
            let latest = generation == state.issued_generation;
            let superseded = generation <= state.completed_generation;
            state.completed_generation = state.completed_generation.max(generation);
            match result {
                Ok(uploaded) => {
                    if superseded {
                        debug!("new bill: dropped stale upload #{generation}");
                    } else {
                        state.receipt = Some(Receipt {
                            file_url: uploaded.file_url,
                            file_id: BillId(uploaded.key.0),
                            file_name,
                        });
                    }
                    if latest {
                        state.phase = FormPhase::Uploaded;
                    }
                }
                Err(err) => {
                    error!("new bill: receipt upload failed: {err}");
                    if latest {
                        state.phase = FormPhase::UploadFailed;
                        state.form_error = Some(err.to_string());
                    }
                }
            }
            (state.phase, state.view())
        };
        self.settle(generation);
        self.render(view).await;
        phase
    }

    pub async fn update_bill(&self, bill: BillRecord) -> SubmitOutcome {
        {
            let mut state = self.state.lock().await;
            state.phase = FormPhase::Submitting;
            state.form_error = None;
        }
        self.send_bill(bill).await
    }

    // Caller has already moved the form to `Submitting`.
    async fn send_bill(&self, bill: BillRecord) -> SubmitOutcome {
        match self.gateway.update(bill).await {
            Ok(saved) => {
                self.state.lock().await.phase = FormPhase::Done;
                if self.is_mounted().await {
                    info!("new bill: submitted {}", saved.name);
                    self.navigator.navigate(Route::Bills).await;
                } else {
                    debug!("new bill: submitted from an unmounted form, staying put");
                }
                SubmitOutcome::Submitted(saved)
            }
            Err(err) => {
                error!("new bill: update failed: {err}");
                let message = err.to_string();
                let view = {
                    let mut state = self.state.lock().await;
                    state.phase = FormPhase::SubmitFailed;
                    state.form_error = Some(message.clone());
                    state.view()
                };
                self.render(view).await;
                SubmitOutcome::Failed(message)
            }
        }
    }

    pub async fn handle_submit(&self, form: NewBillForm) -> SubmitOutcome {
        let pending = self.state.lock().await.issued_generation;
        let mut settled = self.settled.subscribe();
        let ready = settled.wait_for(|done| *done >= pending).await.is_ok();

        if !ready || !self.is_mounted().await {
            return SubmitOutcome::Blocked(SubmitBlocked::Detached);
        }

        let bill = {
            let mut state = self.state.lock().await;
            let blocked = match state.phase {
                FormPhase::FileRejected => Some(SubmitBlocked::RejectedFile),
                FormPhase::UploadFailed => Some(SubmitBlocked::UploadFailed),
                FormPhase::Submitting | FormPhase::Done => Some(SubmitBlocked::AlreadySubmitted),
                _ if state.receipt.is_none() => Some(SubmitBlocked::MissingReceipt),
                _ => None,
            };
            let blocked = blocked.or_else(|| {
                parse_integer(&form.amount)
                    .is_none()
                    .then_some(SubmitBlocked::InvalidAmount)
            });
            if let Some(reason) = blocked {
                warn!("new bill: submission blocked: {reason}");
                if reason == SubmitBlocked::InvalidAmount {
                    state.form_error = Some(reason.to_string());
                }
                return SubmitOutcome::Blocked(reason);
            }

            let Some(receipt) = state.receipt.clone() else {
                return SubmitOutcome::Blocked(SubmitBlocked::MissingReceipt);
            };
            state.phase = FormPhase::Submitting;
            state.form_error = None;
            build_bill(&self.session, &form, receipt)
        };

        self.send_bill(bill).await
    }
}

fn parse_integer(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

fn build_bill(session: &Session, form: &NewBillForm, receipt: Receipt) -> BillRecord {
    let commentary = form.commentary.trim();
    BillRecord {
        id: Some(receipt.file_id),
        email: session.email.clone(),
        expense_type: form.expense_type.clone(),
        name: form.expense_name.clone(),
        amount: parse_integer(&form.amount).unwrap_or_default(),
        date: form.date.clone(),
        vat: form.vat.trim().parse::<f64>().ok(),
        pct: parse_integer(&form.pct).unwrap_or(DEFAULT_PCT),
        commentary: (!commentary.is_empty()).then(|| commentary.to_string()),
        file_url: Some(receipt.file_url),
        file_name: Some(receipt.file_name),
        status: BillStatus::Pending,
    }
}

#[cfg(test)]
#[path = "tests/new_bill_tests.rs"]
mod tests;
