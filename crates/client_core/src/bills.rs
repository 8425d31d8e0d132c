use std::sync::Arc;

use shared::domain::Session;
use tracing::{debug, error};

use crate::{
    document::{MountToken, SharedDocument},
    error::GatewayError,
    format::{sort_most_recent_first, DisplayBill},
    gateway::BillsGateway,
    router::{Navigator, Route},
    view::ViewRenderer,
};

/// The clicked receipt icon; `data-bill-url` may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IconEyeTarget {
    pub bill_url: Option<String>,
}

impl IconEyeTarget {
    pub fn new(bill_url: impl Into<String>) -> Self {
        Self {
            bill_url: Some(bill_url.into()),
        }
    }
}

pub struct BillsListController {
    session: Session,
    gateway: Arc<dyn BillsGateway>,
    renderer: Arc<dyn ViewRenderer>,
    document: SharedDocument,
    navigator: Arc<dyn Navigator>,
    token: MountToken,
}

impl BillsListController {
    pub fn new(
        session: Session,
        gateway: Arc<dyn BillsGateway>,
        renderer: Arc<dyn ViewRenderer>,
        document: SharedDocument,
        navigator: Arc<dyn Navigator>,
        token: MountToken,
    ) -> Self {
        Self {
            session,
            gateway,
            renderer,
            document,
            navigator,
            token,
        }
    }

    pub async fn get_bills(&self) -> Result<Vec<DisplayBill>, GatewayError> {
        let records = self.gateway.list().await.map_err(|err| {
            error!(
                code = ?err.code(),
                "bills: list failed for {}: {err}",
                self.session.email
            );
            err
        })?;
        let bills = records.into_iter().map(DisplayBill::from_record).collect();
        Ok(sort_most_recent_first(bills))
    }

    pub async fn handle_click_new_bill(&self) {
        self.navigator.navigate(Route::NewBill).await;
    }

    pub async fn handle_click_icon_eye(&self, target: &IconEyeTarget) {
        let markup = self.renderer.receipt_modal(target.bill_url.as_deref());
        if !self.document.lock().await.open_modal(self.token, markup) {
            debug!("bills: receipt preview ignored on an unmounted view");
        }
    }
}

#[cfg(test)]
#[path = "tests/bills_tests.rs"]
mod tests;
