//! Client core of the employee expense-report module: navigation gated by the
//! session role, the bills list and the new-bill submission workflow.

pub mod bills;
pub mod document;
pub mod error;
pub mod format;
pub mod gateway;
pub mod new_bill;
pub mod router;
pub mod session;
pub mod view;

pub use bills::{BillsListController, IconEyeTarget};
pub use document::{Document, MountToken, NavIcon, NavigationState, SharedDocument};
pub use error::{GatewayError, SubmitBlocked};
pub use format::DisplayBill;
pub use gateway::{BillsGateway, HttpBillsGateway, MissingBillsGateway, ReceiptUpload};
pub use new_bill::{
    FormPhase, FormSnapshot, NewBillController, NewBillForm, Receipt, SelectedFile,
    SubmitOutcome,
};
pub use router::{MountedView, Navigator, Route, Router};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore};
pub use view::{NewBillView, TextRenderer, ViewRenderer};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
