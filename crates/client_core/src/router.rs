use std::sync::{Arc, Weak};

use async_trait::async_trait;
use shared::domain::Session;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::{
    bills::BillsListController,
    document::{Document, NavIcon, NavigationState, SharedDocument},
    gateway::BillsGateway,
    new_bill::NewBillController,
    view::{NewBillView, ViewRenderer},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Bills,
    NewBill,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "",
            Route::Bills => "#employee/bills",
            Route::NewBill => "#employee/bill/new",
        }
    }

    /// Accepts the hash path or the logical route name.
    pub fn from_path(pathname: &str) -> Option<Self> {
        match pathname.trim() {
            "" | "/" | "Login" => Some(Route::Login),
            "#employee/bills" | "Bills" => Some(Route::Bills),
            "#employee/bill/new" | "NewBill" => Some(Route::NewBill),
            _ => None,
        }
    }

    pub fn is_protected(self) -> bool {
        !matches!(self, Route::Login)
    }

    pub fn icon(self) -> Option<NavIcon> {
        match self {
            Route::Login => None,
            Route::Bills => Some(NavIcon::Window),
            Route::NewBill => Some(NavIcon::Mail),
        }
    }
}

/// Navigation capability handed to controllers.
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn navigate(&self, route: Route);
}

struct RouterHandle(Weak<Router>);

#[async_trait]
impl Navigator for RouterHandle {
    async fn navigate(&self, route: Route) {
        if let Some(router) = self.0.upgrade() {
            router.navigate_to(route).await;
        }
    }
}

#[derive(Clone, Default)]
pub enum MountedView {
    #[default]
    None,
    Forbidden,
    Bills(Arc<BillsListController>),
    NewBill(Arc<NewBillController>),
}

pub struct Router {
    session: Option<Session>,
    gateway: Arc<dyn BillsGateway>,
    renderer: Arc<dyn ViewRenderer>,
    document: SharedDocument,
    navigator: Arc<dyn Navigator>,
    mounted: Mutex<MountedView>,
    history: Mutex<Vec<Route>>,
}

impl Router {
    pub fn new(
        session: Option<Session>,
        gateway: Arc<dyn BillsGateway>,
        renderer: Arc<dyn ViewRenderer>,
    ) -> Arc<Self> {
        Self::with_document(session, gateway, renderer, Document::shared())
    }

    pub fn with_document(
        session: Option<Session>,
        gateway: Arc<dyn BillsGateway>,
        renderer: Arc<dyn ViewRenderer>,
        document: SharedDocument,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            session,
            gateway,
            renderer,
            document,
            navigator: Arc::new(RouterHandle(weak.clone())),
            mounted: Mutex::new(MountedView::None),
            history: Mutex::new(Vec::new()),
        })
    }

    pub fn document(&self) -> SharedDocument {
        Arc::clone(&self.document)
    }

    pub fn navigator(&self) -> Arc<dyn Navigator> {
        Arc::clone(&self.navigator)
    }

    pub async fn history(&self) -> Vec<Route> {
        self.history.lock().await.clone()
    }

    pub async fn current_route(&self) -> Option<Route> {
        self.document.lock().await.navigation().map(|nav| nav.route)
    }

    pub async fn mounted(&self) -> MountedView {
        self.mounted.lock().await.clone()
    }

    pub async fn bills_controller(&self) -> Option<Arc<BillsListController>> {
        match &*self.mounted.lock().await {
            MountedView::Bills(controller) => Some(Arc::clone(controller)),
            _ => None,
        }
    }

    pub async fn new_bill_controller(&self) -> Option<Arc<NewBillController>> {
        match &*self.mounted.lock().await {
            MountedView::NewBill(controller) => Some(Arc::clone(controller)),
            _ => None,
        }
    }

    /// Unknown paths are logged and ignored.
    pub async fn on_navigate(&self, pathname: &str) {
        match Route::from_path(pathname) {
            Some(route) => self.navigate_to(route).await,
            None => warn!("router: ignoring unknown path '{pathname}'"),
        }
    }

    pub async fn navigate_to(&self, route: Route) {
        self.history.lock().await.push(route);

        let employee = self.session.as_ref().filter(|session| session.is_employee());
        let session = match (route.is_protected(), employee) {
            (false, _) => {
                self.mount_login(route).await;
                return;
            }
            (true, None) => {
                warn!(
                    "router: blocked '{}' without an employee session",
                    route.path()
                );
                self.mount_login(route).await;
                return;
            }
            (true, Some(session)) => session.clone(),
        };

        info!("router: navigate to '{}'", route.path());
        match route {
            Route::Bills => self.mount_bills(session).await,
            Route::NewBill => self.mount_new_bill(session).await,
            Route::Login => {}
        }
    }

    async fn mount_login(&self, route: Route) {
        self.document.lock().await.mount(
            NavigationState {
                route,
                active_icon: None,
            },
            self.renderer.login_page(),
        );
        *self.mounted.lock().await = MountedView::Forbidden;
    }

    async fn mount_new_bill(&self, session: Session) {
        let token = self.document.lock().await.mount(
            NavigationState {
                route: Route::NewBill,
                active_icon: Route::NewBill.icon(),
            },
            self.renderer.new_bill_page(&NewBillView::default()),
        );
        let controller = Arc::new(NewBillController::new(
            session,
            Arc::clone(&self.gateway),
            Arc::clone(&self.renderer),
            self.document(),
            self.navigator(),
            token,
        ));
        *self.mounted.lock().await = MountedView::NewBill(controller);
    }

    async fn mount_bills(&self, session: Session) {
        let token = self.document.lock().await.mount(
            NavigationState {
                route: Route::Bills,
                active_icon: Route::Bills.icon(),
            },
            self.renderer.loading_page(),
        );
        let controller = Arc::new(BillsListController::new(
            session,
            Arc::clone(&self.gateway),
            Arc::clone(&self.renderer),
            self.document(),
            self.navigator(),
            token,
        ));
        *self.mounted.lock().await = MountedView::Bills(Arc::clone(&controller));

        let markup = match controller.get_bills().await {
            Ok(bills) => self.renderer.bills_page(&bills),
            Err(err) => {
                error!("router: failed to load bills: {err}");
                self.renderer.error_page(&err.to_string())
            }
        };
        if !self.document.lock().await.render(token, markup) {
            info!("router: dropped bills result for an unmounted view");
        }
    }
}

#[cfg(test)]
#[path = "tests/router_tests.rs"]
mod tests;
