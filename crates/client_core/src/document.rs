use std::sync::Arc;

use tokio::sync::Mutex;

use crate::router::Route;

/// Navigation icons of the vertical layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavIcon {
    Window,
    Mail,
}

impl NavIcon {
    pub const ALL: [NavIcon; 2] = [NavIcon::Window, NavIcon::Mail];

    pub fn test_id(self) -> &'static str {
        match self {
            NavIcon::Window => "icon-window",
            NavIcon::Mail => "icon-mail",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationState {
    pub route: Route,
    pub active_icon: Option<NavIcon>,
}

/// Identifies one mounted view. Callbacks holding an older token are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountToken(u64);

/// The single mount point all views render into.
#[derive(Debug, Default)]
pub struct Document {
    generation: u64,
    navigation: Option<NavigationState>,
    root: String,
    modal: Option<String>,
}

pub type SharedDocument = Arc<Mutex<Document>>;

impl Document {
    pub fn shared() -> SharedDocument {
        Arc::new(Mutex::new(Self::default()))
    }

    /// Replaces whatever was mounted. Earlier tokens stop being current.
    pub fn mount(&mut self, navigation: NavigationState, markup: String) -> MountToken {
        self.generation += 1;
        self.navigation = Some(navigation);
        self.root = markup;
        self.modal = None;
        MountToken(self.generation)
    }

    pub fn is_mounted(&self, token: MountToken) -> bool {
        token.0 == self.generation
    }

    /// Re-renders the root of the mounted view; no-op for a stale token.
    pub fn render(&mut self, token: MountToken, markup: String) -> bool {
        if !self.is_mounted(token) {
            return false;
        }
        self.root = markup;
        true
    }

    pub fn open_modal(&mut self, token: MountToken, markup: String) -> bool {
        if !self.is_mounted(token) {
            return false;
        }
        self.modal = Some(markup);
        true
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn modal(&self) -> Option<&str> {
        self.modal.as_deref()
    }

    pub fn navigation(&self) -> Option<NavigationState> {
        self.navigation
    }

    pub fn active_icon(&self) -> Option<NavIcon> {
        self.navigation.and_then(|nav| nav.active_icon)
    }

    pub fn icon_states(&self) -> [(NavIcon, bool); 2] {
        let active = self.active_icon();
        NavIcon::ALL.map(|icon| (icon, active == Some(icon)))
    }

    /// Root plus modal, the way a host would display the page.
    pub fn to_markup(&self) -> String {
        match &self.modal {
            Some(modal) => format!("{}{}", self.root, modal),
            None => self.root.clone(),
        }
    }
}
