//! Dashboard shell: which surface a session renders.
//!
//! Page widgets themselves live outside this workspace. The shell only
//! decides between loading, error, login and dashboard views, and which
//! dashboard surfaces a user may open. Capabilities arrive explicitly via
//! [`ShellContext`].

use opsgate_types::{RoutePaths, SessionSnapshot, SessionState, UserId};
use serde::{Deserialize, Serialize};

/// Dashboard page surfaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    Forecasting,
    Inspection,
    Map,
    Reporting,
    SupplierScorecards,
    FeatureFlags,
}

impl Surface {
    pub const ALL: [Surface; 6] = [
        Surface::Forecasting,
        Surface::Inspection,
        Surface::Map,
        Surface::Reporting,
        Surface::SupplierScorecards,
        Surface::FeatureFlags,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            Surface::Forecasting => "forecasting",
            Surface::Inspection => "inspection",
            Surface::Map => "map",
            Surface::Reporting => "reporting",
            Surface::SupplierScorecards => "suppliers",
            Surface::FeatureFlags => "feature-flags",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Surface::Forecasting => "Demand Forecasting",
            Surface::Inspection => "Visual Inspection",
            Surface::Map => "Shipment Map",
            Surface::Reporting => "AI Reporting",
            Surface::SupplierScorecards => "Supplier Scorecards",
            Surface::FeatureFlags => "Feature Flags",
        }
    }

    pub fn requires_admin(&self) -> bool {
        matches!(self, Surface::FeatureFlags)
    }

    /// Route of this surface below the dashboard path.
    pub fn path(&self, routes: &RoutePaths) -> String {
        format!("{}/{}", routes.dashboard.trim_end_matches('/'), self.slug())
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|surface| surface.slug() == slug)
    }
}

/// Capabilities handed to dashboard surfaces by the composing layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellContext {
    pub user_id: UserId,
    pub is_admin: bool,
}

impl ShellContext {
    /// Context for an authenticated snapshot; `None` otherwise.
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Option<Self> {
        snapshot.state.user_id().map(|user_id| Self {
            user_id: user_id.clone(),
            is_admin: snapshot.is_admin,
        })
    }

    pub fn can_open(&self, surface: Surface) -> bool {
        !surface.requires_admin() || self.is_admin
    }
}

/// Surfaces the user may open, in navigation order.
pub fn visible_surfaces(context: &ShellContext) -> Vec<Surface> {
    Surface::ALL
        .into_iter()
        .filter(|surface| context.can_open(*surface))
        .collect()
}

/// What the shell renders for a snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShellView {
    Loading,
    Error { reason: String },
    Login,
    Dashboard {
        context: ShellContext,
        surfaces: Vec<Surface>,
    },
}

impl ShellView {
    pub fn for_snapshot(snapshot: &SessionSnapshot) -> Self {
        match &snapshot.state {
            SessionState::Loading => ShellView::Loading,
            SessionState::Failed { reason } => ShellView::Error {
                reason: reason.clone(),
            },
            SessionState::Unauthenticated => ShellView::Login,
            SessionState::Authenticated { user_id } => {
                let context = ShellContext {
                    user_id: user_id.clone(),
                    is_admin: snapshot.is_admin,
                };
                let surfaces = visible_surfaces(&context);
                ShellView::Dashboard { context, surfaces }
            }
        }
    }
}
