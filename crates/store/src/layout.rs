use std::sync::Arc;

use shared::{Action, SectionId};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LayoutState {
    pub sidebar_shown: bool,
    pub sidebar_section_id: Option<SectionId>,
    pub account_menu_shown: bool,
    pub header_collapsed: bool,
}

pub fn reducer(state: Option<&Arc<LayoutState>>, action: &Action) -> Arc<LayoutState> {
    let current = state
        .cloned()
        .unwrap_or_else(|| Arc::new(LayoutState::default()));

    let next = match action {
        Action::SetSidebarShown(shown) => LayoutState {
            sidebar_shown: *shown,
            ..(*current).clone()
        },
        Action::SetSidebarSectionId(section_id) => LayoutState {
            sidebar_section_id: section_id.clone(),
            ..(*current).clone()
        },
        Action::SetAccountMenuShown(shown) => LayoutState {
            account_menu_shown: *shown,
            ..(*current).clone()
        },
        Action::SetHeaderCollapsed(collapsed) => LayoutState {
            header_collapsed: *collapsed,
            ..(*current).clone()
        },
        _ => return current,
    };
    Arc::new(next)
}
