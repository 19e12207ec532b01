//! Navigation state and responsive layout rules.
//!
//! Measurements are in pixels so the breakpoint and header height keep their
//! usual meaning; terminals that do not report pixel sizes are measured in
//! cells times a nominal cell size.

use tracing::debug;

/// Height of the fixed header, in pixels.
pub const HEADER_HEIGHT: u32 = 56;
/// Widest viewport that still uses the compact (hamburger) layout.
pub const COMPACT_MAX_WIDTH: u32 = 768;

pub const CELL_WIDTH_PX: u32 = 8;
pub const CELL_HEIGHT_PX: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Panel {
    Chat,
    #[default]
    Dashboard,
    Upload,
}

impl Panel {
    /// Navigation order, as shown in the header and the dropdown.
    pub const ALL: [Panel; 3] = [Panel::Chat, Panel::Dashboard, Panel::Upload];

    pub fn label(&self) -> &'static str {
        match self {
            Panel::Chat => "Chat",
            Panel::Dashboard => "Dashboard",
            Panel::Upload => "Upload Data",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Panel::Chat => 0,
            Panel::Dashboard => 1,
            Panel::Upload => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn next(&self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn previous(&self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Pixel size when the terminal reports one, otherwise cells scaled by the
    /// nominal cell size.
    pub fn from_terminal(columns: u16, rows: u16, pixels: Option<(u16, u16)>) -> Self {
        match pixels {
            Some((width, height)) if width > 0 && height > 0 => {
                Self::new(u32::from(width), u32::from(height))
            }
            _ => Self::new(
                u32::from(columns) * CELL_WIDTH_PX,
                u32::from(rows) * CELL_HEIGHT_PX,
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavLayout {
    /// Horizontal navigation list, no hamburger.
    Wide,
    /// Hamburger control with a dropdown menu.
    Compact,
}

/// Size handed to the embedded dashboard: the viewport minus the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardFrame {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct ViewState {
    active_panel: Panel,
    menu_open: bool,
    menu_cursor: usize, // highlighted row in the dropdown
    viewport: Viewport,
}

impl ViewState {
    /// Creates the shell state with the measurement taken at mount.
    pub fn mount(initial: Viewport) -> Self {
        let mut state = Self {
            active_panel: Panel::default(),
            menu_open: false,
            menu_cursor: Panel::default().index(),
            viewport: Viewport::default(),
        };
        state.on_resize(initial);
        state
    }

    pub fn active_panel(&self) -> Panel {
        self.active_panel
    }

    pub fn menu_open(&self) -> bool {
        self.menu_open
    }

    pub fn menu_cursor(&self) -> usize {
        self.menu_cursor
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Switches panels. Choosing a panel also dismisses the mobile menu.
    pub fn set_active_panel(&mut self, panel: Panel) {
        debug!(?panel, "active panel changed");
        self.active_panel = panel;
        self.menu_open = false;
    }

    pub fn toggle_menu(&mut self) {
        self.menu_open = !self.menu_open;
        if self.menu_open {
            self.menu_cursor = self.active_panel.index();
        }
    }

    pub fn on_resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn menu_down(&mut self) {
        self.menu_cursor = (self.menu_cursor + 1).min(Panel::ALL.len() - 1);
    }

    pub fn menu_up(&mut self) {
        self.menu_cursor = self.menu_cursor.saturating_sub(1);
    }

    /// Activates the highlighted dropdown entry.
    pub fn menu_select(&mut self) {
        if let Some(panel) = Panel::from_index(self.menu_cursor) {
            self.set_active_panel(panel);
        }
    }

    pub fn layout(&self) -> NavLayout {
        if self.viewport.width <= COMPACT_MAX_WIDTH {
            NavLayout::Compact
        } else {
            NavLayout::Wide
        }
    }

    pub fn nav_list_visible(&self) -> bool {
        self.layout() == NavLayout::Wide
    }

    pub fn hamburger_visible(&self) -> bool {
        self.layout() == NavLayout::Compact
    }

    /// The dropdown only shows in the compact layout, whatever `menu_open` says.
    pub fn mobile_menu_visible(&self) -> bool {
        self.menu_open && self.layout() == NavLayout::Compact
    }

    pub fn dashboard_frame(&self) -> DashboardFrame {
        DashboardFrame {
            width: self.viewport.width,
            height: self.viewport.height.saturating_sub(HEADER_HEIGHT),
        }
    }
}
