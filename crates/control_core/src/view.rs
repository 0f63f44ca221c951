//! View transform tracking for the primary drawing surface.
//!
//! The surface itself (a scrollable container holding a much larger canvas)
//! is a platform service reached through [`SurfaceGeometry`]; this module
//! owns the derived state: offsets, drawable extent, and the once-computed
//! scrollable extent.

use std::sync::Arc;

use shared::domain::{CanvasOffset, Extent, Point};

/// Scrollable extent is this many times the client extent, fixed for the
/// lifetime of the surface.
pub const SCROLLABLE_AREA_FACTOR: f64 = 10.0;

/// Geometry snapshot of the canvas container as the platform sees it now.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContainerGeometry {
    /// Visible client size of the container, after scrollbars.
    pub client: Extent,
    /// Client size of the window body hosting the container.
    pub body: Extent,
    /// Bounding-rectangle position of the container within the window.
    pub bounding_left: f64,
    pub bounding_top: f64,
    /// Distance from the top of the body to the container.
    pub offset_top: f64,
}

/// Platform services for one drawing surface.
pub trait SurfaceGeometry: Send + Sync {
    /// Only the designated primary surface tracks a view transform;
    /// auxiliary windows answer false and the tracker no-ops.
    fn is_primary(&self) -> bool;

    /// None when the container element is absent (e.g. during teardown);
    /// all tracker operations become no-ops in that case.
    fn container(&self) -> Option<ContainerGeometry>;

    fn menu_bar_height(&self) -> f64;

    fn scroll_position(&self) -> Point;
    fn set_scroll_position(&self, position: Point);

    /// Stretches the inner canvas element to the scrollable extent.
    fn set_canvas_extent(&self, extent: Extent);

    /// Pins the container to fill the body below its own top offset.
    fn set_container_height(&self, height: f64);
}

pub struct ViewTransform {
    surface: Arc<dyn SurfaceGeometry>,
    left_offset: f64,
    top_offset: f64,
    menu_bar_height: f64,
    drawable: Extent,
    scrollable: Option<Extent>,
    initialized: bool,
}

impl ViewTransform {
    pub fn new(surface: Arc<dyn SurfaceGeometry>) -> Self {
        Self {
            surface,
            left_offset: 0.0,
            top_offset: 0.0,
            menu_bar_height: 0.0,
            drawable: Extent::default(),
            scrollable: None,
            initialized: false,
        }
    }

    /// Recomputes offsets and drawable size from the current container
    /// geometry. Idempotent; safe to call on every resize/layout event.
    /// The scrollable extent is computed once and never changes afterwards.
    pub fn reinitialize(&mut self) {
        if !self.surface.is_primary() {
            return;
        }
        let Some(container) = self.surface.container() else {
            return;
        };

        self.surface
            .set_container_height(container.body.height - container.offset_top);

        if self.scrollable.is_none() {
            let scrollable = Extent::new(
                container.body.width * SCROLLABLE_AREA_FACTOR,
                container.body.height * SCROLLABLE_AREA_FACTOR,
            );
            self.surface.set_canvas_extent(scrollable);
            self.scrollable = Some(scrollable);
        }

        // Client extent is read only after the canvas has been stretched,
        // since adding scrollbars shrinks it.
        let Some(container) = self.surface.container() else {
            return;
        };
        self.drawable = container.client;
        self.left_offset = container.bounding_left;
        self.top_offset = container.bounding_top;
        self.menu_bar_height = self.surface.menu_bar_height();
        self.initialized = true;
    }

    fn initialize_if_needed(&mut self) {
        if !self.initialized {
            self.reinitialize();
        }
    }

    pub fn offset(&mut self) -> CanvasOffset {
        self.initialize_if_needed();
        CanvasOffset {
            left: self.left_offset,
            top: self.top_offset,
            menu_bar_height: self.menu_bar_height,
        }
    }

    pub fn drawable_area(&mut self) -> Extent {
        self.initialize_if_needed();
        self.drawable
    }

    pub fn scrollable_area(&mut self) -> Extent {
        self.initialize_if_needed();
        self.scrollable.unwrap_or_default()
    }

    pub fn scroll_position(&self) -> Point {
        self.surface.scroll_position()
    }

    pub fn set_scroll_position(&self, position: Point) {
        self.surface.set_scroll_position(position);
    }

    pub fn scroll_to_center(&mut self) {
        self.initialize_if_needed();
        let Some(scrollable) = self.scrollable else {
            return;
        };
        self.surface
            .set_scroll_position(Point::new(scrollable.width / 2.0, scrollable.height / 2.0));
    }

    pub fn is_primary(&self) -> bool {
        self.surface.is_primary()
    }
}

/// A surface with fixed geometry and in-memory scroll state, for headless
/// shells and tests.
pub struct FixedSurface {
    primary: bool,
    container: Option<ContainerGeometry>,
    menu_bar_height: f64,
    scroll: std::sync::Mutex<Point>,
    canvas_extent: std::sync::Mutex<Option<Extent>>,
}

impl FixedSurface {
    pub fn primary(client: Extent) -> Self {
        Self {
            primary: true,
            container: Some(ContainerGeometry {
                client,
                body: client,
                ..ContainerGeometry::default()
            }),
            menu_bar_height: 0.0,
            scroll: std::sync::Mutex::new(Point::default()),
            canvas_extent: std::sync::Mutex::new(None),
        }
    }

    pub fn with_container(container: Option<ContainerGeometry>, primary: bool) -> Self {
        Self {
            primary,
            container,
            menu_bar_height: 0.0,
            scroll: std::sync::Mutex::new(Point::default()),
            canvas_extent: std::sync::Mutex::new(None),
        }
    }

    pub fn canvas_extent(&self) -> Option<Extent> {
        *self.canvas_extent.lock().unwrap()
    }
}

impl SurfaceGeometry for FixedSurface {
    fn is_primary(&self) -> bool {
        self.primary
    }

    fn container(&self) -> Option<ContainerGeometry> {
        self.container
    }

    fn menu_bar_height(&self) -> f64 {
        self.menu_bar_height
    }

    fn scroll_position(&self) -> Point {
        *self.scroll.lock().unwrap()
    }

    fn set_scroll_position(&self, position: Point) {
        *self.scroll.lock().unwrap() = position;
    }

    fn set_canvas_extent(&self, extent: Extent) {
        *self.canvas_extent.lock().unwrap() = Some(extent);
    }

    fn set_container_height(&self, _height: f64) {}
}
